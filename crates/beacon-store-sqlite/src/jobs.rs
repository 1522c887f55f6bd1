//! [`JobStore`] for [`SqliteStore`].

use beacon_core::{
  job::{DeliveryJob, JobDraft, JobStatus},
  store::JobStore,
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  encode::{JOB_COLUMNS, RawJob, encode_dt, encode_uuid},
};

impl SqliteStore {
  /// Fetch one job row by its encoded id inside an open connection.
  fn select_job(
    conn: &rusqlite::Connection,
    id_str: &str,
  ) -> rusqlite::Result<Option<RawJob>> {
    conn
      .query_row(
        &format!("SELECT {JOB_COLUMNS} FROM delivery_jobs WHERE job_id = ?1"),
        rusqlite::params![id_str],
        RawJob::from_row,
      )
      .optional()
  }

  /// The first row of `sql` (a `SELECT {JOB_COLUMNS} … LIMIT 1` query).
  async fn first_job(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Option<DeliveryJob>> {
    let raw: Option<RawJob> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), RawJob::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawJob::into_job).transpose()
  }
}

impl JobStore for SqliteStore {
  type Error = crate::Error;

  async fn insert_job(&self, draft: JobDraft) -> Result<DeliveryJob> {
    let JobDraft { job, created_at } = draft;
    let stored = DeliveryJob {
      job_id: Uuid::new_v4(),
      recipient: job.recipient,
      subject: job.subject,
      body: job.body,
      status: JobStatus::Pending,
      attempts: 0,
      last_attempt_at: None,
      error: None,
      created_at,
      sent_at: None,
      correlation: job.correlation,
    };

    let id_str    = encode_uuid(stored.job_id);
    let recipient = stored.recipient.clone();
    let subject   = stored.subject.clone();
    let body      = stored.body.clone();
    let at_str    = encode_dt(stored.created_at);
    let (corr_kind, corr_id) = match &stored.correlation {
      Some(c) => (Some(c.kind.clone()), Some(c.id.clone())),
      None => (None, None),
    };

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO delivery_jobs (
             job_id, recipient, subject, body, status, attempts, created_at,
             correlation_kind, correlation_id
           ) VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, recipient, subject, body, at_str, corr_kind, corr_id
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(stored)
  }

  async fn get_job(&self, job_id: Uuid) -> Result<Option<DeliveryJob>> {
    let id_str = encode_uuid(job_id);
    let raw = self
      .conn
      .call(move |conn| Ok(Self::select_job(conn, &id_str)?))
      .await?;
    raw.map(RawJob::into_job).transpose()
  }

  async fn oldest_pending(&self) -> Result<Option<DeliveryJob>> {
    self
      .first_job(
        format!(
          "SELECT {JOB_COLUMNS} FROM delivery_jobs
           WHERE status = 'pending'
           ORDER BY created_at ASC, seq ASC
           LIMIT 1"
        ),
        vec![],
      )
      .await
  }

  async fn oldest_retriable(&self, max_attempts: u32) -> Result<Option<DeliveryJob>> {
    self
      .first_job(
        format!(
          "SELECT {JOB_COLUMNS} FROM delivery_jobs
           WHERE status = 'failed' AND attempts < ?1
           ORDER BY created_at ASC, seq ASC
           LIMIT 1"
        ),
        vec![i64::from(max_attempts).into()],
      )
      .await
  }

  async fn claim(&self, job_id: Uuid, at: DateTime<Utc>) -> Result<Option<DeliveryJob>> {
    let id_str = encode_uuid(job_id);
    let at_str = encode_dt(at);

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE delivery_jobs
           SET status = 'sending', last_attempt_at = ?2
           WHERE job_id = ?1 AND status IN ('pending', 'failed')",
          rusqlite::params![id_str, at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(Self::select_job(conn, &id_str)?)
      })
      .await?;

    raw.map(RawJob::into_job).transpose()
  }

  async fn mark_sent(&self, job_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let id_str = encode_uuid(job_id);
    let at_str = encode_dt(at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE delivery_jobs
           SET status = 'sent', sent_at = ?2, error = NULL
           WHERE job_id = ?1 AND status = 'sending'",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn mark_failed(&self, job_id: Uuid, error: String) -> Result<Option<DeliveryJob>> {
    let id_str = encode_uuid(job_id);

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE delivery_jobs
           SET status = 'failed', attempts = attempts + 1, error = ?2
           WHERE job_id = ?1 AND status = 'sending'",
          rusqlite::params![id_str, error],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(Self::select_job(conn, &id_str)?)
      })
      .await?;

    raw.map(RawJob::into_job).transpose()
  }

  async fn list_jobs(&self, status: JobStatus) -> Result<Vec<DeliveryJob>> {
    let status_str = status.as_ref().to_owned();

    let raws: Vec<RawJob> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {JOB_COLUMNS} FROM delivery_jobs
           WHERE status = ?1
           ORDER BY created_at ASC, seq ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![status_str], RawJob::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawJob::into_job).collect()
  }

  async fn count_jobs(&self, status: JobStatus) -> Result<u64> {
    let status_str = status.as_ref().to_owned();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM delivery_jobs WHERE status = ?1",
          rusqlite::params![status_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count as u64)
  }

  async fn count_failed(&self, max_attempts: u32) -> Result<(u64, u64)> {
    let max = i64::from(max_attempts);

    let (retriable, exhausted): (i64, i64) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT
             COALESCE(SUM(CASE WHEN attempts <  ?1 THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN attempts >= ?1 THEN 1 ELSE 0 END), 0)
           FROM delivery_jobs
           WHERE status = 'failed'",
          rusqlite::params![max],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?)
      })
      .await?;

    Ok((retriable as u64, exhausted as u64))
  }

  async fn reset_failed(&self) -> Result<u64> {
    let changed = self
      .conn
      .call(|conn| {
        Ok(conn.execute(
          "UPDATE delivery_jobs
           SET status = 'pending', attempts = 0, error = NULL
           WHERE status = 'failed'",
          [],
        )?)
      })
      .await?;

    Ok(changed as u64)
  }

  async fn fail_stalled(&self, error: String) -> Result<u64> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE delivery_jobs
           SET status = 'failed', attempts = attempts + 1, error = ?1
           WHERE status = 'sending'",
          rusqlite::params![error],
        )?)
      })
      .await?;

    Ok(changed as u64)
  }

  async fn delete_job(&self, job_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(job_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM delivery_jobs WHERE job_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }
}
