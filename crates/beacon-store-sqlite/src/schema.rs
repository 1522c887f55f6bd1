//! SQL schema for the Beacon SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Each table carries an integer `seq` so "oldest first" has a stable
/// tie-break when two rows share a `created_at`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS delivery_jobs (
    seq              INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id           TEXT NOT NULL UNIQUE,
    recipient        TEXT NOT NULL,
    subject          TEXT NOT NULL,
    body             TEXT NOT NULL,
    status           TEXT NOT NULL,   -- 'pending' | 'sending' | 'sent' | 'failed'
    attempts         INTEGER NOT NULL DEFAULT 0,
    last_attempt_at  TEXT,
    error            TEXT,
    created_at       TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    sent_at          TEXT,
    correlation_kind TEXT,
    correlation_id   TEXT
);

CREATE INDEX IF NOT EXISTS jobs_status_idx         ON delivery_jobs(status);
CREATE INDEX IF NOT EXISTS jobs_status_created_idx ON delivery_jobs(status, created_at);

-- Audit events are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS audit_events (
    seq           INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id      TEXT NOT NULL UNIQUE,
    event_type    TEXT NOT NULL,
    outcome       TEXT NOT NULL,      -- 'success' | 'denied' | 'error'
    actor_user_id TEXT,
    actor_email   TEXT,               -- normalized
    target_type   TEXT,
    target_id     TEXT,
    details       TEXT,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS events_created_idx       ON audit_events(created_at);
CREATE INDEX IF NOT EXISTS events_type_created_idx  ON audit_events(event_type, created_at);
CREATE INDEX IF NOT EXISTS events_actor_created_idx ON audit_events(actor_email, created_at);
CREATE INDEX IF NOT EXISTS events_outcome_created_idx ON audit_events(outcome, created_at);

CREATE TABLE IF NOT EXISTS security_alerts (
    seq              INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id         TEXT NOT NULL UNIQUE,
    actor_email      TEXT NOT NULL,
    event_type       TEXT NOT NULL,
    threshold        INTEGER NOT NULL,
    count_in_window  INTEGER NOT NULL,
    window_start     TEXT NOT NULL,
    window_end       TEXT NOT NULL,
    status           TEXT NOT NULL,   -- 'open' | 'resolved'
    created_at       TEXT NOT NULL,
    resolved_at      TEXT,
    resolved_by      TEXT,
    resolution_notes TEXT
);

CREATE INDEX IF NOT EXISTS alerts_status_created_idx ON security_alerts(status, created_at);
CREATE INDEX IF NOT EXISTS alerts_actor_status_idx   ON security_alerts(actor_email, status);

PRAGMA user_version = 1;
";
