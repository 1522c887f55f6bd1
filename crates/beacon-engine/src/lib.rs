//! Beacon's engines: the rate-limited delivery queue, its single-flight
//! worker, the audit log and the threshold alerting engine.
//!
//! Everything here is written against the `beacon-core` store traits and
//! [`Transport`](beacon_core::transport::Transport); callers pick the
//! backends.
//!
//! # Wiring
//!
//! ```rust,ignore
//! let (scheduler, wakeups) = worker::channel();
//! let queue  = DeliveryQueue::new(store.clone(), transport, Arc::new(scheduler));
//! let worker = worker::spawn(queue.clone(), wakeups);
//! queue.resume().await?;
//! ```

pub mod alert;
pub mod audit;
pub mod error;
pub mod overview;
pub mod queue;
pub mod worker;

pub use alert::{AlertEngine, Denial, Resolution};
pub use audit::AuditLog;
pub use error::{Error, Result};
pub use queue::{DeliveryQueue, Scheduler, Step};

#[cfg(test)]
mod tests;
