//! Core types and trait definitions for Beacon.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! defines the three record kinds (delivery jobs, audit events, security
//! alerts), the store traits the engines are written against, and the narrow
//! [`transport::Transport`] contract used to hand a job to the outside world.

pub mod alert;
pub mod audit;
pub mod clock;
pub mod error;
pub mod job;
pub mod policy;
pub mod store;
pub mod transport;

pub use error::{Error, Result};
