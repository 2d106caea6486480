//! IC Intake — submission validation and result-aggregation pipeline.
//!
//! Turns a raw inbound email plus its attachments into a classified,
//! validated, deduplicated submission with a hierarchical pass/fail
//! report. Mailbox transport, map rendering, and database mechanics
//! live behind collaborator traits; this crate owns only the decision
//! pipeline.

pub mod attachments;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod geometry;
pub mod mail;
pub mod pipeline;
pub mod report;
pub mod store;

pub use error::{Error, Result};
