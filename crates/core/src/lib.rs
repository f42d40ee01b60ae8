//! Domain types for the stem separation service.
//!
//! Pure logic only: no I/O beyond path arithmetic. The job state machine,
//! the engine output layout resolver and the reconciliation rule that turns
//! published artifacts into a uniform four-stem result all live here so they
//! can be tested without a runtime.

pub mod audio;
pub mod error;
pub mod job;
pub mod layout;
pub mod models;
pub mod request;
pub mod stems;
pub mod types;
