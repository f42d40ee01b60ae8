//! Job orchestration for stem separation.
//!
//! A submission stages the upload, creates a [`JobRecord`](store::JobRecord)
//! and queues a ticket on the [`WorkerPool`](pool::WorkerPool). The pool's
//! [`Dispatcher`](pool::Dispatcher) runs each ticket through a
//! [`SeparationWorker`](worker::SeparationWorker), which drives the engine,
//! publishes the stems and finalizes the record.

pub mod config;
pub mod error;
pub mod pool;
pub mod runtime;
pub mod store;
pub mod submission;
pub mod worker;
pub mod workspace;

pub use config::PipelineConfig;
pub use runtime::Pipeline;
