//! External separation engine boundary.
//!
//! The engine is a black-box process that reads an audio file and writes
//! stem files under an output directory. [`SeparationEngine`] is the seam
//! the pipeline drives; [`DemucsEngine`] is the production implementation
//! that spawns the Demucs CLI.

pub mod config;
pub mod demucs;
pub mod engine;
pub mod subprocess;

pub use config::EngineConfig;
pub use demucs::DemucsEngine;
pub use engine::{EngineError, EngineJob, SeparationEngine};
