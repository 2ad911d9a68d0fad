//! vidoc core - backend logic for turning a video into documentation.
//!
//! This crate contains the job engine and every processing stage with zero
//! UI dependencies. It is driven by the `vidoc` CLI but can be embedded in
//! any front-end that can submit jobs and poll status records.

pub mod clips;
pub mod config;
pub mod export;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod nlp;
pub mod orchestrator;
pub mod scenes;
pub mod transcription;
pub mod validation;
pub mod video;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
