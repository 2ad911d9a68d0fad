//! Pipeline orchestrator for coordinating job execution.
//!
//! Each job runs a fixed sequence of steps after its upload has been
//! validated. Progress is written to the status store as the steps advance.
//!
//! # Architecture
//!
//! ```text
//! JobRunner (validate, then)
//!     Pipeline
//!         ├── Step: Prepare      Preparing          5
//!         ├── Step: Segment      Segmenting        15  (segments.persist)
//!         ├── Step: Transcribe   Transcribing      30
//!         ├── Step: Nlp          NLP processing    60
//!         ├── Step: Clips        Generating clips  70 → 90
//!         └── Step: Export       Exporting         95
//!     Complete                                    100
//! ```

mod errors;
mod pipeline;
mod reporter;
mod runner;
mod step;
pub mod steps;
mod types;

pub use errors::{ItemError, PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use reporter::ProgressReporter;
pub use runner::{create_standard_pipeline, JobReport, JobRunner, Services};
pub use step::PipelineStep;
pub use steps::{ClipsStep, ExportStep, NlpStep, PrepareStep, SegmentStep, TranscribeStep};
pub use types::{Context, JobState, StepOutcome};
