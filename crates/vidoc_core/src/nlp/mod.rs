//! Transcript processing: cleaning, labeling, summary, steps and timeline.

pub mod model;
pub mod processor;
pub mod rules;

pub use model::{ModelError, NullModel, TextModel};
pub use processor::{DocumentProcessor, NlpError, RuleBasedProcessor};
