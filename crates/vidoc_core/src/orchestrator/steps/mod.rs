//! Pipeline step implementations.

mod clips;
mod export;
mod nlp;
mod prepare;
mod segment;
mod transcribe;

pub use clips::ClipsStep;
pub use export::ExportStep;
pub use nlp::NlpStep;
pub use prepare::PrepareStep;
pub use segment::SegmentStep;
pub use transcribe::{TranscribeStep, TRANSCRIPT_FILE_NAME};
