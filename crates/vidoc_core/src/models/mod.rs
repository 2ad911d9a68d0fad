//! Data models for vidoc.
//!
//! This module contains the value objects that flow through the pipeline:
//! - Enums for segment labels and validation problem codes
//! - Media structures (assets, scenes, time ranges, clips)
//! - Document structures (transcripts, timeline items, processed documents)
//!
//! Value objects carry no back-references and are never mutated once a
//! stage has produced them.

mod document;
mod enums;
pub(crate) mod media;

pub use document::{
    ClipArtifact, DocumentStatistics, ProcessedDocument, TimelineItem, Transcript, Utterance,
};
pub use enums::{ProblemCode, SegmentLabel};
pub use media::{Clip, Scene, TimeRange, VideoAsset};
