//! Transcript and documentation structures passed between phases.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::SegmentLabel;
use super::media::Clip;

/// One recognized utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Output of the speech-to-text collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub utterances: Vec<Utterance>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub model: String,
}

impl Transcript {
    /// All utterance text joined by single spaces.
    pub fn full_text(&self) -> String {
        self.utterances
            .iter()
            .map(|u| u.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }
}

/// A labeled span of the transcript placed on the documentation timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub label: SegmentLabel,
    #[serde(default)]
    pub confidence: f64,
}

/// Aggregate numbers over the processed transcript.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentStatistics {
    pub total_segments: usize,
    pub total_words: usize,
    pub label_distribution: BTreeMap<String, usize>,
    pub avg_segment_length: f64,
}

/// Output of the document processor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub title: String,
    pub summary: String,
    pub steps: Vec<String>,
    pub key_concepts: Vec<String>,
    pub timeline: Vec<TimelineItem>,
    pub statistics: DocumentStatistics,
}

/// A GIF produced for one timeline item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipArtifact {
    /// Index into `ProcessedDocument::timeline`.
    pub item_index: usize,
    pub clip: Clip,
    /// Path relative to the job output directory (e.g. `gifs/clip_001.gif`).
    pub gif: PathBuf,
}
