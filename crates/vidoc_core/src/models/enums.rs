//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// Category assigned to a transcript segment by the document processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentLabel {
    Greeting,
    Farewell,
    Action,
    Explanation,
    Question,
    Transition,
    Definition,
    Statement,
    Noise,
}

impl SegmentLabel {
    /// All labels in rule-evaluation order.
    pub const ALL: [SegmentLabel; 9] = [
        SegmentLabel::Greeting,
        SegmentLabel::Farewell,
        SegmentLabel::Action,
        SegmentLabel::Explanation,
        SegmentLabel::Question,
        SegmentLabel::Transition,
        SegmentLabel::Definition,
        SegmentLabel::Statement,
        SegmentLabel::Noise,
    ];

    /// Lowercase name as used in documents and model prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentLabel::Greeting => "greeting",
            SegmentLabel::Farewell => "farewell",
            SegmentLabel::Action => "action",
            SegmentLabel::Explanation => "explanation",
            SegmentLabel::Question => "question",
            SegmentLabel::Transition => "transition",
            SegmentLabel::Definition => "definition",
            SegmentLabel::Statement => "statement",
            SegmentLabel::Noise => "noise",
        }
    }

    /// Parse a lowercase label name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == name.trim().to_lowercase())
    }

    /// Whether segments with this label belong in the documentation timeline.
    ///
    /// Greetings, farewells and noise are dropped before the document is built.
    pub fn is_documentable(&self) -> bool {
        !matches!(
            self,
            SegmentLabel::Greeting | SegmentLabel::Farewell | SegmentLabel::Noise
        )
    }
}

impl std::fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Problem reported by the upload validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCode {
    /// The file does not exist.
    FileNotFound,
    /// The file extension is not in the allow-list.
    InvalidFormat,
    /// ffprobe could not read a duration.
    DurationUnreadable,
    /// The duration exceeds the configured maximum.
    DurationTooLong,
}

impl ProblemCode {
    /// Stable snake_case code, as reported to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemCode::FileNotFound => "file_not_found",
            ProblemCode::InvalidFormat => "invalid_format",
            ProblemCode::DurationUnreadable => "duration_unreadable",
            ProblemCode::DurationTooLong => "duration_too_long",
        }
    }
}

impl std::fmt::Display for ProblemCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
