//! Transcript to structured document.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use super::model::{ModelError, NullModel, TextModel};
use super::rules::{
    derive_title, merge_similar_steps, rule_summary, Classifier, TextCleaner, DEFAULT_FILLER_WORDS,
    DEFAULT_RULES, SUMMARY_SENTENCE_LIMIT,
};
use crate::models::{
    DocumentStatistics, ProcessedDocument, SegmentLabel, TimelineItem, Transcript,
};

/// Key concepts kept in a document.
const MAX_KEY_CONCEPTS: usize = 10;

/// Title used when no sentence qualifies.
pub const FALLBACK_TITLE: &str = "Video documentation";

/// Errors from document processing.
#[derive(Error, Debug)]
pub enum NlpError {
    #[error("Invalid rule pattern: {0}")]
    Rules(#[from] regex::Error),

    #[error("Utterance {index} has invalid times ({start}, {end})")]
    InvalidTiming { index: usize, start: f64, end: f64 },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Turns a transcript into a [`ProcessedDocument`].
pub trait DocumentProcessor: Send + Sync {
    fn process(&self, transcript: &Transcript) -> Result<ProcessedDocument, NlpError>;
}

/// A cleaned and labeled utterance.
#[derive(Debug, Clone)]
struct LabeledSegment {
    start: f64,
    end: f64,
    text: String,
    label: SegmentLabel,
    confidence: f64,
}

/// Keyword rules, optionally assisted by a [`TextModel`] for the summary and
/// for steps when no action was recognized.
pub struct RuleBasedProcessor {
    cleaner: TextCleaner,
    classifier: Classifier,
    model: Arc<dyn TextModel>,
}

impl RuleBasedProcessor {
    /// Processor with the default rules and no model.
    pub fn new() -> Result<Self, NlpError> {
        Ok(Self {
            cleaner: TextCleaner::new(DEFAULT_FILLER_WORDS)?,
            classifier: Classifier::new(DEFAULT_RULES, 0.0)?,
            model: Arc::new(NullModel),
        })
    }

    pub fn with_model(mut self, model: Arc<dyn TextModel>) -> Self {
        self.model = model;
        self
    }

    fn label(&self, transcript: &Transcript) -> Result<Vec<LabeledSegment>, NlpError> {
        let mut segments = Vec::with_capacity(transcript.utterances.len());
        for (index, utterance) in transcript.utterances.iter().enumerate() {
            if !utterance.start.is_finite() || !utterance.end.is_finite() {
                return Err(NlpError::InvalidTiming {
                    index,
                    start: utterance.start,
                    end: utterance.end,
                });
            }

            let text = self.cleaner.clean(&utterance.text);
            if !TextCleaner::is_meaningful(&text) {
                tracing::trace!("[NLP] Skipping short utterance {}", index);
                continue;
            }
            let label = self.classifier.classify(&text, utterance.confidence);
            segments.push(LabeledSegment {
                start: utterance.start.max(0.0),
                end: utterance.end.max(utterance.start).max(0.0),
                text,
                label,
                confidence: utterance.confidence,
            });
        }
        tracing::debug!(
            "[NLP] Kept {} of {} utterances",
            segments.len(),
            transcript.utterances.len()
        );
        Ok(segments)
    }

    fn summarize(&self, segments: &[LabeledSegment]) -> String {
        let passages: Vec<&str> = segments
            .iter()
            .filter(|s| s.label != SegmentLabel::Noise)
            .map(|s| s.text.as_str())
            .collect();
        if passages.is_empty() {
            return "No content to summarize.".to_string();
        }

        if self.model.is_available() {
            let prompt = format!(
                "Summarize the following spoken instructions into 2-3 concise sentences.\n\
                 Focus on the main actions and key concepts discussed.\n\nText:\n{}\n\nSummary:",
                passages.join(" ")
            );
            match self.model.generate(&prompt) {
                Ok(summary) if !summary.trim().is_empty() => return summary.trim().to_string(),
                Ok(_) => tracing::warn!("[NLP] Model returned an empty summary"),
                Err(e) => tracing::warn!("[NLP] Model summary failed, using rules: {}", e),
            }
        }
        rule_summary(&passages, SUMMARY_SENTENCE_LIMIT)
    }

    fn extract_steps(&self, segments: &[LabeledSegment]) -> Vec<String> {
        let mut steps: Vec<String> = segments
            .iter()
            .filter(|s| s.label == SegmentLabel::Action)
            .map(|s| s.text.clone())
            .collect();

        if steps.is_empty() && self.model.is_available() && !segments.is_empty() {
            let text = segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let prompt = format!(
                "Extract clear, actionable steps from the following spoken text.\n\
                 Return only the steps, numbered, one per line.\n\nText:\n{}\n\nSteps:",
                text
            );
            match self.model.generate_list(&prompt) {
                Ok(list) => steps = list,
                Err(e) => tracing::warn!("[NLP] Model step extraction failed: {}", e),
            }
        }

        merge_similar_steps(steps)
    }
}

impl DocumentProcessor for RuleBasedProcessor {
    fn process(&self, transcript: &Transcript) -> Result<ProcessedDocument, NlpError> {
        let segments = self.label(transcript)?;

        let title = derive_title(segments.iter().map(|s| (s.text.as_str(), s.label)))
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());
        let summary = self.summarize(&segments);
        let steps = self.extract_steps(&segments);

        let key_concepts = segments
            .iter()
            .filter(|s| s.label == SegmentLabel::Definition)
            .map(|s| s.text.clone())
            .take(MAX_KEY_CONCEPTS)
            .collect();

        let statistics = statistics(&segments);

        let timeline = segments
            .into_iter()
            .filter(|s| s.label.is_documentable())
            .map(|s| TimelineItem {
                start: s.start,
                end: s.end,
                text: s.text,
                label: s.label,
                confidence: s.confidence,
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "[NLP] {} timeline item(s), {} step(s)",
            timeline.len(),
            steps.len()
        );

        Ok(ProcessedDocument {
            title,
            summary,
            steps,
            key_concepts,
            timeline,
            statistics,
        })
    }
}

fn statistics(segments: &[LabeledSegment]) -> DocumentStatistics {
    let mut label_distribution = BTreeMap::new();
    for segment in segments {
        *label_distribution
            .entry(segment.label.as_str().to_string())
            .or_insert(0) += 1;
    }
    let total_words: usize = segments
        .iter()
        .map(|s| s.text.split_whitespace().count())
        .sum();

    DocumentStatistics {
        total_segments: segments.len(),
        total_words,
        label_distribution,
        avg_segment_length: if segments.is_empty() {
            0.0
        } else {
            total_words as f64 / segments.len() as f64
        },
    }
}
