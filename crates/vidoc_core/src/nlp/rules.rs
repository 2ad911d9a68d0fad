//! Rule-based transcript cleaning, labeling and summarizing.

use regex::{Regex, RegexBuilder};

use crate::models::SegmentLabel;

/// Words and tags removed from every utterance.
pub const DEFAULT_FILLER_WORDS: &[&str] = &[
    "um", "uh", "like", "you know", "sort of", "kind of", "i mean", "basically", "actually",
    "literally", "uh-huh", "mm-hmm",
];

/// Keyword lists per label, checked in this order.
pub const DEFAULT_RULES: &[(SegmentLabel, &[&str])] = &[
    (
        SegmentLabel::Greeting,
        &["hello", "hi", "hey", "good morning", "good afternoon", "good evening", "welcome"],
    ),
    (
        SegmentLabel::Farewell,
        &["thanks", "thank you", "goodbye", "bye", "see you", "see ya", "take care", "cheers"],
    ),
    (
        SegmentLabel::Action,
        &[
            "click", "open", "select", "go to", "press", "drag", "type", "enter", "choose",
            "navigate", "scroll",
        ],
    ),
    (
        SegmentLabel::Explanation,
        &["so", "this is", "what happens", "because", "the reason", "essentially"],
    ),
    (
        SegmentLabel::Question,
        &["how do", "what is", "why does", "can i", "should i"],
    ),
    (
        SegmentLabel::Transition,
        &["next", "now", "then", "after that", "moving on", "let's", "okay so"],
    ),
    (
        SegmentLabel::Definition,
        &["we call this", "defined as", "means", "refers to"],
    ),
];

/// Cleaned text shorter than this (without the final period) is discarded.
pub const MIN_SEGMENT_CHARS: usize = 3;

/// Sentences kept by the rule-based summary.
pub const SUMMARY_SENTENCE_LIMIT: usize = 3;

fn word_alternation(words: &[&str]) -> Result<Regex, regex::Error> {
    // Longest first so "uh-huh" wins over "uh".
    let mut sorted = words.to_vec();
    sorted.sort_by_key(|w| std::cmp::Reverse(w.len()));
    let alternation = sorted
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
        .case_insensitive(true)
        .build()
}

/// Removes filler words and bracketed tags, then normalizes punctuation.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    filler: Regex,
    tags: Regex,
    spaces: Regex,
    loose_punct: Regex,
    repeated_punct: Regex,
}

impl TextCleaner {
    pub fn new(filler_words: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            filler: word_alternation(filler_words)?,
            tags: Regex::new(r"\[[^\]]*\]|\((?:laughs|applause|music)\)")?,
            spaces: Regex::new(r"\s+")?,
            loose_punct: Regex::new(r"\s+([.,!?])")?,
            repeated_punct: Regex::new(r"([,;])(?:\s*[,;])+")?,
        })
    }

    /// Clean one utterance. Returns an empty string when nothing is left.
    pub fn clean(&self, text: &str) -> String {
        let text = self.tags.replace_all(text.trim(), "");
        let text = self.filler.replace_all(&text, "");
        let text = self.spaces.replace_all(&text, " ");
        let text = self.loose_punct.replace_all(text.trim(), "$1");
        let text = self.repeated_punct.replace_all(&text, "$1");
        let text = text
            .trim_start_matches([',', ';', ' '])
            .trim_end_matches([',', ';', ':', ' ']);

        if text.chars().filter(|c| c.is_alphanumeric()).count() == 0 {
            return String::new();
        }

        let mut chars = text.chars();
        let mut out: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        if !out.ends_with(['.', '!', '?']) {
            out.push('.');
        }
        out
    }

    /// Whether a cleaned utterance carries enough content to keep.
    pub fn is_meaningful(cleaned: &str) -> bool {
        cleaned.trim_end_matches('.').chars().count() >= MIN_SEGMENT_CHARS
    }
}

/// Keyword classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<(SegmentLabel, Regex)>,
    min_confidence: f64,
}

impl Classifier {
    pub fn new(rules: &[(SegmentLabel, &[&str])], min_confidence: f64) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|(label, words)| -> Result<_, regex::Error> {
                Ok((*label, word_alternation(words)?))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            rules,
            min_confidence,
        })
    }

    /// Label one cleaned utterance.
    ///
    /// Very short or low-confidence text is noise. Otherwise the first rule
    /// with a whole-word match wins; a trailing `?` makes a question and
    /// everything else is a statement.
    pub fn classify(&self, text: &str, confidence: f64) -> SegmentLabel {
        let trimmed = text.trim();
        if trimmed.chars().count() < MIN_SEGMENT_CHARS || confidence < self.min_confidence {
            return SegmentLabel::Noise;
        }

        for (label, pattern) in &self.rules {
            if pattern.is_match(trimmed) {
                return *label;
            }
        }

        if trimmed.ends_with('?') {
            SegmentLabel::Question
        } else {
            SegmentLabel::Statement
        }
    }
}

/// Split text after `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.trim().chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences
}

/// First `max_sentences` sentences of the joined passages.
pub fn rule_summary(passages: &[&str], max_sentences: usize) -> String {
    let text = passages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    split_sentences(&text)
        .into_iter()
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop a step when it contains, or is contained in, the previous one
/// (case-insensitive).
pub fn merge_similar_steps(steps: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(steps.len());
    for step in steps {
        let similar = merged.last().is_some_and(|last| {
            let (last, current) = (last.to_lowercase(), step.to_lowercase());
            last.contains(&current) || current.contains(&last)
        });
        if !similar {
            merged.push(step);
        }
    }
    merged
}

/// Title from the first explanation or statement longer than 20 chars.
pub fn derive_title<'a>(segments: impl IntoIterator<Item = (&'a str, SegmentLabel)>) -> Option<String> {
    segments
        .into_iter()
        .find(|(text, label)| {
            matches!(label, SegmentLabel::Explanation | SegmentLabel::Statement)
                && text.chars().count() > 20
        })
        .map(|(text, _)| {
            let first = text.split('.').next().unwrap_or(text).trim();
            if first.chars().count() > 60 {
                let cut: String = first.chars().take(57).collect();
                format!("{}...", cut)
            } else {
                first.to_string()
            }
        })
}
