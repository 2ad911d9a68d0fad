//! Pluggable text generation model.

use thiserror::Error;

/// Errors from a text model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("No text model configured")]
    Unavailable,

    #[error("Text model failed: {0}")]
    Failed(String),
}

/// A text generation backend (LLM wrapper or similar).
pub trait TextModel: Send + Sync {
    /// Complete `prompt`.
    fn generate(&self, prompt: &str) -> Result<String, ModelError>;

    /// Complete `prompt` and split the answer into list items.
    ///
    /// The default splits lines and strips `1.`, `-` and `*` markers.
    fn generate_list(&self, prompt: &str) -> Result<Vec<String>, ModelError> {
        Ok(parse_list(&self.generate(prompt)?))
    }

    /// Whether calls can succeed at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Model used when none is configured; every call is `Unavailable`.
#[derive(Debug, Clone, Default)]
pub struct NullModel;

impl TextModel for NullModel {
    fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Split a model answer into items, dropping numbering and bullets.
pub fn parse_list(response: &str) -> Vec<String> {
    response
        .lines()
        .map(|line| {
            let line = line.trim();
            let without_number = line
                .split_once(". ")
                .filter(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
                .map(|(_, rest)| rest)
                .unwrap_or(line);
            without_number
                .trim_start_matches(['-', '*'])
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    impl TextModel for Echo {
        fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn null_model_is_unavailable() {
        assert_eq!(NullModel.generate("hi"), Err(ModelError::Unavailable));
        assert!(!NullModel.is_available());
        assert!(NullModel.generate_list("hi").is_err());
    }

    #[test]
    fn list_parsing_strips_markers() {
        let items = Echo("1. Open the app\n2. Click Save\n\n- Close it\n* Done")
            .generate_list("steps")
            .unwrap();
        assert_eq!(items, vec!["Open the app", "Click Save", "Close it", "Done"]);
    }
}
