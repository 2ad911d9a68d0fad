//! Transcription through OpenAI Whisper in a Python subprocess.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use super::{Transcriber, TranscriptionError};
use crate::config::TranscriptionSettings;
use crate::models::{Transcript, Utterance};

/// Prints `{"language", "duration", "segments": [...]}` as JSON on stdout.
const WHISPER_SCRIPT: &str = r#"
import json
import sys
import whisper

audio_path, model_name = sys.argv[1], sys.argv[2]
language = sys.argv[3] if len(sys.argv) > 3 and sys.argv[3] else None

model = whisper.load_model(model_name)
options = {"verbose": False}
if language:
    options["language"] = language
result = model.transcribe(audio_path, **options)

segments = [
    {
        "start": seg.get("start", 0.0),
        "end": seg.get("end", 0.0),
        "text": seg.get("text", "").strip(),
        "avg_logprob": seg.get("avg_logprob"),
    }
    for seg in result.get("segments", [])
]
duration = segments[-1]["end"] if segments else 0.0
print(json.dumps({"language": result.get("language"), "duration": duration, "segments": segments}))
"#;

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    avg_logprob: Option<f64>,
}

/// Parse the script's stdout into a [`Transcript`].
///
/// Whisper reports `avg_logprob`; confidence is `exp(avg_logprob)` clamped
/// into `[0, 1]`. Blank segments are dropped.
pub fn parse_whisper_output(stdout: &[u8], model: &str) -> Result<Transcript, TranscriptionError> {
    // Whisper and its dependencies may print warnings before the JSON line.
    let text = String::from_utf8_lossy(stdout);
    let json_line = text
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap_or("");
    let output: WhisperOutput = serde_json::from_str(json_line.trim())?;

    let utterances: Vec<Utterance> = output
        .segments
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| Utterance {
            start: s.start,
            end: s.end.max(s.start),
            text: s.text.trim().to_string(),
            confidence: s
                .avg_logprob
                .map(|lp| lp.exp().clamp(0.0, 1.0))
                .unwrap_or(0.0),
        })
        .collect();

    let duration = output
        .duration
        .or_else(|| utterances.last().map(|u| u.end))
        .unwrap_or(0.0);

    Ok(Transcript {
        utterances,
        duration,
        language: output.language.unwrap_or_default(),
        model: model.to_string(),
    })
}

/// Extracts 16 kHz mono audio with ffmpeg, then runs Whisper.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    python: PathBuf,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    pub fn new(settings: &TranscriptionSettings) -> Self {
        Self {
            python: PathBuf::from(&settings.python),
            model: if settings.model.trim().is_empty() {
                "small".to_string()
            } else {
                settings.model.clone()
            },
            language: settings.language.clone().filter(|l| !l.is_empty()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn extract_audio(&self, media: &Path, wav: &Path) -> Result<(), TranscriptionError> {
        tracing::debug!("[Whisper] Extracting audio to {}", wav.display());
        let output = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-y", "-i"])
            .arg(media)
            .args(["-vn", "-ac", "1", "-ar", "16000"])
            .arg(wav)
            .output()
            .map_err(|e| TranscriptionError::AudioExtraction(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(TranscriptionError::AudioExtraction(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, media: &Path, work_dir: &Path) -> Result<Transcript, TranscriptionError> {
        if !media.exists() {
            return Err(TranscriptionError::NotFound(media.to_path_buf()));
        }
        std::fs::create_dir_all(work_dir)?;

        let wav = work_dir.join("audio_16k.wav");
        self.extract_audio(media, &wav)?;

        tracing::info!("[Whisper] Transcribing with model '{}'", self.model);
        let output = Command::new(&self.python)
            .arg("-c")
            .arg(WHISPER_SCRIPT)
            .arg(&wav)
            .arg(&self.model)
            .arg(self.language.as_deref().unwrap_or(""))
            .output()
            .map_err(|e| TranscriptionError::CommandFailed {
                tool: self.python.display().to_string(),
                exit_code: -1,
                message: e.to_string(),
            })?;

        let _ = std::fs::remove_file(&wav);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(TranscriptionError::CommandFailed {
                tool: "whisper".to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                message: tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
            });
        }

        let transcript = parse_whisper_output(&output.stdout, &self.model)?;
        tracing::info!(
            "[Whisper] {} utterance(s), language '{}'",
            transcript.utterances.len(),
            transcript.language
        );
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_script_output_after_warnings() {
        let stdout = concat!(
            "UserWarning: FP16 is not supported on CPU\n",
            r#"{"language": "en", "duration": 7.5, "segments": ["#,
            r#"{"start": 0.0, "end": 2.0, "text": " Hello there ", "avg_logprob": -0.2}, "#,
            r#"{"start": 2.0, "end": 4.0, "text": "  ", "avg_logprob": -1.0}, "#,
            r#"{"start": 4.0, "end": 7.5, "text": "Open settings", "avg_logprob": null}]}"#,
            "\n"
        );

        let transcript = parse_whisper_output(stdout.as_bytes(), "small").unwrap();
        assert_eq!(transcript.language, "en");
        assert_eq!(transcript.duration, 7.5);
        assert_eq!(transcript.utterances.len(), 2);
        assert_eq!(transcript.utterances[0].text, "Hello there");
        assert!((transcript.utterances[0].confidence - (-0.2f64).exp()).abs() < 1e-9);
        assert_eq!(transcript.utterances[1].confidence, 0.0);
        assert_eq!(transcript.model, "small");
    }

    #[test]
    fn garbage_output_is_parse_error() {
        assert!(matches!(
            parse_whisper_output(b"Traceback (most recent call last)", "small"),
            Err(TranscriptionError::Parse(_))
        ));
    }

    #[test]
    fn missing_media_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = WhisperTranscriber::new(&TranscriptionSettings::default());
        let err = transcriber
            .transcribe(Path::new("/missing/video.mp4"), dir.path())
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::NotFound(_)));
    }
}
