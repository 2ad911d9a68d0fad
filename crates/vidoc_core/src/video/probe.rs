//! Media probing using `ffprobe -of json`.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use thiserror::Error;

/// Errors from probing a media file.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("Failed to parse probe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duration missing from probe output")]
    MissingDuration,
}

/// What the pipeline needs to know about a media file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    /// Container duration in seconds.
    pub duration: Option<f64>,
    /// Average frame rate of the first video stream.
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_video: bool,
    pub has_audio: bool,
    /// ffprobe's `format_name` (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format_name: String,
}

/// Probe a file with ffprobe.
pub fn probe(path: &Path) -> Result<MediaInfo, ProbeError> {
    if !path.exists() {
        return Err(ProbeError::NotFound(path.to_path_buf()));
    }

    tracing::debug!("[Probe] Probing {}", path.display());

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|source| ProbeError::Spawn {
            tool: "ffprobe".to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProbeError::CommandFailed {
            tool: "ffprobe".to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let json: Value = serde_json::from_slice(&output.stdout)?;
    Ok(parse_probe_json(&json))
}

/// Probe only the duration, failing when ffprobe reports none.
pub fn probe_duration(path: &Path) -> Result<f64, ProbeError> {
    probe(path)?.duration.ok_or(ProbeError::MissingDuration)
}

/// Extract [`MediaInfo`] from ffprobe's JSON document.
pub fn parse_probe_json(json: &Value) -> MediaInfo {
    let mut info = MediaInfo::default();

    if let Some(format) = json.get("format") {
        info.duration = format
            .get("duration")
            .and_then(number_or_string)
            .filter(|d| d.is_finite() && *d >= 0.0);
        info.format_name = format
            .get("format_name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
    }

    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .map(|s| s.as_slice())
        .unwrap_or_default();

    for stream in streams {
        match stream.get("codec_type").and_then(|c| c.as_str()) {
            Some("video") if !info.has_video => {
                info.has_video = true;
                info.width = stream
                    .get("width")
                    .and_then(|w| w.as_u64())
                    .map(|w| w as u32);
                info.height = stream
                    .get("height")
                    .and_then(|h| h.as_u64())
                    .map(|h| h as u32);
                info.fps = ["avg_frame_rate", "r_frame_rate"]
                    .iter()
                    .filter_map(|key| stream.get(*key).and_then(|v| v.as_str()))
                    .find_map(parse_rate);
                if info.duration.is_none() {
                    info.duration = stream.get("duration").and_then(number_or_string);
                }
            }
            Some("audio") => info.has_audio = true,
            _ => {}
        }
    }

    info
}

/// ffprobe prints most numbers as strings.
fn number_or_string(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a rational rate such as `"30000/1001"`; `0/0` gives `None`.
pub fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (rate.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 {
        return None;
    }
    let fps = num / den;
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_rates() {
        assert_eq!(parse_rate("25/1"), Some(25.0));
        assert!((parse_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("garbage"), None);
    }

    #[test]
    fn parses_probe_document() {
        let doc = json!({
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 1280, "height": 720,
                 "avg_frame_rate": "0/0", "r_frame_rate": "30/1"}
            ],
            "format": {"duration": "12.480000", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"}
        });
        let info = parse_probe_json(&doc);
        assert_eq!(info.duration, Some(12.48));
        assert_eq!(info.fps, Some(30.0));
        assert_eq!(info.width, Some(1280));
        assert!(info.has_video && info.has_audio);
    }

    #[test]
    fn missing_duration_is_none() {
        let info = parse_probe_json(&json!({"format": {"duration": "N/A"}}));
        assert_eq!(info.duration, None);
        assert!(!info.has_video);
    }

    #[test]
    fn probe_missing_file_is_not_found() {
        let err = probe(Path::new("/definitely/not/here.mp4")).unwrap_err();
        assert!(matches!(err, ProbeError::NotFound(_)));
    }
}
