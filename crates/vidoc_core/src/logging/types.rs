use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Case-insensitive; `"warning"` is accepted for `Warn`.
    pub fn parse(name: &str) -> Option<Self> {
        let level = match name.trim().to_ascii_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => return None,
        };
        Some(level)
    }

    /// Directive for `EnvFilter`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Behaviour of one [`JobLogger`](super::JobLogger).
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Thin out progress lines to one per `progress_step`.
    pub compact: bool,
    pub progress_step: u32,
    /// How many recent lines to keep for failure reports. Zero keeps none.
    pub error_tail: usize,
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            progress_step: 20,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

impl LogConfig {
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: LogLevel::parse(&settings.level).unwrap_or_default(),
            compact: settings.compact,
            progress_step: settings.progress_step.max(1),
            error_tail: settings.error_tail as usize,
            show_timestamps: true,
        }
    }
}

/// Receives every formatted job log line, e.g. to echo it to a terminal.
pub type LogSink = Box<dyn Fn(&str) + Send + Sync>;

/// Markers put in front of job log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    /// `=== Phase ===`
    Phase,
    /// `[Validation] ...`
    Validation,
    /// `[SUCCESS] ...`
    Success,
    /// `[WARNING] ...`
    Warning,
    /// `[ERROR] ...`
    Error,
    None,
}

impl MessagePrefix {
    pub fn format(&self, message: &str) -> String {
        match self {
            MessagePrefix::Phase => format!("=== {} ===", message),
            MessagePrefix::Validation => format!("[Validation] {}", message),
            MessagePrefix::Success => format!("[SUCCESS] {}", message),
            MessagePrefix::Warning => format!("[WARNING] {}", message),
            MessagePrefix::Error => format!("[ERROR] {}", message),
            MessagePrefix::None => message.to_string(),
        }
    }
}
