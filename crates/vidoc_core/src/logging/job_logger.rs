//! Per-job log file.
//!
//! Lines go to `<logs_dir>/<job_id>.log` and to an optional sink. The last
//! few lines are also kept in memory so a failed job can carry them in its
//! status record.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogConfig, LogLevel, LogSink, MessagePrefix};

struct Inner {
    writer: Option<BufWriter<File>>,
    recent: VecDeque<String>,
    last_progress: u32,
}

pub struct JobLogger {
    job_id: String,
    log_path: PathBuf,
    config: LogConfig,
    sink: Option<LogSink>,
    inner: Mutex<Inner>,
}

impl JobLogger {
    /// Open `<log_dir>/<job_id>.log` for appending, creating `log_dir` if
    /// needed.
    pub fn new(
        job_id: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        sink: Option<LogSink>,
    ) -> std::io::Result<Self> {
        let job_id = job_id.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", file_stem(&job_id)));
        let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

        Ok(Self {
            job_id,
            log_path,
            inner: Mutex::new(Inner {
                writer: Some(BufWriter::new(file)),
                recent: VecDeque::with_capacity(config.error_tail),
                last_progress: 0,
            }),
            config,
            sink,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn debug(&self, message: &str) {
        self.write(LogLevel::Debug, MessagePrefix::None, message);
    }

    pub fn info(&self, message: &str) {
        self.write(LogLevel::Info, MessagePrefix::None, message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(job_id = %self.job_id, "{}", message);
        self.write(LogLevel::Warn, MessagePrefix::Warning, message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!(job_id = %self.job_id, "{}", message);
        self.write(LogLevel::Error, MessagePrefix::Error, message);
    }

    pub fn phase(&self, name: &str) {
        self.write(LogLevel::Info, MessagePrefix::Phase, name);
    }

    pub fn success(&self, message: &str) {
        self.write(LogLevel::Info, MessagePrefix::Success, message);
    }

    pub fn validation(&self, message: &str) {
        self.write(LogLevel::Info, MessagePrefix::Validation, message);
    }

    /// Log `Progress: N%`. In compact mode only the first value to reach a
    /// new multiple of `progress_step` (and 100) is written.
    ///
    /// Returns whether a line was written.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let step = self.config.progress_step.max(1);
            let mut inner = self.inner.lock();
            if percent < 100 && percent / step <= inner.last_progress / step {
                return false;
            }
            inner.last_progress = percent;
        }
        self.write(
            LogLevel::Info,
            MessagePrefix::None,
            &format!("Progress: {}%", percent),
        );
        true
    }

    /// The last `error_tail` lines written, oldest first.
    pub fn recent_lines(&self) -> Vec<String> {
        self.inner.lock().recent.iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(writer) = self.inner.lock().writer.as_mut() {
            let _ = writer.flush();
        }
    }

    /// Flush and release the file. Later lines still reach the sink.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if let Some(mut writer) = inner.writer.take() {
            let _ = writer.flush();
        }
    }

    fn write(&self, level: LogLevel, prefix: MessagePrefix, message: &str) {
        if level < self.config.level {
            return;
        }

        let body = prefix.format(message);
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), body)
        } else {
            body
        };

        {
            let mut inner = self.inner.lock();
            if let Some(writer) = inner.writer.as_mut() {
                let _ = writeln!(writer, "{}", line);
            }
            if self.config.error_tail > 0 {
                if inner.recent.len() == self.config.error_tail {
                    inner.recent.pop_front();
                }
                inner.recent.push_back(line.clone());
            }
        }

        if let Some(sink) = &self.sink {
            sink(&line);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Replace characters that are not allowed in file names.
fn file_stem(job_id: &str) -> String {
    job_id
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn plain() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..Default::default()
        }
    }

    #[test]
    fn log_file_is_named_after_job() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job-1", dir.path(), plain(), None).unwrap();
        assert!(logger.log_path().ends_with("job-1.log"));
        assert!(logger.log_path().exists());
    }

    #[test]
    fn prefixes_reach_the_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job", dir.path(), plain(), None).unwrap();
        logger.phase("Transcribing");
        logger.warn("no speech found");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("=== Transcribing ==="));
        assert!(content.contains("[WARNING] no speech found"));
    }

    #[test]
    fn second_logger_appends() {
        let dir = tempdir().unwrap();
        JobLogger::new("job", dir.path(), plain(), None)
            .unwrap()
            .info("first run");
        let logger = JobLogger::new("job", dir.path(), plain(), None).unwrap();
        logger.info("second run");
        logger.close();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert_eq!(content, "first run\nsecond run\n");
    }

    #[test]
    fn sink_sees_only_lines_above_level() {
        let dir = tempdir().unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let sink: LogSink = Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let logger = JobLogger::new("job", dir.path(), plain(), Some(sink)).unwrap();
        logger.info("one");
        logger.debug("hidden at info");
        logger.success("two");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_progress_writes_each_step_once() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            progress_step: 20,
            ..plain()
        };
        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();

        let written: Vec<bool> = [5, 15, 30, 35, 60, 100]
            .into_iter()
            .map(|p| logger.progress(p))
            .collect();
        assert_eq!(written, vec![false, false, true, false, true, true]);
    }

    #[test]
    fn recent_lines_are_bounded() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            error_tail: 3,
            ..plain()
        };
        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();
        for i in 0..5 {
            logger.info(&format!("line {}", i));
        }
        assert_eq!(logger.recent_lines(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(file_stem("plain_id"), "plain_id");
        assert_eq!(file_stem("a/b:c"), "a_b_c");
    }
}
