//! documentation.json / documentation.md writer.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::models::{
    ClipArtifact, DocumentStatistics, ProcessedDocument, SegmentLabel, Transcript,
};

pub const JSON_FILE_NAME: &str = "documentation.json";
pub const MARKDOWN_FILE_NAME: &str = "documentation.md";

/// Errors from writing the documentation files.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Paths of the files written by one export.
#[derive(Debug, Clone)]
pub struct ExportedFiles {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

/// Context that is not part of the processed document itself.
#[derive(Debug, Clone)]
pub struct ExportMetadata<'a> {
    pub job_id: &'a str,
    pub source: &'a Path,
    pub transcript: &'a Transcript,
}

#[derive(Serialize)]
struct Metadata<'a> {
    job_id: &'a str,
    source: String,
    language: &'a str,
    model: &'a str,
    duration: f64,
    processed_segments: usize,
    created_gifs: Vec<String>,
    generated_at: String,
}

#[derive(Serialize)]
struct TimelineEntry<'a> {
    start: f64,
    end: f64,
    start_formatted: String,
    end_formatted: String,
    text: &'a str,
    label: SegmentLabel,
    confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    gif: Option<String>,
}

#[derive(Serialize)]
struct DocumentJson<'a> {
    title: &'a str,
    summary: &'a str,
    steps: &'a [String],
    key_concepts: &'a [String],
    timeline: Vec<TimelineEntry<'a>>,
    statistics: &'a DocumentStatistics,
    metadata: Metadata<'a>,
}

/// Writes the processed document and its GIF references.
#[derive(Debug, Clone, Default)]
pub struct DocumentExporter;

impl DocumentExporter {
    pub fn new() -> Self {
        Self
    }

    /// Write both files into `out_dir`.
    pub fn export(
        &self,
        out_dir: &Path,
        document: &ProcessedDocument,
        artifacts: &[ClipArtifact],
        meta: &ExportMetadata<'_>,
    ) -> Result<ExportedFiles, ExportError> {
        std::fs::create_dir_all(out_dir).map_err(|source| ExportError::Write {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let gifs: BTreeMap<usize, String> = artifacts
            .iter()
            .map(|a| (a.item_index, gif_path_string(&a.gif)))
            .collect();

        let json = out_dir.join(JSON_FILE_NAME);
        let body = serde_json::to_string_pretty(&to_json(document, &gifs, meta))?;
        write_file(&json, &body)?;

        let markdown = out_dir.join(MARKDOWN_FILE_NAME);
        write_file(&markdown, &render_markdown(document, &gifs, meta))?;

        tracing::info!(
            "[Export] Wrote {} and {} ({} gif(s))",
            json.display(),
            markdown.display(),
            gifs.len()
        );
        Ok(ExportedFiles { json, markdown })
    }
}

fn to_json<'a>(
    document: &'a ProcessedDocument,
    gifs: &BTreeMap<usize, String>,
    meta: &'a ExportMetadata<'a>,
) -> DocumentJson<'a> {
    let timeline = document
        .timeline
        .iter()
        .enumerate()
        .map(|(index, item)| TimelineEntry {
            start: item.start,
            end: item.end,
            start_formatted: format_timestamp(item.start),
            end_formatted: format_timestamp(item.end),
            text: &item.text,
            label: item.label,
            confidence: item.confidence,
            gif: gifs.get(&index).cloned(),
        })
        .collect();

    DocumentJson {
        title: &document.title,
        summary: &document.summary,
        steps: &document.steps,
        key_concepts: &document.key_concepts,
        timeline,
        statistics: &document.statistics,
        metadata: Metadata {
            job_id: meta.job_id,
            source: meta.source.to_string_lossy().to_string(),
            language: &meta.transcript.language,
            model: &meta.transcript.model,
            duration: meta.transcript.duration,
            processed_segments: document.timeline.len(),
            created_gifs: gifs.values().cloned().collect(),
            generated_at: chrono::Local::now().to_rfc3339(),
        },
    }
}

fn render_markdown(
    document: &ProcessedDocument,
    gifs: &BTreeMap<usize, String>,
    meta: &ExportMetadata<'_>,
) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# {}\n", document.title);
    let _ = writeln!(md, "## Summary\n\n{}\n", document.summary);

    if !document.steps.is_empty() {
        md.push_str("## Steps\n\n");
        for (i, step) in document.steps.iter().enumerate() {
            let _ = writeln!(md, "{}. {}", i + 1, step);
        }
        md.push('\n');
    }

    if !document.key_concepts.is_empty() {
        md.push_str("## Key Concepts\n\n");
        for concept in &document.key_concepts {
            let _ = writeln!(md, "- {}", concept);
        }
        md.push('\n');
    }

    md.push_str("## Timeline\n\n");
    for (index, item) in document.timeline.iter().enumerate() {
        let _ = writeln!(
            md,
            "**{} - {}** [{}]: {}",
            format_timestamp(item.start),
            format_timestamp(item.end),
            item.label,
            item.text
        );
        if let Some(gif) = gifs.get(&index) {
            let _ = writeln!(md, "\n![clip {}]({})\n", index + 1, gif);
        }
    }

    md.push_str("\n## Metadata\n\n");
    let _ = writeln!(md, "- **Job ID**: {}", meta.job_id);
    let _ = writeln!(md, "- **Language**: {}", meta.transcript.language);
    let _ = writeln!(md, "- **Model**: {}", meta.transcript.model);
    let _ = writeln!(md, "- **Duration**: {:.1}s", meta.transcript.duration);
    let _ = writeln!(md, "- **Processed Segments**: {}", document.timeline.len());

    let stats = &document.statistics;
    md.push_str("\n## Statistics\n\n");
    let _ = writeln!(md, "- **Total Segments**: {}", stats.total_segments);
    let _ = writeln!(md, "- **Total Words**: {}", stats.total_words);
    let _ = writeln!(
        md,
        "- **Average Segment Length**: {:.1} words",
        stats.avg_segment_length
    );
    if !stats.label_distribution.is_empty() {
        md.push_str("\n### Label Distribution\n\n");
        for (label, count) in &stats.label_distribution {
            let _ = writeln!(md, "- **{}**: {}", label, count);
        }
    }
    md
}

/// `m:ss`, or `h:mm:ss` from one hour on.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

fn gif_path_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    std::fs::write(path, contents).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
