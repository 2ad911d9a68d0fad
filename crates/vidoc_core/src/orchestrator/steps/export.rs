//! Export step - documentation.json and documentation.md.

use crate::export::{DocumentExporter, ExportMetadata};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

#[derive(Default)]
pub struct ExportStep {
    exporter: DocumentExporter,
}

impl ExportStep {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PipelineStep for ExportStep {
    fn name(&self) -> &str {
        "Export"
    }

    fn phase(&self) -> &str {
        "Exporting"
    }

    fn progress(&self) -> u8 {
        95
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.document.is_none() || state.transcript.is_none() {
            return Err(StepError::precondition_failed(
                "Document and transcript are required for export",
            ));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let (Some(document), Some(transcript)) = (state.document.as_ref(), state.transcript.as_ref())
        else {
            return Err(StepError::precondition_failed(
                "Document and transcript are required for export",
            ));
        };

        let artifacts = state.artifacts();
        let meta = ExportMetadata {
            job_id: &ctx.job_id,
            source: &ctx.video,
            transcript,
        };
        let files = self
            .exporter
            .export(&ctx.output_dir, document, &artifacts, &meta)?;
        ctx.logger.info(&format!(
            "Exported {} and {}",
            files.json.display(),
            files.markdown.display()
        ));

        state.exported = vec![files.json, files.markdown];
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if let Some(missing) = state.exported.iter().find(|p| !p.exists()) {
            return Err(StepError::other(format!(
                "Export did not produce {}",
                missing.display()
            )));
        }
        if state.exported.is_empty() {
            return Err(StepError::other("Nothing was exported"));
        }
        Ok(())
    }
}
