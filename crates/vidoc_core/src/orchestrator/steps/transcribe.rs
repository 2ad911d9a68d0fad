//! Transcribe step - speech to text, persisted as `transcript.json`.

use std::sync::Arc;

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::transcription::Transcriber;

pub const TRANSCRIPT_FILE_NAME: &str = "transcript.json";

pub struct TranscribeStep {
    transcriber: Arc<dyn Transcriber>,
}

impl TranscribeStep {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }
}

impl PipelineStep for TranscribeStep {
    fn name(&self) -> &str {
        "Transcribe"
    }

    fn phase(&self) -> &str {
        "Transcribing"
    }

    fn progress(&self) -> u8 {
        30
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> StepResult<()> {
        if !ctx.video.exists() {
            return Err(StepError::input_not_found(ctx.video.display().to_string()));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let transcript = self.transcriber.transcribe(&ctx.video, &ctx.work_dir)?;
        ctx.logger.info(&format!(
            "Transcribed {} utterance(s), language {}, model {}",
            transcript.utterances.len(),
            transcript.language,
            transcript.model
        ));
        if transcript.is_empty() {
            ctx.logger.warn("Transcript contains no speech");
        }

        let path = ctx.output_dir.join(TRANSCRIPT_FILE_NAME);
        let json = serde_json::to_string_pretty(&transcript)
            .map_err(|e| StepError::caused_by("Failed to serialize transcript", e))?;
        std::fs::write(&path, json).map_err(|e| StepError::io_error("writing transcript", e))?;

        state.transcript = Some(transcript);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.transcript.is_none() {
            return Err(StepError::other("Transcript not recorded"));
        }
        Ok(())
    }
}
