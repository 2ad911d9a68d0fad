//! Nlp step - transcript to processed document.

use std::sync::Arc;

use crate::nlp::DocumentProcessor;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

pub struct NlpStep {
    processor: Arc<dyn DocumentProcessor>,
}

impl NlpStep {
    pub fn new(processor: Arc<dyn DocumentProcessor>) -> Self {
        Self { processor }
    }
}

impl PipelineStep for NlpStep {
    fn name(&self) -> &str {
        "Nlp"
    }

    fn phase(&self) -> &str {
        "NLP processing"
    }

    fn progress(&self) -> u8 {
        60
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.transcript.is_none() {
            return Err(StepError::precondition_failed("No transcript to process"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let Some(transcript) = state.transcript.as_ref() else {
            return Err(StepError::precondition_failed("No transcript to process"));
        };
        let document = self.processor.process(transcript)?;
        ctx.logger.info(&format!(
            "Document '{}': {} timeline item(s), {} step(s), {} key concept(s)",
            document.title,
            document.timeline.len(),
            document.steps.len(),
            document.key_concepts.len()
        ));
        state.document = Some(document);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.document.is_none() {
            return Err(StepError::other("Document not recorded"));
        }
        Ok(())
    }
}
