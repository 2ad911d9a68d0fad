//! The unit of work a [`Pipeline`](super::Pipeline) runs.

use super::errors::StepResult;
use super::types::{Context, JobState, StepOutcome};

/// One stage of a job.
///
/// Before anything else the pipeline records `phase()` at `progress()` in the
/// status store. Then `validate_input` checks what earlier stages left in
/// the [`JobState`], `execute` does the work, and `validate_output` runs
/// only when `execute` reported [`StepOutcome::Success`].
pub trait PipelineStep: Send + Sync {
    /// Short name used in logs and error traces.
    fn name(&self) -> &str;

    /// Status phase label, e.g. `"Transcribing"`.
    fn phase(&self) -> &str;

    /// Checkpoint percentage written when the step begins.
    fn progress(&self) -> u8;

    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome>;

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    fn description(&self) -> &str {
        self.name()
    }
}
