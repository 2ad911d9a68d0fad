//! Clips step - one selected clip and GIF per timeline item.
//!
//! Failures here are per item: a failed refinement falls back to the
//! deterministic clip, a failed encode leaves the item without a GIF. Neither
//! stops the job, and a panic in either is handled the same way. Progress
//! moves only when a clip is produced.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::clips::ClipSelector;
use crate::export::{gif_relative_path, EncodeError, GifEncoder, GifRequest};
use crate::jobs::panic_message;
use crate::models::ClipArtifact;
use crate::orchestrator::errors::{ItemError, StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

const PHASE: &str = "Generating clips";
const START_PROGRESS: u8 = 70;
const END_PROGRESS: u8 = 90;

pub struct ClipsStep {
    selector: Arc<ClipSelector>,
    encoder: Arc<dyn GifEncoder>,
}

impl ClipsStep {
    pub fn new(selector: Arc<ClipSelector>, encoder: Arc<dyn GifEncoder>) -> Self {
        Self { selector, encoder }
    }
}

/// Checkpoint after `done` of `total` clips were produced.
fn item_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return END_PROGRESS;
    }
    let span = usize::from(END_PROGRESS - START_PROGRESS);
    START_PROGRESS + (span * done.min(total) / total) as u8
}

impl PipelineStep for ClipsStep {
    fn name(&self) -> &str {
        "Clips"
    }

    fn phase(&self) -> &str {
        PHASE
    }

    fn progress(&self) -> u8 {
        START_PROGRESS
    }

    fn description(&self) -> &str {
        "Select a clip per timeline item and encode it as a GIF"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.document.is_none() {
            return Err(StepError::precondition_failed("No document to illustrate"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let Some(document) = state.document.as_ref() else {
            return Err(StepError::precondition_failed("No document to illustrate"));
        };
        let total = document.timeline.len();
        if total == 0 {
            return Ok(StepOutcome::Skipped("no timeline items".to_string()));
        }

        let mut outcomes = Vec::with_capacity(total);
        let mut refinement_failures = Vec::new();
        let mut produced = 0;

        for (index, item) in document.timeline.iter().enumerate() {
            let selection = self.selector.select(&ctx.video, item);
            if let Some(source) = selection.degraded {
                let err = ItemError::Refinement {
                    item_index: index,
                    source,
                };
                ctx.logger.warn(&format!("{}; using centered clip", err));
                refinement_failures.push(err);
            }

            let relative = gif_relative_path(index);
            let request = GifRequest::new(
                &ctx.video,
                selection.clip,
                ctx.output_dir.join(&relative),
                &ctx.settings.gif,
            );
            let encoded = panic::catch_unwind(AssertUnwindSafe(|| self.encoder.encode(&request)))
                .unwrap_or_else(|payload| Err(EncodeError::Panicked(panic_message(&*payload))));
            let outcome = match encoded {
                Ok(_) => {
                    produced += 1;
                    ctx.report_progress(PHASE, item_progress(produced, total));
                    ctx.logger.debug(&format!(
                        "Item {}: {} -> {}",
                        index,
                        selection.clip.range(),
                        relative.display()
                    ));
                    Ok(ClipArtifact {
                        item_index: index,
                        clip: selection.clip,
                        gif: relative,
                    })
                }
                Err(source) => {
                    let err = ItemError::Encoding {
                        item_index: index,
                        source,
                    };
                    ctx.logger.warn(&format!("{}; skipping", err));
                    Err(err)
                }
            };
            outcomes.push(outcome);
        }

        ctx.logger
            .info(&format!("Produced {} of {} clip(s)", produced, total));

        state.clip_outcomes = outcomes;
        state.refinement_failures = refinement_failures;
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let expected = state.document.as_ref().map_or(0, |d| d.timeline.len());
        if state.clip_outcomes.len() != expected {
            return Err(StepError::other(format!(
                "Expected {} clip outcome(s), recorded {}",
                expected,
                state.clip_outcomes.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_spans_seventy_to_ninety() {
        assert_eq!(item_progress(0, 4), 70);
        assert_eq!(item_progress(1, 4), 75);
        assert_eq!(item_progress(4, 4), 90);
        assert_eq!(item_progress(0, 0), 90);
        let steps: Vec<u8> = (1..=3).map(|i| item_progress(i, 3)).collect();
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
    }
}
