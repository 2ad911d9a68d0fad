//! Segment step - optional scene-based sub-clips under `segments/`.

use std::sync::Arc;

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::scenes::{Cutter, SceneDetector, SegmentAssembler};

pub struct SegmentStep {
    detector: Arc<SceneDetector>,
    cutter: Arc<dyn Cutter>,
}

impl SegmentStep {
    pub fn new(detector: Arc<SceneDetector>, cutter: Arc<dyn Cutter>) -> Self {
        Self { detector, cutter }
    }
}

impl PipelineStep for SegmentStep {
    fn name(&self) -> &str {
        "Segment"
    }

    fn phase(&self) -> &str {
        "Segmenting"
    }

    fn progress(&self) -> u8 {
        15
    }

    fn description(&self) -> &str {
        "Cut the input at scene changes"
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.asset.is_none() {
            return Err(StepError::precondition_failed("Input asset not prepared"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let Some(duration) = state.asset.as_ref().and_then(|a| a.duration) else {
            return Ok(StepOutcome::Skipped("input duration unknown".to_string()));
        };

        let scenes = self.detector.detect(&ctx.video);
        ctx.logger.info(&format!(
            "Detected {} scene(s) at threshold {:.2}",
            scenes.scenes.len(),
            self.detector.threshold()
        ));

        let out_dir = ctx.output_dir.join("segments");
        let segments = SegmentAssembler::from_settings(&ctx.settings.segments)
            .with_cutter(Arc::clone(&self.cutter))
            .assemble(&ctx.video, &scenes.cut_times(), duration, &out_dir)?;
        ctx.logger
            .info(&format!("Wrote {} segment(s) to {}", segments.len(), out_dir.display()));

        state.segments = Some(segments);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.segments.is_none() {
            return Err(StepError::other("Segments not recorded"));
        }
        Ok(())
    }
}
