//! Prepare step - job directories and the probed input asset.

use std::fs;

use crate::models::VideoAsset;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::validation::DurationProbe;

pub struct PrepareStep {
    probe: DurationProbe,
}

impl PrepareStep {
    pub fn new(probe: DurationProbe) -> Self {
        Self { probe }
    }
}

impl PipelineStep for PrepareStep {
    fn name(&self) -> &str {
        "Prepare"
    }

    fn phase(&self) -> &str {
        "Preparing"
    }

    fn progress(&self) -> u8 {
        5
    }

    fn description(&self) -> &str {
        "Create job directories and probe the input"
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> StepResult<()> {
        if !ctx.video.is_file() {
            return Err(StepError::input_not_found(ctx.video.display().to_string()));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        for dir in [&ctx.output_dir, &ctx.work_dir] {
            fs::create_dir_all(dir)
                .map_err(|e| StepError::io_error(format!("creating {}", dir.display()), e))?;
        }

        let mut asset = VideoAsset::new(&ctx.video);
        match (self.probe)(&ctx.video) {
            Ok(duration) => {
                ctx.logger
                    .info(&format!("Input: {} ({:.1}s)", asset.display_name(), duration));
                asset = asset.with_duration(duration);
            }
            Err(e) => ctx.logger.warn(&format!(
                "Could not probe duration of {}: {}",
                asset.display_name(),
                e
            )),
        }
        state.asset = Some(asset);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.asset.is_none() || !ctx.output_dir.is_dir() {
            return Err(StepError::other("Job directories were not prepared"));
        }
        Ok(())
    }
}
