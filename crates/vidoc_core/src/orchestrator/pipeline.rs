//! Ordered execution of [`PipelineStep`]s for one job.

use std::panic::{self, AssertUnwindSafe};

use super::errors::{PipelineError, PipelineResult, StepResult};
use super::step::PipelineStep;
use super::types::{Context, JobState, StepOutcome};
use crate::jobs::panic_message;

/// Steps run strictly in insertion order. The first error or panic ends the
/// run and no later step is started.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Drive `state` through every step.
    pub fn run(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<PipelineRunResult> {
        let mut ran = PipelineRunResult::default();

        for step in &self.steps {
            let name = step.name();
            ctx.logger.phase(step.phase());
            ctx.report_progress(step.phase(), step.progress());

            let outcome = guarded(ctx, name, || {
                step.validate_input(ctx, state)?;
                let outcome = step.execute(ctx, state)?;
                if outcome == StepOutcome::Success {
                    step.validate_output(ctx, state)?;
                }
                Ok(outcome)
            })?;

            match outcome {
                StepOutcome::Success => {
                    ctx.logger.debug(&format!("{} done", name));
                    ran.steps_completed.push(name.to_string());
                }
                StepOutcome::Skipped(reason) => {
                    ctx.logger.info(&format!("{} skipped: {}", name, reason));
                    ran.steps_skipped.push(name.to_string());
                }
            }
        }

        Ok(ran)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one step body, turning errors and panics into [`PipelineError`].
fn guarded<F>(ctx: &Context, step_name: &str, body: F) -> PipelineResult<StepOutcome>
where
    F: FnOnce() -> StepResult<StepOutcome>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) => Err(PipelineError::step_failed(&ctx.job_id, step_name, e)),
        Err(payload) => {
            let message = panic_message(&*payload);
            Err(PipelineError::Panicked {
                job_id: ctx.job_id.clone(),
                step_name: step_name.to_string(),
                message,
                backtrace: std::backtrace::Backtrace::force_capture().to_string(),
            })
        }
    }
}

/// Steps that ran, by outcome.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
}

impl PipelineRunResult {
    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::jobs::{JobPaths, JobStatus, MemoryStatusStore, StatusStore};
    use crate::logging::{JobLogger, LogConfig};
    use crate::orchestrator::errors::StepError;
    use crate::orchestrator::reporter::ProgressReporter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedStep {
        name: &'static str,
        progress: u8,
        behaviour: &'static str,
        runs: Arc<AtomicUsize>,
    }

    impl PipelineStep for ScriptedStep {
        fn name(&self) -> &str {
            self.name
        }

        fn phase(&self) -> &str {
            self.name
        }

        fn progress(&self) -> u8 {
            self.progress
        }

        fn validate_input(&self, _ctx: &Context, _state: &JobState) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _state: &mut JobState) -> StepResult<StepOutcome> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                "fail" => Err(StepError::other("scripted failure")),
                "panic" => panic!("scripted panic"),
                "skip" => Ok(StepOutcome::Skipped("not needed".into())),
                _ => Ok(StepOutcome::Success),
            }
        }

        fn validate_output(&self, _ctx: &Context, _state: &JobState) -> StepResult<()> {
            Ok(())
        }
    }

    fn step(name: &'static str, progress: u8, behaviour: &'static str, runs: &Arc<AtomicUsize>) -> ScriptedStep {
        ScriptedStep {
            name,
            progress,
            behaviour,
            runs: Arc::clone(runs),
        }
    }

    fn context(dir: &std::path::Path, store: Arc<MemoryStatusStore>) -> Context {
        let logger = Arc::new(JobLogger::new("job", dir, LogConfig::default(), None).unwrap());
        let reporter = Arc::new(ProgressReporter::attach("job", store).unwrap());
        Context::new(
            "job",
            dir.join("in.mp4"),
            Settings::default(),
            JobPaths::under(dir),
            dir.join("out"),
            dir.join("work"),
            logger,
        )
        .with_reporter(reporter)
    }

    #[test]
    fn runs_steps_in_order_and_reports_phases() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStatusStore::new());
        let ctx = context(dir.path(), store.clone());
        let runs = Arc::new(AtomicUsize::new(0));

        let pipeline = Pipeline::new()
            .with_step(step("A", 5, "ok", &runs))
            .with_step(step("B", 30, "skip", &runs));
        assert_eq!(pipeline.step_names(), vec!["A", "B"]);

        let result = pipeline.run(&ctx, &mut JobState::new("job")).unwrap();
        assert_eq!(result.steps_completed, vec!["A"]);
        assert_eq!(result.steps_skipped, vec!["B"]);
        assert_eq!(result.total_steps(), 2);

        let record = store.get("job").unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Running);
        assert_eq!((record.phase.as_str(), record.progress), ("B", 30));
    }

    #[test]
    fn failure_stops_later_steps() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Arc::new(MemoryStatusStore::new()));
        let runs = Arc::new(AtomicUsize::new(0));

        let err = Pipeline::new()
            .with_step(step("A", 5, "fail", &runs))
            .with_step(step("B", 30, "ok", &runs))
            .run(&ctx, &mut JobState::new("job"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::StepFailed { ref step_name, .. } if step_name == "A"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panic_is_caught() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Arc::new(MemoryStatusStore::new()));
        let runs = Arc::new(AtomicUsize::new(0));

        let err = Pipeline::new()
            .with_step(step("Boom", 5, "panic", &runs))
            .run(&ctx, &mut JobState::new("job"))
            .unwrap_err();
        match err {
            PipelineError::Panicked { message, .. } => assert_eq!(message, "scripted panic"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
