// file: src/controller/runner.rs
// description: polling controller driving the remote document parser to completion
// reference: repeats script execution until the finished sentinel comes back

use crate::config::ScriptConfig;
use crate::error::{HarvestError, Result};
use crate::gcp::{ScriptOutcome, ScriptRunner};
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseSummary {
    pub attempts: u32,
    pub script_errors: u32,
    pub transport_errors: u32,
}

pub struct ParseController<'a, R: ScriptRunner> {
    runner: &'a R,
    config: &'a ScriptConfig,
}

impl<'a, R: ScriptRunner> ParseController<'a, R> {
    pub fn new(runner: &'a R, config: &'a ScriptConfig) -> Self {
        Self { runner, config }
    }

    /// Runs the remote parser function until it reports the finished
    /// sentinel. Each run chews through one batch of documents, so the
    /// loop keeps calling; failures back off exponentially and the loop
    /// gives up once the policy's attempt bound is spent.
    pub async fn run_to_completion(&self) -> Result<ParseSummary> {
        let mut summary = ParseSummary::default();
        let mut consecutive_failures: u32 = 0;

        for attempt in 1..=self.config.poll.max_attempts {
            if attempt > 1 {
                sleep(self.config.poll.delay_for(consecutive_failures)).await;
            }

            summary.attempts = attempt;

            match self.runner.run_once().await {
                Ok(ScriptOutcome::Completed(result))
                    if result == self.config.finished_sentinel =>
                {
                    info!("Parser reports completion after {} attempts", attempt);
                    return Ok(summary);
                }
                Ok(ScriptOutcome::Completed(result)) => {
                    info!("Parser batch done: {}", result);
                    consecutive_failures = 0;
                }
                Ok(ScriptOutcome::Failed {
                    error_type,
                    message,
                }) => {
                    summary.script_errors += 1;
                    consecutive_failures += 1;
                    warn!(
                        "Script error ({}): {}",
                        error_type.as_deref().unwrap_or("unknown"),
                        message
                    );
                }
                Err(e) => {
                    summary.transport_errors += 1;
                    consecutive_failures += 1;
                    warn!("Run request failed: {}", e);
                }
            }
        }

        Err(HarvestError::ScriptRun(format!(
            "Gave up after {} attempts without a completion report",
            self.config.poll.max_attempts
        )))
    }
}
