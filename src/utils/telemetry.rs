// file: src/utils/telemetry.rs
// description: service health reporting and stage timing

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn symbol(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "✓",
            HealthStatus::Degraded => "⚠",
            HealthStatus::Unhealthy => "✗",
        }
    }

    fn severity(self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
        }
    }
}

/// Outcome of probing one external service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl HealthCheck {
    fn record(
        component: &str,
        status: HealthStatus,
        message: Option<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            component: component.to_string(),
            status,
            message,
            response_time_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn healthy(component: &str, elapsed: Duration) -> Self {
        Self::record(component, HealthStatus::Healthy, None, elapsed)
    }

    pub fn degraded(component: &str, message: String, elapsed: Duration) -> Self {
        Self::record(component, HealthStatus::Degraded, Some(message), elapsed)
    }

    pub fn unhealthy(component: &str, message: String, elapsed: Duration) -> Self {
        Self::record(component, HealthStatus::Unhealthy, Some(message), elapsed)
    }
}

/// Worst-status-wins roll-up of every probe in one verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub generated_at: String,
    pub version: String,
}

impl HealthReport {
    pub fn new(checks: Vec<HealthCheck>, version: String) -> Self {
        let overall_status = checks
            .iter()
            .map(|c| c.status)
            .max_by_key(|s| s.severity())
            .unwrap_or(HealthStatus::Healthy);

        Self {
            overall_status,
            checks,
            generated_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            version,
        }
    }

    pub fn format(&self) -> String {
        let mut out = format!(
            "{} Service Health: {:?}\nVersion: {}\nGenerated: {}\n\n",
            self.overall_status.symbol(),
            self.overall_status,
            self.version,
            self.generated_at
        );

        for check in &self.checks {
            let _ = write!(
                out,
                "{} {} ({:?}) - {}ms",
                check.status.symbol(),
                check.component,
                check.status,
                check.response_time_ms
            );
            if let Some(message) = &check.message {
                let _ = write!(out, "\n  {}", message);
            }
            out.push('\n');
        }

        out
    }
}

/// Wall-clock timer for one pipeline stage.
pub struct OperationTimer {
    operation: String,
    started: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        info!("Starting {}", operation);
        Self {
            operation: operation.to_string(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!("Finished {} in {:.2}s", self.operation, elapsed.as_secs_f64());
        elapsed
    }

    /// Finish, reporting per-item throughput for the stage.
    pub fn finish_with_count(self, count: usize) -> Duration {
        let elapsed = self.elapsed();
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { count as f64 / secs } else { 0.0 };
        info!(
            "Finished {}: {} items in {:.2}s ({:.2}/s)",
            self.operation, count, secs, rate
        );
        elapsed
    }
}
