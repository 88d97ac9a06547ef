// file: src/gcp/script.rs
// description: Apps Script execution API client driving the document parser
// reference: https://developers.google.com/apps-script/api/reference/rest/v1/scripts/run

use crate::config::ScriptConfig;
use crate::error::{HarvestError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const SCRIPT_ENDPOINT: &str = "https://script.googleapis.com/v1";

/// One execution of the remote parser function.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    /// The function ran to completion and returned this value.
    Completed(String),
    /// The function threw inside the script runtime.
    Failed {
        error_type: Option<String>,
        message: String,
    },
}

/// Execution seam for the controller loop. The real runner calls the
/// Apps Script API; tests script a sequence of outcomes.
pub trait ScriptRunner {
    async fn run_once(&self) -> Result<ScriptOutcome>;
}

#[derive(Debug, Serialize)]
struct RunRequest {
    function: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    response: Option<ScriptResponse>,
    error: Option<RunStatus>,
}

#[derive(Debug, Deserialize)]
struct ScriptResponse {
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RunStatus {
    message: Option<String>,
    #[serde(default)]
    details: Vec<ExecutionErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ExecutionErrorDetail {
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
    #[serde(rename = "errorType")]
    error_type: Option<String>,
}

pub struct AppsScriptClient {
    client: Client,
    token: String,
    config: ScriptConfig,
}

impl AppsScriptClient {
    pub fn new(token: String, config: ScriptConfig) -> Result<Self> {
        // Document parsing runs for minutes per call, well past the
        // default client timeout.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                HarvestError::ScriptRun(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            token,
            config,
        })
    }

    fn run_url(&self) -> String {
        format!("{}/scripts/{}:run", SCRIPT_ENDPOINT, self.config.script_id)
    }
}

impl ScriptRunner for AppsScriptClient {
    async fn run_once(&self) -> Result<ScriptOutcome> {
        let request = RunRequest {
            function: self.config.function.clone(),
        };

        debug!(
            "Running script function {} on {}",
            self.config.function, self.config.script_id
        );

        let response = self
            .client
            .post(self.run_url())
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| HarvestError::ScriptRun(format!("Failed to send run request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HarvestError::ScriptRun(format!(
                "Run request failed with status {}: {}",
                status, error_text
            )));
        }

        let run: RunResponse = response.json().await.map_err(|e| {
            HarvestError::ScriptRun(format!("Failed to parse run response: {}", e))
        })?;

        // A 200 with an error block means the script itself threw.
        if let Some(error) = run.error {
            let fallback = error
                .message
                .unwrap_or_else(|| "unknown script error".to_string());
            let (message, error_type) = match error.details.into_iter().next() {
                Some(detail) => (detail.error_message.unwrap_or(fallback), detail.error_type),
                None => (fallback, None),
            };
            return Ok(ScriptOutcome::Failed {
                error_type,
                message,
            });
        }

        let result = run
            .response
            .and_then(|r| r.result)
            .map(|value| match value {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_default();

        Ok(ScriptOutcome::Completed(result))
    }
}
