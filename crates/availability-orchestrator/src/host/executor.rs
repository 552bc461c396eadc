//! Activity executors
//!
//! The executor is the only component that performs real side effects. It
//! receives `{activityName, data}` and returns the activity's JSON result.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use crate::activity::{ActivityFailure, ActivityRequest};
use crate::config::HostConfig;

/// Runs activities on behalf of the replay host
#[async_trait]
pub trait ActivityExecutor: Send + Sync {
    /// Run one activity
    ///
    /// # Errors
    ///
    /// Return an [`ActivityFailure`] when the activity could not produce a
    /// result. Web activities that reached the service report their status
    /// code in the result instead.
    async fn execute(&self, request: &ActivityRequest) -> Result<serde_json::Value, ActivityFailure>;
}

/// Executor that forwards activities to a remote HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpActivityExecutor {
    client: Client,
    endpoint: String,
}

impl HttpActivityExecutor {
    /// Per-request timeout
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    /// Create an executor that posts activity calls to `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(config.activity_executor_url.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ActivityExecutor for HttpActivityExecutor {
    async fn execute(&self, request: &ActivityRequest) -> Result<serde_json::Value, ActivityFailure> {
        debug!(activity = %request.activity_name, endpoint = %self.endpoint, "Executing activity");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(Self::REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(activity = %request.activity_name, error = %e, "Activity request failed");
                ActivityFailure::new(e.to_string()).with_type("transport")
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                activity = %request.activity_name,
                status = status.as_u16(),
                "Activity executor returned an error"
            );
            return Err(
                ActivityFailure::new(format!("activity executor returned {status}"))
                    .with_type("executor")
                    .with_details(json!({ "statusCode": status.as_u16(), "body": body })),
            );
        }

        // Activities without a result answer with an empty body.
        let bytes = response.bytes().await.map_err(|e| {
            ActivityFailure::new(e.to_string()).with_type("transport")
        })?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| ActivityFailure::new(e.to_string()).with_type("serialization"))
    }
}
