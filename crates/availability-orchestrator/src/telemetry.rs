//! Replay-aware telemetry for orchestration steps
//!
//! Every property set starts from the host execution context
//! (`instanceId`, `isReplaying`, `currentUtcDateTime`), never from a local
//! clock. Log lines are suppressed while the context is replaying so each
//! step is logged once per instance rather than once per turn.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::workflow::OrchestrationContext;

/// Name of the availability record emitted by `trackAvailability`
pub const AVAILABILITY_TEST_NAME: &str = "workerAvailabilityTest";

/// String key/value properties attached to telemetry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TelemetryProperties(BTreeMap<String, String>);

impl TelemetryProperties {
    /// Create an empty property set
    pub fn new() -> Self {
        Self::default()
    }

    /// Base properties taken from the execution context
    pub fn from_context(ctx: &OrchestrationContext) -> Self {
        Self::new()
            .with("instanceId", ctx.instance_id())
            .with("isReplaying", ctx.is_replaying().to_string())
            .with("currentUtcDateTime", ctx.current_utc_date_time().to_rfc3339())
    }

    /// Add a property
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a property in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge `other` over `self`; keys in `other` win
    pub fn merged(mut self, other: &TelemetryProperties) -> Self {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    /// Look up a property
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Payload of the `trackAvailability` activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityTelemetry {
    /// Whether the tracked operation succeeded
    pub success: bool,

    /// Context properties merged with call-specific ones
    pub properties: TelemetryProperties,
}

/// Structured, replay-safe logger for orchestration steps
#[derive(Debug, Clone, Default)]
pub struct OrchestrationLogger {
    base: TelemetryProperties,
}

impl OrchestrationLogger {
    /// Create a logger with no extra base properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property stamped on every log line and telemetry record
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.base.insert(key, value);
        self
    }

    /// Context properties plus this logger's base properties
    pub fn default_properties(&self, ctx: &OrchestrationContext) -> TelemetryProperties {
        TelemetryProperties::from_context(ctx).merged(&self.base)
    }

    /// Log a step at info level
    pub fn log_step(
        &self,
        ctx: &OrchestrationContext,
        message: &str,
        properties: Option<&TelemetryProperties>,
    ) {
        if ctx.is_replaying() {
            return;
        }
        let properties = self.properties_for(ctx, properties);
        info!(instance_id = ctx.instance_id(), ?properties, "{message}");
    }

    /// Log a recoverable condition at warn level
    pub fn log_warning(
        &self,
        ctx: &OrchestrationContext,
        message: &str,
        properties: Option<&TelemetryProperties>,
    ) {
        if ctx.is_replaying() {
            return;
        }
        let properties = self.properties_for(ctx, properties);
        warn!(instance_id = ctx.instance_id(), ?properties, "{message}");
    }

    /// Log a failure at error level
    pub fn log_error(
        &self,
        ctx: &OrchestrationContext,
        message: &str,
        properties: Option<&TelemetryProperties>,
    ) {
        if ctx.is_replaying() {
            return;
        }
        let properties = self.properties_for(ctx, properties);
        error!(instance_id = ctx.instance_id(), ?properties, "{message}");
    }

    fn properties_for(
        &self,
        ctx: &OrchestrationContext,
        extra: Option<&TelemetryProperties>,
    ) -> TelemetryProperties {
        let defaults = self.default_properties(ctx);
        match extra {
            Some(extra) => defaults.merged(extra),
            None => defaults,
        }
    }
}
