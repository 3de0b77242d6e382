// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Process-wide coordination of telemetry setup and event creation.
//!
//! A [`TelemetryManager`] is configured exactly once with a sink list and a
//! schema validator, then hands out [`TelemetryEvent`]s bound to that
//! configuration. A process-wide shared instance is available through the
//! module-level functions ([`setup`], [`new_metric`], [`log`]); independent
//! instances can be built with [`TelemetryManager::create`] for test
//! isolation or scoped pipelines.

use std::collections::HashMap;
use std::panic::Location;
use std::path::Path;

use once_cell::sync::{Lazy, OnceCell};
use serde_json::Value;

use crate::error::TelemetryError;
use crate::telemetry::event::{LogLevel, StatusCode, TelemetryEvent, TelemetryKind};
use crate::telemetry::sink::{SharedSink, SharedValidator};

/// Event-name prefix for one-shot log messages without an explicit name.
const LOG_EVENT_PREFIX: &str = "LogMessage";

/// Process-wide shared manager, created lazily on first access.
static GLOBAL_TELEMETRY: Lazy<TelemetryManager> = Lazy::new(TelemetryManager::new);

/// Write-once configuration installed by `setup`.
struct ManagerConfig {
    sinks: Vec<SharedSink>,
    validator: SharedValidator,
}

/// Coordinates one-time sink/validator registration and acts as the factory
/// for telemetry events.
///
/// The configuration is write-once-then-read-only: `setup` transitions the
/// manager from uninitialized to configured, and that transition is one-way.
/// Every factory call fails with [`TelemetryError::NotSetup`] until it has
/// happened.
pub struct TelemetryManager {
    config: OnceCell<ManagerConfig>,
}

impl TelemetryManager {
    /// Create an uninitialized manager.
    pub fn new() -> Self {
        Self {
            config: OnceCell::new(),
        }
    }

    /// Create a manager and configure it in one step.
    pub fn create(
        sinks: Vec<SharedSink>,
        validator: SharedValidator,
    ) -> Result<Self, TelemetryError> {
        let manager = Self::new();
        manager.setup(sinks, validator)?;
        Ok(manager)
    }

    /// One-time configuration with a sink list and schema validator.
    ///
    /// Fails with [`TelemetryError::AlreadySetup`] on a second call,
    /// whatever its arguments, and with [`TelemetryError::EmptySinkList`]
    /// if no sinks are given (a manager with no destination is a
    /// misconfiguration, not a silent no-op).
    pub fn setup(
        &self,
        sinks: Vec<SharedSink>,
        validator: SharedValidator,
    ) -> Result<(), TelemetryError> {
        if self.config.get().is_some() {
            return Err(TelemetryError::AlreadySetup);
        }
        if sinks.is_empty() {
            return Err(TelemetryError::EmptySinkList);
        }
        self.config
            .set(ManagerConfig { sinks, validator })
            .map_err(|_| TelemetryError::AlreadySetup)
    }

    /// Whether `setup` has completed on this instance.
    pub fn is_setup(&self) -> bool {
        self.config.get().is_some()
    }

    /// Create a new metric-kind event bound to the configured sinks.
    ///
    /// `properties` seeds the event's property bag; more can be attached
    /// with [`TelemetryEvent::add_property`] before completion.
    pub fn new_metric(
        &self,
        event_name: impl Into<String>,
        properties: Option<HashMap<String, Value>>,
    ) -> Result<TelemetryEvent, TelemetryError> {
        let config = self.configured()?;
        Ok(TelemetryEvent::new(
            event_name,
            TelemetryKind::Metric,
            config.sinks.clone(),
            Some(config.validator.clone()),
            properties,
        ))
    }

    /// Log a one-shot message under an explicit event name.
    ///
    /// The message becomes a log-kind event completed immediately:
    /// `Warning` and `Error` levels route through the error path, every
    /// other level through the success path. Logs therefore traverse the
    /// same validation and fan-out pipeline as multi-step metrics.
    pub fn log_named(
        &self,
        event_name: impl Into<String>,
        message: impl Into<String>,
        level: LogLevel,
        properties: Option<HashMap<String, Value>>,
        status_code: Option<StatusCode>,
        exception: Option<anyhow::Error>,
    ) -> Result<(), TelemetryError> {
        let config = self.configured()?;
        let mut event = TelemetryEvent::new(
            event_name,
            TelemetryKind::Log,
            config.sinks.clone(),
            Some(config.validator.clone()),
            properties,
        );
        if level.is_failure() {
            event.error_with_level(message, status_code, None, exception, level)?;
        } else {
            event.success_with_level(message, status_code, None, level)?;
        }
        Ok(())
    }

    /// Log a one-shot message, deriving the event name from the call site.
    ///
    /// The name has the form `LogMessage:<file>:<line>`, a best-effort
    /// diagnostic identifier. Name derivation cannot fail, so logging
    /// itself can never throw for naming reasons. Prefer [`log_named`]
    /// with a stable operation tag where one exists.
    ///
    /// [`log_named`]: TelemetryManager::log_named
    #[track_caller]
    pub fn log(
        &self,
        message: impl Into<String>,
        level: LogLevel,
        properties: Option<HashMap<String, Value>>,
        status_code: Option<StatusCode>,
        exception: Option<anyhow::Error>,
    ) -> Result<(), TelemetryError> {
        let event_name = caller_event_name(Location::caller());
        self.log_named(event_name, message, level, properties, status_code, exception)
    }

    fn configured(&self) -> Result<&ManagerConfig, TelemetryError> {
        self.config.get().ok_or(TelemetryError::NotSetup)
    }
}

impl Default for TelemetryManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Synthesize a log event name from a call site, falling back to the bare
/// prefix when the file name does not render.
fn caller_event_name(caller: &Location<'_>) -> String {
    let file = Path::new(caller.file())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(LOG_EVENT_PREFIX);
    format!("{LOG_EVENT_PREFIX}:{file}:{line}", line = caller.line())
}

/// The process-wide shared manager.
pub fn global() -> &'static TelemetryManager {
    &GLOBAL_TELEMETRY
}

/// Configure the process-wide shared manager. May be called at most once
/// per process lifetime.
pub fn setup(sinks: Vec<SharedSink>, validator: SharedValidator) -> Result<(), TelemetryError> {
    GLOBAL_TELEMETRY.setup(sinks, validator)
}

/// Create a metric-kind event on the process-wide shared manager.
pub fn new_metric(
    event_name: impl Into<String>,
    properties: Option<HashMap<String, Value>>,
) -> Result<TelemetryEvent, TelemetryError> {
    GLOBAL_TELEMETRY.new_metric(event_name, properties)
}

/// Log a one-shot message on the process-wide shared manager, naming the
/// event after the call site.
#[track_caller]
pub fn log(
    message: impl Into<String>,
    level: LogLevel,
    properties: Option<HashMap<String, Value>>,
    status_code: Option<StatusCode>,
    exception: Option<anyhow::Error>,
) -> Result<(), TelemetryError> {
    let event_name = caller_event_name(Location::caller());
    GLOBAL_TELEMETRY.log_named(event_name, message, level, properties, status_code, exception)
}

/// Log a one-shot message on the process-wide shared manager under an
/// explicit event name.
pub fn log_named(
    event_name: impl Into<String>,
    message: impl Into<String>,
    level: LogLevel,
    properties: Option<HashMap<String, Value>>,
    status_code: Option<StatusCode>,
    exception: Option<anyhow::Error>,
) -> Result<(), TelemetryError> {
    GLOBAL_TELEMETRY.log_named(event_name, message, level, properties, status_code, exception)
}
