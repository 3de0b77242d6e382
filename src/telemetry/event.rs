// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! A single unit of telemetry with exactly-once completion.
//!
//! A [`TelemetryEvent`] represents one logical operation being measured or
//! logged. It is created through the telemetry manager, enriched with
//! properties while the operation runs, and finished exactly once with
//! [`success`](TelemetryEvent::success) or [`error`](TelemetryEvent::error),
//! at which point it is pushed synchronously to every registered sink.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TelemetryError;
use crate::telemetry::sink::{SharedSink, SharedValidator};

/// Whether an event is a multi-step metric or a one-shot log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    Metric,
    Log,
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "metric"),
            Self::Log => write!(f, "log"),
        }
    }
}

/// Severity attached to a completed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Verbose,
    Debug,
}

impl LogLevel {
    /// Levels that route a one-shot log through the error path.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Warning)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        };
        write!(f, "{name}")
    }
}

/// A status code supplied at completion time.
///
/// Codes are normalized to their string form when the event completes.
/// Zero and empty-string codes are preserved verbatim; a code is only
/// absent when the caller passes `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCode {
    Number(i64),
    Text(String),
}

impl StatusCode {
    /// The normalized string form stored on the completed event.
    pub fn normalize(self) -> String {
        match self {
            Self::Number(code) => code.to_string(),
            Self::Text(code) => code,
        }
    }
}

impl From<i64> for StatusCode {
    fn from(code: i64) -> Self {
        Self::Number(code)
    }
}

impl From<&str> for StatusCode {
    fn from(code: &str) -> Self {
        Self::Text(code.to_string())
    }
}

impl From<String> for StatusCode {
    fn from(code: String) -> Self {
        Self::Text(code)
    }
}

/// One telemetry event: an event name, a kind, a start timestamp, a
/// mutable property bag, and a terminal outcome that can be set exactly
/// once.
///
/// Events are constructed by [`TelemetryManager`](crate::TelemetryManager),
/// which binds them to the configured sink list and schema validator.
/// Completing an event fans it out to every sink in registration order,
/// synchronously, before returning to the caller. A second completion
/// attempt fails with [`TelemetryError::AlreadyCompleted`]; a duplicate
/// completion usually means both a success and a failure path executed in
/// caller code.
pub struct TelemetryEvent {
    event_name: String,
    kind: TelemetryKind,
    timestamp: DateTime<Utc>,
    start: Instant,
    properties: HashMap<String, Value>,
    successful: Option<bool>,
    message: Option<String>,
    status_code: Option<String>,
    metadata: Option<Value>,
    exception: Option<anyhow::Error>,
    log_level: Option<LogLevel>,
    latency: Option<Duration>,
    completed: bool,
    sinks: Vec<SharedSink>,
    validator: Option<SharedValidator>,
}

impl TelemetryEvent {
    /// Construct an open event bound to the given sinks and validator.
    ///
    /// Only the manager creates events; callers receive them from
    /// `new_metric` or implicitly through `log`.
    pub(crate) fn new(
        event_name: impl Into<String>,
        kind: TelemetryKind,
        sinks: Vec<SharedSink>,
        validator: Option<SharedValidator>,
        initial_properties: Option<HashMap<String, Value>>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            kind,
            timestamp: Utc::now(),
            start: Instant::now(),
            properties: initial_properties.unwrap_or_default(),
            successful: None,
            message: None,
            status_code: None,
            metadata: None,
            exception: None,
            log_level: None,
            latency: None,
            completed: false,
            sinks,
            validator,
        }
    }

    /// Upsert a property into the event's property bag.
    ///
    /// Chainable through `?`. Fails with
    /// [`TelemetryError::AlreadyCompleted`] once the event has completed;
    /// a completed event is immutable.
    pub fn add_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, TelemetryError> {
        if self.completed {
            return Err(self.already_completed());
        }
        self.properties.insert(key.into(), value.into());
        Ok(self)
    }

    /// Complete the event as successful with `LogLevel::Info`.
    pub fn success(
        &mut self,
        message: impl Into<String>,
        status_code: Option<StatusCode>,
        metadata: Option<Value>,
    ) -> Result<(), TelemetryError> {
        self.complete(message.into(), status_code, metadata, LogLevel::Info, true, None)
    }

    /// Complete the event as successful with an explicit severity.
    pub fn success_with_level(
        &mut self,
        message: impl Into<String>,
        status_code: Option<StatusCode>,
        metadata: Option<Value>,
        level: LogLevel,
    ) -> Result<(), TelemetryError> {
        self.complete(message.into(), status_code, metadata, level, true, None)
    }

    /// Complete the event as failed with `LogLevel::Error`.
    pub fn error(
        &mut self,
        message: impl Into<String>,
        status_code: Option<StatusCode>,
        metadata: Option<Value>,
        exception: Option<anyhow::Error>,
    ) -> Result<(), TelemetryError> {
        self.complete(
            message.into(),
            status_code,
            metadata,
            LogLevel::Error,
            false,
            exception,
        )
    }

    /// Complete the event as failed with an explicit severity.
    pub fn error_with_level(
        &mut self,
        message: impl Into<String>,
        status_code: Option<StatusCode>,
        metadata: Option<Value>,
        exception: Option<anyhow::Error>,
        level: LogLevel,
    ) -> Result<(), TelemetryError> {
        self.complete(message.into(), status_code, metadata, level, false, exception)
    }

    /// The single completion routine behind `success` and `error`.
    ///
    /// Order matters for reproducibility: reject-if-completed, store the
    /// outcome fields, stamp latency, validate shape, fan out to every
    /// sink in registration order, then mark completed.
    fn complete(
        &mut self,
        message: String,
        status_code: Option<StatusCode>,
        metadata: Option<Value>,
        level: LogLevel,
        successful: bool,
        exception: Option<anyhow::Error>,
    ) -> Result<(), TelemetryError> {
        if self.completed {
            return Err(self.already_completed());
        }

        self.message = Some(message);
        self.status_code = status_code.map(StatusCode::normalize);
        self.metadata = metadata;
        self.log_level = Some(level);
        self.successful = Some(successful);
        self.exception = exception;
        self.latency = Some(self.start.elapsed());

        // Schema failures are reported, never fatal: telemetry must not
        // corrupt the caller's control flow.
        if let Some(validator) = self.validator.clone() {
            if let Err(err) = validator.validate(self) {
                tracing::warn!(
                    event = %self.event_name,
                    error = %err,
                    "telemetry event failed schema validation"
                );
            }
        }

        // A failing sink must not block its siblings.
        let sinks = self.sinks.clone();
        for (index, sink) in sinks.iter().enumerate() {
            if let Err(err) = sink.emit(self) {
                tracing::warn!(
                    event = %self.event_name,
                    sink = index,
                    error = %err,
                    "telemetry sink emit failed"
                );
            }
        }

        self.completed = true;
        Ok(())
    }

    fn already_completed(&self) -> TelemetryError {
        TelemetryError::AlreadyCompleted {
            event_name: self.event_name.clone(),
        }
    }

    /// Stable identifier for the logical operation this event measures.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Whether this event is a metric or a log.
    pub fn kind(&self) -> TelemetryKind {
        self.kind
    }

    /// Wall-clock time at which the event was created.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The event's property bag.
    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }

    /// Time between creation and completion, if completed.
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    /// Latency in whole milliseconds, if completed.
    pub fn latency_in_ms(&self) -> Option<u64> {
        self.latency.map(|latency| latency.as_millis() as u64)
    }

    /// Terminal outcome flag; `None` until the event completes.
    pub fn successful(&self) -> Option<bool> {
        self.successful
    }

    /// Human-readable completion message, if completed.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Normalized status code, if one was supplied at completion.
    pub fn status_code(&self) -> Option<&str> {
        self.status_code.as_deref()
    }

    /// Structured metadata attached at completion.
    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    /// Exception payload attached on the error path.
    pub fn exception(&self) -> Option<&anyhow::Error> {
        self.exception.as_ref()
    }

    /// Severity recorded at completion.
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Whether the event has reached its terminal state.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Render the event as a JSON object for sink consumption.
    ///
    /// The exception, when present, is flattened to its display string.
    pub fn as_json(&self) -> Value {
        serde_json::json!({
            "event_name": self.event_name,
            "kind": self.kind.to_string(),
            "timestamp": self.timestamp.to_rfc3339(),
            "properties": self.properties,
            "successful": self.successful,
            "message": self.message,
            "status_code": self.status_code,
            "metadata": self.metadata,
            "exception": self.exception.as_ref().map(|err| err.to_string()),
            "log_level": self.log_level.map(|level| level.to_string()),
            "latency_ms": self.latency_in_ms(),
        })
    }
}

impl fmt::Debug for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryEvent")
            .field("event_name", &self.event_name)
            .field("kind", &self.kind)
            .field("timestamp", &self.timestamp)
            .field("properties", &self.properties)
            .field("successful", &self.successful)
            .field("message", &self.message)
            .field("status_code", &self.status_code)
            .field("completed", &self.completed)
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::telemetry::sink::TelemetrySink;

    /// Records a JSON snapshot of every event it receives.
    #[derive(Default)]
    struct RecordingSink {
        emitted: Mutex<Vec<Value>>,
    }

    impl RecordingSink {
        fn emitted(&self) -> Vec<Value> {
            self.emitted.lock().unwrap().clone()
        }
    }

    impl TelemetrySink for RecordingSink {
        fn emit(&self, event: &TelemetryEvent) -> anyhow::Result<()> {
            self.emitted.lock().unwrap().push(event.as_json());
            Ok(())
        }
    }

    /// Always fails; used to verify sibling-sink isolation.
    struct FailingSink;

    impl TelemetrySink for FailingSink {
        fn emit(&self, _event: &TelemetryEvent) -> anyhow::Result<()> {
            anyhow::bail!("backend unavailable")
        }
    }

    fn metric(sinks: Vec<SharedSink>) -> TelemetryEvent {
        TelemetryEvent::new("test_operation", TelemetryKind::Metric, sinks, None, None)
    }

    #[test]
    fn test_fresh_event_state() {
        let event = metric(vec![]);

        assert_eq!(event.event_name(), "test_operation");
        assert_eq!(event.kind(), TelemetryKind::Metric);
        assert!(!event.is_completed());
        assert!(event.successful().is_none());
        assert!(event.message().is_none());
        assert!(event.status_code().is_none());
        assert!(event.metadata().is_none());
        assert!(event.exception().is_none());
        assert!(event.log_level().is_none());
        assert!(event.latency().is_none());
        assert!(event.properties().is_empty());
    }

    #[test]
    fn test_initial_properties_merged() {
        let mut initial = HashMap::new();
        initial.insert("tenant".to_string(), Value::from("contoso"));

        let mut event = TelemetryEvent::new(
            "test_operation",
            TelemetryKind::Metric,
            vec![],
            None,
            Some(initial),
        );
        event.add_property("document", "doc-1").unwrap();

        assert_eq!(event.properties().len(), 2);
        assert_eq!(event.properties()["tenant"], Value::from("contoso"));
    }

    #[test]
    fn test_add_property_upserts_and_chains() {
        let mut event = metric(vec![]);
        event
            .add_property("attempt", 1)
            .unwrap()
            .add_property("attempt", 2)
            .unwrap();

        assert_eq!(event.properties()["attempt"], Value::from(2));
    }

    #[test]
    fn test_success_records_outcome() {
        let sink = Arc::new(RecordingSink::default());
        let mut event = metric(vec![sink.clone()]);

        event.success("ok", Some(200.into()), Some(serde_json::json!({"region": "eu"}))).unwrap();

        assert!(event.is_completed());
        assert_eq!(event.successful(), Some(true));
        assert_eq!(event.message(), Some("ok"));
        assert_eq!(event.status_code(), Some("200"));
        assert_eq!(event.log_level(), Some(LogLevel::Info));
        assert!(event.latency().is_some());

        let emitted = sink.emitted();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0]["message"], "ok");
        assert_eq!(emitted[0]["status_code"], "200");
    }

    #[test]
    fn test_error_records_outcome_and_exception() {
        let mut event = metric(vec![]);
        event
            .error(
                "write failed",
                Some("ECONNRESET".into()),
                None,
                Some(anyhow::anyhow!("connection reset by peer")),
            )
            .unwrap();

        assert_eq!(event.successful(), Some(false));
        assert_eq!(event.log_level(), Some(LogLevel::Error));
        assert_eq!(event.status_code(), Some("ECONNRESET"));
        assert!(event
            .exception()
            .unwrap()
            .to_string()
            .contains("connection reset"));
    }

    #[test]
    fn test_double_completion_rejected() {
        let mut event = metric(vec![]);
        event.success("ok", Some(200.into()), None).unwrap();

        let err = event.error("too late", None, None, None).unwrap_err();
        assert!(
            matches!(err, TelemetryError::AlreadyCompleted { ref event_name } if event_name == "test_operation")
        );

        // First outcome retained
        assert_eq!(event.successful(), Some(true));
        assert_eq!(event.message(), Some("ok"));
        assert_eq!(event.status_code(), Some("200"));
    }

    #[test]
    fn test_add_property_after_completion_rejected() {
        let mut event = metric(vec![]);
        event.success("ok", None, None).unwrap();

        let err = event.add_property("late", true).unwrap_err();
        assert!(matches!(err, TelemetryError::AlreadyCompleted { .. }));
        assert!(event.properties().is_empty());
    }

    #[test]
    fn test_zero_status_code_preserved() {
        let mut event = metric(vec![]);
        event.success("ok", Some(0.into()), None).unwrap();
        assert_eq!(event.status_code(), Some("0"));
    }

    #[test]
    fn test_empty_status_code_preserved() {
        let mut event = metric(vec![]);
        event.success("ok", Some("".into()), None).unwrap();
        assert_eq!(event.status_code(), Some(""));
    }

    #[test]
    fn test_failing_sink_does_not_block_siblings() {
        let recording = Arc::new(RecordingSink::default());
        let sinks: Vec<SharedSink> = vec![Arc::new(FailingSink), recording.clone()];
        let mut event = TelemetryEvent::new("test_operation", TelemetryKind::Metric, sinks, None, None);

        event.success("ok", None, None).unwrap();

        assert!(event.is_completed());
        assert_eq!(recording.emitted().len(), 1);
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        struct OrderSink {
            id: usize,
            order: Arc<Mutex<Vec<usize>>>,
        }

        impl TelemetrySink for OrderSink {
            fn emit(&self, _event: &TelemetryEvent) -> anyhow::Result<()> {
                self.order.lock().unwrap().push(self.id);
                Ok(())
            }
        }

        let sinks: Vec<SharedSink> = (0..3)
            .map(|id| {
                Arc::new(OrderSink {
                    id,
                    order: order.clone(),
                }) as SharedSink
            })
            .collect();

        let mut event = TelemetryEvent::new("test_operation", TelemetryKind::Metric, sinks, None, None);
        event.success("ok", None, None).unwrap();

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_as_json_shape() {
        let mut event = metric(vec![]);
        event.add_property("document", "doc-1").unwrap();
        event.success("ok", Some(200.into()), None).unwrap();

        let json = event.as_json();
        assert_eq!(json["event_name"], "test_operation");
        assert_eq!(json["kind"], "metric");
        assert_eq!(json["properties"]["document"], "doc-1");
        assert_eq!(json["successful"], true);
        assert_eq!(json["log_level"], "info");
        assert!(json["latency_ms"].is_u64());
    }

    #[test]
    fn test_status_code_normalization() {
        assert_eq!(StatusCode::from(404).normalize(), "404");
        assert_eq!(StatusCode::from(0).normalize(), "0");
        assert_eq!(StatusCode::from("teapot").normalize(), "teapot");
        assert_eq!(StatusCode::from(String::new()).normalize(), "");
    }

    #[test]
    fn test_log_level_failure_routing() {
        assert!(LogLevel::Error.is_failure());
        assert!(LogLevel::Warning.is_failure());
        assert!(!LogLevel::Info.is_failure());
        assert!(!LogLevel::Verbose.is_failure());
        assert!(!LogLevel::Debug.is_failure());
    }
}
