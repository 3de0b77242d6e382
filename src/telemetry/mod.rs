// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Structured telemetry-event capture and multi-sink emission.
//!
//! This module implements the event lifecycle used by every telemetry
//! producer in the process:
//!
//! - **Events**: [`TelemetryEvent`] carries a name, a kind (metric or
//!   log), a property bag, and a terminal outcome set exactly once
//! - **Fan-out**: completion pushes the event synchronously to every
//!   registered [`TelemetrySink`], in registration order
//! - **Coordination**: [`TelemetryManager`] is configured once per process
//!   with the sink list and schema validator, and is the only way to
//!   create events
//!
//! # Usage
//!
//! Configure the shared manager once at startup, then create metrics or
//! log one-shot messages anywhere:
//!
//! ```rust,ignore
//! use tracekit::telemetry::{manager, LogLevel};
//!
//! manager::setup(vec![my_sink], my_validator)?;
//!
//! let mut metric = manager::new_metric("document_open", None)?;
//! metric.add_property("document_id", "doc-1")?;
//! // ... do the work being measured ...
//! metric.success("opened", Some(200.into()), None)?;
//!
//! manager::log("cache warmed", LogLevel::Info, None, None, None)?;
//! ```
//!
//! A sink or validator failure never propagates to the caller; it is
//! reported through `tracing` and emission continues with the remaining
//! sinks.

pub mod event;
pub mod manager;
pub mod sink;

pub use event::{LogLevel, StatusCode, TelemetryEvent, TelemetryKind};
pub use manager::TelemetryManager;
pub use sink::{SchemaValidator, SharedSink, SharedValidator, TelemetrySink};
