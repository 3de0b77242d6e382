// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Seams between the telemetry pipeline and its external collaborators.
//!
//! Concrete sinks (log shippers, metrics backends) and schema rules live
//! outside this crate; these traits define the contract they implement.

use std::sync::Arc;

use crate::telemetry::event::TelemetryEvent;

/// A destination for completed telemetry events.
///
/// `emit` is invoked synchronously, once per sink, for every completed
/// event, in the order the sinks were registered. An implementation that
/// needs slow or asynchronous transport should enqueue internally; the
/// completion path never awaits it. An `Err` return is reported through
/// `tracing` and does not stop emission to sibling sinks.
///
/// The event reference is valid only for the duration of the call; sinks
/// that need the data later should copy what they need (for example via
/// [`TelemetryEvent::as_json`]).
pub trait TelemetrySink: Send + Sync {
    /// Consume one completed event.
    fn emit(&self, event: &TelemetryEvent) -> anyhow::Result<()>;
}

/// A sink handle shared between the manager and every event it creates.
pub type SharedSink = Arc<dyn TelemetrySink>;

/// Checks whether an event's shape (name, properties) conforms to the
/// schema expected by downstream consumers.
///
/// Consulted once per event just before fan-out; a failure is reported
/// through `tracing` and does not block emission.
pub trait SchemaValidator: Send + Sync {
    /// Validate one completed event.
    fn validate(&self, event: &TelemetryEvent) -> anyhow::Result<()>;
}

/// A validator handle shared between the manager and every event.
pub type SharedValidator = Arc<dyn SchemaValidator>;
