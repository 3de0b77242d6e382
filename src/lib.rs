// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tracekit - small infrastructure utilities for telemetry-heavy services.
//!
//! Two components, independent of each other:
//!
//! - [`telemetry`] - structured telemetry-event capture with exactly-once
//!   completion and synchronous fan-out to pluggable sinks, coordinated by
//!   a once-per-process manager
//! - [`cache`] - a self-expiring key/value staging cache where every entry
//!   lives for a caller-specified TTL
//!
//! Concrete sink implementations and schema rules are external
//! collaborators; this crate only defines the contract between a completed
//! event and its consumers (see [`telemetry::sink`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use tracekit::telemetry::manager;
//!
//! manager::setup(vec![shipper], validator)?;
//!
//! let mut metric = manager::new_metric("session_start", None)?;
//! metric.add_property("tenant", "contoso")?;
//! metric.success("started", Some(200.into()), None)?;
//! ```

pub mod cache;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use cache::ExpiringCache;
pub use error::{CacheError, Result, TelemetryError};
pub use telemetry::{
    LogLevel, SchemaValidator, SharedSink, SharedValidator, StatusCode, TelemetryEvent,
    TelemetryKind, TelemetryManager, TelemetrySink,
};

/// Tracekit version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
