// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for tracekit.
//!
//! This module provides strongly-typed errors for the cache and telemetry
//! components, using `thiserror` for ergonomic error definitions and
//! `anyhow` for opaque error payloads (exceptions attached to failed
//! events, sink emit results).

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Insertion rejected: cache already holds an entry for key '{0}'")]
    DuplicateKey(String),
}

/// Errors that can occur in the telemetry pipeline.
///
/// All of these are synchronous usage errors surfaced immediately to the
/// caller; none are retried.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Telemetry event '{event_name}' has already been completed")]
    AlreadyCompleted { event_name: String },

    #[error("This telemetry manager was already set up with a sink list and schema validator")]
    AlreadySetup,

    #[error("The provided sink list is empty; at least one sink is required")]
    EmptySinkList,

    #[error("Telemetry manager has not been set up yet; it requires a sink list and a schema validator")]
    NotSetup,
}

impl TelemetryError {
    /// Check if this error indicates a missing or repeated configuration
    /// step rather than a per-event misuse.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadySetup | Self::EmptySinkList | Self::NotSetup
        )
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;
