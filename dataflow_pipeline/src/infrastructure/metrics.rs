// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Infrastructure
//!
//! Implementations of the domain observability surface: the in-memory
//! aggregating collector, the Prometheus service with its bridge, and the
//! human-readable trace sinks.

pub mod collector;
pub mod service;
pub mod tracer;

pub use collector::{BasicMetricsCollector, CollectedMetrics, PipeExecutionRecord};
pub use service::{MetricsService, PrometheusMetricsCollector};
pub use tracer::{format_duration, BufferTraceSink, ConsoleTraceSink, PREVIEW_LEN};
