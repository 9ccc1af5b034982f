// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::EdgeKey;

/// Error conditions which abort processing of a trace.
///
/// Recoverable, per-node problems are not errors - they are reported as
/// [Diagnostics](crate::Diagnostic) and processing continues.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Consecutive matched path entries are neither equal nor connected.
    /// This indicates a defect in the matcher or in the graph.
    #[error("path discontinuity at point {index}: {prev} is followed by {next}")]
    PathDiscontinuity {
        index: usize,
        prev: EdgeKey,
        next: EdgeKey,
    },

    /// A node referenced by the matched path doesn't exist in the graph.
    #[error("unknown node: {0}")]
    UnknownNode(i64),

    /// An edge referenced by the matched path doesn't exist in the graph.
    #[error("no way is registered for edge {0}")]
    UnknownEdge(EdgeKey),

    /// A divided road case outside of 1..=4 was requested.
    #[error("unsupported divided road case: {0}")]
    UnsupportedDividedRoadCase(u8),

    /// The matched path has too few distinct edges to fill the snap window.
    /// The trace was left unchanged.
    #[error("snap window requires {required} distinct edges, but the path has only {available}")]
    SnapWindowUnderflow { required: usize, available: usize },

    /// The trace and the matched path are not index-aligned.
    #[error("trace has {trace} points, but the matched path has {path} entries")]
    TraceLengthMismatch { trace: usize, path: usize },

    /// A required configuration value is missing or invalid.
    #[error("malformed configuration: {0}")]
    MalformedConfig(String),

    /// A line of a matched path file couldn't be parsed.
    #[error("malformed matched path on line {line}: {reason}")]
    MalformedPath { line: usize, reason: String },

    /// Several exits continue the incoming way and the [Decider](crate::Decider)
    /// was unable to pick one.
    #[error("ambiguous continuation at node {node}: {options} exits follow the incoming way")]
    AmbiguousExit { node: i64, options: usize },

    /// A [Decider](crate::Decider) cancelled the whole operation.
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
}
