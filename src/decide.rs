// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Error, LoopSpan};

/// One of several exits which could continue the incoming way,
/// presented to [Decider::resolve_ambiguous_exit].
#[derive(Debug, Clone, PartialEq)]
pub struct ExitOption {
    /// Node the exit leads to.
    pub to: i64,

    /// Road name of the exit.
    pub name: String,

    /// Angle of the exit relative to the incoming heading, in (-180°, 180°].
    pub angle: f64,
}

/// Decisions which can't be made from the graph and the matched path alone.
///
/// Both methods are called synchronously during processing. Returning
/// [Error::Cancelled] aborts the whole operation.
pub trait Decider {
    /// Given detected loops, returns indices (into `loops`) of the spans to collapse.
    /// Spans not selected are kept as genuine U-turns.
    fn confirm_loop_removal(&self, loops: &[LoopSpan]) -> Result<Vec<usize>, Error>;

    /// Picks which of `options` (all continuing the incoming way at `node`)
    /// is the straight-ahead continuation. Returns an index into `options`.
    fn resolve_ambiguous_exit(&self, node: i64, options: &[ExitOption]) -> Result<usize, Error>;
}

/// What [NonInteractive] does when several exits continue the incoming way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguityPolicy {
    /// Fail with [Error::AmbiguousExit].
    #[default]
    Fail,

    /// Pick the option with the smallest absolute angle.
    Straightest,
}

/// [Decider] which never asks anybody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NonInteractive {
    /// Collapse every detected loop (true), or treat all of them as genuine U-turns (false).
    pub collapse_loops: bool,

    /// Handling of ambiguous same-way continuations.
    pub ambiguity: AmbiguityPolicy,
}

impl Decider for NonInteractive {
    fn confirm_loop_removal(&self, loops: &[LoopSpan]) -> Result<Vec<usize>, Error> {
        if self.collapse_loops {
            Ok((0..loops.len()).collect())
        } else {
            Ok(Vec::default())
        }
    }

    fn resolve_ambiguous_exit(&self, node: i64, options: &[ExitOption]) -> Result<usize, Error> {
        match (options.len(), self.ambiguity) {
            (1, _) => Ok(0),
            (0, _) | (_, AmbiguityPolicy::Fail) => Err(Error::AmbiguousExit {
                node,
                options: options.len(),
            }),
            (_, AmbiguityPolicy::Straightest) => Ok(options
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.angle.abs().total_cmp(&b.angle.abs()))
                .map(|(idx, _)| idx)
                .unwrap_or(0)),
        }
    }
}
