// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use log::{info, warn};

use crate::distance::node_distance;
use crate::{Decider, EdgeRun, Error, MatchedPath, RoadGraph};

/// Part of a [MatchedPath] which backtracks over itself - either a genuine U-turn,
/// or an artifact of map matching.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSpan {
    /// Index of the first path entry in the loop.
    pub start: usize,

    /// Index one past the last path entry in the loop.
    pub end: usize,

    /// Node at which the loop starts.
    pub start_node: i64,

    /// Node at which the loop ends. Equal to `start_node` for exact mirrors.
    pub end_node: i64,

    /// Length of all edges in the loop, in meters.
    pub length: f64,

    /// Distinct names of the roads in the loop, in order of appearance.
    pub names: Vec<String>,

    /// Index of the first path entry after the turnaround point.
    pub midpoint: usize,
}

/// Finds all mirrored spans in the path - sequences of edges immediately followed
/// by the same edges traversed in reverse order (like `A-B-C-B-A`).
///
/// Every turnaround point produces a single span, grown outwards as long as
/// the edges on both sides keep mirroring each other. The path is not modified.
pub fn detect_loops(
    g: &RoadGraph,
    path: &MatchedPath,
    default_name: &str,
) -> Result<Vec<LoopSpan>, Error> {
    let runs = path.runs();
    let mut spans = Vec::default();

    for center in 0..runs.len().saturating_sub(1) {
        let depth = mirror_depth(&runs, center);
        if depth == 0 {
            continue;
        }

        let first = center + 1 - depth;
        let last = center + depth;
        spans.push(loop_span(g, &runs[first..=last], runs[center].end, default_name)?);
    }

    Ok(spans)
}

/// Returns how many runs on each side of the boundary between
/// `runs[center]` and `runs[center + 1]` mirror each other.
fn mirror_depth(runs: &[EdgeRun], center: usize) -> usize {
    let mut depth = 0;
    while depth <= center
        && center + depth + 1 < runs.len()
        && runs[center - depth]
            .edge
            .same_segment(runs[center + depth + 1].edge)
    {
        depth += 1;
    }
    depth
}

fn loop_span(
    g: &RoadGraph,
    runs: &[EdgeRun],
    midpoint: usize,
    default_name: &str,
) -> Result<LoopSpan, Error> {
    debug_assert!(!runs.is_empty());

    let mut length = 0.0;
    let mut names: Vec<String> = Vec::default();

    for run in runs {
        let from = g.node(run.edge.from)?;
        let to = g.node(run.edge.to)?;
        length += node_distance(&from, &to);

        let name = g.way_of(run.edge)?.display_name(default_name);
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    let first = runs[0];
    let last = runs[runs.len() - 1];
    Ok(LoopSpan {
        start: first.start,
        end: last.end,
        start_node: first.edge.from,
        end_node: last.edge.to,
        length,
        names,
        midpoint,
    })
}

/// Removes the provided loops from the path. Entries before the loop's
/// midpoint are replaced by the edge preceding the loop, and entries after it
/// by the edge following the loop. Loops touching the start or the end of
/// the path are filled entirely from the other side.
///
/// Spans are applied in order of their start. Spans chained at the same node
/// (touching or overlapping, and returning to where the first one started)
/// are removed together as one. Other overlapping spans, and spans covering
/// the whole path, are skipped. Returns the spans which were actually collapsed.
pub fn collapse_loops(path: &mut MatchedPath, spans: &[LoopSpan]) -> Vec<LoopSpan> {
    let mut ordered: Vec<&LoopSpan> = spans.iter().collect();
    ordered.sort_by_key(|s| (s.start, s.end));

    let mut collapsed: Vec<LoopSpan> = Vec::default();
    let mut i = 0;

    while i < ordered.len() {
        let first = ordered[i];
        let mut group = vec![first];
        let mut end = first.end;
        i += 1;

        while let Some(&next) = ordered.get(i) {
            if next.start > end {
                break;
            }
            i += 1;

            let merged_end = end.max(next.end);
            if path[first.start].from == path[merged_end - 1].to {
                end = merged_end;
                group.push(next);
            } else {
                warn!(
                    "Loop at points {}..{} overlaps an already removed loop - skipping",
                    next.start, next.end,
                );
            }
        }

        if !fill_loop(path, first.start, first.midpoint, end) {
            warn!("Loop at points {}..{} covers the whole path - skipping", first.start, end);
            continue;
        }

        debug_assert!(MatchedPath::check_contiguity(path.edges()).is_ok());
        for span in group {
            info!(
                "Removed loop over {} at points {}..{} ({:.1} m)",
                span.names.join(", "),
                span.start,
                span.end,
                span.length,
            );
            collapsed.push(span.clone());
        }
    }

    collapsed
}

/// Replaces `path[start..end]` with the edges around it, switching
/// from the preceding to the following edge at `midpoint`.
/// Returns false if there are no edges around the range.
fn fill_loop(path: &mut MatchedPath, start: usize, midpoint: usize, end: usize) -> bool {
    let before = start.checked_sub(1).and_then(|i| path.get(i));
    let after = path.get(end);

    match (before, after) {
        (Some(before), Some(after)) => {
            path.fill(start..midpoint, before);
            path.fill(midpoint..end, after);
        }
        (Some(before), None) => path.fill(start..end, before),
        (None, Some(after)) => path.fill(start..end, after),
        (None, None) => return false,
    }
    true
}

/// Detects loops in the path, asks the [Decider] which of them are matching errors,
/// and collapses the selected ones. Returns the collapsed spans.
pub fn correct_loops(
    g: &RoadGraph,
    path: &mut MatchedPath,
    default_name: &str,
    decider: &dyn Decider,
) -> Result<Vec<LoopSpan>, Error> {
    let spans = detect_loops(g, path, default_name)?;
    if spans.is_empty() {
        return Ok(Vec::default());
    }

    for span in &spans {
        warn!(
            "Loop detected between nodes {} and {} at points {}..{} over {} ({:.1} m)",
            span.start_node,
            span.end_node,
            span.start,
            span.end,
            span.names.join(", "),
            span.length,
        );
    }

    let selected: Vec<LoopSpan> = decider
        .confirm_loop_removal(&spans)?
        .into_iter()
        .filter_map(|idx| {
            let span = spans.get(idx).cloned();
            if span.is_none() {
                warn!("Ignoring selection of non-existing loop {}", idx);
            }
            span
        })
        .collect();

    Ok(collapse_loops(path, &selected))
}
