// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fmt;
use std::io;
use std::ops::Range;

use crate::Error;

/// Directed edge of a [RoadGraph](crate::RoadGraph), identified by its end nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub from: i64,
    pub to: i64,
}

impl EdgeKey {
    pub const fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// Returns the same edge traversed in the opposite direction.
    pub const fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }

    /// Checks if both edges connect the same pair of nodes, regardless of direction.
    pub fn same_segment(self, other: Self) -> bool {
        self == other || self == other.reversed()
    }

    /// Checks if both edges connect the same pair of nodes in opposite directions.
    pub fn mirrors(self, other: Self) -> bool {
        self.from != self.to && self == other.reversed()
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} -> {})", self.from, self.to)
    }
}

/// Maximal range of consecutive [MatchedPath] entries with the same edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRun {
    pub edge: EdgeKey,
    pub start: usize,
    pub end: usize,
}

impl EdgeRun {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Sequence of directed edges, index-aligned with the points of a GPS trace:
/// entry `i` is the edge on which point `i` was matched.
///
/// Consecutive entries are either equal, or connected (`e[i].to == e[i + 1].from`).
/// This invariant is checked on construction and preserved by all mutations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchedPath(Vec<EdgeKey>);

impl MatchedPath {
    /// Wraps a sequence of edges, returning [Error::PathDiscontinuity]
    /// if the contiguity invariant doesn't hold.
    pub fn new(edges: Vec<EdgeKey>) -> Result<Self, Error> {
        Self::check_contiguity(&edges)?;
        Ok(Self(edges))
    }

    /// Checks that consecutive edges are equal or connected.
    pub fn check_contiguity(edges: &[EdgeKey]) -> Result<(), Error> {
        match edges
            .windows(2)
            .position(|pair| pair[0] != pair[1] && pair[0].to != pair[1].from)
        {
            Some(i) => Err(Error::PathDiscontinuity {
                index: i + 1,
                prev: edges[i],
                next: edges[i + 1],
            }),
            None => Ok(()),
        }
    }

    /// Parses a matched path from a text stream.
    ///
    /// Every non-empty line must contain two node ids separated by whitespace,
    /// the start and end of the edge on which the corresponding trace point was matched.
    /// Text after `#` is ignored.
    pub fn from_reader<R: io::BufRead>(reader: R) -> Result<Self, Error> {
        let mut edges = Vec::default();

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            let malformed = |reason: &str| Error::MalformedPath {
                line: line_idx + 1,
                reason: reason.to_string(),
            };

            let mut fields = content.split_whitespace();
            let from = fields
                .next()
                .and_then(|f| f.parse::<i64>().ok())
                .ok_or_else(|| malformed("invalid start node"))?;
            let to = fields
                .next()
                .and_then(|f| f.parse::<i64>().ok())
                .ok_or_else(|| malformed("invalid end node"))?;
            if fields.next().is_some() {
                return Err(malformed("expected exactly two node ids"));
            }

            edges.push(EdgeKey::new(from, to));
        }

        Self::new(edges)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn edges(&self) -> &[EdgeKey] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<EdgeKey> {
        self.0.get(index).copied()
    }

    /// Returns the ids of all traversed nodes, without repetitions
    /// caused by multiple points on the same edge.
    pub fn nodes(&self) -> Vec<i64> {
        let mut nodes = Vec::default();
        if let Some(first) = self.0.first() {
            nodes.push(first.from);
        }
        nodes.extend(self.runs().iter().map(|r| r.edge.to));
        nodes
    }

    /// Collapses the path into [EdgeRuns](EdgeRun).
    pub fn runs(&self) -> Vec<EdgeRun> {
        let mut runs: Vec<EdgeRun> = Vec::default();
        for (i, &edge) in self.0.iter().enumerate() {
            match runs.last_mut() {
                Some(run) if run.edge == edge => run.end = i + 1,
                _ => runs.push(EdgeRun {
                    edge,
                    start: i,
                    end: i + 1,
                }),
            }
        }
        runs
    }

    /// Overwrites a range of entries with a single edge.
    /// The caller must restore contiguity once all fills are done.
    pub(crate) fn fill(&mut self, range: Range<usize>, edge: EdgeKey) {
        self.0[range].fill(edge);
    }
}

impl std::ops::Index<usize> for MatchedPath {
    type Output = EdgeKey;

    fn index(&self, index: usize) -> &EdgeKey {
        &self.0[index]
    }
}
