// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use log::info;

use crate::distance::earth_distance;
use crate::{Error, MatchedPath, Node, RoadGraph, TracePoint};

/// Summary of the changes made by [snap_trace].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnapReport {
    /// Number of points whose position changed.
    pub moved: usize,

    /// Largest distance between a point and its snapped position, in meters.
    pub max_offset: f64,

    /// Average distance between points and their snapped positions, in meters.
    pub mean_offset: f64,
}

/// Finds the point on the segment `a`-`b` closest to the provided position,
/// returning its latitude and longitude.
///
/// Longitudes are scaled by the cosine of the position's latitude,
/// and the projection is done on a plane.
pub fn project_onto_segment(lat: f64, lon: f64, a: &Node, b: &Node) -> (f64, f64) {
    let scale = lat.to_radians().cos();
    let dx = (b.lon - a.lon) * scale;
    let dy = b.lat - a.lat;
    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return (a.lat, a.lon);
    }

    let px = (lon - a.lon) * scale;
    let py = lat - a.lat;
    let t = ((px * dx + py * dy) / length_squared).clamp(0.0, 1.0);
    (a.lat + t * (b.lat - a.lat), a.lon + t * (b.lon - a.lon))
}

/// Moves every trace point onto the closest segment among `2 * window + 1`
/// distinct path edges, centered on the edge the point was matched to
/// (and shifted inwards near the ends of the path).
///
/// The trace must be index-aligned with the path. On error, the trace is left untouched.
pub fn snap_trace(
    g: &RoadGraph,
    path: &MatchedPath,
    trace: &mut [TracePoint],
    window: usize,
) -> Result<SnapReport, Error> {
    if trace.len() != path.len() {
        return Err(Error::TraceLengthMismatch {
            trace: trace.len(),
            path: path.len(),
        });
    }

    let runs = path.runs();
    let required = 2 * window + 1;
    if runs.len() < required {
        return Err(Error::SnapWindowUnderflow {
            required,
            available: runs.len(),
        });
    }

    let segments = runs
        .iter()
        .map(|run| Ok((g.node(run.edge.from)?, g.node(run.edge.to)?)))
        .collect::<Result<Vec<(Node, Node)>, Error>>()?;

    let mut report = SnapReport::default();
    let mut total_offset = 0.0;

    for (r, run) in runs.iter().enumerate() {
        let first = r.saturating_sub(window).min(runs.len() - required);
        let candidates = &segments[first..first + required];

        for point in &mut trace[run.range()] {
            let closest = candidates
                .iter()
                .map(|(a, b)| {
                    let (lat, lon) = project_onto_segment(point.lat, point.lon, a, b);
                    (earth_distance(point.lat, point.lon, lat, lon), lat, lon)
                })
                .min_by(|x, y| x.0.total_cmp(&y.0));

            if let Some((offset, lat, lon)) = closest {
                if lat != point.lat || lon != point.lon {
                    report.moved += 1;
                }
                report.max_offset = report.max_offset.max(offset);
                total_offset += offset;
                point.lat = lat;
                point.lon = lon;
            }
        }
    }

    if !trace.is_empty() {
        report.mean_offset = total_offset / trace.len() as f64;
    }

    info!(
        "Snapped {} of {} points (max offset {:.1} m, mean {:.1} m)",
        report.moved,
        trace.len(),
        report.max_offset,
        report.mean_offset,
    );
    Ok(report)
}
