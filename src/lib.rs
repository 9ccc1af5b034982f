// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Turn-by-turn intersection events from map-matched GPS traces.
//!
//! Given a [RoadGraph] and a [MatchedPath] (the graph edge every trace point was
//! matched to), turnsign walks the path and reports, for every traversed intersection,
//! the road names reachable to the left, straight ahead and to the right, together with
//! the exit which was actually taken. On the way it can collapse map-matching loops
//! ([correct_loops]), hide spurious exits at divided roads ([DividedRoadConfig]),
//! name slip roads after the road they lead to ([LinkResolver]) and snap the original
//! trace onto the matched path ([snap_trace]).
//!
//! # Example
//!
//! ```no_run
//! let mut g = turnsign::RoadGraph::new();
//! turnsign::osm::add_features_from_file(&mut g, "path/to/map.osm.gz")
//!     .expect("failed to load map");
//!
//! let file = std::io::BufReader::new(std::fs::File::open("path/to/trace.path").unwrap());
//! let mut path = turnsign::MatchedPath::from_reader(file).expect("failed to load path");
//!
//! let decider = turnsign::NonInteractive::default();
//! turnsign::correct_loops(&g, &mut path, "Unnamed Road", &decider).unwrap();
//!
//! let directions = turnsign::describe_path(&g, &path, &turnsign::DEFAULT_OPTIONS, &decider)
//!     .expect("failed to analyze path");
//!
//! for e in directions.events.iter().filter(|e| e.is_intersection()) {
//!     println!("{}: turn {} from {}", e.index, e.exit, e.current);
//! }
//! ```

mod analysis;
mod decide;
pub mod distance;
mod error;
pub mod gpx;
mod graph;
mod loops;
pub mod osm;
mod path;
mod snap;
mod way;
mod xml;

pub use analysis::{
    describe_path, Diagnostic, DirectionEvent, Directions, DividedCase, DividedRoadConfig,
    DividedRoadParams, ExitDirection, LinkResolver, Options, DEFAULT_OPTIONS,
    LINK_NAME_PLACEHOLDER,
};
pub use decide::{AmbiguityPolicy, Decider, ExitOption, NonInteractive};
pub use distance::earth_distance;
pub use error::Error;
pub use gpx::TracePoint;
pub use graph::RoadGraph;
pub use loops::{collapse_loops, correct_loops, detect_loops, LoopSpan};
pub use path::{EdgeKey, EdgeRun, MatchedPath};
pub use snap::{project_onto_segment, snap_trace, SnapReport};
pub use way::{
    highway_priority, AllowAll, ExitFilter, HighwayFilter, HighwayPriority, Oneway, WayTags,
    DEFAULT_HIGHWAY_PRIORITY, VEHICLE_EXIT_FILTER,
};
pub use xml::FileFormat;

/// Represents a junction or a shape point of the [RoadGraph].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    pub const fn new(id: i64, lat: f64, lon: f64) -> Self {
        Self { id, lat, lon }
    }
}
