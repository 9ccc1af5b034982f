// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

/// Direction(s) in which a way may be traversed, relative to the order of its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oneway {
    /// Only in the direction of the way's nodes.
    Forward,

    /// Only against the direction of the way's nodes.
    Backward,

    /// In both directions.
    #[default]
    Both,
}

impl Oneway {
    /// Returns whether edges following the node order (first value)
    /// and against it (second value) should exist.
    pub fn directions(self) -> (bool, bool) {
        match self {
            Self::Forward => (true, false),
            Self::Backward => (false, true),
            Self::Both => (true, true),
        }
    }
}

/// Subset of way tags used when describing intersections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WayTags {
    /// Value of the `name` tag, if present and not empty.
    pub name: Option<String>,

    /// Value of the `highway` tag, e.g. "primary" or "motorway_link".
    /// Empty for ways without the tag.
    pub highway: String,

    /// Traversal restriction of the way.
    pub oneway: Oneway,
}

impl WayTags {
    /// Creates tags for a way with the provided name and highway class, traversable both ways.
    pub fn new(name: Option<&str>, highway: &str) -> Self {
        Self {
            name: name.map(str::to_string),
            highway: highway.to_string(),
            oneway: Oneway::Both,
        }
    }

    /// Returns a copy of the tags with a different [Oneway] restriction.
    pub fn with_oneway(mut self, oneway: Oneway) -> Self {
        self.oneway = oneway;
        self
    }

    /// Interprets raw OSM way tags.
    ///
    /// `highway=motorway`, `highway=motorway_link`, `junction=roundabout` and
    /// `junction=circular` default to being one-way, unless overridden by the `oneway` tag.
    pub fn from_osm(tags: &HashMap<String, String>) -> Self {
        let highway = tags.get("highway").cloned().unwrap_or_default();
        let name = tags.get("name").filter(|n| !n.is_empty()).cloned();

        let mut oneway = match highway.as_str() {
            "motorway" | "motorway_link" => Oneway::Forward,
            _ => Oneway::Both,
        };

        match tags.get("junction").map(|s| s.as_str()).unwrap_or("") {
            "roundabout" | "circular" => oneway = Oneway::Forward,
            _ => {}
        }

        match tags.get("oneway").map(|s| s.as_str()).unwrap_or("") {
            "yes" | "true" | "1" => oneway = Oneway::Forward,
            "-1" | "reverse" => oneway = Oneway::Backward,
            "no" => oneway = Oneway::Both,
            _ => {}
        }

        Self {
            name,
            highway,
            oneway,
        }
    }

    /// Returns true for ramps and connectors (`highway=*_link`).
    pub fn is_link(&self) -> bool {
        self.highway.ends_with("_link")
    }

    /// Returns the name of the way, falling back to `default` for unnamed ways.
    pub fn display_name<'a>(&'a self, default: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(default)
    }
}

/// Decides whether a way may be offered as an alternative at an intersection.
///
/// The exit actually taken by the path is always considered, regardless of the filter.
pub trait ExitFilter {
    fn admits(&self, way: &WayTags) -> bool;
}

impl<F: Fn(&WayTags) -> bool> ExitFilter for F {
    fn admits(&self, way: &WayTags) -> bool {
        self(way)
    }
}

/// [ExitFilter] admitting every way.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ExitFilter for AllowAll {
    fn admits(&self, _: &WayTags) -> bool {
        true
    }
}

/// [ExitFilter] rejecting ways with specific `highway` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighwayFilter<'a> {
    pub excluded: &'a [&'a str],
}

impl<'a> ExitFilter for HighwayFilter<'a> {
    fn admits(&self, way: &WayTags) -> bool {
        !self.excluded.contains(&way.highway.as_str())
    }
}

/// Example [HighwayFilter] for motor vehicles, hiding ways
/// which would never be offered as an alternative to a driver.
pub const VEHICLE_EXIT_FILTER: HighwayFilter = HighwayFilter {
    excluded: &[
        "footway",
        "path",
        "steps",
        "pedestrian",
        "cycleway",
        "bridleway",
        "corridor",
        "platform",
        "construction",
        "proposed",
    ],
};

/// Preference of a `highway` class when picking the left or right alternative.
/// Classes absent from the table have priority 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighwayPriority<'a> {
    pub highway: &'a str,
    pub priority: i32,
}

/// Looks up the priority of a highway class in a priority table.
pub fn highway_priority(table: &[HighwayPriority<'_>], highway: &str) -> i32 {
    table
        .iter()
        .find_map(|p| {
            if p.highway == highway {
                Some(p.priority)
            } else {
                None
            }
        })
        .unwrap_or(0)
}

/// Example priority table, preferring major roads over minor ones.
pub const DEFAULT_HIGHWAY_PRIORITY: &[HighwayPriority<'static>] = &[
    HighwayPriority {
        highway: "motorway",
        priority: 6,
    },
    HighwayPriority {
        highway: "trunk",
        priority: 5,
    },
    HighwayPriority {
        highway: "primary",
        priority: 4,
    },
    HighwayPriority {
        highway: "secondary",
        priority: 3,
    },
    HighwayPriority {
        highway: "tertiary",
        priority: 2,
    },
    HighwayPriority {
        highway: "unclassified",
        priority: 1,
    },
    HighwayPriority {
        highway: "residential",
        priority: 1,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! tags {
        {} => { HashMap::default() };
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    #[test]
    fn from_osm_oneway() {
        assert_eq!(
            WayTags::from_osm(&tags! {"highway": "primary"}).oneway,
            Oneway::Both,
        );
        assert_eq!(
            WayTags::from_osm(&tags! {"highway": "primary", "oneway": "yes"}).oneway,
            Oneway::Forward,
        );
        assert_eq!(
            WayTags::from_osm(&tags! {"highway": "primary", "oneway": "-1"}).oneway,
            Oneway::Backward,
        );
        assert_eq!(
            WayTags::from_osm(&tags! {"highway": "motorway_link"}).oneway,
            Oneway::Forward,
        );
        assert_eq!(
            WayTags::from_osm(&tags! {"highway": "motorway_link", "oneway": "no"}).oneway,
            Oneway::Both,
        );
        assert_eq!(
            WayTags::from_osm(&tags! {"highway": "tertiary", "junction": "roundabout"}).oneway,
            Oneway::Forward,
        );
    }

    #[test]
    fn from_osm_name() {
        let way = WayTags::from_osm(&tags! {"highway": "residential", "name": "Elm Street"});
        assert_eq!(way.name.as_deref(), Some("Elm Street"));
        assert_eq!(way.display_name("Unnamed Road"), "Elm Street");

        let way = WayTags::from_osm(&tags! {"highway": "residential", "name": ""});
        assert_eq!(way.name, None);
        assert_eq!(way.display_name("Unnamed Road"), "Unnamed Road");

        assert_eq!(WayTags::from_osm(&tags! {}).highway, "");
    }

    #[test]
    fn is_link() {
        assert!(WayTags::new(None, "motorway_link").is_link());
        assert!(WayTags::new(None, "primary_link").is_link());
        assert!(!WayTags::new(None, "primary").is_link());
    }

    #[test]
    fn exit_filters() {
        let footway = WayTags::new(None, "footway");
        let primary = WayTags::new(Some("Main Street"), "primary");

        assert!(AllowAll.admits(&footway));
        assert!(!VEHICLE_EXIT_FILTER.admits(&footway));
        assert!(VEHICLE_EXIT_FILTER.admits(&primary));

        let named_only = |w: &WayTags| w.name.is_some();
        assert!(!named_only.admits(&footway));
        assert!(named_only.admits(&primary));
    }

    #[test]
    fn priority_lookup() {
        assert_eq!(highway_priority(DEFAULT_HIGHWAY_PRIORITY, "primary"), 4);
        assert_eq!(highway_priority(DEFAULT_HIGHWAY_PRIORITY, "service"), 0);
        assert_eq!(highway_priority(&[], "primary"), 0);
    }
}
