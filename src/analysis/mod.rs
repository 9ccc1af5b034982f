// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fmt;

use crate::distance::bearing;
use crate::way::{AllowAll, ExitFilter, HighwayPriority};
use crate::{EdgeKey, Error, Node, RoadGraph};

mod divided;
mod intersection;
mod link;

pub use divided::{DividedCase, DividedRoadConfig, DividedRoadParams};
pub use intersection::describe_path;
pub use link::{LinkResolver, LINK_NAME_PLACEHOLDER};

/// Which of the alternatives at an intersection was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitDirection {
    /// Not an intersection - the event only marks a change of the road name.
    #[default]
    None,
    Left,
    Forward,
    Right,
}

impl fmt::Display for ExitDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Left => write!(f, "left"),
            Self::Forward => write!(f, "forward"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Describes what happened at a single point of the trace.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectionEvent {
    /// Index of the trace point (and matched path entry) the event applies to.
    pub index: usize,

    /// The intersection node.
    pub node: i64,

    /// Name of the road followed after this event.
    pub current: String,

    /// Name of the road offered on the left, empty if none.
    pub left: String,

    /// Name of the road offered straight ahead, empty if none.
    pub forward: String,

    /// Name of the road offered on the right, empty if none.
    pub right: String,

    /// Which alternative was taken.
    pub exit: ExitDirection,
}

impl DirectionEvent {
    /// Creates an event which only marks a change of the road name.
    pub fn name_change(index: usize, node: i64, current: String) -> Self {
        Self {
            index,
            node,
            current,
            ..Self::default()
        }
    }

    /// Returns true if the event describes an intersection, not only a name change.
    pub fn is_intersection(&self) -> bool {
        self.exit != ExitDirection::None
    }
}

/// Recoverable problem found while describing a path.
/// Diagnostics are also emitted as log warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// No exit of the node was eligible; the node was left undescribed.
    NoAdmissibleExits { index: usize, node: i64 },

    /// The path turns back to the node it came from (possibly a U-turn).
    LoopBack { index: usize, node: i64 },

    /// A carriageway merge pattern was found, but the node branches
    /// in unexpected ways. The exit was not suppressed.
    DegenerateMerge { index: usize, node: i64, exit: i64 },
}

/// Result of [describe_path].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Directions {
    /// Events ordered by [DirectionEvent::index].
    pub events: Vec<DirectionEvent>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Controls how intersections are described.
#[derive(Clone, Copy)]
pub struct Options<'a> {
    /// Which ways may be offered as alternatives at intersections.
    pub exit_filter: &'a dyn ExitFilter,

    /// Name used for ways without a `name` tag.
    pub default_name: &'a str,

    /// Maximum angle (in degrees) between the straightest exit and the incoming heading
    /// for the exit to be considered "forward" rather than a turn.
    pub forward_angle: f64,

    /// Preference of highway classes when picking the left and right alternatives.
    pub highway_priority: &'a [HighwayPriority<'a>],

    /// Template for naming unnamed link roads after their destination,
    /// with [LINK_NAME_PLACEHOLDER] replaced by the destination name.
    /// `None` disables link following.
    pub link_template: Option<&'a str>,

    /// Divided road heuristics, `None` to disable.
    pub divided: Option<DividedRoadConfig<'a>>,
}

impl<'a> Options<'a> {
    /// Checks that all thresholds are usable.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.forward_angle.is_finite() || !(0.0..=180.0).contains(&self.forward_angle) {
            return Err(Error::MalformedConfig(format!(
                "forward angle must be within [0, 180], got {}",
                self.forward_angle
            )));
        }

        if let Some(template) = self.link_template {
            if !template.contains(LINK_NAME_PLACEHOLDER) {
                log::warn!(
                    "Link name template {:?} doesn't contain {} - all links will get the same name",
                    template,
                    LINK_NAME_PLACEHOLDER,
                );
            }
        }

        match self.divided {
            Some(ref divided) => divided.validate(),
            None => Ok(()),
        }
    }
}

impl<'a> fmt::Debug for Options<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("default_name", &self.default_name)
            .field("forward_angle", &self.forward_angle)
            .field("highway_priority", &self.highway_priority)
            .field("link_template", &self.link_template)
            .field("divided", &self.divided)
            .finish_non_exhaustive()
    }
}

/// Sensible [Options]: every exit is admitted, all highway classes have
/// the same priority, links are followed, divided road heuristics are disabled.
pub const DEFAULT_OPTIONS: Options<'static> = Options {
    exit_filter: &AllowAll,
    default_name: "Unnamed Road",
    forward_angle: 45.0,
    highway_priority: &[],
    link_template: Some(LINK_NAME_PLACEHOLDER),
    divided: None,
};

/// State of the walk through a single path node: where it came from,
/// where it goes, and the heading on arrival.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Traversal {
    /// Index of the path entry leaving `node`.
    pub index: usize,
    pub prev: Node,
    pub node: Node,
    pub next: i64,
    pub incoming_way: Option<i64>,

    /// Bearing from `prev` to `node`.
    pub origin: f64,
}

impl Traversal {
    pub fn new(
        g: &RoadGraph,
        index: usize,
        incoming: EdgeKey,
        outgoing: EdgeKey,
    ) -> Result<Self, Error> {
        debug_assert_eq!(incoming.to, outgoing.from);
        let prev = g.node(incoming.from)?;
        let node = g.node(outgoing.from)?;
        Ok(Self {
            index,
            prev,
            node,
            next: outgoing.to,
            incoming_way: g.way_id(incoming),
            origin: bearing(&prev, &node),
        })
    }

    pub fn incoming(&self) -> EdgeKey {
        EdgeKey::new(self.prev.id, self.node.id)
    }

    pub fn outgoing(&self) -> EdgeKey {
        EdgeKey::new(self.node.id, self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchedPath;

    pub(super) fn path_through(nodes: &[i64]) -> MatchedPath {
        MatchedPath::new(
            nodes
                .windows(2)
                .map(|pair| EdgeKey::new(pair[0], pair[1]))
                .collect(),
        )
        .unwrap()
    }

    pub(super) fn event(
        index: usize,
        node: i64,
        current: &str,
        left: &str,
        forward: &str,
        right: &str,
        exit: ExitDirection,
    ) -> DirectionEvent {
        DirectionEvent {
            index,
            node,
            current: current.to_string(),
            left: left.to_string(),
            forward: forward.to_string(),
            right: right.to_string(),
            exit,
        }
    }

    #[test]
    fn exit_direction_display() {
        assert_eq!(ExitDirection::None.to_string(), "none");
        assert_eq!(ExitDirection::Left.to_string(), "left");
        assert_eq!(ExitDirection::Forward.to_string(), "forward");
        assert_eq!(ExitDirection::Right.to_string(), "right");
    }

    #[test]
    fn name_change_event() {
        let e = DirectionEvent::name_change(3, 42, "Elm Street".to_string());
        assert_eq!(e, event(3, 42, "Elm Street", "", "", "", ExitDirection::None));
        assert!(!e.is_intersection());
    }

    #[test]
    fn options_validation() {
        assert!(DEFAULT_OPTIONS.validate().is_ok());

        for forward_angle in [-1.0, 180.5, f64::NAN] {
            let options = Options {
                forward_angle,
                ..DEFAULT_OPTIONS
            };
            assert!(matches!(options.validate(), Err(Error::MalformedConfig(_))));
        }

        let options = Options {
            divided: Some(DividedRoadConfig {
                length: -5.0,
                angle: 30.0,
                same_name: false,
                apply_filter: false,
                cases: &[DividedCase::ShortSpur],
            }),
            ..DEFAULT_OPTIONS
        };
        assert!(matches!(options.validate(), Err(Error::MalformedConfig(_))));
    }
}
