// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use log::{debug, info, warn};

use super::{DirectionEvent, Diagnostic, ExitDirection, Options, Traversal};
use crate::distance::{bearing, node_distance, reciprocal_deviation, relative_angle};
use crate::{EdgeKey, Error, MatchedPath, RoadGraph};

/// Heuristic recognizing an artifact of roads mapped as two separate one-way carriageways.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DividedCase {
    /// 1: short connector from one carriageway to the other, offered
    /// as an exit right before the opposite carriageway is reached.
    ShortSpur,

    /// 2: the opposite carriageway of the road just turned from,
    /// offered at the second half of a turn across a divided road.
    ReciprocalTurn,

    /// 3: a turn onto a divided road, performed at its far carriageway,
    /// where the graph shows no intersection at all.
    HiddenTurn,

    /// 4: the opposite carriageway offered at the node where
    /// the carriageways merge into a single road.
    MergeBack {
        /// Only suppress the exit if it also reverses the incoming heading
        /// within [DividedRoadConfig::angle].
        angle_guard: bool,
    },
}

impl DividedCase {
    /// Maps the numeric case id (1 to 4) to a case.
    pub fn from_id(id: u8) -> Result<Self, Error> {
        match id {
            1 => Ok(Self::ShortSpur),
            2 => Ok(Self::ReciprocalTurn),
            3 => Ok(Self::HiddenTurn),
            4 => Ok(Self::MergeBack { angle_guard: false }),
            _ => Err(Error::UnsupportedDividedRoadCase(id)),
        }
    }

    /// Returns the numeric id of the case.
    pub fn id(&self) -> u8 {
        match self {
            Self::ShortSpur => 1,
            Self::ReciprocalTurn => 2,
            Self::HiddenTurn => 3,
            Self::MergeBack { .. } => 4,
        }
    }
}

/// Thresholds and enabled cases of the divided road heuristics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DividedRoadConfig<'a> {
    /// Maximum length (in meters) of connectors and carriageway separation.
    pub length: f64,

    /// Maximum deviation (in degrees) from an exact reversal of the heading.
    pub angle: f64,

    /// Require the carriageways to share the same name.
    pub same_name: bool,

    /// Apply [Options::exit_filter] when walking connectors and looking for carriageways.
    pub apply_filter: bool,

    /// Enabled heuristics. Evaluation order doesn't depend on the order of this slice.
    pub cases: &'a [DividedCase],
}

impl<'a> DividedRoadConfig<'a> {
    pub fn validate(&self) -> Result<(), Error> {
        if !self.length.is_finite() || self.length < 0.0 {
            return Err(Error::MalformedConfig(format!(
                "divided road length must be a non-negative number, got {}",
                self.length
            )));
        }

        if !self.angle.is_finite() || !(0.0..=180.0).contains(&self.angle) {
            return Err(Error::MalformedConfig(format!(
                "divided road angle must be within [0, 180], got {}",
                self.angle
            )));
        }

        Ok(())
    }

    /// Returns the enabled case with the provided id, if any.
    pub fn case(&self, id: u8) -> Option<DividedCase> {
        self.cases.iter().copied().find(|c| c.id() == id)
    }
}

/// Loosely specified divided road thresholds (as they come from the command line),
/// turned into a [DividedRoadConfig] once the enabled cases are known.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DividedRoadParams {
    pub length: Option<f64>,
    pub angle: Option<f64>,
    pub same_name: bool,
    pub apply_filter: bool,
}

impl DividedRoadParams {
    /// Creates a [DividedRoadConfig], returning `None` if no cases are enabled.
    ///
    /// Fails with [Error::MalformedConfig] if any case is enabled,
    /// but the length or angle threshold is missing or invalid.
    pub fn build<'a>(
        &self,
        cases: &'a [DividedCase],
    ) -> Result<Option<DividedRoadConfig<'a>>, Error> {
        if cases.is_empty() {
            return Ok(None);
        }

        let length = self.length.ok_or_else(|| {
            Error::MalformedConfig("divided road heuristics require a length threshold".into())
        })?;
        let angle = self.angle.ok_or_else(|| {
            Error::MalformedConfig("divided road heuristics require an angle threshold".into())
        })?;

        let config = DividedRoadConfig {
            length,
            angle,
            same_name: self.same_name,
            apply_filter: self.apply_filter,
            cases,
        };
        config.validate()?;
        Ok(Some(config))
    }
}

/// Evaluates the divided road heuristics against a single path.
pub(super) struct Heuristics<'a> {
    pub g: &'a RoadGraph,
    pub path: &'a MatchedPath,
    pub options: &'a Options<'a>,
    pub config: &'a DividedRoadConfig<'a>,
}

impl<'a> Heuristics<'a> {
    fn name(&self, edge: EdgeKey) -> Result<&'a str, Error> {
        Ok(self.g.way_of(edge)?.display_name(self.options.default_name))
    }

    fn admits(&self, edge: EdgeKey) -> bool {
        !self.config.apply_filter
            || self
                .g
                .way(edge)
                .is_some_and(|w| self.options.exit_filter.admits(w))
    }

    /// Checks whether a non-taken exit from `ctx.node` should be hidden.
    /// Cases are evaluated in order of their ids; the first match wins.
    pub fn suppresses(
        &self,
        ctx: &Traversal,
        exit: i64,
        events: &[DirectionEvent],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<bool, Error> {
        if self.config.case(1).is_some() && self.short_spur(ctx, exit)? {
            return Ok(true);
        }

        if self.config.case(2).is_some() && self.reciprocal_turn(ctx, exit, events)? {
            return Ok(true);
        }

        if let Some(DividedCase::MergeBack { angle_guard }) = self.config.case(4) {
            if self.merge_back(ctx, exit, angle_guard, diagnostics)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Case 1: walks from the exit along nodes with a single onward edge,
    /// looking for an edge reversing the incoming heading before
    /// the walked distance exceeds the length threshold.
    fn short_spur(&self, ctx: &Traversal, exit: i64) -> Result<bool, Error> {
        let incoming_name = self.name(ctx.incoming())?;
        let mut visited = vec![ctx.node.id];
        let mut from = ctx.node;
        let mut to = self.g.node(exit)?;
        let mut distance = node_distance(&from, &to);

        while distance <= self.config.length {
            let onward: Vec<i64> = self
                .g
                .neighbors(to.id)
                .filter(|n| !visited.contains(n))
                .filter(|&n| self.admits(EdgeKey::new(to.id, n)))
                .collect();
            let &[next] = onward.as_slice() else {
                break;
            };

            visited.push(to.id);
            from = to;
            to = self.g.node(next)?;

            let deviation = reciprocal_deviation(bearing(&from, &to), ctx.origin);
            if deviation <= self.config.angle
                && (!self.config.same_name || self.name(EdgeKey::new(from.id, to.id))? == incoming_name)
            {
                info!(
                    "Divided road: hiding spur {} -> {} at point {} (deviation {:.1}°, length {:.1} m)",
                    ctx.node.id, exit, ctx.index, deviation, distance,
                );
                return Ok(true);
            }

            distance += node_distance(&from, &to);
        }

        Ok(false)
    }

    /// Case 2: hides the opposite carriageway of the road from which the path
    /// turned at the previous intersection, if that intersection is close enough.
    fn reciprocal_turn(
        &self,
        ctx: &Traversal,
        exit: i64,
        events: &[DirectionEvent],
    ) -> Result<bool, Error> {
        let Some(last) = events.last() else {
            return Ok(false);
        };
        if last.index == 0 {
            return Ok(false);
        }

        let q = self.g.node(last.node)?;
        let q_prev = self.g.node(self.path[last.index - 1].from)?;
        let candidate = EdgeKey::new(ctx.node.id, exit);

        if self.config.same_name
            && self.name(EdgeKey::new(q_prev.id, q.id))? != self.name(candidate)?
        {
            return Ok(false);
        }

        let deviation =
            reciprocal_deviation(bearing(&ctx.node, &self.g.node(exit)?), bearing(&q_prev, &q));
        if deviation > self.config.angle || node_distance(&ctx.node, &q) > self.config.length {
            return Ok(false);
        }

        let mut distance = 0.0;
        let mut reached = q;
        for edge in &self.path.edges()[last.index..ctx.index] {
            if edge.to != reached.id {
                let to = self.g.node(edge.to)?;
                distance += node_distance(&reached, &to);
                if distance > self.config.length {
                    return Ok(false);
                }
                reached = to;
            }

            if reached.id == ctx.node.id {
                info!(
                    "Divided road: hiding opposite carriageway {} -> {} at point {} (deviation {:.1}°, distance {:.1} m)",
                    ctx.node.id, exit, ctx.index, deviation, distance,
                );
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Case 4: at a node where two one-way carriageways merge into
    /// a two-way road, hides the carriageway leading back.
    fn merge_back(
        &self,
        ctx: &Traversal,
        exit: i64,
        angle_guard: bool,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<bool, Error> {
        let n = ctx.node;
        let taken_two_way = self.g.has_edge(ctx.next, n.id);
        let incoming_one_way = !self.g.has_edge(n.id, ctx.prev.id);
        let candidate_one_way = !self.g.has_edge(exit, n.id);
        if !taken_two_way || !incoming_one_way || !candidate_one_way {
            return Ok(false);
        }

        let dest = self.g.node(exit)?;
        if node_distance(&ctx.prev, &dest) > self.config.length
            || node_distance(&n, &dest) > self.config.length
        {
            return Ok(false);
        }

        let deviation = reciprocal_deviation(bearing(&n, &dest), ctx.origin);
        if deviation > self.config.angle {
            if angle_guard {
                debug!(
                    "Divided road: not hiding merge {} -> {} at point {}, deviation {:.1}° is too big",
                    n.id, exit, ctx.index, deviation,
                );
                return Ok(false);
            }
            debug!(
                "Divided road: merge {} -> {} at point {} deviates by {:.1}°, ignored without angle guard",
                n.id, exit, ctx.index, deviation,
            );
        }

        // Only the continuation and the opposite carriageway may leave a merge node
        if self.g.out_degree(n.id) != 2 {
            warn!(
                "Divided road: merge at node {} (point {}) has {} outgoing edges - not hiding {}",
                n.id,
                ctx.index,
                self.g.out_degree(n.id),
                exit,
            );
            diagnostics.push(Diagnostic::DegenerateMerge {
                index: ctx.index,
                node: n.id,
                exit,
            });
            return Ok(false);
        }

        info!(
            "Divided road: hiding merging carriageway {} -> {} at point {} (deviation {:.1}°)",
            n.id, exit, ctx.index, deviation,
        );
        Ok(true)
    }

    /// Case 3: at a node with a single exit, checks whether the path turned onto
    /// the far carriageway of a divided road shortly after the last intersection.
    /// Returns the synthesized turn event.
    ///
    /// `label` is the name announced for the taken exit, `current`
    /// the raw name of the road followed afterwards.
    pub fn hidden_turn(
        &self,
        ctx: &Traversal,
        events: &[DirectionEvent],
        label: &str,
        current: &str,
    ) -> Result<Option<DirectionEvent>, Error> {
        let Some(last) = events.iter().rev().find(|e| e.is_intersection()) else {
            return Ok(None);
        };
        if last.index == 0 {
            return Ok(None);
        }

        let q = self.g.node(last.node)?;
        let q_prev = self.path[last.index - 1].from;
        let q_next = self.path[last.index].to;

        let mut distance = 0.0;
        let mut counted: Option<EdgeKey> = None;
        for &edge in &self.path.edges()[last.index..ctx.index] {
            if counted != Some(edge) {
                distance += node_distance(&self.g.node(edge.from)?, &self.g.node(edge.to)?);
                counted = Some(edge);
            }
        }
        if distance > self.config.length {
            return Ok(None);
        }

        // The path must actually turn relative to the road it arrived on at Q
        let exit_heading = bearing(&ctx.node, &self.g.node(ctx.next)?);
        let turn = relative_angle(exit_heading, bearing(&self.g.node(q_prev)?, &q));
        if turn.abs() <= self.options.forward_angle {
            return Ok(None);
        }

        let mut best: Option<(f64, &str)> = None;

        for n in self.g.neighbors(q.id) {
            if n == q_prev || n == q_next {
                continue;
            }

            let edge = EdgeKey::new(q.id, n);
            if !self.admits(edge) {
                continue;
            }

            let name = self.name(edge)?;
            if self.config.same_name && name != current {
                continue;
            }

            let deviation = reciprocal_deviation(bearing(&q, &self.g.node(n)?), exit_heading);
            if deviation <= self.config.angle && best.map_or(true, |(d, _)| deviation < d) {
                best = Some((deviation, name));
            }
        }

        let Some((deviation, far_name)) = best else {
            return Ok(None);
        };

        let mut event = DirectionEvent {
            index: ctx.index,
            node: ctx.node.id,
            current: current.to_string(),
            ..DirectionEvent::default()
        };

        if turn < 0.0 {
            event.left = label.to_string();
            event.right = far_name.to_string();
            event.exit = ExitDirection::Left;
        } else {
            event.right = label.to_string();
            event.left = far_name.to_string();
            event.exit = ExitDirection::Right;
        }

        info!(
            "Divided road: turn {} onto {} at point {}, {:.1} m after node {} (deviation {:.1}°)",
            event.exit, current, ctx.index, distance, q.id, deviation,
        );
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::{event, path_through};
    use crate::{
        describe_path, Directions, HighwayFilter, NonInteractive, Node, Oneway, WayTags,
        DEFAULT_OPTIONS,
    };

    fn config(cases: &[DividedCase]) -> DividedRoadConfig<'_> {
        DividedRoadConfig {
            length: 50.0,
            angle: 30.0,
            same_name: false,
            apply_filter: false,
            cases,
        }
    }

    fn describe(g: &RoadGraph, nodes: &[i64], divided: Option<DividedRoadConfig>) -> Directions {
        let options = Options {
            divided,
            ..DEFAULT_OPTIONS
        };
        describe_with(g, nodes, &options)
    }

    fn describe_with(g: &RoadGraph, nodes: &[i64], options: &Options) -> Directions {
        describe_path(g, &path_through(nodes), options, &NonInteractive::default()).unwrap()
    }

    fn one_way(name: &str, highway: &str) -> WayTags {
        WayTags::new(Some(name), highway).with_oneway(Oneway::Forward)
    }

    #[test]
    fn case_ids() {
        for id in 1..=4 {
            assert_eq!(DividedCase::from_id(id).unwrap().id(), id);
        }
        assert!(matches!(
            DividedCase::from_id(5),
            Err(Error::UnsupportedDividedRoadCase(5))
        ));
        assert!(matches!(
            DividedCase::from_id(0),
            Err(Error::UnsupportedDividedRoadCase(0))
        ));
    }

    #[test]
    fn params_build() {
        let params = DividedRoadParams {
            length: Some(40.0),
            angle: Some(20.0),
            ..DividedRoadParams::default()
        };
        assert_eq!(params.build(&[]).unwrap(), None);

        let cases = [DividedCase::HiddenTurn];
        let config = params.build(&cases).unwrap().unwrap();
        assert_eq!(config.length, 40.0);
        assert_eq!(config.case(3), Some(DividedCase::HiddenTurn));
        assert_eq!(config.case(1), None);

        let missing = DividedRoadParams {
            length: None,
            ..params
        };
        assert!(matches!(missing.build(&cases), Err(Error::MalformedConfig(_))));

        let obtuse = DividedRoadParams {
            angle: Some(200.0),
            ..params
        };
        assert!(matches!(obtuse.build(&cases), Err(Error::MalformedConfig(_))));
    }

    /// Main Street 1-2-3 heading north, with Service Lane leaving 2 east to 4,
    /// then turning back south to 5.
    fn spur(spur_lon: f64) -> RoadGraph {
        let mut g = RoadGraph::new();
        g.set_node(Node::new(1, -0.001, 0.0));
        g.set_node(Node::new(2, 0.0, 0.0));
        g.set_node(Node::new(3, 0.001, 0.0));
        g.set_node(Node::new(4, 0.0, spur_lon));
        g.set_node(Node::new(5, -0.0004, spur_lon));
        g.add_way(10, &[1, 2, 3], WayTags::new(Some("Main Street"), "primary"));
        g.add_way(11, &[2, 4, 5], WayTags::new(Some("Service Lane"), "service"));
        g
    }

    #[test]
    fn short_spur_is_hidden() {
        let g = spur(0.0002);
        let cases = [DividedCase::ShortSpur];

        let d = describe(&g, &[1, 2, 3], Some(config(&cases)));
        assert_eq!(d.events.len(), 1);

        let d = describe(&g, &[1, 2, 3], None);
        assert_eq!(
            d.events[1],
            event(1, 2, "Main Street", "", "Main Street", "Service Lane", ExitDirection::Forward),
        );

        // Spur named differently than the incoming road
        let same_name = DividedRoadConfig {
            same_name: true,
            ..config(&cases)
        };
        let d = describe(&g, &[1, 2, 3], Some(same_name));
        assert_eq!(d.events.len(), 2);
    }

    #[test]
    fn long_spur_is_kept() {
        let g = spur(0.01);
        let cases = [DividedCase::ShortSpur];
        let d = describe(&g, &[1, 2, 3], Some(config(&cases)));
        assert_eq!(d.events.len(), 2);
        assert_eq!(d.events[1].right, "Service Lane");
    }

    #[test]
    fn spur_walk_honors_exit_filter() {
        // Service Lane turns back south as a footway
        let mut g = RoadGraph::new();
        g.set_node(Node::new(1, -0.001, 0.0));
        g.set_node(Node::new(2, 0.0, 0.0));
        g.set_node(Node::new(3, 0.001, 0.0));
        g.set_node(Node::new(4, 0.0, 0.0002));
        g.set_node(Node::new(5, -0.0004, 0.0002));
        g.add_way(10, &[1, 2, 3], WayTags::new(Some("Main Street"), "primary"));
        g.add_way(11, &[2, 4], WayTags::new(Some("Service Lane"), "service"));
        g.add_way(12, &[4, 5], WayTags::new(Some("Service Lane"), "footway"));

        let filter = HighwayFilter {
            excluded: &["footway"],
        };
        let cases = [DividedCase::ShortSpur];
        let mut options = Options {
            exit_filter: &filter,
            divided: Some(config(&cases)),
            ..DEFAULT_OPTIONS
        };
        assert_eq!(describe_with(&g, &[1, 2, 3], &options).events.len(), 1);

        options.divided = Some(DividedRoadConfig {
            apply_filter: true,
            ..config(&cases)
        });
        let d = describe_with(&g, &[1, 2, 3], &options);
        assert_eq!(d.events.len(), 2);
        assert_eq!(d.events[1].right, "Service Lane");
    }

    /// Main Street as two carriageways: 1-2-3-4 northbound and 5-6-7 southbound
    /// (named `southbound`), crossed by Elm Street 8-3-6-9 going west.
    fn crossing(southbound: &str) -> RoadGraph {
        let mut g = RoadGraph::new();
        g.set_node(Node::new(1, -0.002, 0.0));
        g.set_node(Node::new(2, -0.001, 0.0));
        g.set_node(Node::new(3, 0.0, 0.0));
        g.set_node(Node::new(4, 0.001, 0.0));
        g.set_node(Node::new(5, 0.001, -0.0002));
        g.set_node(Node::new(6, 0.0, -0.0002));
        g.set_node(Node::new(7, -0.001, -0.0002));
        g.set_node(Node::new(8, 0.0, 0.001));
        g.set_node(Node::new(9, 0.0, -0.001));
        g.add_way(10, &[1, 2, 3, 4], one_way("Main Street", "primary"));
        g.add_way(11, &[5, 6, 7], one_way(southbound, "primary"));
        g.add_way(12, &[8, 3, 6, 9], WayTags::new(Some("Elm Street"), "residential"));
        g
    }

    #[test]
    fn reciprocal_carriageway_is_hidden() {
        let g = crossing("Main Street");
        let path = [1, 2, 3, 6, 9];
        let turn = event(2, 3, "Elm Street", "Elm Street", "Main Street", "Elm Street", ExitDirection::Left);

        let d = describe(&g, &path, None);
        assert_eq!(
            d.events,
            vec![
                event(0, 1, "Main Street", "", "", "", ExitDirection::None),
                turn.clone(),
                event(3, 6, "Elm Street", "Main Street", "Elm Street", "", ExitDirection::Forward),
            ],
        );

        let cases = [DividedCase::ReciprocalTurn];
        let d = describe(&g, &path, Some(config(&cases)));
        assert_eq!(
            d.events,
            vec![
                event(0, 1, "Main Street", "", "", "", ExitDirection::None),
                turn,
            ],
        );
    }

    #[test]
    fn reciprocal_turn_with_same_name() {
        let path = [1, 2, 3, 6, 9];
        let cases = [DividedCase::ReciprocalTurn];
        let same_name = DividedRoadConfig {
            same_name: true,
            ..config(&cases)
        };

        let d = describe(&crossing("Main Street"), &path, Some(same_name));
        assert_eq!(d.events.len(), 2);

        let d = describe(&crossing("Harbor Road"), &path, Some(same_name));
        assert_eq!(d.events.len(), 3);
        assert_eq!(d.events[2].left, "Harbor Road");
    }

    /// Elm Street 7-8-2-5 ends at the southbound carriageway 4-5-6 of Main Street,
    /// crossing the northbound carriageway 1-2-3 (named `northbound`).
    fn hidden_turn(northbound: &str) -> RoadGraph {
        let mut g = RoadGraph::new();
        g.set_node(Node::new(1, -0.001, 0.0));
        g.set_node(Node::new(2, 0.0, 0.0));
        g.set_node(Node::new(3, 0.001, 0.0));
        g.set_node(Node::new(4, 0.001, -0.0002));
        g.set_node(Node::new(5, 0.0, -0.0002));
        g.set_node(Node::new(6, -0.001, -0.0002));
        g.set_node(Node::new(7, 0.0, 0.002));
        g.set_node(Node::new(8, 0.0, 0.001));
        g.add_way(10, &[1, 2, 3], one_way(northbound, "primary"));
        g.add_way(11, &[4, 5, 6], one_way("Main Street", "primary"));
        g.add_way(12, &[7, 8, 2, 5], WayTags::new(Some("Elm Street"), "residential"));
        g
    }

    #[test]
    fn turn_at_far_carriageway_is_synthesized() {
        let g = hidden_turn("Main Street");
        let path = [7, 8, 2, 5, 6];

        let d = describe(&g, &path, None);
        assert_eq!(
            d.events[2..],
            [event(3, 5, "Main Street", "", "", "", ExitDirection::None)],
        );

        let cases = [DividedCase::HiddenTurn];
        let d = describe(&g, &path, Some(config(&cases)));
        assert_eq!(
            d.events,
            vec![
                event(0, 7, "Elm Street", "", "", "", ExitDirection::None),
                event(2, 2, "Elm Street", "", "Elm Street", "Main Street", ExitDirection::Forward),
                event(3, 5, "Main Street", "Main Street", "", "Main Street", ExitDirection::Left),
            ],
        );

        // Carriageways further apart than the length threshold
        let narrow = DividedRoadConfig {
            length: 10.0,
            ..config(&cases)
        };
        let d = describe(&g, &path, Some(narrow));
        assert_eq!(d.events[2].exit, ExitDirection::None);
    }

    #[test]
    fn hidden_turn_with_same_name() {
        let path = [7, 8, 2, 5, 6];
        let cases = [DividedCase::HiddenTurn];
        let same_name = DividedRoadConfig {
            same_name: true,
            ..config(&cases)
        };

        let d = describe(&hidden_turn("Main Street"), &path, Some(same_name));
        assert_eq!(d.events[2].exit, ExitDirection::Left);

        let d = describe(&hidden_turn("Market Street"), &path, Some(same_name));
        assert_eq!(
            d.events[2],
            event(3, 5, "Main Street", "", "", "", ExitDirection::None),
        );
    }

    #[test]
    fn hidden_turn_honors_exit_filter() {
        // Oak Lane keeps node 2 an intersection once primary roads are filtered out
        let mut g = hidden_turn("Main Street");
        g.set_node(Node::new(9, -0.0007, 0.0007));
        g.add_way(13, &[2, 9], WayTags::new(Some("Oak Lane"), "residential"));
        let path = [7, 8, 2, 5, 6];

        let filter = HighwayFilter {
            excluded: &["primary"],
        };
        let cases = [DividedCase::HiddenTurn];
        let mut options = Options {
            exit_filter: &filter,
            divided: Some(config(&cases)),
            ..DEFAULT_OPTIONS
        };

        let d = describe_with(&g, &path, &options);
        assert_eq!(d.events[1].left, "Oak Lane");
        assert_eq!(
            d.events[2],
            event(3, 5, "Main Street", "Main Street", "", "Main Street", ExitDirection::Left),
        );

        options.divided = Some(DividedRoadConfig {
            apply_filter: true,
            ..config(&cases)
        });
        let d = describe_with(&g, &path, &options);
        assert_eq!(
            d.events[2],
            event(3, 5, "Main Street", "", "", "", ExitDirection::None),
        );
    }

    #[test]
    fn straight_road_has_no_hidden_turn() {
        // Main Street 1-2-3-4 straight north, Side Road leaving 2 at 160°
        let mut g = RoadGraph::new();
        g.set_node(Node::new(1, -0.001, 0.0));
        g.set_node(Node::new(2, 0.0, 0.0));
        g.set_node(Node::new(3, 0.0003, 0.0));
        g.set_node(Node::new(4, 0.0013, 0.0));
        g.set_node(Node::new(5, -0.00093969, 0.00034202));
        g.add_way(10, &[1, 2, 3, 4], WayTags::new(Some("Main Street"), "primary"));
        g.add_way(11, &[2, 5], WayTags::new(Some("Side Road"), "residential"));

        let cases = [DividedCase::HiddenTurn];
        let d = describe(&g, &[1, 2, 3, 4], Some(config(&cases)));
        assert_eq!(
            d.events,
            vec![
                event(0, 1, "Main Street", "", "", "", ExitDirection::None),
                event(1, 2, "Main Street", "", "Main Street", "Side Road", ExitDirection::Forward),
            ],
        );
    }

    /// Northbound 1-2-3 and southbound 3-4-5 carriageways merging at 3
    /// into a two-way road 3-6.
    fn merge() -> RoadGraph {
        let mut g = RoadGraph::new();
        g.set_node(Node::new(1, -0.001, 0.0001));
        g.set_node(Node::new(2, -0.0003, 0.0001));
        g.set_node(Node::new(3, 0.0, 0.0));
        g.set_node(Node::new(4, -0.0003, -0.0001));
        g.set_node(Node::new(5, -0.001, -0.0001));
        g.set_node(Node::new(6, 0.001, 0.0));
        g.add_way(10, &[1, 2, 3], one_way("Main Street", "primary"));
        g.add_way(11, &[3, 4, 5], one_way("Main Street", "primary"));
        g.add_way(12, &[3, 6], WayTags::new(Some("Main Street"), "primary"));
        g
    }

    #[test]
    fn merging_carriageway_is_hidden() {
        let g = merge();
        let path = [1, 2, 3, 6];

        let unguarded = [DividedCase::MergeBack { angle_guard: false }];
        let d = describe(&g, &path, Some(config(&unguarded)));
        assert_eq!(d.events.len(), 1);
        assert!(d.diagnostics.is_empty());

        let d = describe(&g, &path, None);
        assert_eq!(
            d.events[1],
            event(2, 3, "Main Street", "Main Street", "Main Street", "", ExitDirection::Forward),
        );
    }

    #[test]
    fn merge_angle_guard() {
        let g = merge();
        let path = [1, 2, 3, 6];
        let guarded = [DividedCase::MergeBack { angle_guard: true }];

        // The carriageway leaves at ~37° off the reversed heading
        let d = describe(&g, &path, Some(config(&guarded)));
        assert_eq!(d.events.len(), 2);
        assert_eq!(d.events[1].left, "Main Street");

        let lenient = DividedRoadConfig {
            angle: 40.0,
            ..config(&guarded)
        };
        let d = describe(&g, &path, Some(lenient));
        assert_eq!(d.events.len(), 1);
    }

    #[test]
    fn degenerate_merge_is_reported() {
        let mut g = merge();
        g.set_node(Node::new(7, 0.0, 0.001));
        g.add_way(13, &[3, 7], WayTags::new(Some("Depot Road"), "service"));

        let cases = [DividedCase::MergeBack { angle_guard: false }];
        let d = describe(&g, &[1, 2, 3, 6], Some(config(&cases)));
        assert_eq!(
            d.diagnostics,
            vec![Diagnostic::DegenerateMerge {
                index: 2,
                node: 3,
                exit: 4
            }],
        );
        assert_eq!(
            d.events[1],
            event(2, 3, "Main Street", "Main Street", "Main Street", "Depot Road", ExitDirection::Forward),
        );
    }
}
