// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use log::{debug, warn};

use super::divided::Heuristics;
use super::{Diagnostic, DirectionEvent, Directions, ExitDirection, LinkResolver, Options, Traversal};
use crate::distance::{bearing, relative_angle};
use crate::way::{highway_priority, HighwayPriority};
use crate::{Decider, EdgeKey, Error, ExitOption, MatchedPath, RoadGraph, WayTags};

/// Describes every intersection along a matched path: which alternatives
/// (left, forward, right) were offered, and which one was taken.
///
/// The first event always names the road the path starts on. Nodes with only
/// one admissible exit produce an event only if the road name changes.
/// Recoverable problems are collected in [Directions::diagnostics];
/// errors abort the whole description.
pub fn describe_path<'a>(
    g: &'a RoadGraph,
    path: &'a MatchedPath,
    options: &'a Options<'a>,
    decider: &'a dyn Decider,
) -> Result<Directions, Error> {
    options.validate()?;

    let mut analyzer = Analyzer {
        g,
        path,
        options,
        decider,
        divided: options.divided.as_ref().map(|config| Heuristics {
            g,
            path,
            options,
            config,
        }),
        links: options.link_template.map(LinkResolver::new),
        events: Vec::default(),
        diagnostics: Vec::default(),
        current: String::default(),
    };
    analyzer.run()?;

    Ok(Directions {
        events: analyzer.events,
        diagnostics: analyzer.diagnostics,
    })
}

/// Exit from an intersection node.
#[derive(Debug, Clone, Copy)]
struct Exit<'a> {
    to: i64,

    /// Relative to the incoming heading, in (-180°, 180°]; positive to the right.
    angle: f64,

    way_id: Option<i64>,
    way: &'a WayTags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
struct Straightest {
    /// Index into the sorted exits.
    index: usize,

    /// The exit continues the incoming way, and is forward regardless of its angle.
    continues_way: bool,
}

struct Analyzer<'a> {
    g: &'a RoadGraph,
    path: &'a MatchedPath,
    options: &'a Options<'a>,
    decider: &'a dyn Decider,
    divided: Option<Heuristics<'a>>,
    links: Option<LinkResolver<'a>>,
    events: Vec<DirectionEvent>,
    diagnostics: Vec<Diagnostic>,

    /// Name of the road the path is currently on.
    current: String,
}

impl<'a> Analyzer<'a> {
    fn run(&mut self) -> Result<(), Error> {
        let path = self.path;
        let Some(first) = path.get(0) else {
            return Ok(());
        };

        self.current = self.name(first)?.to_string();
        self.events
            .push(DirectionEvent::name_change(0, first.from, self.current.clone()));

        for (i, pair) in path.edges().windows(2).enumerate() {
            if pair[0] != pair[1] {
                let ctx = Traversal::new(self.g, i + 1, pair[0], pair[1])?;
                self.visit(&ctx)?;
            }
        }

        Ok(())
    }

    fn name(&self, edge: EdgeKey) -> Result<&'a str, Error> {
        Ok(self.g.way_of(edge)?.display_name(self.options.default_name))
    }

    fn visit(&mut self, ctx: &Traversal) -> Result<(), Error> {
        let exits = self.collect_exits(ctx)?;
        if exits.is_empty() {
            warn!("No exits at node {} (point {})", ctx.node.id, ctx.index);
            self.diagnostics.push(Diagnostic::NoAdmissibleExits {
                index: ctx.index,
                node: ctx.node.id,
            });
            return Ok(());
        }

        let current = self.name(ctx.outgoing())?.to_string();
        if exits.len() == 1 {
            self.single_exit(ctx, current)
        } else {
            self.intersection(ctx, &exits, current)
        }
    }

    /// Returns admissible exits from `ctx.node`, sorted by angle.
    fn collect_exits(&mut self, ctx: &Traversal) -> Result<Vec<Exit<'a>>, Error> {
        let g = self.g;
        let mut exits = Vec::default();

        for to in g.neighbors(ctx.node.id) {
            let edge = EdgeKey::new(ctx.node.id, to);
            let Some(way) = g.way(edge) else {
                continue;
            };
            let taken = to == ctx.next;

            if to == ctx.prev.id {
                if !taken {
                    continue;
                }
                warn!(
                    "Path turns back at node {} (point {}), possibly a U-turn",
                    ctx.node.id, ctx.index,
                );
                self.diagnostics.push(Diagnostic::LoopBack {
                    index: ctx.index,
                    node: ctx.node.id,
                });
            } else if !taken {
                if !self.options.exit_filter.admits(way) {
                    continue;
                }
                if let Some(divided) = &self.divided {
                    if divided.suppresses(ctx, to, &self.events, &mut self.diagnostics)? {
                        continue;
                    }
                }
            }

            exits.push(Exit {
                to,
                angle: relative_angle(bearing(&ctx.node, &g.node(to)?), ctx.origin),
                way_id: g.way_id(edge),
                way,
            });
        }

        exits.sort_by(|a, b| a.angle.total_cmp(&b.angle));
        Ok(exits)
    }

    /// Returns the name announced for the taken exit - the road name,
    /// or the destination of an unnamed link.
    fn label(&mut self, ctx: &Traversal, current: &str) -> Result<String, Error> {
        match self.links {
            Some(ref mut links) => links.resolve(self.g, self.path, ctx.index, self.options.default_name),
            None => Ok(current.to_string()),
        }
    }

    fn single_exit(&mut self, ctx: &Traversal, current: String) -> Result<(), Error> {
        let hidden_turns = self
            .divided
            .as_ref()
            .is_some_and(|d| d.config.case(3).is_some());

        if hidden_turns {
            let label = self.label(ctx, &current)?;
            if let Some(divided) = &self.divided {
                if let Some(event) = divided.hidden_turn(ctx, &self.events, &label, &current)? {
                    self.current = current;
                    self.events.push(event);
                    return Ok(());
                }
            }
        }

        if current != self.current {
            debug!("Point {}: now on {}", ctx.index, current);
            self.events.push(DirectionEvent::name_change(
                ctx.index,
                ctx.node.id,
                current.clone(),
            ));
            self.current = current;
        }

        Ok(())
    }

    /// Picks the exit continuing straight ahead: the exit continuing the incoming way,
    /// or (if there's none) the exit with the smallest absolute angle.
    fn straightest(&self, ctx: &Traversal, exits: &[Exit]) -> Result<Straightest, Error> {
        let same_way: Vec<usize> = match ctx.incoming_way {
            Some(way_id) => exits
                .iter()
                .enumerate()
                .filter(|(_, e)| e.way_id == Some(way_id) && e.to != ctx.prev.id)
                .map(|(i, _)| i)
                .collect(),
            None => Vec::default(),
        };

        let index = match same_way.as_slice() {
            [] => {
                let mut best = 0;
                for (i, exit) in exits.iter().enumerate() {
                    if exit.angle.abs() < exits[best].angle.abs() {
                        best = i;
                    }
                }
                return Ok(Straightest {
                    index: best,
                    continues_way: false,
                });
            }

            &[only] => only,

            candidates => {
                let options: Vec<ExitOption> = candidates
                    .iter()
                    .map(|&i| ExitOption {
                        to: exits[i].to,
                        name: exits[i].way.display_name(self.options.default_name).to_string(),
                        angle: exits[i].angle,
                    })
                    .collect();

                let choice = self.decider.resolve_ambiguous_exit(ctx.node.id, &options)?;
                *candidates.get(choice).ok_or(Error::AmbiguousExit {
                    node: ctx.node.id,
                    options: candidates.len(),
                })?
            }
        };

        Ok(Straightest {
            index,
            continues_way: true,
        })
    }

    fn intersection(&mut self, ctx: &Traversal, exits: &[Exit], current: String) -> Result<(), Error> {
        let taken = exits
            .iter()
            .position(|e| e.to == ctx.next)
            .ok_or(Error::UnknownEdge(ctx.outgoing()))?;
        let straightest = self.straightest(ctx, exits)?;
        let label = self.label(ctx, &current)?;

        let default_name = self.options.default_name;
        let forward_angle = self.options.forward_angle;
        let s = &exits[straightest.index];
        let is_forward = straightest.continues_way || s.angle.abs() <= forward_angle;

        let mut event = DirectionEvent {
            index: ctx.index,
            node: ctx.node.id,
            current: current.clone(),
            ..DirectionEvent::default()
        };

        // Pool joined by the straightest exit if it's too sharp to be forward (T-junctions)
        let mut displaced: Option<Side> = None;

        if straightest.index == taken {
            event.exit = if is_forward {
                ExitDirection::Forward
            } else if s.angle > 0.0 {
                ExitDirection::Right
            } else {
                ExitDirection::Left
            };
        } else if exits[taken].angle < s.angle {
            event.exit = ExitDirection::Left;
            if !straightest.continues_way && s.angle > forward_angle {
                displaced = Some(Side::Right);
            } else {
                event.forward = s.way.display_name(default_name).to_string();
            }
        } else {
            event.exit = ExitDirection::Right;
            if !straightest.continues_way && s.angle < -forward_angle {
                displaced = Some(Side::Left);
            } else {
                event.forward = s.way.display_name(default_name).to_string();
            }
        }

        match event.exit {
            ExitDirection::Left => event.left = label,
            ExitDirection::Forward => event.forward = label,
            ExitDirection::Right => event.right = label,
            ExitDirection::None => {}
        }

        let mut left: Vec<&Exit> = Vec::default();
        let mut right: Vec<&Exit> = Vec::default();
        for (i, exit) in exits.iter().enumerate() {
            if i == taken {
                continue;
            }

            let side = if i == straightest.index {
                match displaced {
                    Some(side) => side,
                    None => continue,
                }
            } else if i < straightest.index {
                Side::Left
            } else {
                Side::Right
            };

            match side {
                Side::Left => left.push(exit),
                Side::Right => right.push(exit),
            }
        }

        let priorities = self.options.highway_priority;
        if event.left.is_empty() {
            if let Some(exit) = preferred_exit(&left, -90.0, priorities) {
                event.left = exit.way.display_name(default_name).to_string();
            }
        }
        if event.right.is_empty() {
            if let Some(exit) = preferred_exit(&right, 90.0, priorities) {
                event.right = exit.way.display_name(default_name).to_string();
            }
        }

        debug!(
            "Point {}: {} at node {} onto {} (left: {:?}, forward: {:?}, right: {:?})",
            ctx.index, event.exit, ctx.node.id, current, event.left, event.forward, event.right,
        );

        self.current = current;
        self.events.push(event);
        Ok(())
    }
}

/// Picks the exit with the highest highway priority, breaking ties
/// by closeness to `target` angle, and then by order in the pool.
fn preferred_exit<'e, 'w>(
    pool: &[&'e Exit<'w>],
    target: f64,
    priorities: &[HighwayPriority<'_>],
) -> Option<&'e Exit<'w>> {
    let mut best: Option<(&Exit, i32, f64)> = None;

    for &exit in pool {
        let priority = highway_priority(priorities, &exit.way.highway);
        let deviation = (exit.angle - target).abs();
        let better = match best {
            None => true,
            Some((_, p, d)) => priority > p || (priority == p && deviation < d),
        };
        if better {
            best = Some((exit, priority, deviation));
        }
    }

    best.map(|(exit, _, _)| exit)
}
