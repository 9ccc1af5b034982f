// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::ops::Range;

use log::debug;

use crate::{Error, MatchedPath, RoadGraph};

/// Placeholder in link name templates replaced by the destination road name.
pub const LINK_NAME_PLACEHOLDER: &str = "%n";

/// Names unnamed link roads (`highway=*_link`) after the first non-link road
/// the path reaches through them.
///
/// The resolved name is cached for the whole run of link edges,
/// so a chain of ramps is only scanned once.
#[derive(Debug, Clone)]
pub struct LinkResolver<'a> {
    template: &'a str,
    cached: Option<(Range<usize>, String)>,
}

impl<'a> LinkResolver<'a> {
    /// Creates a resolver, with `template` controlling the produced names;
    /// see [LINK_NAME_PLACEHOLDER].
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            cached: None,
        }
    }

    /// Returns the name of the road entered at `path[index]`.
    ///
    /// Named ways and non-link ways return their own name. Unnamed links return
    /// the template filled with the name of the first non-link way further down
    /// the path, or `default_name` if the path ends before leaving the links.
    ///
    /// Panics if `index` is out of bounds of the path.
    pub fn resolve(
        &mut self,
        g: &RoadGraph,
        path: &MatchedPath,
        index: usize,
        default_name: &str,
    ) -> Result<String, Error> {
        if let Some((range, name)) = &self.cached {
            if range.contains(&index) {
                return Ok(name.clone());
            }
        }

        let edge = path[index];
        let way = g.way_of(edge)?;
        if !way.is_link() || way.name.is_some() {
            return Ok(way.display_name(default_name).to_string());
        }

        for (offset, &next) in path.edges()[index + 1..].iter().enumerate() {
            let dest = g.way_of(next)?;
            if dest.is_link() {
                continue;
            }

            let name = self
                .template
                .replace(LINK_NAME_PLACEHOLDER, dest.display_name(default_name));
            debug!("Link at {} leads to {}, naming it {:?}", edge, next, name);
            self.cached = Some((index..index + offset + 1, name.clone()));
            return Ok(name);
        }

        Ok(way.display_name(default_name).to_string())
    }
}
