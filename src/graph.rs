// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::hash_map::{Entry, HashMap};

use crate::{EdgeKey, Error, Node, WayTags};

/// Represents a road network as a set of [Nodes](Node), directed edges between them,
/// and the tags of the ways the edges belong to.
///
/// Nodes are stored in an arena indexed by dense integers, which are
/// remapped from the (sparse, 64-bit) node ids. Adjacency lists refer to
/// arena indices, never to other nodes directly.
#[derive(Debug, Default, Clone)]
pub struct RoadGraph {
    index: HashMap<i64, usize>,
    nodes: Vec<Node>,
    adjacency: Vec<Vec<usize>>,
    edges: HashMap<EdgeKey, i64>,
    ways: HashMap<i64, WayTags>,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns an iterator over all [Nodes](Node) in the graph, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<Node> {
        self.index.get(&id).map(|&idx| self.nodes[idx])
    }

    /// Retrieves a [Node] with the provided id, failing with [Error::UnknownNode].
    pub fn node(&self, id: i64) -> Result<Node, Error> {
        self.get_node(id).ok_or(Error::UnknownNode(id))
    }

    /// Creates or updates a [Node] with `node.id`.
    ///
    /// All edges are preserved.
    pub fn set_node(&mut self, node: Node) {
        match self.index.entry(node.id) {
            Entry::Vacant(e) => {
                e.insert(self.nodes.len());
                self.nodes.push(node);
                self.adjacency.push(Vec::default());
            }
            Entry::Occupied(e) => {
                self.nodes[*e.get()] = node;
            }
        }
    }

    /// Returns the ids of nodes reachable by a single edge from `id`,
    /// in the order the edges were added.
    pub fn neighbors(&self, id: i64) -> impl Iterator<Item = i64> + '_ {
        self.index
            .get(&id)
            .map(|&idx| self.adjacency[idx].as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&idx| self.nodes[idx].id)
    }

    /// Returns the number of outgoing edges from `id`.
    pub fn out_degree(&self, id: i64) -> usize {
        self.index
            .get(&id)
            .map(|&idx| self.adjacency[idx].len())
            .unwrap_or(0)
    }

    /// Checks if a directed edge from one node to another exists.
    pub fn has_edge(&self, from: i64, to: i64) -> bool {
        self.edges.contains_key(&EdgeKey::new(from, to))
    }

    /// Returns the id of the way a directed edge belongs to.
    pub fn way_id(&self, edge: EdgeKey) -> Option<i64> {
        self.edges.get(&edge).copied()
    }

    /// Returns the tags of the way a directed edge belongs to.
    pub fn way(&self, edge: EdgeKey) -> Option<&WayTags> {
        self.way_id(edge).and_then(|id| self.ways.get(&id))
    }

    /// Returns the tags of the way a directed edge belongs to,
    /// failing with [Error::UnknownEdge].
    pub fn way_of(&self, edge: EdgeKey) -> Result<&WayTags, Error> {
        self.way(edge).ok_or(Error::UnknownEdge(edge))
    }

    /// Retrieves the tags of a way with a given id.
    pub fn way_tags(&self, way_id: i64) -> Option<&WayTags> {
        self.ways.get(&way_id)
    }

    /// Creates or updates a directed edge, attributing it to a way.
    /// Does nothing if either of the nodes doesn't exist.
    pub fn set_edge(&mut self, from: i64, to: i64, way_id: i64) {
        let (Some(&from_idx), Some(&to_idx)) = (self.index.get(&from), self.index.get(&to)) else {
            return;
        };

        let adjacent = &mut self.adjacency[from_idx];
        if !adjacent.contains(&to_idx) {
            adjacent.push(to_idx);
        }
        self.edges.insert(EdgeKey::new(from, to), way_id);
    }

    /// Adds a way over the provided sequence of node ids, creating edges
    /// between consecutive nodes in the directions allowed by [WayTags::oneway].
    ///
    /// References to unknown nodes are dropped. Ways with less than 2 known
    /// nodes only have their tags stored.
    pub fn add_way(&mut self, way_id: i64, nodes: &[i64], tags: WayTags) {
        let (forward, backward) = tags.oneway.directions();
        self.ways.insert(way_id, tags);

        let nodes: Vec<i64> = nodes
            .iter()
            .copied()
            .filter(|id| self.index.contains_key(id))
            .collect();

        nodes.windows(2).for_each(|pair| {
            if forward {
                self.set_edge(pair[0], pair[1], way_id);
            }
            if backward {
                self.set_edge(pair[1], pair[0], way_id);
            }
        });
    }
}
