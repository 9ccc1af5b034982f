// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::str::from_utf8;

use quick_xml::events::{BytesStart, Event};

use crate::xml::{parse_attribute, Parser};
use crate::Node;

/// OSM way, as read from the input.
#[derive(Debug, Clone, PartialEq, Default)]
pub(super) struct Way {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: HashMap<String, String>,
}

/// OSM feature relevant for building a [RoadGraph](crate::RoadGraph).
/// Relations are skipped by the [Reader].
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Feature {
    Node(Node),
    Way(Way),
}

/// Iterator over the nodes and ways of an OSM XML document, in document order.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
}

impl<P: Parser> Reader<P> {
    #[inline]
    pub fn new(parser: P) -> Self {
        Self { parser, eof: false }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<Feature, quick_xml::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut node: Option<Node> = None;
        let mut way: Option<Way> = None;

        while !self.eof {
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => return Some(Err(e)),
            };

            match event {
                Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" => {
                        if let Some(n) = parse_node(&start) {
                            return Some(Ok(Feature::Node(n)));
                        }
                    }
                    b"tag" => {
                        if let (Some(w), Some((k, v))) = (way.as_mut(), parse_tag(&start)) {
                            w.tags.insert(k, v);
                        }
                    }
                    b"nd" => {
                        if let (Some(w), Some(node_id)) = (way.as_mut(), parse_attribute(&start, b"ref")) {
                            w.nodes.push(node_id);
                        }
                    }
                    _ => {}
                },

                // Nodes with tags are reported on their end tag
                Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => node = parse_node(&start),
                    b"way" => {
                        way = parse_attribute(&start, b"id").map(|id| Way {
                            id,
                            ..Way::default()
                        })
                    }
                    _ => {}
                },

                Event::End(end) => match end.local_name().as_ref() {
                    b"node" => {
                        if let Some(n) = node.take() {
                            return Some(Ok(Feature::Node(n)));
                        }
                    }
                    b"way" => {
                        if let Some(w) = way.take() {
                            return Some(Ok(Feature::Way(w)));
                        }
                    }
                    _ => {}
                },

                Event::Eof => {
                    self.eof = true;
                }

                _ => {}
            }
        }

        None
    }
}

fn parse_node(start: &BytesStart<'_>) -> Option<Node> {
    let id: i64 = parse_attribute(start, b"id")?;
    let lat: f64 = parse_attribute(start, b"lat")?;
    let lon: f64 = parse_attribute(start, b"lon")?;

    if id != 0 && lat.is_finite() && lon.is_finite() {
        Some(Node::new(id, lat, lon))
    } else {
        None
    }
}

fn parse_tag(start: &BytesStart<'_>) -> Option<(String, String)> {
    let mut k = None;
    let mut v = None;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"k" => k = from_utf8(&attr.value).ok().map(|s| s.to_string()),
            b"v" => v = from_utf8(&attr.value).ok().map(|s| s.to_string()),
            _ => {}
        }
    }

    k.map(|k| (k, v.unwrap_or_default()))
}
