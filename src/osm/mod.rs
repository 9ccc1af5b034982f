// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Loading [RoadGraphs](RoadGraph) from [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML).
//!
//! Only nodes and ways with a `highway` tag are loaded. Turn restrictions,
//! access tags and other relations are not interpreted.

use std::fs::File;
use std::io;
use std::path::Path;

use log::info;

use crate::xml::{decompressed, BufParser, IoParser};
use crate::{Error, FileFormat, RoadGraph, WayTags};

mod features;

use features::{Feature, Reader};

/// Parse OSM features from a reader into a [RoadGraph].
///
/// The provided stream will be automatically wrapped in a buffered reader
/// and a decompressor, as per the [FileFormat].
pub fn add_features_from_io<R: io::Read>(
    g: &mut RoadGraph,
    reader: R,
    format: FileFormat,
) -> Result<(), Error> {
    let b = decompressed(reader, format)?;
    add_features(g, Reader::new(IoParser::new(b)))
}

/// Parse OSM features from a file at the provided path into a [RoadGraph].
/// The compression is guessed from the file extension or content.
pub fn add_features_from_file<P: AsRef<Path>>(g: &mut RoadGraph, path: P) -> Result<(), Error> {
    let format = FileFormat::from_path(&path);
    add_features_from_io(g, File::open(path)?, format)
}

/// Parse OSM features from a static buffer into a [RoadGraph].
pub fn add_features_from_buffer(
    g: &mut RoadGraph,
    data: &[u8],
    format: FileFormat,
) -> Result<(), Error> {
    if format == FileFormat::Plain {
        // Fast path is available for in-memory XML data
        add_features(g, Reader::new(BufParser::new(data)))
    } else {
        add_features_from_io(g, io::Cursor::new(data), format)
    }
}

fn add_features<I>(g: &mut RoadGraph, features: I) -> Result<(), Error>
where
    I: Iterator<Item = Result<Feature, quick_xml::Error>>,
{
    let mut ways = 0;
    let mut skipped = 0;

    for feature in features {
        match feature? {
            Feature::Node(n) => g.set_node(n),
            Feature::Way(w) if w.tags.contains_key("highway") => {
                g.add_way(w.id, &w.nodes, WayTags::from_osm(&w.tags));
                ways += 1;
            }
            Feature::Way(_) => skipped += 1,
        }
    }

    info!(
        "Loaded {} nodes and {} highways ({} other ways skipped)",
        g.len(),
        ways,
        skipped,
    );
    Ok(())
}
