// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io::{self, BufRead};
use std::path::Path;
use std::str::from_utf8;

use quick_xml::events::{BytesStart, Event};

/// Compression of an XML input file (GPX or OSM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Unknown format - guess the compression based on the content
    #[default]
    Unknown,

    /// Force uncompressed XML
    Plain,

    /// Force XML with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    Gz,

    /// Force XML with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    Bz2,
}

impl FileFormat {
    /// Guesses the format from the extension of a file,
    /// returning [FileFormat::Unknown] for unrecognized extensions.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("gz") => Self::Gz,
            Some("bz2") => Self::Bz2,
            Some("gpx") | Some("osm") | Some("xml") => Self::Plain,
            _ => Self::Unknown,
        }
    }

    fn sniff(magic: &[u8]) -> Self {
        if magic.starts_with(&[0x1f, 0x8b]) {
            Self::Gz
        } else if magic.starts_with(b"BZh") {
            Self::Bz2
        } else {
            Self::Plain
        }
    }
}

/// Wraps a stream in a decompressor (as per the [FileFormat]) and a buffered reader.
pub(crate) fn decompressed<'r, R: io::Read + 'r>(
    reader: R,
    format: FileFormat,
) -> io::Result<Box<dyn BufRead + 'r>> {
    if format != FileFormat::Unknown {
        return Ok(wrap(reader, format));
    }

    let mut b = io::BufReader::new(reader);
    let detected = FileFormat::sniff(b.fill_buf()?);
    match detected {
        FileFormat::Plain => Ok(Box::new(b)),
        _ => Ok(wrap(b, detected)),
    }
}

fn wrap<'r, R: io::Read + 'r>(reader: R, format: FileFormat) -> Box<dyn BufRead + 'r> {
    match format {
        FileFormat::Unknown | FileFormat::Plain => Box::new(io::BufReader::new(reader)),
        FileFormat::Gz => Box::new(io::BufReader::new(flate2::read::MultiGzDecoder::new(reader))),
        FileFormat::Bz2 => Box::new(io::BufReader::new(bzip2::read::MultiBzDecoder::new(reader))),
    }
}

/// Source of XML events shared by the GPX and OSM readers.
///
/// In-memory documents are read with [quick_xml::Reader::read_event] (borrowing
/// from the input), streams with [quick_xml::Reader::read_event_into] (borrowing
/// from an internal buffer); this trait hides the difference.
pub(crate) trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>>;
}

/// [Parser] over any [std::io::BufRead], e.g. a decompressed file.
pub(crate) struct IoParser<R: BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: BufRead> IoParser<R> {
    #[inline]
    pub fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// [Parser] over an uncompressed document already in memory.
pub(crate) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<Event<'b>> {
        self.0.read_event()
    }
}

/// Parses the value of an attribute, returning `None` if the attribute
/// is missing, malformed or can't be parsed.
pub(crate) fn parse_attribute<T: std::str::FromStr>(start: &BytesStart<'_>, key: &[u8]) -> Option<T> {
    start
        .attributes()
        .filter_map(Result::ok)
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| from_utf8(&attr.value).ok()?.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    const DATA: &str = "<?xml version=\"1.0\"?><root/>";

    fn read_all(mut r: Box<dyn BufRead + '_>) -> String {
        let mut s = String::new();
        r.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn format_from_path() {
        assert_eq!(FileFormat::from_path("trace.gpx"), FileFormat::Plain);
        assert_eq!(FileFormat::from_path("map.osm.gz"), FileFormat::Gz);
        assert_eq!(FileFormat::from_path("map.osm.bz2"), FileFormat::Bz2);
        assert_eq!(FileFormat::from_path("map"), FileFormat::Unknown);
    }

    #[test]
    fn sniffs_compression() {
        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(DATA.as_bytes()).unwrap();
        let gz = gz.finish().unwrap();

        let mut bz = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        bz.write_all(DATA.as_bytes()).unwrap();
        let bz = bz.finish().unwrap();

        for data in [DATA.as_bytes(), gz.as_slice(), bz.as_slice()] {
            let r = decompressed(io::Cursor::new(data), FileFormat::Unknown).unwrap();
            assert_eq!(read_all(r), DATA);
        }

        let r = decompressed(io::Cursor::new(gz.as_slice()), FileFormat::Gz).unwrap();
        assert_eq!(read_all(r), DATA);
    }

    #[test]
    fn attributes() {
        let start = BytesStart::from_content(r#"trkpt lat="51.5" lon="x""#, 5);
        assert_eq!(parse_attribute::<f64>(&start, b"lat"), Some(51.5));
        assert_eq!(parse_attribute::<f64>(&start, b"lon"), None);
        assert_eq!(parse_attribute::<f64>(&start, b"ele"), None);
    }
}
