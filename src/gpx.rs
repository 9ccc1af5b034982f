// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Reading and writing GPS traces in the [GPX](https://www.topografix.com/gpx.asp) format.

use std::fs::File;
use std::io;
use std::path::Path;

use log::warn;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::xml::{decompressed, parse_attribute, BufParser, IoParser, Parser};
use crate::{Error, FileFormat};

/// A single point of a GPS trace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TracePoint {
    pub lat: f64,
    pub lon: f64,

    /// Elevation in meters, if recorded.
    pub ele: Option<f64>,

    /// Timestamp, kept verbatim as it appeared in the input.
    pub time: Option<String>,
}

impl TracePoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ..Self::default()
        }
    }
}

/// Reads all track points (`trkpt`) from a GPX stream, in document order.
/// Track and segment boundaries are not preserved.
///
/// The provided stream will be automatically wrapped in a buffered reader.
pub fn read_trace<R: io::Read>(reader: R, format: FileFormat) -> Result<Vec<TracePoint>, Error> {
    let b = decompressed(reader, format)?;
    read_points(IoParser::new(b))
}

/// Reads all track points from a GPX file at the provided path, see [read_trace].
/// The compression is guessed from the file extension or content.
pub fn read_trace_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<TracePoint>, Error> {
    let format = FileFormat::from_path(&path);
    read_trace(File::open(path)?, format)
}

/// Reads all track points from an in-memory, uncompressed GPX document.
pub fn read_trace_from_buffer(data: &[u8]) -> Result<Vec<TracePoint>, Error> {
    read_points(BufParser::new(data))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Ele,
    Time,
}

fn read_points<P: Parser>(mut parser: P) -> Result<Vec<TracePoint>, Error> {
    let mut points = Vec::default();
    let mut point: Option<TracePoint> = None;
    let mut field = Field::None;

    loop {
        match parser.read_event()? {
            Event::Empty(start) => {
                if start.local_name().as_ref() == b"trkpt" {
                    points.extend(parse_trkpt(&start));
                }
            }

            Event::Start(start) => match start.local_name().as_ref() {
                b"trkpt" => point = parse_trkpt(&start),
                b"ele" => field = Field::Ele,
                b"time" => field = Field::Time,
                _ => {}
            },

            Event::Text(text) => {
                if let (Some(p), true) = (point.as_mut(), field != Field::None) {
                    let content = text.unescape()?;
                    let content = content.trim();
                    match field {
                        Field::Ele => {
                            p.ele = content.parse().ok();
                            if p.ele.is_none() {
                                warn!("Ignoring invalid track point elevation {:?}", content);
                            }
                        }
                        Field::Time => p.time = Some(content.to_string()),
                        Field::None => {}
                    }
                }
            }

            Event::End(end) => match end.local_name().as_ref() {
                b"trkpt" => points.extend(point.take()),
                b"ele" | b"time" => field = Field::None,
                _ => {}
            },

            Event::Eof => break,

            _ => {}
        }
    }

    Ok(points)
}

fn parse_trkpt(start: &BytesStart<'_>) -> Option<TracePoint> {
    let lat: Option<f64> = parse_attribute(start, b"lat");
    let lon: Option<f64> = parse_attribute(start, b"lon");

    match (lat, lon) {
        (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
            Some(TracePoint::new(lat, lon))
        }
        _ => {
            warn!("Skipping track point without valid coordinates");
            None
        }
    }
}

/// Writes points as a GPX 1.1 document with a single track segment.
pub fn write_trace<W: io::Write>(writer: W, points: &[TracePoint], name: &str) -> Result<(), Error> {
    let mut w = quick_xml::Writer::new_with_indent(writer, b' ', 2);

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.write_event(Event::Start(BytesStart::new("gpx").with_attributes([
        ("version", "1.1"),
        ("creator", env!("CARGO_PKG_NAME")),
        ("xmlns", "http://www.topografix.com/GPX/1/1"),
    ])))?;
    w.write_event(Event::Start(BytesStart::new("trk")))?;
    write_text_element(&mut w, "name", name)?;
    w.write_event(Event::Start(BytesStart::new("trkseg")))?;

    for p in points {
        let lat = format!("{:.7}", p.lat);
        let lon = format!("{:.7}", p.lon);
        let start =
            BytesStart::new("trkpt").with_attributes([("lat", lat.as_str()), ("lon", lon.as_str())]);

        if p.ele.is_none() && p.time.is_none() {
            w.write_event(Event::Empty(start))?;
            continue;
        }

        w.write_event(Event::Start(start))?;
        if let Some(ele) = p.ele {
            write_text_element(&mut w, "ele", &ele.to_string())?;
        }
        if let Some(ref time) = p.time {
            write_text_element(&mut w, "time", time)?;
        }
        w.write_event(Event::End(BytesEnd::new("trkpt")))?;
    }

    w.write_event(Event::End(BytesEnd::new("trkseg")))?;
    w.write_event(Event::End(BytesEnd::new("trk")))?;
    w.write_event(Event::End(BytesEnd::new("gpx")))?;
    Ok(())
}

fn write_text_element<W: io::Write>(
    w: &mut quick_xml::Writer<W>,
    tag: &str,
    text: &str,
) -> Result<(), Error> {
    w.write_event(Event::Start(BytesStart::new(tag)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="1.0" lon="1.0"><ele>99</ele><name>Depot</name></wpt>
  <trk>
    <name>Morning ride</name>
    <trkseg>
      <trkpt lat="52.2297" lon="21.0122"><ele>110.5</ele><time>2024-05-01T08:00:00Z</time></trkpt>
      <trkpt lat="52.2298" lon="21.0124"/>
    </trkseg>
    <trkseg>
      <trkpt lat="52.2300" lon="21.0127"><time>2024-05-01T08:00:02Z</time></trkpt>
      <trkpt lat="oops" lon="21.0"/>
    </trkseg>
  </trk>
</gpx>
"#;

    fn expected() -> Vec<TracePoint> {
        vec![
            TracePoint {
                lat: 52.2297,
                lon: 21.0122,
                ele: Some(110.5),
                time: Some("2024-05-01T08:00:00Z".to_string()),
            },
            TracePoint::new(52.2298, 21.0124),
            TracePoint {
                lat: 52.23,
                lon: 21.0127,
                ele: None,
                time: Some("2024-05-01T08:00:02Z".to_string()),
            },
        ]
    }

    #[test]
    fn read_from_buffer() {
        assert_eq!(read_trace_from_buffer(TRACE.as_bytes()).unwrap(), expected());
    }

    #[test]
    fn read_from_io() {
        let points = read_trace(io::Cursor::new(TRACE), FileFormat::Unknown).unwrap();
        assert_eq!(points, expected());
    }

    #[test]
    fn write_then_read() {
        let mut out = Vec::new();
        write_trace(&mut out, &expected(), "Snapped & corrected").unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.contains("<name>Snapped &amp; corrected</name>"));
        assert!(text.contains(r#"<trkpt lat="52.2298000" lon="21.0124000"/>"#));

        assert_eq!(read_trace_from_buffer(&out).unwrap(), expected());
    }

    #[test]
    fn text_is_unescaped() {
        let data = br#"<gpx><trk><trkseg>
          <trkpt lat="1.0" lon="2.0"><time>dawn &amp; dusk</time></trkpt>
        </trkseg></trk></gpx>"#;
        let points = read_trace_from_buffer(data).unwrap();
        assert_eq!(points[0].time.as_deref(), Some("dawn & dusk"));

        let bad = br#"<gpx><trk><trkseg>
          <trkpt lat="1.0" lon="2.0"><time>&bogus;</time></trkpt>
        </trkseg></trk></gpx>"#;
        assert!(matches!(read_trace_from_buffer(bad), Err(Error::Xml(_))));
    }

    #[test]
    fn malformed_document() {
        assert!(matches!(
            read_trace_from_buffer(b"<gpx><trk></gpx>"),
            Err(Error::Xml(_))
        ));
    }
}
