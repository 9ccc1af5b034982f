use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, warn, LevelFilter};
use turnsign::{
    AmbiguityPolicy, DividedCase, DividedRoadParams, HighwayFilter, HighwayPriority, MatchedPath,
    NonInteractive, Options, RoadGraph, TracePoint, DEFAULT_HIGHWAY_PRIORITY, DEFAULT_OPTIONS,
};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct FileError(PathBuf, #[source] turnsign::Error);

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The path to the OSM XML file (optionally gzip or bzip2 compressed)
    map_file: PathBuf,

    /// The path to the GPX file with the recorded trace
    trace_file: PathBuf,

    /// The path to the matched path, one "from to" node pair per trace point
    path_file: PathBuf,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Name used for roads without a name
    #[arg(long, default_value = DEFAULT_OPTIONS.default_name)]
    default_name: String,

    /// Maximum deviation (in degrees) of an exit still considered straight ahead
    #[arg(long, default_value_t = DEFAULT_OPTIONS.forward_angle)]
    forward_angle: f64,

    /// Template for names of unnamed link roads, "%n" is replaced by the destination name
    #[arg(long, default_value = "%n")]
    link_template: String,

    /// Don't follow link roads to name them after their destination
    #[arg(long)]
    no_follow_link: bool,

    /// Highway class never offered as an alternative (may be repeated)
    #[arg(long, value_name = "HIGHWAY")]
    exclude_highway: Vec<String>,

    /// Priority of a highway class as HIGHWAY=N (may be repeated, unlisted classes have 0)
    #[arg(long, value_name = "HIGHWAY=N", value_parser = parse_priority)]
    priority: Vec<(String, i32)>,

    /// Use the built-in priority table, preferring major roads over minor ones
    #[arg(long, conflicts_with = "priority")]
    major_roads_first: bool,

    /// Comma-separated divided road heuristics to enable (1 to 4)
    #[arg(long, value_delimiter = ',', value_name = "CASES")]
    divided_cases: Vec<u8>,

    /// Maximum connector length and carriageway separation in meters
    #[arg(long, value_name = "METERS")]
    divided_length: Option<f64>,

    /// Maximum deviation from a reversed heading in degrees
    #[arg(long, value_name = "DEGREES")]
    divided_angle: Option<f64>,

    /// Only treat carriageways with the same name as one road
    #[arg(long)]
    divided_same_name: bool,

    /// Apply --exclude-highway to divided road candidates
    #[arg(long)]
    divided_apply_filter: bool,

    /// Require the merging carriageway (case 4) to reverse the heading within --divided-angle
    #[arg(long)]
    merge_angle_guard: bool,

    /// Collapse all detected loops, instead of keeping them as U-turns
    #[arg(long)]
    collapse_loops: bool,

    /// Pick the straightest exit when several exits continue the same way, instead of failing
    #[arg(long)]
    straightest_on_ambiguity: bool,

    /// Snap the trace onto the path, considering this many edges on each side
    #[arg(long, value_name = "EDGES")]
    snap_window: Option<usize>,

    /// Write the snapped trace to this GPX file
    #[arg(short, long, requires = "snap_window")]
    output: Option<PathBuf>,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    colog::default_builder()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    let g = load_graph(&cli.map_file)?;
    let mut trace = load_trace(&cli.trace_file)?;
    let mut path = load_path(&cli.path_file)?;

    let decider = NonInteractive {
        collapse_loops: cli.collapse_loops,
        ambiguity: if cli.straightest_on_ambiguity {
            AmbiguityPolicy::Straightest
        } else {
            AmbiguityPolicy::Fail
        },
    };

    let excluded: Vec<&str> = cli.exclude_highway.iter().map(String::as_str).collect();
    let exit_filter = HighwayFilter {
        excluded: &excluded,
    };

    let priorities: Vec<HighwayPriority> = cli
        .priority
        .iter()
        .map(|(highway, priority)| HighwayPriority {
            highway: highway.as_str(),
            priority: *priority,
        })
        .collect();

    let cases = cli
        .divided_cases
        .iter()
        .map(|&id| -> Result<DividedCase, turnsign::Error> {
            match DividedCase::from_id(id)? {
                DividedCase::MergeBack { .. } => Ok(DividedCase::MergeBack {
                    angle_guard: cli.merge_angle_guard,
                }),
                case => Ok(case),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let divided = DividedRoadParams {
        length: cli.divided_length,
        angle: cli.divided_angle,
        same_name: cli.divided_same_name,
        apply_filter: cli.divided_apply_filter,
    }
    .build(&cases)?;

    let options = Options {
        exit_filter: &exit_filter,
        default_name: &cli.default_name,
        forward_angle: cli.forward_angle,
        highway_priority: if cli.major_roads_first {
            DEFAULT_HIGHWAY_PRIORITY
        } else {
            priorities.as_slice()
        },
        link_template: if cli.no_follow_link {
            None
        } else {
            Some(cli.link_template.as_str())
        },
        divided,
    };
    options.validate()?;

    if trace.len() != path.len() {
        warn!(
            "Trace has {} points, but the matched path has {} entries",
            trace.len(),
            path.len(),
        );
    }

    let collapsed = turnsign::correct_loops(&g, &mut path, options.default_name, &decider)?;
    if !collapsed.is_empty() {
        info!("Collapsed {} loop(s)", collapsed.len());
    }

    let directions = turnsign::describe_path(&g, &path, &options, &decider)?;
    if !directions.diagnostics.is_empty() {
        warn!("{} problem(s) found along the path", directions.diagnostics.len());
    }

    print_events(&directions.events, &trace)?;

    if let Some(window) = cli.snap_window {
        snap_or_warn(&g, &path, &mut trace, window)?;

        // Written even if snapping was skipped, the trace is then left as recorded
        if let Some(ref output) = cli.output {
            save_trace(output, &trace)?;
        }
    }

    Ok(())
}

/// Snaps the trace onto the path. A path too short for the window
/// only produces a warning, and the trace is left as recorded.
fn snap_or_warn(
    g: &RoadGraph,
    path: &MatchedPath,
    trace: &mut [TracePoint],
    window: usize,
) -> Result<bool, turnsign::Error> {
    match turnsign::snap_trace(g, path, trace, window) {
        Ok(_) => Ok(true),
        Err(e @ turnsign::Error::SnapWindowUnderflow { .. }) => {
            warn!("Not snapping the trace: {}", e);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn parse_priority(s: &str) -> Result<(String, i32), String> {
    let (highway, priority) = s
        .split_once('=')
        .ok_or_else(|| format!("expected HIGHWAY=N, got {:?}", s))?;
    let priority = priority
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid priority {:?}: {}", priority, e))?;
    Ok((highway.trim().to_string(), priority))
}

fn print_events(events: &[turnsign::DirectionEvent], trace: &[TracePoint]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "index\tnode\ttime\texit\tcurrent\tleft\tforward\tright")?;
    for e in events {
        let time = trace
            .get(e.index)
            .and_then(|p| p.time.as_deref())
            .unwrap_or("");
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            e.index, e.node, time, e.exit, e.current, e.left, e.forward, e.right,
        )?;
    }
    Ok(())
}

fn load_graph<P: AsRef<Path>>(path: P) -> Result<RoadGraph, FileError> {
    let mut g = RoadGraph::default();
    match turnsign::osm::add_features_from_file(&mut g, path.as_ref()) {
        Ok(()) => Ok(g),
        Err(e) => Err(FileError(PathBuf::from(path.as_ref()), e)),
    }
}

fn load_trace<P: AsRef<Path>>(path: P) -> Result<Vec<TracePoint>, FileError> {
    turnsign::gpx::read_trace_from_file(path.as_ref())
        .map_err(|e| FileError(PathBuf::from(path.as_ref()), e))
}

fn load_path<P: AsRef<Path>>(path: P) -> Result<MatchedPath, FileError> {
    File::open(path.as_ref())
        .map_err(turnsign::Error::from)
        .and_then(|f| MatchedPath::from_reader(BufReader::new(f)))
        .map_err(|e| FileError(PathBuf::from(path.as_ref()), e))
}

fn save_trace<P: AsRef<Path>>(path: P, trace: &[TracePoint]) -> Result<(), FileError> {
    let name = path
        .as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("snapped");
    File::create(path.as_ref())
        .map_err(turnsign::Error::from)
        .and_then(|f| turnsign::gpx::write_trace(BufWriter::new(f), trace, name))
        .map_err(|e| FileError(PathBuf::from(path.as_ref()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnsign::{EdgeKey, Node, WayTags};

    fn graph() -> RoadGraph {
        let mut g = RoadGraph::new();
        g.set_node(Node::new(1, 0.0, 0.0));
        g.set_node(Node::new(2, 0.0, 0.001));
        g.set_node(Node::new(3, 0.0, 0.002));
        g.add_way(10, &[1, 2, 3], WayTags::new(Some("Main Street"), "primary"));
        g
    }

    #[test]
    fn short_path_skips_snapping() {
        let g = graph();
        let path = MatchedPath::new(vec![EdgeKey::new(1, 2), EdgeKey::new(2, 3)]).unwrap();
        let original = vec![TracePoint::new(0.0001, 0.0005), TracePoint::new(0.0001, 0.0015)];

        let mut trace = original.clone();
        assert!(!snap_or_warn(&g, &path, &mut trace, 1).unwrap());
        assert_eq!(trace, original);

        assert!(snap_or_warn(&g, &path, &mut trace, 0).unwrap());
        assert_eq!(trace[0].lat, 0.0);
    }

    #[test]
    fn misaligned_trace_is_an_error() {
        let g = graph();
        let path = MatchedPath::new(vec![EdgeKey::new(1, 2), EdgeKey::new(2, 3)]).unwrap();
        let mut trace = vec![TracePoint::new(0.0, 0.0)];
        assert!(matches!(
            snap_or_warn(&g, &path, &mut trace, 0),
            Err(turnsign::Error::TraceLengthMismatch { trace: 1, path: 2 })
        ));
    }

    #[test]
    fn priorities() {
        assert_eq!(parse_priority("primary=4"), Ok(("primary".to_string(), 4)));
        assert_eq!(parse_priority(" service = -1"), Ok(("service".to_string(), -1)));
        assert!(parse_priority("primary").is_err());
        assert!(parse_priority("primary=high").is_err());
    }
}
