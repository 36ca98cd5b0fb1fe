//! Binary entry point for the lineage forest CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use lineage_forest::{
    config::load_options,
    ingest::{forest_from_graph_file, load_label_assignment},
    ColorBy, CyclicPalette, EditOutcome, Forest, LayoutOptions, NodeId, Ordinal, RegionView,
    TimestampSummary,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "lineage",
    version,
    about = "Build, lay out, and edit cell lineage forests",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    layout: LayoutArgs,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(long, global = true, value_name = "FILE", help = "Configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = "warn",
        help = "Log filter used when RUST_LOG is unset"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct LayoutArgs {
    #[arg(long, global = true, help = "Initial layout cursor")]
    start_at: Option<i64>,

    #[arg(long, global = true, value_enum, help = "Color nodes by track or lineage")]
    color_by: Option<ColorByArg>,

    #[arg(long, global = true, help = "Omit isolated nodes from written snapshots")]
    exclude_isolated: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Build a laid-out snapshot from a tracking graph dump")]
    Ingest {
        #[arg(value_name = "GRAPH")]
        graph: PathBuf,

        #[arg(long, value_name = "CSV", help = "Identity to label assignment (stack,identity,label)")]
        labels: Option<PathBuf>,

        #[arg(short, long, value_name = "FILE", help = "Write the snapshot here instead of stdout")]
        output: Option<PathBuf>,
    },

    #[command(about = "Recompute tracks, offsets, and colors of a snapshot")]
    Layout {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        #[arg(short, long, value_name = "FILE", help = "Write the snapshot here instead of stdout")]
        output: Option<PathBuf>,
    },

    #[command(about = "Show the render window of one timestamp")]
    Region {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        #[arg(long, help = "Target timestamp ordinal")]
        ordinal: Ordinal,
    },

    #[command(about = "Move a node under a new parent")]
    Reparent {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        #[arg(long, value_name = "ID")]
        child: String,

        #[arg(long, value_name = "ID")]
        parent: String,

        #[arg(short, long, value_name = "FILE", help = "Write the snapshot here instead of stdout")]
        output: Option<PathBuf>,
    },

    #[command(about = "Remove the parent link of a node")]
    Disconnect {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        #[arg(long, value_name = "ID")]
        child: String,

        #[arg(short, long, value_name = "FILE", help = "Write the snapshot here instead of stdout")]
        output: Option<PathBuf>,
    },

    #[command(about = "Summarize a snapshot")]
    Stats {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,
    },

    #[command(about = "List timestamps and their nodes")]
    Timestamps {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ColorByArg {
    Tracks,
    Lineages,
}

impl From<ColorByArg> for ColorBy {
    fn from(mode: ColorByArg) -> Self {
        match mode {
            ColorByArg::Tracks => ColorBy::Tracks,
            ColorByArg::Lineages => ColorBy::Lineages,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsReport {
    nodes: usize,
    edges: usize,
    timestamps: usize,
    tracks: usize,
    lineages: usize,
    isolated: usize,
    width: i64,
    height: i64,
}

#[derive(Debug, Serialize)]
struct EditReport {
    child: NodeId,
    applied: bool,
}

impl EditReport {
    fn new(child: NodeId, outcome: EditOutcome) -> Self {
        Self {
            child,
            applied: outcome == EditOutcome::Applied,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    install_tracing_subscriber(&cli.log_level);
    let options = build_layout_options(&cli)?;
    let palette = CyclicPalette::default();

    match cli.command {
        Command::Ingest {
            graph,
            labels,
            output,
        } => {
            let assignment = match labels {
                Some(path) => Some(load_label_assignment(fs::File::open(path)?)?),
                None => None,
            };
            let mut forest = forest_from_graph_file(&graph, assignment.as_ref())?;
            forest.recompute(&options, &palette)?;
            write_snapshot(&forest, &options, output.as_deref())?;
            if output.is_some() {
                println!(
                    "Ingested {} nodes and {} edges",
                    forest.len(),
                    forest.edge_count()
                );
            }
        }
        Command::Layout { snapshot, output } => {
            let mut forest = read_snapshot(&snapshot)?;
            forest.recompute(&options, &palette)?;
            write_snapshot(&forest, &options, output.as_deref())?;
        }
        Command::Region { snapshot, ordinal } => {
            let mut forest = read_snapshot(&snapshot)?;
            forest.recompute(&options, &palette)?;
            let view = forest.timestamp_region_json(ordinal);
            emit(&cli.format, &view, || print_region_text(ordinal, &view))?;
        }
        Command::Reparent {
            snapshot,
            child,
            parent,
            output,
        } => {
            let mut forest = read_snapshot(&snapshot)?;
            let child = NodeId::from(child);
            let outcome = forest.reparent(&child, &NodeId::from(parent))?;
            let report = EditReport::new(child, outcome);
            finish_edit(&cli.format, &mut forest, &options, report, output.as_deref())?;
        }
        Command::Disconnect {
            snapshot,
            child,
            output,
        } => {
            let mut forest = read_snapshot(&snapshot)?;
            let child = NodeId::from(child);
            let outcome = forest.disconnect(&child)?;
            let report = EditReport::new(child, outcome);
            finish_edit(&cli.format, &mut forest, &options, report, output.as_deref())?;
        }
        Command::Stats { snapshot } => {
            let mut forest = read_snapshot(&snapshot)?;
            forest.recompute(&options, &palette)?;
            let report = stats(&forest);
            emit(&cli.format, &report, || print_stats_text(&report))?;
        }
        Command::Timestamps { snapshot } => {
            let forest = read_snapshot(&snapshot)?;
            let summaries: Vec<TimestampSummary> =
                forest.timestamps().map(|ts| ts.summary()).collect();
            emit(&cli.format, &summaries, || print_timestamps_text(&summaries))?;
        }
    }

    Ok(())
}

fn install_tracing_subscriber(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_layout_options(cli: &Cli) -> Result<LayoutOptions, Box<dyn Error>> {
    let mut options = load_options(cli.config.clone())?;
    if let Some(start_at) = cli.layout.start_at {
        options.start_at = start_at;
    }
    if let Some(mode) = cli.layout.color_by {
        options.color_by = mode.into();
    }
    if cli.layout.exclude_isolated {
        options.exclude_isolated = true;
    }
    debug!(?options, "cli.options.resolved");
    Ok(options)
}

fn read_snapshot(path: &Path) -> Result<Forest, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    Ok(Forest::from_json(&text)?)
}

fn write_snapshot(
    forest: &Forest,
    options: &LayoutOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let json = forest.to_json(options.exclude_isolated)?;
    match output {
        Some(path) => fs::write(path, json)
            .map_err(|err| format!("failed to write {}: {err}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn finish_edit(
    format: &OutputFormat,
    forest: &mut Forest,
    options: &LayoutOptions,
    report: EditReport,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    if !report.applied {
        eprintln!("nothing to do for {}", report.child);
    }
    forest.recompute(options, &CyclicPalette::default())?;
    write_snapshot(forest, options, output)?;
    if output.is_some() {
        emit(format, &report, || {
            let state = if report.applied { "updated" } else { "unchanged" };
            println!("{} {state}", report.child);
        })?;
    }
    Ok(())
}

fn stats(forest: &Forest) -> StatsReport {
    let (width, height) = forest.dimensions();
    let (lineages, isolated) = forest.lineages().map_or((0, 0), |lineages| {
        (
            lineages.len(),
            lineages.values().filter(|l| l.is_isolated()).count(),
        )
    });
    StatsReport {
        nodes: forest.len(),
        edges: forest.edge_count(),
        timestamps: forest.timestamps().count(),
        tracks: forest.tracks().map_or(0, |tracks| tracks.len()),
        lineages,
        isolated,
        width,
        height,
    }
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_stats_text(report: &StatsReport) {
    println!("Forest:");
    println!(
        "  nodes={} edges={} timestamps={}",
        report.nodes, report.edges, report.timestamps
    );
    println!(
        "  tracks={} lineages={} isolated={}",
        report.tracks, report.lineages, report.isolated
    );
    println!("  width={} height={}", report.width, report.height);
}

fn print_region_text(ordinal: Ordinal, view: &RegionView) {
    if view.is_empty() {
        println!("No timestamp {ordinal}");
        return;
    }
    println!(
        "Region for {ordinal}: ordinals={:?} width={} height={}",
        view.ordinals, view.width, view.height
    );
    for (id, node) in &view.id_to_node {
        let marker = if node.is_child { "*" } else { " " };
        println!("{marker} {id} x={} y={}", node.x, node.y);
    }
}

fn print_timestamps_text(summaries: &[TimestampSummary]) {
    for summary in summaries {
        let ids: Vec<&str> = summary.node_id.iter().map(NodeId::as_str).collect();
        println!("{}: {}", summary.ordinal, ids.join(" "));
    }
}
