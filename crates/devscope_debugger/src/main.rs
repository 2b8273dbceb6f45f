//! devscope - inspect recorded store states from the command line
//!
//! Loads a file of states (a JSON array, or one JSON document per line),
//! replays them through an in-memory store watched by a DevTools panel, and
//! prints one of the panel's views:
//! - `json` - the collapsible outline of the live state
//! - `history` - every recorded entry with the current one marked
//! - `graph` - laid out nodes and edge paths of the state graph

mod app;

use anyhow::Result;
use app::InputFormat;
use clap::{Parser, ValueEnum};
use devscope_panel::ViewMode;
use std::path::PathBuf;

/// Inspect recorded store states
#[derive(Parser, Debug)]
#[command(name = "devscope")]
#[command(about = "Replay recorded store states through the devscope panel")]
#[command(version)]
struct Args {
    /// States to replay: a JSON array or JSON lines
    #[arg(short, long)]
    file: PathBuf,

    /// Layout of the states file. `auto` reads the file as one array when it
    /// parses as one and as JSON lines otherwise, so a JSON-lines file whose
    /// only state is an array needs `jsonl`
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    format: InputFormat,

    /// Settings JSON (camelCase, any subset of fields)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Time-travel to this history index before printing
    #[arg(short, long, allow_negative_numbers = true)]
    index: Option<i64>,

    /// Node budget of the graph view
    #[arg(long, default_value_t = devscope_graph::DEFAULT_MAX_NODES)]
    max_nodes: usize,

    /// View to print
    #[arg(long, value_enum, default_value_t = View::Json)]
    view: View,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum View {
    Json,
    History,
    Graph,
}

impl From<View> for ViewMode {
    fn from(view: View) -> Self {
        match view {
            View::Json => ViewMode::Json,
            View::History => ViewMode::History,
            View::Graph => ViewMode::Graph,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!(file = %args.file.display(), "loading states");

    let states = app::load_states(&args.file, args.format)?;
    let settings = args
        .settings
        .as_deref()
        .map(app::load_settings)
        .transpose()?
        .unwrap_or_default();

    let mut session = app::Session::open(states, settings, args.max_nodes)?;
    if let Some(index) = args.index {
        session.travel(index);
    }
    print!("{}", session.render(args.view.into()));
    Ok(())
}
