//! Standalone CLI tool for dumping a parsed UI hierarchy as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hview_core::tree::snapshot::NodeSnapshot;
use hview_core::HierarchyModel;
use serde_json::json;

#[derive(Parser)]
#[command(name = "hview-tree", about = "Parse a UI hierarchy dump and print it as JSON")]
struct Args {
    /// Path to the XML hierarchy dump
    dump: PathBuf,

    /// Also print the rectangles of nodes flagged NAF
    #[arg(long)]
    naf: bool,

    /// Print only the nodes whose text or content-desc contains this term
    #[arg(long)]
    search: Option<String>,

    /// Compact JSON output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let bytes = match std::fs::read(&args.dump) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", args.dump.display());
            return ExitCode::FAILURE;
        }
    };

    let model = match HierarchyModel::from_xml(&bytes) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to parse {}: {e}", args.dump.display());
            return ExitCode::FAILURE;
        }
    };

    let mut output = json!({ "node_count": model.all_nodes().len() });
    match &args.search {
        Some(term) => {
            let matches: Vec<_> = model
                .search(term)
                .into_iter()
                .filter_map(|id| NodeSnapshot::capture(model.tree(), id, false))
                .collect();
            output["matches"] = json!(matches);
        }
        None => output["tree"] = json!(model.tree().snapshot()),
    }
    if args.naf {
        output["naf_rects"] = json!(model.naf_rects());
    }

    let rendered = if args.compact {
        serde_json::to_string(&output)
    } else {
        serde_json::to_string_pretty(&output)
    };

    match rendered {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize output: {e}");
            ExitCode::FAILURE
        }
    }
}
