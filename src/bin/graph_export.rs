//! Declaration Graph Export CLI
//!
//! Renders the qualified model (optionally filtered to roots) as a GraphViz
//! graph and lists groups of mutually recursive messages.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use proto_schemas::{filter, qualify, CompileRequest, CompilerConfig, DependencyGraph, Forest};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proto-graph-export")]
#[command(about = "Export the declaration dependency graph to DOT/SVG format")]
struct Cli {
    /// Schema search path (defaults to the configured proto_path)
    #[arg(short, long)]
    proto_path: Option<PathBuf>,

    /// Output file (defaults to declarations.dot)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: dot or svg
    #[arg(short, long, default_value = "dot")]
    format: String,

    /// Comma-separated roots; graph only what they need
    #[arg(long)]
    roots: Option<String>,

    /// Config file (defaults to proto-schemas.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Source files (declared paths); empty exports the whole search path
    files: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config =
        CompilerConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if let Some(proto_path) = cli.proto_path {
        config.compiler.proto_path = proto_path;
    }
    let proto_path = config.compiler.proto_path.clone();

    println!("Loading schema model from: {:?}", proto_path);
    let loader = config
        .scan_model()
        .with_context(|| format!("scanning {}", proto_path.display()))?;
    let files = qualify(&loader.load(cli.files.as_slice())?)?;
    let roots = cli.roots.as_deref().map(CompileRequest::parse_roots).unwrap_or_default();
    let files = if roots.is_empty() {
        files
    } else {
        filter(&files, roots.as_slice())?
    };

    let forest = Forest::build(&files);
    let graph = DependencyGraph::from_forest(&forest)?;

    println!(
        "Graph loaded: {} declarations, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    let cycles = graph.cycle_groups();
    if !cycles.is_empty() {
        println!("🔁 Recursive groups:");
        for group in &cycles {
            println!("  - {}", group.join(" ↔ "));
        }
    }

    let dot_content = graph.to_dot();

    match cli.format.as_str() {
        "dot" => {
            let output_path = cli.output.unwrap_or_else(|| PathBuf::from("declarations.dot"));
            std::fs::write(&output_path, &dot_content)?;
            println!("✅ Exported DOT to: {:?}", output_path);
        }
        "svg" => {
            let output_path = cli.output.unwrap_or_else(|| PathBuf::from("declarations.svg"));

            // Write DOT to temp file, then convert to SVG
            let temp_dot = output_path.with_extension("temp.dot");
            std::fs::write(&temp_dot, &dot_content)?;

            let output = std::process::Command::new("dot")
                .arg("-Tsvg")
                .arg(&temp_dot)
                .arg("-o")
                .arg(&output_path)
                .output();

            // Clean up temp file whether or not graphviz ran
            let _ = std::fs::remove_file(&temp_dot);
            let output = output.context("running graphviz `dot`")?;

            if output.status.success() {
                println!("✅ Exported SVG to: {:?}", output_path);
            } else {
                eprintln!("❌ GraphViz conversion failed:");
                eprintln!("{}", String::from_utf8_lossy(&output.stderr));
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("❌ Invalid format. Use 'dot' or 'svg'");
            std::process::exit(1);
        }
    }

    Ok(())
}
