//! Schema Compile CLI
//!
//! Loads parsed schema files from a search path, qualifies every type
//! reference, optionally filters to a set of roots, and writes the result
//! for a backend emitter.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use proto_schemas::emit::write_model;
use proto_schemas::{compile, CompileRequest, CompilerConfig, OutputFormat};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proto-compile")]
#[command(about = "Qualify and filter parsed proto schemas for code generation")]
struct Cli {
    /// Schema search path
    #[arg(long)]
    proto_path: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Comma-separated fully-qualified names to keep (default: keep everything)
    #[arg(long)]
    roots: Option<String>,

    /// Drop option values and option-extending extend blocks
    #[arg(long)]
    no_options: bool,

    /// Output format: pretty or compact
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Config file (defaults to proto-schemas.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Dry run - don't write anything
    #[arg(long)]
    dry_run: bool,

    /// Source files (declared paths); empty compiles the whole search path
    files: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        CompilerConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if let Some(proto_path) = cli.proto_path {
        config.compiler.proto_path = proto_path;
    }
    if let Some(out) = cli.out {
        config.compiler.output_dir = out;
    }

    let proto_path = config.compiler.proto_path.clone();
    let out_dir = config.compiler.output_dir.clone();
    let format = cli.format.unwrap_or(config.export.output_format);
    let sources = if cli.files.is_empty() {
        config.compiler.sources.clone()
    } else {
        cli.files
    };
    let request = CompileRequest {
        roots: cli
            .roots
            .as_deref()
            .map(CompileRequest::parse_roots)
            .or_else(|| config.compiler.roots.clone()),
        emit_options: config.compiler.emit_options && !cli.no_options,
    };

    println!("📦 Schema Compile");
    println!("  Search path: {:?}", proto_path);

    let loader = config
        .scan_model()
        .with_context(|| format!("scanning {}", proto_path.display()))?;
    let files = loader.load(sources.as_slice())?;
    println!(
        "  Loaded: {} of {} files (bundle {})",
        files.len(),
        loader.len(),
        &loader.bundle_hash().as_str()[..12]
    );

    let output = compile(&files, &request)?;

    println!();
    println!("📊 Compile Summary:");
    match request.filter_roots() {
        Some(roots) => println!("  Roots: {}", roots.join(", ")),
        None => println!("  Roots: (all)"),
    }
    println!("  Options: {}", if request.emit_options { "kept" } else { "stripped" });
    let names = output.declaration_names();
    println!("  Declarations: {}", names.len());
    for name in names.iter().take(10) {
        println!("    - {}", name);
    }
    if names.len() > 10 {
        println!("    ... and {} more", names.len() - 10);
    }
    println!("  Checksum: {}", output.checksum);

    if cli.dry_run {
        println!();
        println!("🔍 Dry run - not writing output");
        return Ok(());
    }

    let manifest = write_model(&out_dir, &output, request.filter_roots(), format)
        .with_context(|| format!("writing {}", out_dir.display()))?;
    println!();
    println!("✅ Wrote {} files to {:?}", manifest.files.len(), out_dir);
    Ok(())
}
