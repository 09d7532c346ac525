//! papergraph CLI
//!
//! Usage:
//!   papergraph run <document.json | directory> [--out-dir out] [--stages sections,entities]
//!   papergraph reduce <graph_core.json> [--overview-budget 25]

mod batch;
mod pipeline;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use papergraph_core::{DocumentGraph, PipelineConfig};
use tracing_subscriber::EnvFilter;

use batch::run_batch;
use pipeline::{parse_stages, read_json, write_views, DocumentPipeline, Stage, StageRequest};

#[derive(Parser)]
#[command(name = "papergraph")]
#[command(about = "Knowledge-graph extraction from structured scientific documents")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the extraction pipeline over a document or a directory of them
    Run {
        /// Structured document JSON file, or a directory of .json files
        input: PathBuf,
        /// Artifact output directory
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
        /// Comma-separated stage subset
        /// (sections,sentences,entities,relations,graph,views)
        #[arg(long)]
        stages: Option<String>,
        /// Rebuild selected stages even when their artifacts exist
        #[arg(long)]
        overwrite: bool,
        /// Parallel document workers
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Re-derive the overview and section views from a graph artifact
    Reduce {
        /// Path to a graph_core.json artifact
        graph: PathBuf,
        /// Output directory (defaults to the artifact's directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Node budget for the overview
        #[arg(long)]
        overview_budget: Option<usize>,
        /// Node budget per section view
        #[arg(long)]
        section_budget: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.apply_env()?;

    match cli.command {
        Commands::Run {
            input,
            out_dir,
            stages,
            overwrite,
            workers,
        } => {
            if let Some(w) = workers {
                config.workers = w;
            }
            let stages = match stages {
                Some(list) => parse_stages(&list)?,
                None => Stage::ALL.to_vec(),
            };
            let request = StageRequest { stages, overwrite };
            let inputs = collect_inputs(&input)?;
            let workers = config.workers;
            let pipeline = Arc::new(DocumentPipeline::new(config, out_dir));
            let report = run_batch(pipeline, inputs, workers, request).await?;
            println!(
                "Processed {} documents ({} failed)",
                report.n_documents, report.n_failed
            );
            if report.n_failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Reduce {
            graph,
            out_dir,
            overview_budget,
            section_budget,
        } => {
            let mut reducer_config = config.reducer.clone();
            if let Some(budget) = overview_budget {
                reducer_config.overview_budget = budget;
            }
            if let Some(budget) = section_budget {
                reducer_config.section_budget = budget;
            }
            let dir = out_dir.unwrap_or_else(|| {
                graph
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            });
            std::fs::create_dir_all(&dir)?;
            let document: DocumentGraph = read_json(&graph)?;
            let written = write_views(&dir, &document, &reducer_config)?;
            println!("Wrote {} views for {}", written, document.document_id);
        }
    }

    Ok(())
}

/// A single file, or every .json file in a directory (sorted).
fn collect_inputs(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(input)
        .with_context(|| format!("reading input directory {}", input.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();
    if paths.is_empty() {
        anyhow::bail!("no .json documents in {}", input.display());
    }
    Ok(paths)
}
