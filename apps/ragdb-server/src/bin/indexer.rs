use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use ragdb_core::ingest::extension_of;
use ragdb_core::Settings;
use ragdb_server::logging;
use ragdb_server::state::{build_pipeline, open_index};

/// Bulk-ingest every supported file under a directory into the vector index.
#[derive(Debug, Parser)]
#[command(name = "ragdb-indexer")]
struct Args {
    /// Directory to walk recursively.
    dir: PathBuf,
    /// Stop after this many supported files.
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();
    let settings = Settings::load().context("loading configuration")?;
    let pipeline = build_pipeline(&settings)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&args.dir).follow_links(true).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if pipeline.registry().supports(&extension_of(&name)) {
            files.push(entry.into_path());
        } else {
            tracing::warn!("Skipping unsupported file {}", entry.path().display());
        }
    }
    if let Some(limit) = args.limit {
        if files.len() > limit {
            tracing::info!("Limited to first {} of {} files", limit, files.len());
            files.truncate(limit);
        }
    }
    if files.is_empty() {
        tracing::info!("No supported files found under {}", args.dir.display());
        return Ok(());
    }

    let index = open_index(&settings).await?;
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );

    let (mut indexed, mut failed) = (0usize, 0usize);
    for path in &files {
        let source = path.strip_prefix(&args.dir).unwrap_or(path).to_string_lossy().to_string();
        pb.set_message(source.clone());
        match pipeline.ingest_path(path, &source) {
            Ok(chunks) => {
                index
                    .upsert(&chunks)
                    .await
                    .with_context(|| format!("indexing {}", path.display()))?;
                indexed += chunks.len();
            }
            Err(err) => {
                failed += 1;
                pb.suspend(|| tracing::warn!("Failed to ingest {}: {}", path.display(), err));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    tracing::info!(files = files.len(), failed, chunks = indexed, total = index.count().await?, "Indexing completed");
    Ok(())
}
