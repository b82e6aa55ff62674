use anyhow::Context;
use clap::Parser;

use ragdb_core::Settings;
use ragdb_server::logging;
use ragdb_server::state::open_index;

/// Query the vector index from the command line.
#[derive(Debug, Parser)]
#[command(name = "ragdb-search")]
struct Args {
    query: String,
    /// Number of hits (defaults to `index.default_top_k`).
    #[arg(long)]
    top_k: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();
    let settings = Settings::load().context("loading configuration")?;
    let top_k = args.top_k.unwrap_or(settings.index.default_top_k);

    let index = open_index(&settings).await?;
    let hits = index.search(&args.query, top_k).await?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (rank, hit) in hits.iter().enumerate() {
        let preview: String = hit.chunk.text.chars().take(160).collect();
        println!(
            "{}. [{:.4}] {} #{} ({})\n   {}",
            rank + 1,
            hit.score,
            hit.chunk.source,
            hit.chunk.index,
            hit.chunk.chunk_id,
            preview.replace('\n', " ")
        );
    }
    Ok(())
}
