//! Bulk-load the reference lyrics corpus from a JSON Lines file.
//!
//! Each line is `{"name": "...", "lyrics": "..."}`. Lyrics are cleaned of
//! dataset artifacts before insert; entries with nothing left are skipped.
//!
//! Usage:
//!   cargo run --bin ingest -- [--embed] lyrics.jsonl
//!
//! Only `DATABASE_URL` is required. `--embed` also needs `GEMINI_API_KEY`
//! and pauses between embedding calls to stay under the quota.

use amor::{
    config::IngestConfig,
    db::{self, corpus_queries},
    models::reference::{clean_lyric_text, RawLyricRecord, ReferenceEntry},
    ports::EmbeddingService,
    services::gemini::GeminiClient,
    telemetry,
};
use clap::Parser;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;

/// Command-line arguments for the corpus loader
#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Load reference lyrics into the corpus")]
struct Args {
    /// JSON Lines file with `name` and `lyrics` fields
    path: PathBuf,

    /// Compute an embedding for every inserted entry
    #[arg(long)]
    embed: bool,

    /// Pause after each embedding call, in milliseconds
    #[arg(long, env = "INGEST_EMBED_DELAY_MS", default_value_t = 1000)]
    embed_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    dotenvy::dotenv().ok();
    let args = Args::parse();
    let embed_delay = Duration::from_millis(args.embed_delay_ms);

    let config = IngestConfig::from_env()?;
    let pool = db::init_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let embedder = if args.embed {
        let api_key = config
            .gemini_api_key
            .as_deref()
            .ok_or("GEMINI_API_KEY is required with --embed")?;
        Some(GeminiClient::new(
            &config.gemini_base_url,
            api_key,
            &config.embedding_model,
            &config.text_model,
            config.http_timeout(),
        )?)
    } else {
        None
    };

    tracing::info!(path = %args.path.display(), embed = args.embed, "Starting ingestion");
    let reader = BufReader::new(std::fs::File::open(&args.path)?);
    let (mut inserted, mut skipped, mut unembedded) = (0u64, 0u64, 0u64);

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: RawLyricRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(line = line_no + 1, error = %e, "Skipping malformed record");
                skipped += 1;
                continue;
            }
        };

        let Some(text) = clean_lyric_text(&record.lyrics) else {
            tracing::debug!(line = line_no + 1, name = %record.name, "Skipping empty lyrics");
            skipped += 1;
            continue;
        };
        let entry = ReferenceEntry::new(record.name.trim(), text);

        let embedding = match &embedder {
            Some(client) => {
                let result = client.embed(&entry.text).await;
                sleep(embed_delay).await;
                match result {
                    Ok(values) => Some(values),
                    Err(e) => {
                        tracing::warn!(name = %entry.name, error = %e, "Embedding failed, storing without");
                        unembedded += 1;
                        None
                    }
                }
            }
            None => None,
        };

        corpus_queries::insert_entry(&pool, &entry, embedding.as_deref()).await?;
        inserted += 1;

        if inserted % 100 == 0 {
            tracing::info!(inserted, skipped, "Ingestion progress");
        }
    }

    let total = corpus_queries::count_entries(&pool).await?;
    tracing::info!(inserted, skipped, unembedded, total, "Ingestion finished");

    Ok(())
}
