// src/main.rs
// =============================================================================
// Entry point of the kyobo-lookup command.
//
// What happens here:
// 1. Parse command-line arguments using clap and load the settings
// 2. Start logging (stderr) and hook Ctrl-C up to the cancellation token
// 3. Run identify or cover
// 4. Exit with proper code (0 = found, 1 = nothing found, 2 = error)
// =============================================================================

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use cli::{Cli, Commands};
use kyobo_lookup::{Kyobobook, LookupRequest, MemoryCache, Metadata};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    kyobo_lookup::logging::init()?;

    let settings = cli.settings()?;
    let kyobo = Kyobobook::new(settings, Arc::new(MemoryCache::new()), Duration::from_secs(cli.timeout))?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, cancelling lookup");
            on_ctrl_c.cancel();
        }
    });

    match &cli.command {
        Commands::Identify { lookup, json } => handle_identify(&kyobo, &lookup.to_request(), *json, &cancel).await,
        Commands::Cover { lookup, output } => handle_cover(&kyobo, &lookup.to_request(), output, &cancel).await,
    }
}

async fn handle_identify(kyobo: &Kyobobook, request: &LookupRequest, json: bool, cancel: &CancellationToken) -> Result<i32> {
    let results = kyobo.identify_all(request, cancel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_table(&results);
    }

    Ok(if results.is_empty() { 1 } else { 0 })
}

async fn handle_cover(kyobo: &Kyobobook, request: &LookupRequest, output: &Path, cancel: &CancellationToken) -> Result<i32> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    kyobo.download_cover(request, &tx, cancel).await;

    let Ok(bytes) = rx.try_recv() else {
        println!("No cover found");
        return Ok(1);
    };

    std::fs::write(output, &bytes).with_context(|| format!("write cover to {}", output.display()))?;
    println!("Saved {} bytes to {}", bytes.len(), output.display());
    Ok(0)
}

// Human-readable listing, best match first
fn print_table(results: &[Metadata]) {
    if results.is_empty() {
        println!("No matches found");
        return;
    }

    for mi in results {
        println!("[{}] {}", mi.source_relevance, mi.title);
        println!("    {:<10} {}", "authors", mi.authors.join(", "));
        if let Some(series) = &mi.series {
            let index = mi.series_index.map(|i| format!(" #{}", i)).unwrap_or_default();
            println!("    {:<10} {}{}", "series", series, index);
        }
        let fields = [
            ("id", mi.identifiers.kyobobook.clone()),
            ("isbn", mi.isbn.clone()),
            ("publisher", mi.publisher.clone()),
            ("published", mi.pubdate.map(|d| d.to_string())),
            ("language", mi.language.clone()),
            ("rating", mi.rating.map(|r| format!("{}/5", r))),
            ("cover", mi.cover_url.clone()),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                println!("    {:<10} {}", name, value);
            }
        }
        if !mi.tags.is_empty() {
            println!("    {:<10} {}", "tags", mi.tags.join(" "));
        }
        println!();
    }

    println!("{} match(es)", results.len());
}
