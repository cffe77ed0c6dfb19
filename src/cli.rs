use crate::app::FingerprintApp;
use crate::config::Settings;
use crate::models::{HashRecord, RecordStatus};
use crate::utils::format_bytes;
use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "fileprint")]
#[command(author, version, about = "SHA3-256 fingerprints with AI-written file summaries")]
pub struct Cli {
    /// Files to fingerprint, processed one at a time
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// TOML settings file
    #[arg(short, long, env = "FILEPRINT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bytes hashed per step
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Hash algorithm name
    #[arg(long)]
    pub algorithm: Option<String>,

    /// Skip the AI summary request
    #[arg(long)]
    pub no_summary: bool,

    /// Print the session history as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Settings from file and environment, then flags on top.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(size) = self.chunk_size {
            settings.chunk_size = size;
        }
        if let Some(algo) = &self.algorithm {
            settings.algorithm = algo.clone();
        }
        if self.no_summary {
            settings.summarizer.enabled = false;
        }
        Ok(settings)
    }
}

/// Process every file on the command line. Returns `false` if any failed.
pub async fn run(cli: Cli) -> Result<bool> {
    let settings = cli.settings()?;
    debug!(chunk_size = settings.chunk_size, algorithm = %settings.algorithm, "settings loaded");
    let mut app = FingerprintApp::new(settings)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let mut all_ok = true;
    for path in &cli.files {
        if cancel.is_cancelled() {
            break;
        }
        let label = path.display().to_string();
        let quiet = cli.quiet;
        let result = app
            .process_file(path, cancel.clone(), |pct| {
                if !quiet {
                    eprint!("\r{label}: {pct:>3}%");
                    let _ = std::io::stderr().flush();
                }
            })
            .await;
        if !quiet {
            eprintln!();
        }
        if let Err(e) = result {
            eprintln!("Error: {label}: {e}");
            all_ok = false;
        } else if !cli.json {
            if let Some(record) = app.history().latest() {
                print_record(record);
            }
        }
    }

    if cli.json {
        println!("{}", app.history().to_json()?);
    }
    Ok(all_ok)
}

fn print_record(record: &HashRecord) {
    println!(
        "{} ({}, {})",
        record.file_name,
        format_bytes(record.size, 2),
        record.mime_type
    );
    if let Some(modified) = record.last_modified {
        println!("  Modified: {}", modified.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    match (&record.status, &record.digest) {
        (RecordStatus::Success, Some(digest)) => println!("  {}: {digest}", record.algorithm),
        (RecordStatus::Failed { reason }, _) => println!("  Failed: {reason}"),
        (RecordStatus::Success, None) => {}
    }
    if let Some(summary) = &record.summary {
        println!("  Summary: {summary}");
    }
}
