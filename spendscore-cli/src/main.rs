use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use spendscore_client::{ApiClient, UploadManager};
use spendscore_core::{
    ColumnMapping, Field, FileHandle, MappingDraft, PipelineError, UploadStatus, UploadedFile, detect, preview,
    validate,
};
use spendscore_ingest::{decode, normalize, read_sample, summarize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

mod auth;
mod config;
mod display;
mod logging;
mod state;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SPENDSCORE_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "spendscore", version = VERSION, about = "Map spending exports and send them for SpendScore analysis")]
struct Cli {
    /// Increase log detail (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the detected column mapping and a preview of a CSV file
    Detect {
        csv: PathBuf,
    },

    /// Apply a mapping locally and print normalized transactions and totals
    Normalize {
        csv: PathBuf,

        /// Override one field, e.g. --map amount="Debit Amount" (empty header unmaps)
        #[arg(long = "map", value_name = "FIELD=HEADER")]
        overrides: Vec<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Upload CSV files for analysis
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Mapping for files whose amount column cannot be detected
        #[arg(long = "map", value_name = "FIELD=HEADER")]
        overrides: Vec<String>,

        /// Save each completed analysis as a report
        #[arg(long)]
        report: bool,
    },

    /// Manage ~/.spendscore/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Manage the API token in ~/.spendscore/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Store a bearer token for API requests
    SetToken { token: String },
    /// Remove the stored token
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    match cli.command {
        Command::Detect { csv } => detect_cmd(&csv)?,
        Command::Normalize { csv, overrides, json } => normalize_cmd(&csv, &overrides, json)?,
        Command::Upload {
            files,
            overrides,
            report,
        } => upload_cmd(files, &overrides, report).await?,
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
        Command::Auth { command } => match command {
            AuthCommand::SetToken { token } => auth::set_token(&token)?,
            AuthCommand::Clear => auth::clear_token()?,
        },
    }

    Ok(())
}

fn parse_overrides(raw: &[String]) -> Result<Vec<(Field, Option<String>)>> {
    raw.iter()
        .map(|r| ColumnMapping::parse_override(r).with_context(|| format!("--map {r}")))
        .collect()
}

/// Start from `base` (or detection) and apply overrides, then validate.
fn build_mapping(
    headers: &[String],
    base: Option<ColumnMapping>,
    overrides: &[(Field, Option<String>)],
) -> Result<ColumnMapping> {
    let mut draft = MappingDraft::new(headers.to_vec(), base);
    for (field, header) in overrides {
        draft.set(*field, header.as_deref())?;
    }
    Ok(draft.confirm().map_err(PipelineError::MappingInvalid)?)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("read {}", path.display()))
}

fn detect_cmd(path: &Path) -> Result<()> {
    let bytes = read_bytes(path)?;
    let sample = read_sample(&bytes).with_context(|| format!("parse {}", path.display()))?;
    let mapping = detect(&sample.headers);

    println!("Columns: {}\n", sample.headers.join(", "));
    println!("Detected mapping:");
    for line in display::mapping_lines(&mapping) {
        println!("  {line}");
    }

    let issues = validate(&mapping);
    if issues.is_empty() {
        println!("\nMapping is valid.");
    } else {
        println!();
        for issue in &issues {
            println!("! {issue}");
        }
    }

    let rows = preview(&sample.rows);
    println!("\nPreview ({} of {} rows):", rows.len(), sample.total_rows);
    for line in display::preview_lines(&sample.headers, rows) {
        println!("  {line}");
    }
    Ok(())
}

fn normalize_cmd(path: &Path, overrides: &[String], json: bool) -> Result<()> {
    let overrides = parse_overrides(overrides)?;
    let bytes = read_bytes(path)?;
    let sample = read_sample(&bytes).with_context(|| format!("parse {}", path.display()))?;
    let mapping = build_mapping(&sample.headers, None, &overrides)?;

    let text = decode(&bytes);
    let batch = normalize(&text, &mapping)?;
    let summary = summarize(&batch.transactions);

    if json {
        let out = serde_json::json!({
            "mapping": mapping,
            "transactions": batch.transactions,
            "warnings": batch.warnings,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for t in &batch.transactions {
        println!("{}", display::transaction_line(t));
    }
    println!();
    for line in display::totals_lines(&summary) {
        println!("{line}");
    }
    for w in &batch.warnings {
        println!("warning: {w}");
    }
    Ok(())
}

async fn upload_cmd(files: Vec<PathBuf>, overrides: &[String], report: bool) -> Result<()> {
    let overrides = parse_overrides(overrides)?;
    let cfg = config::load_config()?;
    let token = auth::load_auth()?.auth_token;
    let client = ApiClient::new(cfg.api_config(token))?;
    let create_report = report || cfg.upload.create_report;
    let mut mgr = UploadManager::new(client.clone(), cfg.pipeline_config());

    let mut ids = Vec::new();
    for path in &files {
        let file = FileHandle::from_path(path);
        if !file.is_csv() {
            warn!(file = %file.name, "file does not end in .csv");
        }
        ids.push(mgr.add_file(file));
    }
    drive(&mut mgr).await;

    for &id in &ids {
        let Some(upload) = mgr.get(id).filter(|u| u.status() == UploadStatus::Mapping) else {
            continue;
        };
        let name = upload.file.name.clone();
        if overrides.is_empty() {
            print_needs_mapping(upload);
            continue;
        }
        let mapping = match build_mapping(upload.headers(), upload.mapping().cloned(), &overrides) {
            Ok(m) => m,
            Err(e) => {
                println!("{name}: {e:#}");
                continue;
            }
        };
        if let Err(e) = mgr.confirm_mapping(id, mapping) {
            println!("{name}: {e}");
        }
    }
    drive(&mut mgr).await;

    let now = Utc::now();
    let mut unfinished = 0;
    for &id in &ids {
        let Some(upload) = mgr.get(id) else {
            continue;
        };
        let Some(summary) = upload.summary() else {
            unfinished += 1;
            if upload.status() == UploadStatus::Error {
                let message = upload.message().unwrap_or_default();
                println!("{}: {message}", upload.file.name);
            }
            continue;
        };

        for line in display::upload_summary_lines(&upload.file.name, summary) {
            println!("{line}");
        }
        if create_report {
            if let Some(draft) = upload.report_draft(now) {
                match client.create_report(&draft).await {
                    Ok(_) => println!("  report saved: {}", draft.title),
                    Err(e) => {
                        warn!(file = %upload.file.name, error = %e, "report not saved");
                        println!("  report not saved: {e}");
                    }
                }
            }
        }
    }

    if unfinished > 0 {
        bail!("{unfinished} of {} uploads did not complete", ids.len());
    }
    Ok(())
}

/// Apply task results until nothing is in flight, printing each change.
async fn drive(mgr: &mut UploadManager<ApiClient>) {
    while mgr.uploads().has_in_flight() {
        if let Some(upload) = mgr.process_next().await.and_then(|id| mgr.get(id)) {
            println!(
                "{}: {} ({}%)",
                upload.file.name,
                upload.status().message(),
                upload.progress
            );
        }
    }
}

fn print_needs_mapping(upload: &UploadedFile) {
    println!(
        "{}: {}",
        upload.file.name,
        upload.message().unwrap_or_default()
    );
    println!("  columns: {}", upload.headers().join(", "));
    println!("  rerun with --map amount=<column> (and any other field=column) to continue");
}
