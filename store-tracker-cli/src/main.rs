//! Command line entry point for the store visit tracker.
//!
//! Logs go to stderr (`RUST_LOG` overrides the default `info`); command output
//! goes to stdout.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use store_tracker_app::{AppConfig, AppState, AppStateBuilder};
use store_tracker_core::services::{BulkProgress, StoreService};
use store_tracker_core::types::{NewStore, OperationMetrics, StoreFilter, StoreRecord};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "store-tracker", version)]
#[command(about = "Store visit tracker backed by Firestore")]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, env = "STORE_TRACKER_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Number of stores in the remote collection
    Count,
    /// List stores, sorted by prefecture and zip code
    List {
        #[arg(long)]
        prefecture: Option<String>,
        #[arg(long)]
        city: Option<String>,
        /// Only visited stores
        #[arg(long)]
        visited: bool,
        /// Only favorites
        #[arg(long)]
        favorite: bool,
        /// Include closed stores
        #[arg(long)]
        closed: bool,
        /// Substring of name, city or street address
        #[arg(long)]
        text: Option<String>,
    },
    /// Visit progress per prefecture
    Stats,
    /// Replace the whole collection with a JSON or CSV file
    Import { file: PathBuf },
    /// Export the collection to a JSON or CSV file
    Export { file: PathBuf },
    /// Write a timestamped JSON backup
    Backup {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Replace the collection with the last cached backup
    Restore,
    /// Replace the collection with the built-in dataset
    Reset,
    /// Recent bulk operation reports
    Metrics,
    /// Add a store
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        prefecture: String,
        #[arg(long)]
        city: String,
        #[arg(long, default_value = "")]
        zipcode: String,
        #[arg(long, default_value = "")]
        street_address: String,
        #[arg(long, default_value = "")]
        building: String,
        #[arg(long)]
        favorite: bool,
        #[arg(long, default_value = "")]
        memo: String,
    },
    /// Record a visit (date defaults to today)
    Visit {
        id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Clear the visited flag
    Unvisit { id: String },
    /// Mark a store closed
    Close { id: String },
    /// Delete a closed store
    Delete { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let state = AppStateBuilder::from_config(&config)?
        .listener(Arc::new(report_progress))
        .build()
        .await?;

    match cli.command {
        Commands::Count => {
            state.authorize()?;
            println!("{}", state.store_service.count().await?);
        }
        Commands::List {
            prefecture,
            city,
            visited,
            favorite,
            closed,
            text,
        } => {
            state.authorize()?;
            let filter = StoreFilter {
                prefecture,
                city,
                visited_only: visited,
                favorite_only: favorite,
                show_closed: closed,
                text,
            };
            let records = state.store_service.list_stores().await?;
            for record in StoreService::search(&records, &filter) {
                print_record(&record);
            }
        }
        Commands::Stats => {
            state.authorize()?;
            let records = state.store_service.list_stores().await?;
            let summary = StoreService::region_summary(&records);
            println!(
                "visited {}/{} ({:.1}%)",
                summary.visited_open, summary.open_total, summary.visited_rate
            );
            for p in summary.prefectures {
                println!("{}\t{}/{}\t{:.1}%", p.prefecture, p.visited, p.total, p.rate);
            }
        }
        Commands::Import { file } => print_metrics(&state.import_file(&file).await?),
        Commands::Export { file } => {
            let count = state.export_file(&file).await?;
            println!("exported {count} stores to {}", file.display());
        }
        Commands::Backup { dir } => {
            let path = state.backup_now(&dir).await?;
            println!("{}", path.display());
        }
        Commands::Restore => print_metrics(&state.restore_backup().await?),
        Commands::Reset => print_metrics(&state.reset_to_defaults().await?),
        Commands::Metrics => {
            state.authorize()?;
            for report in state.metrics().await {
                let detail = match &report.store {
                    Some(store) => store.clone(),
                    None => format!(
                        "before={} after_delete={} written={} after_write={}",
                        count_or_dash(report.count_before),
                        count_or_dash(report.count_after_delete),
                        count_or_dash(report.count_written),
                        count_or_dash(report.count_after_write),
                    ),
                };
                println!(
                    "{}\t{}\t{detail}\t{}",
                    report.executed_at, report.operation, report.duration
                );
            }
        }
        Commands::Add {
            name,
            prefecture,
            city,
            zipcode,
            street_address,
            building,
            favorite,
            memo,
        } => {
            state.authorize()?;
            let record = state
                .store_service
                .add_store(NewStore {
                    name,
                    zipcode,
                    prefecture,
                    city,
                    street_address,
                    building,
                    favorite,
                    memo,
                })
                .await?;
            println!("{}", record.id);
        }
        Commands::Visit { id, date } => {
            let current = find(&state, &id).await?;
            print_record(&state.store_service.mark_visited(&current, date).await?);
        }
        Commands::Unvisit { id } => {
            let current = find(&state, &id).await?;
            print_record(&state.store_service.unmark_visited(&current).await?);
        }
        Commands::Close { id } => {
            let current = find(&state, &id).await?;
            print_record(&state.store_service.mark_closed(&current).await?);
        }
        Commands::Delete { id } => {
            let current = find(&state, &id).await?;
            state.store_service.delete_store(&current).await?;
            println!("deleted {id}");
        }
    }

    Ok(())
}

async fn find(state: &AppState, id: &str) -> anyhow::Result<StoreRecord> {
    state.authorize()?;
    Ok(state.store_service.find(id).await?)
}

fn report_progress(event: &BulkProgress) {
    match event {
        BulkProgress::Counted { before } => tracing::info!("{before} stores before replace"),
        BulkProgress::PageDeleted { total_deleted, .. } => {
            tracing::info!("deleted {total_deleted}");
        }
        BulkProgress::ChunkWritten { written, total } => tracing::info!("written {written}/{total}"),
        BulkProgress::Finished { count_after_write } => {
            tracing::info!("{count_after_write} stores after replace");
        }
    }
}

fn count_or_dash(count: Option<u64>) -> String {
    count.map_or_else(|| "-".to_string(), |c| c.to_string())
}

fn print_record(r: &StoreRecord) {
    let mark = if r.closed {
        "x"
    } else if r.visited {
        "v"
    } else {
        "-"
    };
    println!(
        "{mark} {}\t{}\t{} {}{}\t{}\tvisits={}",
        r.id,
        r.name,
        r.prefecture,
        r.city,
        r.street_address,
        r.zipcode,
        r.visit_count
    );
}

fn print_metrics(m: &OperationMetrics) {
    let report = m.report();
    println!(
        "{}: before={} after_delete={} written={} skipped={} after_write={} ({})",
        report.operation,
        m.count_before,
        m.count_after_delete,
        m.count_written,
        m.count_skipped,
        m.count_after_write,
        report.duration
    );
    if !m.is_verified() {
        tracing::warn!("count after write does not match records written");
    }
}
