pub mod analyze;
pub mod compare;
pub mod fetch;
pub mod import;
pub mod shared;

use std::path::PathBuf;

use analyze::{analyze, AnalyzeArgs};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use compare::{compare, CompareArgs};
use fetch::{dates, fetch, holdings_path, FetchArgs};
use import::{import, ImportArgs};
use rust_decimal::Decimal;
use shared::confirm_action;

use fundwatch::{
    models::{position::IdentityStrategy, quarter::Quarter},
    services::{
        classifier::{DuplicatePolicy, DEFAULT_MATERIALITY_THRESHOLD},
        holdings::DEFAULT_TOP,
        shared::env::get_env_decimal,
    },
};

#[derive(Parser, Debug)]
#[command(version, about = "Quarterly 13F holdings of biotech funds: fetch, analyze, compare")]
struct Args {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch every fund's holdings for one quarter
    Fetch {
        #[arg(short, long)]
        quarter: Quarter,
        /// CSV with `name,cik` columns; defaults to the built-in fund list
        #[arg(short, long)]
        funds: Option<PathBuf>,
        #[arg(short, long, default_value_t = 1)]
        concurrency: usize,
        #[arg(short, long)]
        silent: bool,
    },
    /// List the quarter-end dates a fund has holdings for
    Dates {
        #[arg(long)]
        cik: String,
    },
    /// Most held, largest and consensus holdings of one holdings file
    Analyze {
        path: PathBuf,
        #[arg(short, long, default_value_t = DEFAULT_TOP)]
        top: usize,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t)]
        key: IdentityStrategy,
    },
    /// Opened, closed, increased and decreased positions between two holdings files
    Compare {
        prior: PathBuf,
        current: PathBuf,
        /// Relative change a position must exceed, e.g. 0.5 for 50 %
        #[arg(short, long)]
        threshold: Option<Decimal>,
        #[arg(long, value_enum, default_value_t)]
        on_duplicate: DuplicatePolicy,
        #[arg(long, value_enum, default_value_t)]
        key: IdentityStrategy,
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,
    },
    /// Combine a directory of per-fund CSV exports into one holdings file
    Import {
        directory: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Explicit column for a field, e.g. `market_value=Value (USD)`
        #[arg(long = "column")]
        columns: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,
    },
}

pub async fn cli() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        Command::Fetch {
            quarter,
            funds,
            concurrency,
            silent,
        } => {
            let current = fetch(FetchArgs {
                quarter,
                funds,
                concurrency,
            })
            .await?;

            let prior = holdings_path(quarter.previous());
            if !silent
                && prior.exists()
                && confirm_action(&format!("compare with {}", quarter.previous()))
            {
                compare(CompareArgs {
                    prior,
                    current,
                    threshold: default_threshold(),
                    on_duplicate: DuplicatePolicy::default(),
                    key: IdentityStrategy::default(),
                    top: DEFAULT_TOP,
                })?;
            }
        }
        Command::Dates { cik } => {
            dates(&cik).await?;
        }
        Command::Analyze {
            path,
            top,
            as_of,
            key,
        } => {
            analyze(AnalyzeArgs {
                path,
                top,
                as_of,
                key,
            })?;
        }
        Command::Compare {
            prior,
            current,
            threshold,
            on_duplicate,
            key,
            top,
        } => {
            compare(CompareArgs {
                prior,
                current,
                threshold: threshold.unwrap_or_else(default_threshold),
                on_duplicate,
                key,
                top,
            })?;
        }
        Command::Import {
            directory,
            as_of,
            columns,
            top,
        } => {
            let path = import(ImportArgs {
                directory,
                as_of,
                columns,
            })?;
            analyze(AnalyzeArgs {
                path,
                top,
                as_of: None,
                key: IdentityStrategy::default(),
            })?;
        }
    }
    Ok(())
}

fn default_threshold() -> Decimal {
    get_env_decimal("MATERIALITY_THRESHOLD", DEFAULT_MATERIALITY_THRESHOLD)
}
