use std::path::{Path, PathBuf};

use owo_colors::{OwoColorize, Style};
use serde::Serialize;
use spinners_rs::{Spinner, Spinners};
use tabled::{Table, Tabled};
use tracing::info;

use fundwatch::{
    models::{
        fund::{default_funds, Fund},
        quarter::Quarter,
    },
    services::{
        files::{read_funds_file, write_holding_records},
        market_data::fmp::{fetch_all_funds, FetchSettings, FmpClient},
        shared::constants::OUT_DIR,
    },
};

use crate::cli::shared::format_currency;

#[derive(Debug, Tabled, Serialize, Clone)]
struct StringifiedFundSummary {
    fund: String,
    cik: String,
    holdings: usize,
    malformed: usize,
    value: String,
    top_holding: String,
}

#[derive(Debug, Tabled)]
struct StringifiedPortfolioDate {
    date: String,
    quarter: String,
}

pub struct FetchArgs {
    pub quarter: Quarter,
    pub funds: Option<PathBuf>,
    pub concurrency: usize,
}

pub fn holdings_path(quarter: Quarter) -> PathBuf {
    Path::new(OUT_DIR).join(format!("{}.csv", quarter.holdings_file_name()))
}

/// Downloads every fund's holdings for the quarter and writes them to one file.
pub async fn fetch(args: FetchArgs) -> anyhow::Result<PathBuf> {
    let funds: Vec<Fund> = match &args.funds {
        Some(path) => read_funds_file(path)?,
        None => default_funds(),
    };
    let client = FmpClient::from_env()?;
    let date = args.quarter.end_date();
    info!(target: "fetch", "Fetching {} funds for {} ({})", funds.len(), args.quarter, date);

    let mut sp = Spinner::new(Spinners::Point, "Fetching 13F holdings...");
    sp.start();
    let run = fetch_all_funds(&client, &funds, date, FetchSettings::from_env(args.concurrency)).await;
    sp.stop();

    let path = holdings_path(args.quarter);
    write_holding_records(&run.records, &path)?;

    let rows: Vec<StringifiedFundSummary> = run
        .summaries
        .iter()
        .map(|summary| StringifiedFundSummary {
            fund: summary.fund_name.clone(),
            cik: summary.cik.clone(),
            holdings: summary.holdings,
            malformed: summary.malformed,
            value: format_currency(summary.total_value),
            top_holding: summary.top_holding.clone().unwrap_or_default(),
        })
        .collect();

    println!("\n");
    println!("{}", Table::new(&rows));
    println!("====");
    let highlight = Style::new().black().on_white().bold();
    println!(
        "Fetched {} holdings from {} of {} funds",
        run.records.len().style(highlight),
        run.summaries.len(),
        funds.len()
    );
    for (fund, reason) in &run.failures {
        println!("{} {}: {}", "Failed".red().bold(), fund, reason);
    }
    println!("Saved to {}", path.display());

    Ok(path)
}

pub async fn dates(cik: &str) -> anyhow::Result<()> {
    let client = FmpClient::from_env()?;
    let mut sp = Spinner::new(Spinners::Point, "Getting filing dates...");
    sp.start();
    let dates = client.get_portfolio_dates(cik).await?;
    sp.stop();

    let rows: Vec<StringifiedPortfolioDate> = dates
        .iter()
        .map(|date| StringifiedPortfolioDate {
            date: date.format("%Y-%m-%d").to_string(),
            quarter: Quarter::containing(*date).to_string(),
        })
        .collect();

    println!("\n");
    if rows.is_empty() {
        println!("No holdings dates available for CIK {}", cik);
    } else {
        println!("{}", Table::new(&rows));
    }
    Ok(())
}
