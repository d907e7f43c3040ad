use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use itertools::Itertools;
use owo_colors::{OwoColorize, Style};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{Table, Tabled};

use fundwatch::{
    models::position::IdentityStrategy,
    services::{
        files::{export_csv, export_json, read_snapshot_file},
        holdings::{get_holdings_overview, InstrumentHolding},
        loader::{LoadOptions, LoadOutcome},
        shared::constants::OUT_DIR,
        workbook::{export_workbook, holdings_sheets},
    },
};

use crate::cli::shared::{format_currency, section};

fn display_currency(amount: &Decimal) -> String {
    format_currency(*amount)
}

fn display_pct(pct: &Decimal) -> String {
    format!("{:.2} %", pct)
}

#[derive(Debug, Tabled, Serialize)]
struct InstrumentRow {
    rank: usize,
    #[tabled(rename = "instrument")]
    label: String,
    fund_count: usize,
    #[tabled(display_with = "display_currency")]
    total_value: Decimal,
    #[tabled(display_with = "display_currency")]
    avg_position_size: Decimal,
    #[tabled(skip)]
    funds: String,
}

impl InstrumentRow {
    fn ranked(holdings: &[InstrumentHolding]) -> Vec<Self> {
        holdings
            .iter()
            .enumerate()
            .map(|(index, holding)| InstrumentRow {
                rank: index + 1,
                label: holding.label.clone(),
                fund_count: holding.holder_count,
                total_value: holding.total_value,
                avg_position_size: holding.avg_position_size,
                funds: holding.holders.iter().join("; "),
            })
            .collect()
    }
}

#[derive(Debug, Tabled, Serialize)]
struct WeightRow {
    rank: usize,
    #[tabled(rename = "instrument")]
    label: String,
    fund_count: usize,
    #[tabled(display_with = "display_currency")]
    total_value: Decimal,
    #[tabled(display_with = "display_pct")]
    weight_pct: Decimal,
    consensus_score: Decimal,
}

#[derive(Debug, Tabled)]
struct StringifiedHolder {
    fund: String,
    positions: usize,
    value: String,
    top_holding: String,
}

pub struct AnalyzeArgs {
    pub path: PathBuf,
    pub top: usize,
    pub as_of: Option<NaiveDate>,
    pub key: IdentityStrategy,
}

pub fn report_load(path: &Path, outcome: &LoadOutcome) {
    if outcome.rejected > 0 {
        println!(
            "{} {} rows of {} could not be read",
            "Warning:".yellow().bold(),
            outcome.rejected,
            path.display()
        );
    }
}

/// Cross-fund statistics for a single holdings file.
pub fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let options = LoadOptions {
        as_of: args.as_of,
        identity: args.key,
        ..Default::default()
    };
    let outcome = read_snapshot_file(&args.path, &options)?;
    report_load(&args.path, &outcome);

    let overview = get_holdings_overview(&outcome.snapshot, args.top);
    let most_held = InstrumentRow::ranked(&overview.most_held);
    let top_by_value = InstrumentRow::ranked(&overview.top_by_value);
    let weights: Vec<WeightRow> = overview
        .weights
        .iter()
        .enumerate()
        .map(|(index, weighted)| WeightRow {
            rank: index + 1,
            label: weighted.holding.label.clone(),
            fund_count: weighted.holding.holder_count,
            total_value: weighted.holding.total_value,
            weight_pct: weighted.weight_pct,
            consensus_score: weighted.consensus_score,
        })
        .collect();
    let holders: Vec<StringifiedHolder> = overview
        .holders
        .iter()
        .map(|holder| StringifiedHolder {
            fund: holder.holder.clone(),
            positions: holder.positions,
            value: format_currency(holder.total_value),
            top_holding: holder.top_holding.clone(),
        })
        .collect();

    section("Funds");
    println!("{}", Table::new(&holders));
    section(&format!("Most held (top {})", args.top));
    println!("{}", Table::new(&most_held));
    section(&format!("Largest by value (top {})", args.top));
    println!("{}", Table::new(&top_by_value));
    section("Portfolio weights");
    println!("{}", Table::new(&weights));

    println!("====");
    let highlight = Style::new().black().on_white().bold();
    if let Some(as_of) = overview.as_of {
        println!("Holdings as of {}", as_of);
    }
    println!(
        "{} funds, {} positions in {} instruments",
        overview.holder_count, overview.position_count, overview.unique_instruments
    );
    println!(
        "Total value: {}, average position {}",
        format_currency(overview.total_value).style(highlight),
        format_currency(overview.avg_position_value)
    );

    let out_dir = Path::new(OUT_DIR);
    export_csv(&most_held, out_dir, "most_held")?;
    export_csv(&top_by_value, out_dir, "top_by_value")?;
    export_csv(&weights, out_dir, "portfolio_weights")?;
    export_workbook(&holdings_sheets(&overview), out_dir, "holdings_analysis")?;
    let json_path = export_json(&overview, out_dir, "holdings_analysis")?;
    println!("Reports written to {}", json_path.parent().unwrap_or(out_dir).display());

    Ok(())
}
