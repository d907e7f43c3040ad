use std::path::{Path, PathBuf};

use itertools::Itertools;
use owo_colors::{OwoColorize, Style};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::info;

use fundwatch::{
    models::{
        position::IdentityStrategy,
        position_change::{ChangeAggregate, ChangeKind},
    },
    services::{
        classifier::{
            classify, rekeyed_positions, ChangeReport, ClassifyOptions, DuplicatePolicy,
        },
        files::{export_csv, export_json, read_snapshot_file},
        loader::LoadOptions,
        shared::constants::OUT_DIR,
        workbook::{change_report_sheets, export_workbook},
    },
};

use crate::cli::{
    analyze::report_load,
    shared::{format_currency, format_fraction_as_pct, section},
};

fn display_currency(amount: &Decimal) -> String {
    format_currency(*amount)
}

fn display_pct(fraction: &Option<Decimal>) -> String {
    format_fraction_as_pct(*fraction)
}

fn display_change(amount: &Option<Decimal>) -> String {
    amount.map(format_currency).unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Tabled, Serialize)]
struct ChangeRow {
    rank: usize,
    name: String,
    ticker: String,
    #[tabled(skip)]
    category: String,
    fund_count: usize,
    #[tabled(display_with = "display_currency")]
    total_value: Decimal,
    #[tabled(display_with = "display_currency")]
    avg_position_size: Decimal,
    #[tabled(display_with = "display_pct")]
    avg_pct_change: Option<Decimal>,
    #[tabled(display_with = "display_change")]
    total_dollar_change: Option<Decimal>,
    #[tabled(skip)]
    funds: String,
}

impl ChangeRow {
    fn ranked(aggregates: &[ChangeAggregate]) -> Vec<Self> {
        aggregates
            .iter()
            .enumerate()
            .map(|(index, aggregate)| ChangeRow {
                rank: index + 1,
                name: aggregate.name.clone(),
                ticker: aggregate.ticker.clone(),
                category: aggregate.category.clone().unwrap_or_default(),
                fund_count: aggregate.holder_count,
                total_value: aggregate.total_value,
                avg_position_size: aggregate.avg_position_size,
                avg_pct_change: aggregate.avg_pct_change,
                total_dollar_change: aggregate.total_dollar_change,
                funds: aggregate.holders.iter().join("; "),
            })
            .collect()
    }
}

pub struct CompareArgs {
    pub prior: PathBuf,
    pub current: PathBuf,
    pub threshold: Decimal,
    pub on_duplicate: DuplicatePolicy,
    pub key: IdentityStrategy,
    pub top: usize,
}

fn heading(kind: ChangeKind) -> String {
    match kind {
        ChangeKind::Opened => format!("{}", "New positions".green().bold()),
        ChangeKind::Closed => format!("{}", "Closed positions".red().bold()),
        ChangeKind::Increased => format!("{}", "Increased positions".green()),
        ChangeKind::Decreased => format!("{}", "Decreased positions".red()),
    }
}

/// Classifies every position of two holdings files and reports the changes per kind.
pub fn compare(args: CompareArgs) -> anyhow::Result<()> {
    let options = LoadOptions {
        identity: args.key,
        ..Default::default()
    };
    let prior = read_snapshot_file(&args.prior, &options)?;
    report_load(&args.prior, &prior);
    let current = read_snapshot_file(&args.current, &options)?;
    report_load(&args.current, &current);

    let classify_options = ClassifyOptions {
        threshold: args.threshold,
        on_duplicate: args.on_duplicate,
    };
    let classification = classify(&prior.snapshot, &current.snapshot, &classify_options)?;
    let report = ChangeReport::new(
        &prior.snapshot,
        &current.snapshot,
        &classification,
        &classify_options,
        Some(args.top),
    );
    info!(
        target: "compare",
        "Compared {} prior and {} current positions",
        report.prior_positions,
        report.current_positions
    );

    let out_dir = Path::new(OUT_DIR);
    for kind in ChangeKind::ALL {
        let rows = ChangeRow::ranked(report.aggregates(kind));
        println!("\n{} ({} positions)", heading(kind), classification.count(kind));
        if rows.is_empty() {
            println!("None");
        } else {
            println!("{}", Table::new(&rows));
        }
        export_csv(&rows, out_dir, kind.file_stem())?;
    }

    section("Summary");
    let highlight = Style::new().black().on_white().bold();
    println!(
        "{} opened, {} closed, {} increased, {} decreased (threshold {})",
        classification.count(ChangeKind::Opened).style(highlight),
        classification.count(ChangeKind::Closed).style(highlight),
        classification.count(ChangeKind::Increased).style(highlight),
        classification.count(ChangeKind::Decreased).style(highlight),
        format_fraction_as_pct(Some(report.threshold))
    );
    println!(
        "{} unchanged, {} skipped with zero prior value",
        report.unchanged, report.zero_prior
    );

    let rekeyed = rekeyed_positions(&classification);
    if !rekeyed.is_empty() {
        println!(
            "{} {} positions look closed and reopened under another identifier:",
            "Warning:".yellow().bold(),
            rekeyed.len()
        );
        for position in rekeyed.iter().take(10) {
            println!(
                "  {}: {} -> {}",
                position.holder_id, position.closed_instrument_id, position.opened_instrument_id
            );
        }
        println!("Run with --key name when the two files carry different identifiers.");
    }

    export_workbook(&change_report_sheets(&report), out_dir, "position_changes")?;
    let json_path = export_json(&report, out_dir, "position_changes")?;
    println!("Reports written to {}", json_path.parent().unwrap_or(out_dir).display());

    Ok(())
}
