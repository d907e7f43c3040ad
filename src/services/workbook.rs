use std::path::{Path, PathBuf};

use anyhow::Context;
use itertools::Itertools;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use rust_xlsxwriter::Workbook;

use crate::{
    models::position_change::{ChangeAggregate, ChangeKind},
    services::{
        classifier::ChangeReport,
        holdings::{HoldingsOverview, InstrumentHolding},
    },
};

/// Excel limits worksheet names to 31 characters.
const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(Decimal),
    Empty,
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_string())
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::Text(text)
    }
}

impl From<Decimal> for Cell {
    fn from(number: Decimal) -> Self {
        Cell::Number(number)
    }
}

impl From<usize> for Cell {
    fn from(number: usize) -> Self {
        Cell::Number(Decimal::from(number))
    }
}

impl From<Option<Decimal>> for Cell {
    fn from(number: Option<Decimal>) -> Self {
        number.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: &str, header: &[&str]) -> Self {
        Sheet {
            name: name.chars().take(MAX_SHEET_NAME).collect(),
            header: header.iter().map(|column| column.to_string()).collect(),
            rows: vec![],
        }
    }

    pub fn row(&mut self, cells: Vec<Cell>) -> &mut Self {
        self.rows.push(cells);
        self
    }
}

fn summary_sheet(metrics: Vec<(&str, Cell)>) -> Sheet {
    let mut sheet = Sheet::new("Summary", &["metric", "value"]);
    for (metric, value) in metrics {
        sheet.row(vec![metric.into(), value]);
    }
    sheet
}

fn change_sheet(kind: ChangeKind, aggregates: &[ChangeAggregate]) -> Sheet {
    let mut sheet = Sheet::new(
        kind.file_stem(),
        &[
            "rank",
            "name",
            "ticker",
            "category",
            "fund_count",
            "total_value",
            "avg_position_size",
            "avg_pct_change",
            "total_dollar_change",
            "funds",
        ],
    );
    for (index, aggregate) in aggregates.iter().enumerate() {
        sheet.row(vec![
            (index + 1).into(),
            aggregate.name.clone().into(),
            aggregate.ticker.clone().into(),
            aggregate.category.clone().unwrap_or_default().into(),
            aggregate.holder_count.into(),
            aggregate.total_value.into(),
            aggregate.avg_position_size.into(),
            aggregate.avg_pct_change.into(),
            aggregate.total_dollar_change.into(),
            aggregate.holders.iter().join("; ").into(),
        ]);
    }
    sheet
}

/// Summary sheet followed by one ranked sheet per change kind.
pub fn change_report_sheets(report: &ChangeReport) -> Vec<Sheet> {
    let mut metrics: Vec<(&str, Cell)> = vec![
        ("materiality_threshold", report.threshold.into()),
        ("prior_positions", report.prior_positions.into()),
        ("current_positions", report.current_positions.into()),
    ];
    for kind in ChangeKind::ALL {
        let count = report.position_counts.get(&kind).copied().unwrap_or_default();
        metrics.push((kind.file_stem(), count.into()));
    }
    metrics.push(("unchanged_positions", report.unchanged.into()));
    metrics.push(("zero_prior_positions", report.zero_prior.into()));

    let mut sheets = vec![summary_sheet(metrics)];
    sheets.extend(
        ChangeKind::ALL
            .iter()
            .map(|kind| change_sheet(*kind, report.aggregates(*kind))),
    );
    sheets
}

fn instrument_sheet(name: &str, holdings: &[InstrumentHolding]) -> Sheet {
    let mut sheet = Sheet::new(
        name,
        &[
            "rank",
            "instrument",
            "fund_count",
            "total_value",
            "avg_position_size",
            "funds",
        ],
    );
    for (index, holding) in holdings.iter().enumerate() {
        sheet.row(vec![
            (index + 1).into(),
            holding.label.clone().into(),
            holding.holder_count.into(),
            holding.total_value.into(),
            holding.avg_position_size.into(),
            holding.holders.iter().join("; ").into(),
        ]);
    }
    sheet
}

pub fn holdings_sheets(overview: &HoldingsOverview) -> Vec<Sheet> {
    let summary = summary_sheet(vec![
        (
            "as_of",
            overview
                .as_of
                .map(|date| Cell::Text(date.to_string()))
                .unwrap_or(Cell::Empty),
        ),
        ("funds", overview.holder_count.into()),
        ("positions", overview.position_count.into()),
        ("unique_instruments", overview.unique_instruments.into()),
        ("total_value", overview.total_value.into()),
        ("avg_position_value", overview.avg_position_value.into()),
    ]);

    let mut weights = Sheet::new(
        "portfolio_weights",
        &[
            "rank",
            "instrument",
            "fund_count",
            "total_value",
            "weight_pct",
            "consensus_score",
        ],
    );
    for (index, weighted) in overview.weights.iter().enumerate() {
        weights.row(vec![
            (index + 1).into(),
            weighted.holding.label.clone().into(),
            weighted.holding.holder_count.into(),
            weighted.holding.total_value.into(),
            weighted.weight_pct.into(),
            weighted.consensus_score.into(),
        ]);
    }

    let mut funds = Sheet::new("funds", &["fund", "positions", "total_value", "top_holding"]);
    for holder in &overview.holders {
        funds.row(vec![
            holder.holder.clone().into(),
            holder.positions.into(),
            holder.total_value.into(),
            holder.top_holding.clone().into(),
        ]);
    }

    vec![
        summary,
        instrument_sheet("most_held", &overview.most_held),
        instrument_sheet("top_by_value", &overview.top_by_value),
        weights,
        funds,
    ]
}

pub fn export_workbook(
    sheets: &[Sheet],
    out_dir: &Path,
    file_name: &str,
) -> anyhow::Result<PathBuf> {
    let path = out_dir.join(format!("{}.xlsx", file_name));
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        for (col, title) in sheet.header.iter().enumerate() {
            worksheet.write_string(0, col as u16, title)?;
        }
        for (row, cells) in sheet.rows.iter().enumerate() {
            let row = row as u32 + 1;
            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(text) => {
                        worksheet.write_string(row, col, text)?;
                    }
                    Cell::Number(number) => {
                        worksheet.write_number(row, col, number.to_f64().unwrap_or_default())?;
                    }
                    Cell::Empty => {}
                }
            }
        }
    }

    workbook
        .save(&path)
        .with_context(|| format!("Couldn't write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn aggregate(instrument: &str, holders: &[&str]) -> ChangeAggregate {
        ChangeAggregate {
            kind: ChangeKind::Increased,
            instrument_id: instrument.to_string(),
            name: format!("{instrument} Inc"),
            ticker: instrument.to_string(),
            category: None,
            holder_count: holders.len(),
            holders: holders.iter().map(|h| h.to_string()).collect(),
            total_prior_value: dec!(100),
            total_current_value: dec!(250),
            total_value: dec!(250),
            avg_position_size: dec!(125),
            avg_pct_change: None,
            total_dollar_change: Some(dec!(150)),
        }
    }

    fn report() -> ChangeReport {
        ChangeReport {
            threshold: dec!(0.5),
            prior_positions: 4,
            current_positions: 5,
            unchanged: 1,
            zero_prior: 0,
            position_counts: [(ChangeKind::Increased, 3)].into_iter().collect(),
            opened: vec![],
            closed: vec![],
            increased: vec![aggregate("MRNA", &["Avoro", "RTW"])],
            decreased: vec![],
        }
    }

    #[test]
    fn change_report_starts_with_a_summary() {
        let sheets = change_report_sheets(&report());
        let names: Vec<_> = sheets.iter().map(|sheet| sheet.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Summary",
                "opened_positions",
                "closed_positions",
                "increased_positions",
                "decreased_positions"
            ]
        );
        assert!(sheets[0]
            .rows
            .contains(&vec!["increased_positions".into(), Cell::Number(dec!(3))]));
        assert!(sheets[0]
            .rows
            .contains(&vec!["opened_positions".into(), Cell::Number(dec!(0))]));

        let increased = &sheets[3].rows[0];
        assert_eq!(increased[0], Cell::Number(dec!(1)));
        assert_eq!(increased[7], Cell::Empty);
        assert_eq!(increased[9], Cell::Text("Avoro; RTW".to_string()));
    }

    #[test]
    fn long_sheet_names_are_truncated() {
        let sheet = Sheet::new("a sheet name that is far too long for excel", &[]);
        assert_eq!(sheet.name.chars().count(), MAX_SHEET_NAME);
    }

    #[test]
    fn writes_an_xlsx_file() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = change_report_sheets(&report());
        let path = export_workbook(&sheets, dir.path(), "changes").unwrap();
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
