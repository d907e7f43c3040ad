use std::fs;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use fundwatch::{
    errors::LoadError,
    models::position_change::ChangeKind,
    services::{
        classifier::{classify, ChangeReport, ClassifyOptions, DuplicatePolicy},
        columns::{ColumnOverrides, FieldRole},
        files::read_snapshot_file,
        loader::{load_snapshot, LoadOptions},
    },
};

const HEADER: &str =
    "fund_name,cik,company,ticker,cusip,shares,value,weight,ownership,date,filing_date,industry";

fn interchange(rows: &[&str]) -> String {
    let mut content = format!("{HEADER}\n");
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    content
}

#[test]
fn compares_two_quarters_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let prior_path = dir.path().join("13F_Q4_2024.csv");
    let current_path = dir.path().join("13F_Q1_2025.csv");
    fs::write(
        &prior_path,
        interchange(&[
            "Fund A,1,Apple Inc,AAPL,037833100,10,100,1,0,2024-12-31,,",
            "Fund A,1,Xyz Corp,XYZ,,5,100,1,0,2024-12-31,,",
            "Fund B,2,Apple Inc,AAPL,037833100,10,200,1,0,2024-12-31,,",
        ]),
    )
    .unwrap();
    fs::write(
        &current_path,
        interchange(&[
            "Fund A,1,Apple Inc,AAPL,037833100,16,160,1,0,2025-03-31,,",
            "Fund B,2,Apple Inc,AAPL,037833100,10,210,1,0,2025-03-31,,",
            "Fund B,2,New Bio,NEW,,5,50,1,0,2025-03-31,,",
        ]),
    )
    .unwrap();

    let prior = read_snapshot_file(&prior_path, &LoadOptions::default()).unwrap();
    let current = read_snapshot_file(&current_path, &LoadOptions::default()).unwrap();
    assert_eq!(
        current.snapshot.as_of(),
        NaiveDate::from_ymd_opt(2025, 3, 31)
    );

    let options = ClassifyOptions::default();
    let classification = classify(&prior.snapshot, &current.snapshot, &options).unwrap();

    let increased: Vec<_> = classification.of_kind(ChangeKind::Increased).collect();
    assert_eq!(increased.len(), 1);
    assert_eq!(increased[0].holder_id, "Fund A");
    assert_eq!(increased[0].dollar_change(), Some(dec!(60)));

    let closed: Vec<_> = classification.of_kind(ChangeKind::Closed).collect();
    assert_eq!(closed[0].instrument_id, "XYZ");
    assert_eq!(closed[0].prior_value, Some(dec!(100)));

    let opened: Vec<_> = classification.of_kind(ChangeKind::Opened).collect();
    assert_eq!(opened[0].instrument_id, "NEW");
    assert_eq!(opened[0].current_value, Some(dec!(50)));

    // Fund B's Apple position moved 5 %
    assert_eq!(classification.unchanged.len(), 1);

    let report = ChangeReport::new(
        &prior.snapshot,
        &current.snapshot,
        &classification,
        &options,
        None,
    );
    assert_eq!(report.prior_positions, 3);
    assert_eq!(report.increased[0].instrument_id, "037833100");
}

#[test]
fn duplicate_rows_need_a_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dupes.csv");
    fs::write(
        &path,
        interchange(&[
            "Fund A,1,Apple Inc,AAPL,,10,100,1,0,2025-03-31,,",
            "Fund A,1,Apple Inc,AAPL,,10,300,1,0,2025-03-31,,",
        ]),
    )
    .unwrap();
    let snapshot = read_snapshot_file(&path, &LoadOptions::default())
        .unwrap()
        .snapshot;

    assert!(classify(&snapshot, &snapshot, &ClassifyOptions::default()).is_err());

    let summed = ClassifyOptions {
        on_duplicate: DuplicatePolicy::Sum,
        ..Default::default()
    };
    let empty = fundwatch::models::position::Snapshot::default();
    let classification = classify(&empty, &snapshot, &summed).unwrap();
    assert_eq!(classification.changes[0].current_value, Some(dec!(400)));
}

#[test]
fn explicit_columns_override_inference() {
    let csv = "\
Manager,Security,Value (USD),Held,Report Date
Avoro,Moderna,\"$1,000\",10,2025-03-31
";
    let options = LoadOptions {
        columns: ColumnOverrides::new()
            .with(FieldRole::InstrumentName, "Security")
            .with(FieldRole::MarketValue, "Value (USD)")
            .with(FieldRole::Quantity, "Held")
            .with(FieldRole::AsOf, "Report Date"),
        ..Default::default()
    };
    let outcome = load_snapshot(csv.as_bytes(), &options).unwrap();
    let position = &outcome.snapshot.positions()[0];
    assert_eq!(position.holder_id, "Avoro");
    assert_eq!(position.name, "Moderna");
    assert_eq!(position.market_value, dec!(1000));
    assert_eq!(position.quantity, dec!(10));
}

#[test]
fn mapping_to_a_missing_header_fails_the_source() {
    let csv = "company,value\nAcme,1\n";
    let options = LoadOptions {
        as_of: NaiveDate::from_ymd_opt(2025, 3, 31),
        columns: ColumnOverrides::new().with(FieldRole::Ticker, "Symbol"),
        ..Default::default()
    };
    let err = load_snapshot(csv.as_bytes(), &options).unwrap_err();
    assert!(matches!(err, LoadError::UnknownColumn { .. }));
}
