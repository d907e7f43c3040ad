use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::{
    errors::{LoadError, RowError},
    models::{
        holding_record::HoldingRecord,
        position::{IdentityStrategy, Position, Snapshot},
    },
    services::{
        columns::{ColumnMapping, ColumnOverrides, FieldRole},
        parsers::{parse_amount, parse_date},
    },
};

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Holder for rows of a source without a holder column.
    pub holder: Option<String>,
    /// Snapshot date for rows of a source without a date column.
    pub as_of: Option<NaiveDate>,
    pub identity: IdentityStrategy,
    pub columns: ColumnOverrides,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOutcome {
    pub snapshot: Snapshot,
    /// Rows without an identifier or without any quantity or value.
    pub skipped: usize,
    /// Rows whose cells could not be interpreted.
    pub rejected: usize,
}

/// Fields of one source row after cell parsing, before acceptance checks.
#[derive(Debug, Default)]
struct RowFields {
    holder: Option<String>,
    name: String,
    ticker: String,
    cusip: String,
    quantity: Decimal,
    market_value: Decimal,
    weight: Decimal,
    ownership: Decimal,
    category: Option<String>,
    as_of: Option<NaiveDate>,
}

#[derive(Default)]
struct Tally {
    positions: Vec<Position>,
    skipped: usize,
    rejected: usize,
}

impl Tally {
    fn push(&mut self, row: usize, result: Result<Option<Position>, RowError>) {
        match result {
            Ok(Some(position)) => self.positions.push(position),
            Ok(None) => self.skipped += 1,
            Err(e) => {
                debug!(target: "loader", "Dropping row {}: {}", row, e);
                self.rejected += 1;
            }
        }
    }

    fn finish(self, as_of: Option<NaiveDate>) -> LoadOutcome {
        info!(
            target: "loader",
            "Loaded {} positions ({} skipped, {} rejected)",
            self.positions.len(),
            self.skipped,
            self.rejected
        );
        LoadOutcome {
            snapshot: Snapshot::new(as_of, self.positions),
            skipped: self.skipped,
            rejected: self.rejected,
        }
    }
}

/// Reads a delimited holdings table with a header row into a snapshot.
pub fn load_snapshot<R: Read>(reader: R, options: &LoadOptions) -> Result<LoadOutcome, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mapping = ColumnMapping::resolve(rdr.headers()?, &options.columns)?;
    if !mapping.has(FieldRole::AsOf) && options.as_of.is_none() {
        return Err(LoadError::MissingAsOf);
    }
    debug!(target: "loader", "Resolved columns: {:?}", mapping);

    let mut tally = Tally::default();
    for (row, result) in rdr.records().enumerate() {
        let parsed = match result {
            Ok(record) => parse_record(&record, &mapping)
                .and_then(|fields| accept_row(fields, options)),
            Err(e) => {
                debug!(target: "loader", "Unreadable row {}: {}", row, e);
                tally.rejected += 1;
                continue;
            }
        };
        tally.push(row, parsed);
    }

    Ok(tally.finish(options.as_of))
}

/// Builds a snapshot from rows already in the interchange layout.
pub fn snapshot_from_records(records: &[HoldingRecord], options: &LoadOptions) -> LoadOutcome {
    let mut tally = Tally::default();
    for (row, record) in records.iter().enumerate() {
        let parsed = record_fields(record).and_then(|fields| accept_row(fields, options));
        tally.push(row, parsed);
    }
    tally.finish(options.as_of)
}

fn parse_record(record: &StringRecord, mapping: &ColumnMapping) -> Result<RowFields, RowError> {
    let text = |role| mapping.get(record, role).unwrap_or_default().to_string();
    let amount = |role| -> Result<Decimal, RowError> {
        mapping
            .get(record, role)
            .map(|raw| parse_amount(raw, role))
            .transpose()
            .map(|value| value.unwrap_or(dec!(0)))
    };

    Ok(RowFields {
        holder: mapping.get(record, FieldRole::Holder).map(str::to_string),
        name: text(FieldRole::InstrumentName),
        ticker: text(FieldRole::Ticker),
        cusip: text(FieldRole::Cusip),
        quantity: amount(FieldRole::Quantity)?,
        market_value: amount(FieldRole::MarketValue)?,
        weight: amount(FieldRole::Weight)?,
        ownership: amount(FieldRole::Ownership)?,
        category: mapping.get(record, FieldRole::Category).map(str::to_string),
        as_of: mapping
            .get(record, FieldRole::AsOf)
            .map(parse_date)
            .transpose()?,
    })
}

fn record_fields(record: &HoldingRecord) -> Result<RowFields, RowError> {
    let non_empty = |value: &str| Some(value.trim().to_string()).filter(|v| !v.is_empty());
    Ok(RowFields {
        holder: non_empty(&record.fund_name),
        name: record.company.trim().to_string(),
        ticker: record.ticker.trim().to_string(),
        cusip: record.cusip.trim().to_string(),
        quantity: record.shares,
        market_value: record.value,
        weight: record.weight,
        ownership: record.ownership,
        category: non_empty(&record.industry),
        as_of: non_empty(&record.date)
            .map(|date| parse_date(&date))
            .transpose()?,
    })
}

/// Applies the acceptance rules; `Ok(None)` means the row is skipped without error.
fn accept_row(fields: RowFields, options: &LoadOptions) -> Result<Option<Position>, RowError> {
    for (field, value) in [
        (FieldRole::Quantity, fields.quantity),
        (FieldRole::MarketValue, fields.market_value),
        (FieldRole::Weight, fields.weight),
        (FieldRole::Ownership, fields.ownership),
    ] {
        if value < dec!(0) {
            return Err(RowError::Negative { field });
        }
    }

    let Some(holder_id) = fields.holder.or_else(|| options.holder.clone()) else {
        return Ok(None);
    };
    let instrument_id = options
        .identity
        .instrument_id(&fields.name, &fields.ticker, &fields.cusip);
    let Some(instrument_id) = instrument_id else {
        return Ok(None);
    };
    if fields.quantity <= dec!(0) && fields.market_value <= dec!(0) {
        return Ok(None);
    }
    let as_of = fields
        .as_of
        .or(options.as_of)
        .ok_or_else(|| RowError::InvalidDate { raw: String::new() })?;

    Ok(Some(Position {
        holder_id,
        instrument_id,
        name: fields.name,
        ticker: fields.ticker,
        cusip: fields.cusip,
        quantity: fields.quantity,
        market_value: fields.market_value,
        weight: fields.weight,
        ownership: fields.ownership,
        category: fields.category,
        as_of,
    }))
}
