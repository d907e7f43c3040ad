use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use itertools::Itertools;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::{
    models::position::{Position, Snapshot},
    services::shared::util::round_to_decimals,
};

pub const DEFAULT_TOP: usize = 25;

/// Combined holdings of all funds in one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentHolding {
    pub instrument_id: String,
    pub label: String,
    pub ticker: String,
    pub category: Option<String>,
    pub holder_count: usize,
    pub holders: Vec<String>,
    pub total_value: Decimal,
    pub avg_position_size: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedHolding {
    #[serde(flatten)]
    pub holding: InstrumentHolding,
    /// Share of the value of all positions in the snapshot, in percent.
    pub weight_pct: Decimal,
    /// Weight multiplied by the number of funds holding the instrument.
    pub consensus_score: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolderSummary {
    pub holder: String,
    pub positions: usize,
    pub total_value: Decimal,
    pub top_holding: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingsOverview {
    pub generated_at: i64,
    pub as_of: Option<NaiveDate>,
    pub holder_count: usize,
    pub unique_instruments: usize,
    pub position_count: usize,
    pub total_value: Decimal,
    pub avg_position_value: Decimal,
    pub most_held: Vec<InstrumentHolding>,
    pub top_by_value: Vec<InstrumentHolding>,
    pub weights: Vec<WeightedHolding>,
    pub holders: Vec<HolderSummary>,
}

fn instrument_holdings(snapshot: &Snapshot) -> Vec<InstrumentHolding> {
    let grouped: BTreeMap<&str, Vec<&Position>> = snapshot
        .positions()
        .iter()
        .map(|position| (position.instrument_id.as_str(), position))
        .into_group_map()
        .into_iter()
        .collect();

    grouped
        .into_iter()
        .map(|(instrument_id, positions)| {
            let first = positions[0];
            let holders: Vec<String> = positions
                .iter()
                .map(|position| position.holder_id.clone())
                .sorted()
                .dedup()
                .collect();
            let total_value = positions
                .iter()
                .fold(dec!(0), |total, position| {
                    total.saturating_add(position.market_value)
                });
            InstrumentHolding {
                instrument_id: instrument_id.to_string(),
                label: first.label(),
                ticker: first.ticker.clone(),
                category: first.category.clone(),
                holder_count: holders.len(),
                avg_position_size: total_value / Decimal::from(holders.len()),
                holders,
                total_value,
            }
        })
        .collect()
}

/// Instruments held by the most funds, larger combined value first on ties.
pub fn most_held(snapshot: &Snapshot, top: usize) -> Vec<InstrumentHolding> {
    instrument_holdings(snapshot)
        .into_iter()
        .sorted_by(|a, b| {
            b.holder_count
                .cmp(&a.holder_count)
                .then_with(|| b.total_value.cmp(&a.total_value))
                .then_with(|| a.instrument_id.cmp(&b.instrument_id))
        })
        .take(top)
        .collect()
}

/// Instruments with the largest combined value across funds.
pub fn top_by_value(snapshot: &Snapshot, top: usize) -> Vec<InstrumentHolding> {
    instrument_holdings(snapshot)
        .into_iter()
        .sorted_by(|a, b| {
            b.total_value
                .cmp(&a.total_value)
                .then_with(|| a.instrument_id.cmp(&b.instrument_id))
        })
        .take(top)
        .collect()
}

/// Portfolio weight of the top holdings by value, ranked by consensus score.
pub fn weights(snapshot: &Snapshot, top: usize) -> Vec<WeightedHolding> {
    let total = snapshot.total_value();
    top_by_value(snapshot, top)
        .into_iter()
        .map(|holding| {
            let weight_pct = if total > dec!(0) {
                round_to_decimals(holding.total_value / total * dec!(100))
            } else {
                dec!(0)
            };
            WeightedHolding {
                consensus_score: weight_pct * Decimal::from(holding.holder_count),
                weight_pct,
                holding,
            }
        })
        .sorted_by(|a, b| {
            b.consensus_score
                .cmp(&a.consensus_score)
                .then_with(|| b.holding.total_value.cmp(&a.holding.total_value))
        })
        .collect()
}

pub fn holder_summaries(snapshot: &Snapshot) -> Vec<HolderSummary> {
    snapshot
        .positions()
        .iter()
        .into_group_map_by(|position| position.holder_id.clone())
        .into_iter()
        .map(|(holder, positions)| {
            let total_value = positions
                .iter()
                .fold(dec!(0), |total, position| {
                    total.saturating_add(position.market_value)
                });
            let top_holding = positions
                .iter()
                .max_by(|a, b| a.market_value.cmp(&b.market_value))
                .map(|position| position.label())
                .unwrap_or_default();
            HolderSummary {
                holder,
                positions: positions.len(),
                total_value,
                top_holding,
            }
        })
        .sorted_by(|a, b| a.holder.cmp(&b.holder))
        .collect()
}

pub fn get_holdings_overview(snapshot: &Snapshot, top: usize) -> HoldingsOverview {
    let total_value = snapshot.total_value();
    let avg_position_value = if snapshot.is_empty() {
        dec!(0)
    } else {
        round_to_decimals(total_value / Decimal::from(snapshot.len()))
    };

    HoldingsOverview {
        generated_at: Utc::now().timestamp(),
        as_of: snapshot.as_of(),
        holder_count: snapshot.holders().len(),
        unique_instruments: instrument_holdings(snapshot).len(),
        position_count: snapshot.len(),
        total_value,
        avg_position_value,
        most_held: most_held(snapshot, top),
        top_by_value: top_by_value(snapshot, top),
        weights: weights(snapshot, top),
        holders: holder_summaries(snapshot),
    }
}
