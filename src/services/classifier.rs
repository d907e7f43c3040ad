use std::collections::{btree_map::Entry, BTreeMap};

use clap::ValueEnum;
use itertools::Itertools;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    errors::SnapshotError,
    models::{
        position::{Position, PositionKey, Snapshot},
        position_change::{ChangeAggregate, ChangeKind, PositionChange},
    },
    services::parsers::normalize_name,
};

pub const DEFAULT_MATERIALITY_THRESHOLD: Decimal = dec!(0.5);

/// What to do when a snapshot lists the same holder and instrument more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DuplicatePolicy {
    /// Fail the comparison.
    #[default]
    Reject,
    /// Keep the row with the larger market value.
    KeepLargest,
    /// Add quantities and values together.
    Sum,
    /// The row read last replaces earlier ones.
    LastWins,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyOptions {
    /// Fractional change a position must exceed to count as increased or decreased.
    pub threshold: Decimal,
    pub on_duplicate: DuplicatePolicy,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        ClassifyOptions {
            threshold: DEFAULT_MATERIALITY_THRESHOLD,
            on_duplicate: DuplicatePolicy::default(),
        }
    }
}

/// Result of comparing two snapshots.
///
/// Every key of either snapshot ends up in exactly one place: a change, `unchanged`,
/// or `zero_prior` (held in both snapshots but with no prior value to compare against).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    pub changes: Vec<PositionChange>,
    pub unchanged: Vec<PositionKey>,
    pub zero_prior: Vec<PositionKey>,
}

impl Classification {
    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &PositionChange> {
        self.changes.iter().filter(move |change| change.kind == kind)
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.of_kind(kind).count()
    }
}

/// Indexes a snapshot by position key, applying `policy` to repeated keys.
pub fn index_snapshot(
    snapshot: &Snapshot,
    policy: DuplicatePolicy,
) -> Result<BTreeMap<PositionKey, Position>, SnapshotError> {
    let mut index: BTreeMap<PositionKey, Position> = BTreeMap::new();

    for position in snapshot.positions() {
        if position.market_value < dec!(0) || position.quantity < dec!(0) {
            return Err(SnapshotError::NegativeValue {
                holder_id: position.holder_id.clone(),
                instrument_id: position.instrument_id.clone(),
            });
        }

        match index.entry(position.key()) {
            Entry::Vacant(slot) => {
                slot.insert(position.clone());
            }
            Entry::Occupied(mut slot) => {
                debug!(
                    "Duplicate position {} / {}",
                    position.holder_id, position.instrument_id
                );
                match policy {
                    DuplicatePolicy::Reject => {
                        return Err(SnapshotError::DuplicateKey {
                            holder_id: position.holder_id.clone(),
                            instrument_id: position.instrument_id.clone(),
                        })
                    }
                    DuplicatePolicy::KeepLargest => {
                        if position.market_value > slot.get().market_value {
                            slot.insert(position.clone());
                        }
                    }
                    DuplicatePolicy::Sum => {
                        let existing = slot.get_mut();
                        let overflow = || SnapshotError::ValueOverflow {
                            holder_id: position.holder_id.clone(),
                            instrument_id: position.instrument_id.clone(),
                        };
                        existing.quantity = existing
                            .quantity
                            .checked_add(position.quantity)
                            .ok_or_else(overflow)?;
                        existing.market_value = existing
                            .market_value
                            .checked_add(position.market_value)
                            .ok_or_else(overflow)?;
                        existing.weight = existing
                            .weight
                            .checked_add(position.weight)
                            .ok_or_else(overflow)?;
                        existing.ownership = existing
                            .ownership
                            .checked_add(position.ownership)
                            .ok_or_else(overflow)?;
                    }
                    DuplicatePolicy::LastWins => {
                        slot.insert(position.clone());
                    }
                }
            }
        }
    }

    Ok(index)
}

fn change(kind: ChangeKind, source: &Position) -> PositionChange {
    PositionChange {
        kind,
        holder_id: source.holder_id.clone(),
        instrument_id: source.instrument_id.clone(),
        name: source.name.clone(),
        ticker: source.ticker.clone(),
        category: source.category.clone(),
        prior_value: None,
        current_value: None,
        pct_change: None,
    }
}

/// Classifies every position of `prior` and `current` as opened, closed, increased,
/// decreased or unchanged.
///
/// Changes come out grouped by kind (opened, closed, increased, decreased) and in key
/// order within each kind, so the result does not depend on row order.
pub fn classify(
    prior: &Snapshot,
    current: &Snapshot,
    options: &ClassifyOptions,
) -> Result<Classification, SnapshotError> {
    if options.threshold < dec!(0) {
        return Err(SnapshotError::InvalidThreshold(options.threshold.to_string()));
    }
    if prior.is_empty() || current.is_empty() {
        warn!(
            "Comparing against an empty snapshot ({} prior, {} current positions)",
            prior.len(),
            current.len()
        );
    }

    let prior_index = index_snapshot(prior, options.on_duplicate)?;
    let current_index = index_snapshot(current, options.on_duplicate)?;

    let mut opened = vec![];
    let mut closed = vec![];
    let mut increased = vec![];
    let mut decreased = vec![];
    let mut classification = Classification::default();

    for (key, now) in &current_index {
        match prior_index.get(key) {
            None => opened.push(PositionChange {
                current_value: Some(now.market_value),
                ..change(ChangeKind::Opened, now)
            }),
            Some(before) if before.market_value == dec!(0) => {
                classification.zero_prior.push(key.clone());
            }
            Some(before) => {
                // both values are non-negative and the prior is positive, so only an
                // increase too large for Decimal can fail to produce a ratio
                let pct_change = now
                    .market_value
                    .checked_sub(before.market_value)
                    .and_then(|delta| delta.checked_div(before.market_value));
                let kind = match pct_change {
                    None => ChangeKind::Increased,
                    Some(pct) if pct > options.threshold => ChangeKind::Increased,
                    Some(pct) if pct < -options.threshold => ChangeKind::Decreased,
                    Some(_) => {
                        classification.unchanged.push(key.clone());
                        continue;
                    }
                };
                // increases describe the new position, decreases the old one
                let source = if kind == ChangeKind::Increased { now } else { before };
                let entry = PositionChange {
                    prior_value: Some(before.market_value),
                    current_value: Some(now.market_value),
                    pct_change,
                    ..change(kind, source)
                };
                if kind == ChangeKind::Increased {
                    increased.push(entry);
                } else {
                    decreased.push(entry);
                }
            }
        }
    }

    for (key, before) in &prior_index {
        if !current_index.contains_key(key) {
            closed.push(PositionChange {
                prior_value: Some(before.market_value),
                ..change(ChangeKind::Closed, before)
            });
        }
    }

    classification.changes = opened
        .into_iter()
        .chain(closed)
        .chain(increased)
        .chain(decreased)
        .collect();

    let rekeyed = rekeyed_positions(&classification);
    if !rekeyed.is_empty() {
        warn!(
            "{} positions were closed and reopened under a different identifier; \
             the sources may key instruments differently",
            rekeyed.len()
        );
    }
    Ok(classification)
}

/// A closed and an opened position of one holder that look like the same security
/// keyed two different ways, e.g. by CUSIP in one quarter and by ticker in the next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RekeyedPosition {
    pub holder_id: String,
    pub closed_instrument_id: String,
    pub opened_instrument_id: String,
}

fn same_security(closed: &PositionChange, opened: &PositionChange) -> bool {
    let same_ticker =
        !closed.ticker.is_empty() && closed.ticker.eq_ignore_ascii_case(&opened.ticker);
    let closed_name = normalize_name(&closed.name);
    same_ticker || (!closed_name.is_empty() && closed_name == normalize_name(&opened.name))
}

/// Closed/opened pairs of the same holder sharing a ticker or name but not a key.
pub fn rekeyed_positions(classification: &Classification) -> Vec<RekeyedPosition> {
    let opened: Vec<&PositionChange> = classification.of_kind(ChangeKind::Opened).collect();
    classification
        .of_kind(ChangeKind::Closed)
        .flat_map(|closed| {
            opened
                .iter()
                .filter(move |opened| {
                    opened.holder_id == closed.holder_id && same_security(closed, opened)
                })
                .map(move |opened| RekeyedPosition {
                    holder_id: closed.holder_id.clone(),
                    closed_instrument_id: closed.instrument_id.clone(),
                    opened_instrument_id: opened.instrument_id.clone(),
                })
        })
        .collect()
}

/// Sums changes of one kind per instrument, most widely shared first.
pub fn aggregate_changes(changes: &[PositionChange], kind: ChangeKind) -> Vec<ChangeAggregate> {
    let grouped = changes
        .iter()
        .filter(|change| change.kind == kind)
        .into_group_map_by(|change| change.instrument_id.clone());

    let mut aggregates: Vec<ChangeAggregate> = grouped
        .into_iter()
        .map(|(instrument_id, group)| {
            let first = group[0];
            let count = Decimal::from(group.len());
            // totals saturate at Decimal::MAX rather than overflow
            let sum = |value: fn(&PositionChange) -> Option<Decimal>| {
                group
                    .iter()
                    .filter_map(|change| value(change))
                    .fold(dec!(0), |total, v| total.saturating_add(v))
            };

            let total_value = sum(|change| Some(change.reported_value()));
            let (avg_pct_change, total_dollar_change) = match kind {
                ChangeKind::Increased | ChangeKind::Decreased => {
                    let with_pct = group.iter().filter(|change| change.pct_change.is_some()).count();
                    let avg_pct_change = (with_pct > 0)
                        .then(|| sum(|change| change.pct_change) / Decimal::from(with_pct));
                    (avg_pct_change, Some(sum(PositionChange::dollar_change)))
                }
                ChangeKind::Opened | ChangeKind::Closed => (None, None),
            };

            ChangeAggregate {
                kind,
                instrument_id,
                name: first.name.clone(),
                ticker: first.ticker.clone(),
                category: first.category.clone(),
                holder_count: group.len(),
                holders: group
                    .iter()
                    .map(|change| change.holder_id.clone())
                    .sorted()
                    .collect(),
                total_prior_value: sum(|change| change.prior_value),
                total_current_value: sum(|change| change.current_value),
                total_value,
                avg_position_size: total_value / count,
                avg_pct_change,
                total_dollar_change,
            }
        })
        .collect();

    aggregates.sort_by(|a, b| {
        b.holder_count
            .cmp(&a.holder_count)
            .then_with(|| b.total_value.cmp(&a.total_value))
            .then_with(|| a.instrument_id.cmp(&b.instrument_id))
    });
    aggregates
}

/// Aggregated view of a comparison, one ranked list per change kind.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeReport {
    pub threshold: Decimal,
    pub prior_positions: usize,
    pub current_positions: usize,
    pub unchanged: usize,
    pub zero_prior: usize,
    /// Classified positions per kind, before aggregation and truncation.
    pub position_counts: BTreeMap<ChangeKind, usize>,
    pub opened: Vec<ChangeAggregate>,
    pub closed: Vec<ChangeAggregate>,
    pub increased: Vec<ChangeAggregate>,
    pub decreased: Vec<ChangeAggregate>,
}

impl ChangeReport {
    pub fn new(
        prior: &Snapshot,
        current: &Snapshot,
        classification: &Classification,
        options: &ClassifyOptions,
        top: Option<usize>,
    ) -> Self {
        let ranked = |kind| {
            let mut aggregates = aggregate_changes(&classification.changes, kind);
            if let Some(top) = top {
                aggregates.truncate(top);
            }
            aggregates
        };
        ChangeReport {
            threshold: options.threshold,
            prior_positions: prior.len(),
            current_positions: current.len(),
            unchanged: classification.unchanged.len(),
            zero_prior: classification.zero_prior.len(),
            position_counts: ChangeKind::ALL
                .iter()
                .map(|kind| (*kind, classification.count(*kind)))
                .collect(),
            opened: ranked(ChangeKind::Opened),
            closed: ranked(ChangeKind::Closed),
            increased: ranked(ChangeKind::Increased),
            decreased: ranked(ChangeKind::Decreased),
        }
    }

    pub fn aggregates(&self, kind: ChangeKind) -> &[ChangeAggregate] {
        match kind {
            ChangeKind::Opened => &self.opened,
            ChangeKind::Closed => &self.closed,
            ChangeKind::Increased => &self.increased,
            ChangeKind::Decreased => &self.decreased,
        }
    }
}
