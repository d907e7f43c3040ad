use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ChangeKind {
    Opened,
    Closed,
    Increased,
    Decreased,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 4] = [
        ChangeKind::Opened,
        ChangeKind::Closed,
        ChangeKind::Increased,
        ChangeKind::Decreased,
    ];

    pub fn file_stem(&self) -> &'static str {
        match self {
            ChangeKind::Opened => "opened_positions",
            ChangeKind::Closed => "closed_positions",
            ChangeKind::Increased => "increased_positions",
            ChangeKind::Decreased => "decreased_positions",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::Opened => "opened",
            ChangeKind::Closed => "closed",
            ChangeKind::Increased => "increased",
            ChangeKind::Decreased => "decreased",
        };
        f.write_str(label)
    }
}

/// One classified difference between two snapshots for a single holder and instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionChange {
    pub kind: ChangeKind,
    pub holder_id: String,
    pub instrument_id: String,
    pub name: String,
    pub ticker: String,
    pub category: Option<String>,
    pub prior_value: Option<Decimal>,
    pub current_value: Option<Decimal>,
    pub pct_change: Option<Decimal>,
}

impl PositionChange {
    pub fn dollar_change(&self) -> Option<Decimal> {
        match (self.prior_value, self.current_value) {
            (Some(prior), Some(current)) => Some(current - prior),
            _ => None,
        }
    }

    /// The value a report shows for this change: the new value for opened and
    /// increased positions, the old one for closed and decreased positions.
    pub fn reported_value(&self) -> Decimal {
        let value = match self.kind {
            ChangeKind::Opened | ChangeKind::Increased => self.current_value,
            ChangeKind::Closed | ChangeKind::Decreased => self.prior_value,
        };
        value.unwrap_or_default()
    }
}

/// Changes of one kind summed over every holder of an instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeAggregate {
    pub kind: ChangeKind,
    pub instrument_id: String,
    pub name: String,
    pub ticker: String,
    pub category: Option<String>,
    pub holder_count: usize,
    pub holders: Vec<String>,
    pub total_prior_value: Decimal,
    pub total_current_value: Decimal,
    pub total_value: Decimal,
    pub avg_position_size: Decimal,
    pub avg_pct_change: Option<Decimal>,
    pub total_dollar_change: Option<Decimal>,
}
