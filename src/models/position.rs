use std::collections::BTreeSet;

use chrono::NaiveDate;
use clap::ValueEnum;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::services::parsers::normalize_name;

/// Identity of a position within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PositionKey {
    pub holder_id: String,
    pub instrument_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub holder_id: String,
    pub instrument_id: String,
    pub name: String,
    pub ticker: String,
    pub cusip: String,
    pub quantity: Decimal,
    pub market_value: Decimal,
    pub weight: Decimal,
    pub ownership: Decimal,
    pub category: Option<String>,
    pub as_of: NaiveDate,
}

impl Position {
    pub fn key(&self) -> PositionKey {
        PositionKey {
            holder_id: self.holder_id.clone(),
            instrument_id: self.instrument_id.clone(),
        }
    }

    /// Human readable label, `Company (TICKER)` when both are known.
    pub fn label(&self) -> String {
        match (self.name.is_empty(), self.ticker.is_empty()) {
            (false, false) => format!("{} ({})", self.name, self.ticker),
            (false, true) => self.name.clone(),
            (true, false) => self.ticker.clone(),
            (true, true) => self.instrument_id.clone(),
        }
    }
}

/// How the instrument half of a position key is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IdentityStrategy {
    /// CUSIP, then ticker, then normalized company name.
    #[default]
    Auto,
    /// Normalized company name only, matching older exports.
    Name,
}

impl IdentityStrategy {
    pub fn instrument_id(&self, name: &str, ticker: &str, cusip: &str) -> Option<String> {
        let name = normalize_name(name);
        let candidates = match self {
            IdentityStrategy::Auto => vec![cusip.trim().to_uppercase(), ticker.trim().to_uppercase(), name],
            IdentityStrategy::Name => vec![name],
        };
        candidates.into_iter().find(|candidate| !candidate.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    as_of: Option<NaiveDate>,
    positions: Vec<Position>,
}

impl Snapshot {
    pub fn new(as_of: Option<NaiveDate>, positions: Vec<Position>) -> Self {
        let as_of = as_of.or_else(|| positions.first().map(|position| position.as_of));
        Snapshot { as_of, positions }
    }

    pub fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn holders(&self) -> BTreeSet<&str> {
        self.positions
            .iter()
            .map(|position| position.holder_id.as_str())
            .collect()
    }

    pub fn total_value(&self) -> Decimal {
        self.positions
            .iter()
            .fold(dec!(0), |total, position| total.saturating_add(position.market_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_identity_prefers_stable_identifiers() {
        let strategy = IdentityStrategy::Auto;
        assert_eq!(
            strategy.instrument_id("Apple Inc", "aapl", "037833100"),
            Some("037833100".to_string())
        );
        assert_eq!(
            strategy.instrument_id("Apple Inc", "aapl", " "),
            Some("AAPL".to_string())
        );
        assert_eq!(
            strategy.instrument_id("Apple  Inc", "", ""),
            Some("APPLE INC".to_string())
        );
        assert_eq!(strategy.instrument_id("", "", ""), None);
    }

    #[test]
    fn name_identity_ignores_ticker() {
        assert_eq!(
            IdentityStrategy::Name.instrument_id("Apple Inc", "AAPL", "037833100"),
            Some("APPLE INC".to_string())
        );
        assert_eq!(IdentityStrategy::Name.instrument_id("", "AAPL", ""), None);
    }
}
