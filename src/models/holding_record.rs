use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position::Position;

/// One row of the flat-file layout shared by the fetch and analysis stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub fund_name: String,
    pub cik: String,
    pub company: String,
    pub ticker: String,
    pub cusip: String,
    pub shares: Decimal,
    pub value: Decimal,
    pub weight: Decimal,
    pub ownership: Decimal,
    pub date: String,
    pub filing_date: String,
    pub industry: String,
}

pub const HOLDING_RECORD_HEADER: [&str; 12] = [
    "fund_name",
    "cik",
    "company",
    "ticker",
    "cusip",
    "shares",
    "value",
    "weight",
    "ownership",
    "date",
    "filing_date",
    "industry",
];

impl From<&Position> for HoldingRecord {
    fn from(position: &Position) -> Self {
        HoldingRecord {
            fund_name: position.holder_id.clone(),
            cik: String::new(),
            company: position.name.clone(),
            ticker: position.ticker.clone(),
            cusip: position.cusip.clone(),
            shares: position.quantity,
            value: position.market_value,
            weight: position.weight,
            ownership: position.ownership,
            date: position.as_of.format("%Y-%m-%d").to_string(),
            filing_date: String::new(),
            industry: position.category.clone().unwrap_or_default(),
        }
    }
}
