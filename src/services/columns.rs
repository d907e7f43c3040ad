use std::{collections::HashMap, fmt, str::FromStr};

use anyhow::anyhow;
use csv::StringRecord;

use crate::errors::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldRole {
    Holder,
    InstrumentName,
    Ticker,
    Cusip,
    Quantity,
    MarketValue,
    Weight,
    Ownership,
    Category,
    AsOf,
}

impl FieldRole {
    pub const ALL: [FieldRole; 10] = [
        FieldRole::Holder,
        FieldRole::InstrumentName,
        FieldRole::Ticker,
        FieldRole::Cusip,
        FieldRole::Quantity,
        FieldRole::MarketValue,
        FieldRole::Weight,
        FieldRole::Ownership,
        FieldRole::Category,
        FieldRole::AsOf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::Holder => "holder",
            FieldRole::InstrumentName => "instrument_name",
            FieldRole::Ticker => "ticker",
            FieldRole::Cusip => "cusip",
            FieldRole::Quantity => "quantity",
            FieldRole::MarketValue => "market_value",
            FieldRole::Weight => "weight",
            FieldRole::Ownership => "ownership",
            FieldRole::Category => "category",
            FieldRole::AsOf => "as_of",
        }
    }

    /// Known header names for this role, lower case. Earlier entries win.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            FieldRole::Holder => &["fund_name", "fund", "holder", "manager", "filer"],
            FieldRole::InstrumentName => &[
                "company",
                "issuer",
                "issuer name",
                "security name",
                "name",
                "securityname",
                "name of issuer",
            ],
            FieldRole::Ticker => &["ticker", "symbol", "sym", "stock symbol", "security symbol"],
            FieldRole::Cusip => &["cusip", "securitycusip", "security cusip"],
            FieldRole::Quantity => &[
                "shares",
                "quantity",
                "shares held",
                "position",
                "shares owned",
                "sharesnumber",
            ],
            FieldRole::MarketValue => &[
                "value",
                "market value",
                "fair value",
                "position value",
                "market cap",
                "value ($000)",
                "value (000s)",
                "marketvalue",
            ],
            FieldRole::Weight => &[
                "weight",
                "percent",
                "%",
                "portfolio %",
                "% of portfolio",
                "allocation",
            ],
            FieldRole::Ownership => &["ownership", "% ownership"],
            FieldRole::Category => &["industry", "sector", "industrytitle", "category"],
            FieldRole::AsOf => &["date", "as of", "report date", "period"],
        }
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        FieldRole::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| anyhow!("Unknown column role '{}'", s))
    }
}

/// Explicit role → header assignments given by the caller.
#[derive(Debug, Clone, Default)]
pub struct ColumnOverrides(HashMap<FieldRole, String>);

impl ColumnOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: FieldRole, column: &str) -> Self {
        self.0.insert(role, column.to_string());
        self
    }

    /// Parses `role=Header` pairs as given on the command line.
    pub fn from_pairs(pairs: &[String]) -> anyhow::Result<Self> {
        let mut overrides = Self::new();
        for pair in pairs {
            let (role, column) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected role=Header, got '{}'", pair))?;
            overrides.0.insert(role.parse()?, column.trim().to_string());
        }
        Ok(overrides)
    }
}

/// Resolved header positions for one tabular source.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    indices: HashMap<FieldRole, usize>,
}

impl ColumnMapping {
    /// Matches headers against the synonym table, then applies overrides on top.
    pub fn resolve(headers: &StringRecord, overrides: &ColumnOverrides) -> Result<Self, LoadError> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|header| header.trim().to_lowercase())
            .collect();

        let mut indices = HashMap::new();
        for role in FieldRole::ALL {
            let found = role
                .synonyms()
                .iter()
                .find_map(|synonym| normalized.iter().position(|header| header == synonym));
            if let Some(index) = found {
                indices.insert(role, index);
            }
        }

        for (role, column) in &overrides.0 {
            let wanted = column.trim().to_lowercase();
            let index = normalized
                .iter()
                .position(|header| *header == wanted)
                .ok_or_else(|| LoadError::UnknownColumn {
                    role: *role,
                    column: column.clone(),
                })?;
            indices.insert(*role, index);
        }

        let mapping = ColumnMapping { indices };
        if !mapping.has(FieldRole::InstrumentName)
            && !mapping.has(FieldRole::Ticker)
            && !mapping.has(FieldRole::Cusip)
        {
            return Err(LoadError::MissingInstrumentColumn);
        }
        Ok(mapping)
    }

    pub fn has(&self, role: FieldRole) -> bool {
        self.indices.contains_key(&role)
    }

    pub fn index(&self, role: FieldRole) -> Option<usize> {
        self.indices.get(&role).copied()
    }

    /// Trimmed cell for `role`, `None` when unmapped or blank.
    pub fn get<'r>(&self, record: &'r StringRecord, role: FieldRole) -> Option<&'r str> {
        self.index(role)
            .and_then(|index| record.get(index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
