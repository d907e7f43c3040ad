use thiserror::Error;

use crate::services::columns::FieldRole;

/// A single row that could not be turned into a position.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("Could not parse {field} from '{raw}'")]
    InvalidNumber { field: FieldRole, raw: String },
    #[error("Could not parse date from '{raw}'")]
    InvalidDate { raw: String },
    #[error("Negative {field} is not a valid holding")]
    Negative { field: FieldRole },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No company, ticker or CUSIP column found in header")]
    MissingInstrumentColumn,
    #[error("No date column found and no snapshot date given")]
    MissingAsOf,
    #[error("Column '{column}' mapped to {role} does not exist")]
    UnknownColumn { role: FieldRole, column: String },
}

/// Violations of the snapshot invariants the classifier relies on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Duplicate position for {holder_id} / {instrument_id}")]
    DuplicateKey {
        holder_id: String,
        instrument_id: String,
    },
    #[error("Negative value for {holder_id} / {instrument_id}")]
    NegativeValue {
        holder_id: String,
        instrument_id: String,
    },
    #[error("Merged values for {holder_id} / {instrument_id} exceed the decimal range")]
    ValueOverflow {
        holder_id: String,
        instrument_id: String,
    },
    #[error("Materiality threshold must not be negative, got {0}")]
    InvalidThreshold(String),
}
