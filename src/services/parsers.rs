use std::{str::FromStr, sync::LazyLock};

use chrono::prelude::*;
use deunicode::deunicode;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{errors::RowError, services::columns::FieldRole};

static AMOUNT_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s$€£,%]").expect("valid amount regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Parses a loosely formatted numeric cell such as `$1,200K`, `(3,000)` or `12.5%`.
///
/// Blank cells, `-` and `N/A` count as zero. A trailing `K`, `M` or `B` scales the
/// number by a thousand, a million or a billion; parentheses mark a negative amount.
pub fn parse_amount(raw: &str, field: FieldRole) -> Result<Decimal, RowError> {
    let invalid = || RowError::InvalidNumber {
        field,
        raw: raw.to_string(),
    };

    let mut cleaned = AMOUNT_NOISE.replace_all(raw, "").to_uppercase();
    if cleaned.is_empty() || cleaned == "-" || cleaned == "N/A" || cleaned == "NA" {
        return Ok(dec!(0));
    }

    let mut negative = false;
    if cleaned.starts_with('(') && cleaned.ends_with(')') {
        negative = true;
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }
    if let Some(stripped) = cleaned.strip_prefix('-') {
        negative = !negative;
        cleaned = stripped.to_string();
    }

    let multiplier = match cleaned.chars().last() {
        Some('K') => dec!(1_000),
        Some('M') => dec!(1_000_000),
        Some('B') => dec!(1_000_000_000),
        _ => dec!(1),
    };
    if multiplier != dec!(1) {
        cleaned.pop();
    }

    let amount = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| invalid())?
        .checked_mul(multiplier)
        .ok_or_else(invalid)?;

    Ok(if negative { -amount } else { amount })
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, RowError> {
    let trimmed = raw.trim();
    let formats = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d", "%Y%m%d"];
    for format in formats.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    // provider timestamps like 2025-05-15 16:04:11
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(timestamp.date());
    }
    Err(RowError::InvalidDate {
        raw: raw.to_string(),
    })
}

/// Canonical form of a free-text security name used as an identity key.
pub fn normalize_name(name: &str) -> String {
    let ascii = deunicode(name).to_uppercase();
    WHITESPACE.replace_all(ascii.trim(), " ").to_string()
}

/// Derives a holder name from an import file name, e.g. `baker_bros.csv` → `Baker Bros`.
pub fn holder_from_file_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    stem.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
