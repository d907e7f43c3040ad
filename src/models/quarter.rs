use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail};
use chrono::{Datelike, NaiveDate};

/// A calendar quarter, the reporting period of a 13F filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quarter {
    year: i32,
    quarter: u32,
}

impl Quarter {
    pub fn new(year: i32, quarter: u32) -> anyhow::Result<Self> {
        if !(1..=4).contains(&quarter) {
            bail!("Quarter must be between 1 and 4, got {}", quarter);
        }
        Ok(Quarter { year, quarter })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Quarter {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u32 {
        self.quarter
    }

    /// Last calendar day of the quarter, the date 13F holdings are reported as of.
    pub fn end_date(&self) -> NaiveDate {
        let (month, day) = match self.quarter {
            1 => (3, 31),
            2 => (6, 30),
            3 => (9, 30),
            _ => (12, 31),
        };
        NaiveDate::from_ymd_opt(self.year, month, day).unwrap_or_default()
    }

    pub fn previous(&self) -> Self {
        if self.quarter == 1 {
            Quarter {
                year: self.year - 1,
                quarter: 4,
            }
        } else {
            Quarter {
                year: self.year,
                quarter: self.quarter - 1,
            }
        }
    }

    /// File name of the combined holdings export for this quarter.
    pub fn holdings_file_name(&self) -> String {
        format!("13F_Q{}_{}", self.quarter, self.year)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{} {}", self.quarter, self.year)
    }
}

impl FromStr for Quarter {
    type Err = anyhow::Error;

    /// Accepts `2025Q1`, `2025-Q1`, `Q1 2025` and `Q1-2025`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .to_uppercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect();
        let invalid = || anyhow!("Could not parse quarter from '{}'", s);

        let (year, quarter) = if let Some(rest) = cleaned.strip_prefix('Q') {
            let (quarter, year) = rest.split_at_checked(1).ok_or_else(invalid)?;
            (year, quarter)
        } else {
            cleaned.split_once('Q').ok_or_else(invalid)?
        };

        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let quarter = quarter.parse::<u32>().map_err(|_| invalid())?;
        Quarter::new(year, quarter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        let expected = Quarter::new(2025, 1).unwrap();
        for raw in ["2025Q1", "2025-q1", "Q1 2025", "q1-2025"] {
            assert_eq!(raw.parse::<Quarter>().unwrap(), expected, "{raw}");
        }
        assert!("2025Q5".parse::<Quarter>().is_err());
        assert!("2025".parse::<Quarter>().is_err());
        assert!("Q".parse::<Quarter>().is_err());
    }

    #[test]
    fn end_dates_and_predecessors() {
        let q1 = Quarter::new(2025, 1).unwrap();
        assert_eq!(q1.end_date(), NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
        assert_eq!(q1.previous(), Quarter::new(2024, 4).unwrap());
        assert_eq!(
            q1.previous().end_date(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
        assert_eq!(Quarter::new(2024, 3).unwrap().previous().quarter(), 2);
        assert_eq!(q1.to_string(), "Q1 2025");
        assert_eq!(q1.holdings_file_name(), "13F_Q1_2025");
    }

    #[test]
    fn quarter_containing_a_date() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 14).unwrap();
        assert_eq!(Quarter::containing(date), Quarter::new(2024, 3).unwrap());
    }
}
