use std::io::{self, Write};

use num_format::{Locale, ToFormattedString};
use owo_colors::{OwoColorize, Style};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use rust_decimal_macros::dec;

use fundwatch::services::shared::util::round_to_decimals;

pub fn confirm_action(action: &str) -> bool {
    print!("Would you like to {}? (y/n): ", action);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }

    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round().to_i64().unwrap_or_default();
    if rounded < 0 {
        format!("-$ {}", rounded.unsigned_abs().to_formatted_string(&Locale::en))
    } else {
        format!("$ {}", rounded.to_formatted_string(&Locale::en))
    }
}

/// Formats a fraction (`0.5`) as a signed, colored percentage (`+50.00 %`).
pub fn format_fraction_as_pct(fraction: Option<Decimal>) -> String {
    match fraction {
        Some(fraction) => {
            let pct = round_to_decimals(fraction * dec!(100));
            let style = if pct >= dec!(0) {
                Style::new().green().bold()
            } else {
                Style::new().red().bold()
            };
            let sign = if pct > dec!(0) { "+" } else { "" };
            format!("{}", format!("{}{:.2} %", sign, pct).style(style))
        }
        None => "-".to_string(),
    }
}

pub fn section(title: &str) {
    let heading = Style::new().black().on_white().bold();
    println!("\n{}", title.style(heading));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_dollar_amounts_with_separators() {
        assert_eq!(format_currency(dec!(1234567.4)), "$ 1,234,567");
        assert_eq!(format_currency(dec!(-2500)), "-$ 2,500");
        assert_eq!(format_currency(dec!(0)), "$ 0");
    }

    #[test]
    fn missing_percentages_render_as_dash() {
        assert_eq!(format_fraction_as_pct(None), "-");
        assert!(format_fraction_as_pct(Some(dec!(0.6))).contains("+60.00 %"));
    }
}
