//! Utility functions and helpers

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while reading an amount typed into a form field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("Amount is empty")]
    Empty,

    #[error("Invalid amount: {text}")]
    Invalid { text: String },
}

static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([-+])?(\d{1,3}(?:,\d{3})+|\d+)?(?:\.(\d*))?$").expect("amount pattern is valid")
});

/// Group the digits of an integer string with a thousands separator
pub fn group_digits(digits: &str, separator: &str) -> String {
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push_str(&separator.chars().rev().collect::<String>());
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    result.chars().rev().collect()
}

/// Format a decimal at a fixed scale with thousands grouping
pub fn format_amount(value: Decimal, scale: u32, thousands_separator: &str, decimal_separator: &str) -> String {
    let mut rounded = value.round_dp(scale);
    rounded.rescale(scale);

    let plain = rounded.abs().to_string();
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (plain, None),
    };

    let mut out = String::new();
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    out.push_str(&group_digits(&int_part, thousands_separator));
    if let Some(frac) = frac_part {
        out.push_str(decimal_separator);
        out.push_str(&frac);
    }
    out
}

/// Parse the text of an amount field
///
/// Accepts an optional sign, comma thousands grouping, and an optional
/// fraction. Surrounding whitespace is ignored.
pub fn parse_amount_text(text: &str) -> Result<Decimal, AmountParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AmountParseError::Empty);
    }

    let caps = AMOUNT_PATTERN.captures(trimmed).ok_or_else(|| AmountParseError::Invalid {
        text: trimmed.to_string(),
    })?;

    let int_part = caps.get(2).map(|m| m.as_str().replace(',', "")).unwrap_or_default();
    let frac_part = caps.get(3).map(|m| m.as_str()).unwrap_or("");
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountParseError::Invalid { text: trimmed.to_string() });
    }

    let sign = match caps.get(1).map(|m| m.as_str()) {
        Some("-") => "-",
        _ => "",
    };
    let int_part = if int_part.is_empty() { "0".to_string() } else { int_part };
    let normalized = if frac_part.is_empty() {
        format!("{}{}", sign, int_part)
    } else {
        format!("{}{}.{}", sign, int_part, frac_part)
    };

    normalized
        .parse::<Decimal>()
        .map_err(|_| AmountParseError::Invalid { text: trimmed.to_string() })
}

/// Join the non-empty memos of split entries in order
pub fn concatenate_memos<'a, I>(memos: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    memos
        .into_iter()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits("1234567", ","), "1,234,567");
        assert_eq!(group_digits("123", ","), "123");
        assert_eq!(group_digits("1000", " "), "1 000");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(d("1234.5"), 2, ",", "."), "1,234.50");
        assert_eq!(format_amount(d("-92"), 2, ",", "."), "-92.00");
        assert_eq!(format_amount(d("0.004"), 2, ",", "."), "0.00");
        assert_eq!(format_amount(d("1500"), 0, ".", ","), "1.500");
    }

    #[test]
    fn test_parse_amount_text() {
        assert_eq!(parse_amount_text("150.00").unwrap(), d("150.00"));
        assert_eq!(parse_amount_text(" 1,234.56 ").unwrap(), d("1234.56"));
        assert_eq!(parse_amount_text("-12").unwrap(), d("-12"));
        assert_eq!(parse_amount_text(".5").unwrap(), d("0.5"));
        assert_eq!(parse_amount_text("+7.").unwrap(), d("7"));
    }

    #[test]
    fn test_parse_amount_text_rejects_garbage() {
        assert_eq!(parse_amount_text("   "), Err(AmountParseError::Empty));
        assert!(matches!(parse_amount_text("12,34"), Err(AmountParseError::Invalid { .. })));
        assert!(matches!(parse_amount_text("abc"), Err(AmountParseError::Invalid { .. })));
        assert!(matches!(parse_amount_text("-"), Err(AmountParseError::Invalid { .. })));
    }

    #[test]
    fn test_concatenate_memos() {
        assert_eq!(concatenate_memos(["rent", "", " power "]), "rent, power");
        assert_eq!(concatenate_memos(Vec::<&str>::new()), "");
    }
}
