use crate::invoice::MoneyValue;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Rendered in place of any value that is absent.
pub const PLACEHOLDER: &str = "—";

/// Display style for a known ISO 4217 code.
struct CurrencyStyle {
    symbol: &'static str,
    minor_digits: usize,
}

fn currency_style(code: &str) -> Option<CurrencyStyle> {
    let (symbol, minor_digits) = match code {
        "USD" => ("$", 2),
        "CAD" => ("CA$", 2),
        "AUD" => ("A$", 2),
        "NZD" => ("NZ$", 2),
        "MXN" => ("MX$", 2),
        "EUR" => ("€", 2),
        "GBP" => ("£", 2),
        "INR" => ("₹", 2),
        "CNY" => ("CN¥", 2),
        "JPY" => ("¥", 0),
        "KRW" => ("₩", 0),
        _ => return None,
    };
    Some(CurrencyStyle {
        symbol,
        minor_digits,
    })
}

/// Format a monetary value as a currency amount in `currency_code`.
///
/// - absent, empty, or non-finite values render [`PLACEHOLDER`]
/// - a string that does not read as a number is returned unchanged
/// - known codes get their symbol (`$12.50`), other well-formed codes a
///   code prefix (`SGD 12.50`), malformed codes a plain grouped number
pub fn format_currency(value: Option<&MoneyValue>, currency_code: &str) -> String {
    let Some(value) = value else {
        return PLACEHOLDER.to_string();
    };
    let amount = match (value.as_number(), value) {
        (Some(n), _) => n,
        (None, MoneyValue::Text(s)) if !s.trim().is_empty() => return s.clone(),
        (None, _) => return PLACEHOLDER.to_string(),
    };
    format_amount(amount, currency_code)
}

/// Same as [`format_currency`] for a bare number.
pub fn format_currency_number(value: f64, currency_code: &str) -> String {
    format_currency(Some(&MoneyValue::Number(value)), currency_code)
}

fn format_amount(amount: f64, currency_code: &str) -> String {
    let code = currency_code.trim().to_ascii_uppercase();

    if let Some(style) = currency_style(&code) {
        let (negative, digits) = fixed_digits(amount, style.minor_digits);
        return format!("{}{}{}", sign(negative), style.symbol, digits);
    }

    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        let (negative, digits) = fixed_digits(amount, 2);
        return format!("{}{} {}", sign(negative), code, digits);
    }

    format_plain_number(amount)
}

/// Grouped number with up to three fraction digits and no trailing zeros.
pub fn format_plain_number(value: f64) -> String {
    let (negative, digits) = fixed_digits(value, 3);
    let digits = if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        digits
    };
    format!("{}{}", sign(negative), digits)
}

fn sign(negative: bool) -> &'static str {
    if negative { "-" } else { "" }
}

/// Round half away from zero at `decimals` places. `format!` alone would
/// round exact ties to even (`0.125` to `0.12`).
pub(crate) fn round_half_away(value: f64, decimals: usize) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let scaled = value * scale;
    if scaled.is_finite() {
        scaled.round() / scale
    } else {
        value
    }
}

/// Round `value` to `decimals` places and group the integer part.
/// Returns whether the rounded value is negative, plus the unsigned digits.
fn fixed_digits(value: f64, decimals: usize) -> (bool, String) {
    let s = format!("{:.*}", decimals, round_half_away(value.abs(), decimals));
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };

    let is_zero = s.chars().all(|c| c == '0' || c == '.');
    let negative = value.is_sign_negative() && !is_zero;

    let grouped = group_thousands(int_part);
    let digits = match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    };
    (negative, digits)
}

fn group_thousands(int_part: &str) -> String {
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

/// Parse a calendar date from `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();
    let iso = format_description!("[year]-[month]-[day]");

    if let Ok(date) = Date::parse(value, iso) {
        return Some(date);
    }
    if let Ok(ts) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(ts.date());
    }
    // "2025-01-05T10:00:00" without an offset still carries a usable date
    match value.split_once(['T', ' ']) {
        Some((head, _)) => Date::parse(head, iso).ok(),
        None => None,
    }
}

/// Medium-length date, e.g. `Jan 5, 2025`.
///
/// Empty input renders [`PLACEHOLDER`]; input that is not a date is
/// returned as-is.
pub fn format_date(value: Option<&str>) -> String {
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return PLACEHOLDER.to_string();
    };
    let Some(date) = parse_date(raw) else {
        return raw.to_string();
    };

    let medium = format_description!("[month repr:short] [day padding:none], [year]");
    date.format(medium).unwrap_or_else(|_| raw.to_string())
}

pub fn compute_billing_period(start: Option<&str>, end: Option<&str>) -> String {
    let present = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());
    if !present(start) || !present(end) {
        return PLACEHOLDER.to_string();
    }
    format!("{} to {}", format_date(start), format_date(end))
}
