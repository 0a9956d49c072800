// Amount parsing, small numeric helpers and the won/weeks/percent display
// formats shared by every report table.
use num_format::{Locale, ToFormattedString};

/// Currency token that exports append to amounts, e.g. `12,000원`.
pub const CURRENCY_SUFFIX: &str = "원";

/// Parse a formatted amount or quantity into `f64`.
///
/// - Removes thousands separators, the currency suffix and spaces.
/// - Returns `None` for blanks, unparseable text and non-finite values.
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .replace(',', "")
        .replace(CURRENCY_SUFFIX, "")
        .replace(' ', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `part / whole * 100`, defined as 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Round to one decimal place, halves away from zero. Display values only;
/// a tie like `0.25` gives `0.3` here, where banker's rounding gives `0.2`.
pub fn round1(n: f64) -> f64 {
    (n * 10.0).round() / 10.0
}

/// Integer part of a quantity, truncating toward zero.
pub fn trunc_i64(n: f64) -> i64 {
    n.trunc() as i64
}

/// Render a text field that arrived as a number cell, dropping `.0` on
/// integral values so product codes like `10023` stay readable.
pub fn number_to_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus `1,234,567.89`-style grouping.
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    let is_zero = res.chars().all(|c| c == '0' || c == '.');
    if neg && !is_zero {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Amount truncated to whole won with grouping, e.g. `1,234,567원`.
pub fn format_won(n: f64) -> String {
    format!("{}{}", format_int(trunc_i64(n)), CURRENCY_SUFFIX)
}

/// Amount rounded to whole won with grouping.
pub fn format_won_rounded(n: f64) -> String {
    format!("{}{}", format_number(n, 0), CURRENCY_SUFFIX)
}

/// Coverage in weeks with one decimal, e.g. `3.4주`.
pub fn format_weeks(n: f64) -> String {
    format!("{:.1}주", n)
}

/// Signed difference in weeks, e.g. `+1.2주` / `-0.8주`.
pub fn format_weeks_signed(n: f64) -> String {
    format!("{:+.1}주", n)
}

pub fn format_pct(n: f64) -> String {
    format!("{:.1}%", n)
}
