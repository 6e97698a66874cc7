//! Utility functions for Logfolio.

use rand::Rng;

/// Placeholder shown instead of an amount when currency blurring is on.
pub const BLURRED_CURRENCY: &str = "••••••";

const ID_SUFFIX_LEN: usize = 9;

/// Generate a record id of the form `<prefix>_<unix millis>_<9 base36 chars>`.
pub fn generate_id(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| std::char::from_digit(rng.gen_range(0..36), 36).unwrap_or('0'))
        .collect();
    format!("{prefix}_{millis}_{suffix}")
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Uses character boundaries, so multi-byte text is never split.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let truncated = &s[..idx];
            format!("{}...", truncated.trim_end())
        }
        None => s.to_string(),
    }
}

/// Parse the leading decimal number of `s`, ignoring trailing garbage.
///
/// `"12.5%"` parses as `12.5`; text without a leading number yields `None`.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let digits_in = |mut i: usize| {
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if end < len && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let int_start = end;
    end = digits_in(end);
    let mut mantissa_digits = end - int_start;

    if end < len && bytes[end] == b'.' {
        let frac_end = digits_in(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }

    if end < len && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < len && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let exp_end = digits_in(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// Parse the leading integer of `s`, ignoring trailing garbage (`"5.9"` → `5`).
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

/// Format an amount as US dollars with two decimals and thousands separators.
///
/// Returns [`BLURRED_CURRENCY`] when `blurred` is set.
pub fn format_currency(value: f64, blurred: bool) -> String {
    if blurred {
        return BLURRED_CURRENCY.to_string();
    }
    if !value.is_finite() {
        return format!("${value}");
    }

    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id("stock");
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "stock");
        assert!(parts[1].parse::<i64>().unwrap() > 1_600_000_000_000);
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generate_id_with_compound_prefix() {
        let id = generate_id("stock_strategy");
        assert!(id.starts_with("stock_strategy_"));
        assert_ne!(id, generate_id("stock_strategy"));
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
        assert_eq!(truncate_with_ellipsis("😀😀😀😀", 2), "😀😀...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
    }

    #[test_case("10", Some(10.0) ; "integer")]
    #[test_case("  2.5", Some(2.5) ; "leading whitespace")]
    #[test_case("12.5%", Some(12.5) ; "trailing garbage")]
    #[test_case("-3", Some(-3.0) ; "negative")]
    #[test_case(".5", Some(0.5) ; "no integer part")]
    #[test_case("5.", Some(5.0) ; "no fraction digits")]
    #[test_case("1e3", Some(1000.0) ; "exponent")]
    #[test_case("2e", Some(2.0) ; "dangling exponent")]
    #[test_case("", None ; "empty")]
    #[test_case("abc", None ; "letters")]
    #[test_case("-", None ; "bare sign")]
    #[test_case(".", None ; "bare dot")]
    fn test_parse_float_prefix(input: &str, expected: Option<f64>) {
        assert_eq!(parse_float_prefix(input), expected);
    }

    #[test_case("5", Some(5) ; "plain")]
    #[test_case("5.9", Some(5) ; "truncates fraction")]
    #[test_case("-2years", Some(-2) ; "negative with suffix")]
    #[test_case("", None ; "empty")]
    #[test_case("x5", None ; "leading letter")]
    fn test_parse_int_prefix(input: &str, expected: Option<i64>) {
        assert_eq!(parse_int_prefix(input), expected);
    }

    #[test_case(0.0, "$0.00" ; "zero")]
    #[test_case(200.0, "$200.00" ; "hundreds")]
    #[test_case(1234.5, "$1,234.50" ; "thousands")]
    #[test_case(24157.65, "$24,157.65" ; "tens of thousands")]
    #[test_case(1_000_000.0, "$1,000,000.00" ; "millions")]
    #[test_case(-1234.567, "-$1,234.57" ; "negative rounds")]
    #[test_case(-0.001, "$0.00" ; "negative zero after rounding")]
    fn test_format_currency(value: f64, expected: &str) {
        assert_eq!(format_currency(value, false), expected);
    }

    #[test]
    fn test_format_currency_blurred() {
        assert_eq!(format_currency(1234.5, true), BLURRED_CURRENCY);
    }
}
