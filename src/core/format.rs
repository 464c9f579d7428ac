//! Korean-locale number display and the matching parse.

/// Thousands separator used by the `ko-KR` locale.
pub const GROUPING_SEPARATOR: char = ',';

/// Display rounds fractions to this many digits.
pub const MAX_FRACTION_DIGITS: usize = 3;

pub fn strip_grouping(raw: &str) -> String {
    raw.replace(GROUPING_SEPARATOR, "")
}

/// Parses separator-free text as a finite decimal number.
pub fn parse_number(text: &str) -> Option<f64> {
    let value = text.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Formats `value` for a form field. Zero renders as an empty field.
pub fn format_grouped(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return String::new();
    }

    let fixed = format!("{:.*}", MAX_FRACTION_DIGITS, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if value.is_sign_negative() {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(GROUPING_SEPARATOR);
        }
        out.push(ch);
    }
    out
}
