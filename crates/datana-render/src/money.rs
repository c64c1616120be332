//! vi-VN money and number formatting
//!
//! ```rust
//! use datana_render::money::{format_compact, format_money, format_number};
//!
//! assert_eq!(format_money(1234567.0), "1.234.567 ₫");
//! assert_eq!(format_compact(2_500_000_000.0), "2.5 tỷ");
//! assert_eq!(format_number(1234.5), "1.234,5");
//! ```

/// Currency suffix
pub const DONG: &str = "₫";

/// Currency amount: the floor grouped with `.`, a positive fraction appended as `.NN`
pub fn format_money(amount: f64) -> String {
    if !amount.is_finite() {
        return format!("0 {}", DONG);
    }
    let whole = group_thousands(&format!("{:.0}", amount.floor()));
    let fraction = amount % 1.0;
    if fraction > 0.0 {
        format!("{}.{:02} {}", whole, (fraction * 100.0).round() as u64, DONG)
    } else {
        format!("{} {}", whole, DONG)
    }
}

/// Axis-label form: `x.y tỷ` from a billion, `x tr` from a million
pub fn format_compact(amount: f64) -> String {
    if amount >= 1e9 {
        format!("{:.1} tỷ", amount / 1e9)
    } else if amount >= 1e6 {
        format!("{:.0} tr", amount / 1e6)
    } else {
        format_money(amount.round())
    }
}

/// Plain number: `.` thousands, `,` decimals, at most three decimals
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".into();
    }
    let text = format!("{:.3}", value);
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');
    let grouped = group_thousands(int_part);
    if frac.is_empty() {
        grouped
    } else {
        format!("{},{}", grouped, frac)
    }
}

/// Percentage with one decimal
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) if rest.bytes().any(|b| b != b'0') => ("-", rest),
        Some(rest) => ("", rest),
        None => ("", digits),
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push_str(sign);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
