//! Size rendering for printed rows.

use crate::SizeUnit;

const HUMAN_SUFFIXES: [&str; 6] = ["K", "M", "G", "T", "P", "E"];

pub fn format_size(bytes: u64, unit: SizeUnit) -> String {
    match unit {
        SizeUnit::Bytes => bytes.to_string(),
        SizeUnit::Kilo => (bytes / 1024).to_string(),
        SizeUnit::Human => human_size(bytes),
    }
}

/// Binary-prefixed size: one decimal below 10, whole numbers above (`999`, `1.5K`, `12M`).
/// The suffix is picked after rounding, so nothing renders as `1024K`.
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        return bytes.to_string();
    }
    let mut value = bytes as f64 / 1024.0;
    let mut idx = 0;
    loop {
        let (shown, decimals) = rounded(value);
        if shown < 1024.0 || idx == HUMAN_SUFFIXES.len() - 1 {
            return format!("{:.*}{}", decimals, shown, HUMAN_SUFFIXES[idx]);
        }
        value /= 1024.0;
        idx += 1;
    }
}

/// Value as it will be printed, plus its number of decimals.
fn rounded(value: f64) -> (f64, usize) {
    let tenths = (value * 10.0).round() / 10.0;
    if tenths < 10.0 {
        (tenths, 1)
    } else {
        (value.round(), 0)
    }
}

/// One output line: size right-aligned in 12 columns, then the label.
pub fn format_row(size: &str, label: &str) -> String {
    format!("{:>12} {}", size, label)
}
