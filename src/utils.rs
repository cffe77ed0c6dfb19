const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Human-readable size using 1024-based units, e.g. `1500 -> "1.46 KB"`.
///
/// The value is rounded to `decimals` places and trailing zeros are dropped,
/// so exact multiples print without a fraction (`1024 -> "1 KB"`).
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let index = (bytes.ilog(1024) as usize).min(UNITS.len() - 1);
    let scaled = bytes as f64 / 1024f64.powi(index as i32);
    // ties round away from zero: 1.125 -> 1.13
    let factor = 10f64.powi(decimals as i32);
    let rounded = (scaled * factor).round() / factor;
    format!("{} {}", trim_fraction(&format!("{rounded:.decimals$}")), UNITS[index])
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
