//! Display formatting for durations, counters, sizes and rates.

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// `M:SS` below an hour, `H:MM:SS` above; absent or zero is `N/A`
pub fn format_duration(seconds: Option<f64>) -> String {
    let secs = match seconds {
        // Whole seconds only
        Some(s) if s > 0.0 => s as u64,
        _ => return "N/A".to_string(),
    };
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Rounds to `digits` decimals with ties away from zero, so `1.25` keeps
/// printing as `1.3` instead of the `{:.1}` round-half-even `1.2`
fn round_half_up(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// View counts: `999`, `1.5K`, `2.5M`
pub fn format_number(num: Option<f64>) -> String {
    match num {
        Some(n) if n >= 1_000_000.0 => format!("{:.1}M", round_half_up(n / 1_000_000.0, 1)),
        Some(n) if n >= 1_000.0 => format!("{:.1}K", round_half_up(n / 1_000.0, 1)),
        Some(n) if n != 0.0 && n.is_finite() => format!("{}", n),
        _ => "0".to_string(),
    }
}

/// Base-1024 size with two decimals, e.g. `1.00 KB`
pub fn format_bytes(bytes: f64) -> String {
    if bytes <= 0.0 || !bytes.is_finite() {
        return "0 B".to_string();
    }
    // log1024(x) == log2(x) / 10, exact on powers of two
    let index = (bytes.log2() / 10.0).floor().clamp(0.0, (SIZE_UNITS.len() - 1) as f64) as usize;
    let scaled = round_half_up(bytes / 1024f64.powi(index as i32), 2);
    format!("{:.2} {}", scaled, SIZE_UNITS[index])
}

pub fn format_speed(speed: Option<f64>) -> String {
    match speed {
        Some(s) if s > 0.0 => format!("{}/s", format_bytes(s)),
        _ => "0 B/s".to_string(),
    }
}

/// Percent as the bar label shows it: `42%`, `42.5%`
pub fn format_percent(percent: f64) -> String {
    format!("{}%", percent)
}

/// `YYYYMMDD` becomes `DD/MM/YYYY`; other shapes pass through untouched
pub fn format_upload_date(date: &str) -> String {
    if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}/{}/{}", &date[6..8], &date[4..6], &date[0..4])
    } else {
        date.to_string()
    }
}
