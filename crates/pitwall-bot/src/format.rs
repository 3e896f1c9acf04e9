//! Time formatting and table rendering for chat messages.
//!
//! Non-positive times mean "not set yet" in the telemetry feed and render
//! as a dash.

use comfy_table::presets::UTF8_NO_BORDERS;
use comfy_table::{ContentArrangement, Table};

const MISSING: &str = "-";

fn is_set(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0
}

/// `83.456` -> `"1:23.456"`.
pub fn seconds_to_minutes(seconds: f64) -> String {
    if !is_set(seconds) {
        return MISSING.to_string();
    }
    let millis = (seconds * 1000.0).round() as u64;
    let minutes = millis / 60_000;
    let rest = millis % 60_000;
    format!("{}:{:02}.{:03}", minutes, rest / 1000, rest % 1000)
}

/// Gap to the leader: `"+0.734"`, or `"+1:02.100"` past a minute.
pub fn seconds_to_diff(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return MISSING.to_string();
    }
    if seconds < 60.0 {
        format!("+{seconds:.3}")
    } else {
        format!("+{}", seconds_to_minutes(seconds))
    }
}

/// `3930.0` -> `"1h 05m"`.
pub fn seconds_to_hours_and_minutes(seconds: f64) -> String {
    let total = if is_set(seconds) { seconds as u64 } else { 0 };
    format!("{}h {:02}m", total / 3600, (total % 3600) / 60)
}

/// Sector split: `"23.456"`, or minutes once a sector exceeds a minute.
pub fn to_sector_time(seconds: f64) -> String {
    if !is_set(seconds) {
        return MISSING.to_string();
    }
    if seconds < 60.0 {
        format!("{seconds:.3}")
    } else {
        seconds_to_minutes(seconds)
    }
}

/// Three-letter code from the last name: `"Jane van Doe"` -> `"DOE"`.
pub fn driver_code_name(name: &str) -> String {
    name.split_whitespace()
        .last()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(3)
        .flat_map(char::to_uppercase)
        .collect()
}

/// Splits cumulative sector marks into three sector times.
///
/// `s1` and `s2_mark` are cumulative marks from the start of the lap, as
/// the feed reports them. Missing pieces come back as `-1.0`.
pub fn split_sectors(s1: f64, s2_mark: f64, lap: f64) -> [f64; 3] {
    let s2 = if s1 > 0.0 && s2_mark > 0.0 {
        s2_mark - s1
    } else {
        -1.0
    };
    let s3 = if s2 > 0.0 && lap > 0.0 {
        lap - s2 - s1
    } else {
        -1.0
    };
    [s1, s2, s3]
}

pub fn sectors_cell(sectors: [f64; 3]) -> String {
    sectors
        .iter()
        .map(|&sector| to_sector_time(sector))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn top_speed(kph: f64) -> String {
    if kph > 0.0 {
        format!("{kph:.1} km/h")
    } else {
        MISSING.to_string()
    }
}

/// Renders a borderless table for a monospaced chat block.
pub fn render_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_NO_BORDERS);
    table.set_content_arrangement(ContentArrangement::Disabled);
    if !header.is_empty() {
        table.set_header(header.iter().copied());
    }
    for row in rows {
        table.add_row(row);
    }
    table.to_string()
}
