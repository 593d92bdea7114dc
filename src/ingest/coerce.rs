//! Cell coercion: time, percent, number and text.
//!
//! Every function here is total. A cell that cannot be read as the wanted
//! kind degrades to zero (or an empty string) instead of failing the row.

use chrono::Timelike;

use super::workbook::{datetime_to_serial, Cell};
use crate::classifier::parse_leading_number;
use crate::types::{Minutes, ObjectiveFormat};

/// Minutes in one day; a serial fraction times this is minutes.
const MINUTES_PER_DAY: f64 = 1440.0;

/// Numbers strictly below this are read as fractions of a day.
///
/// A literal entry of 1 or 1.5 minutes is therefore misread as a day
/// fraction. Exactly 2.0 is literal minutes.
const SERIAL_FRACTION_LIMIT: f64 = 2.0;

/// Convert a cell to whole minutes.
///
/// In priority order: empty -> 0; date/time -> minutes of the day;
/// duration -> total minutes; "HH:MM[:SS]" text -> hours*60 + minutes;
/// a number (or numeric text) in (0, 2) -> day fraction * 1440; any other
/// number -> rounded literal minutes; anything else -> 0.
pub fn coerce_time(cell: &Cell) -> Minutes {
    match cell {
        Cell::Empty => 0,
        Cell::DateTime(dt) => {
            let minutes = dt.hour() as f64 * 60.0 + dt.minute() as f64 + dt.second() as f64 / 60.0;
            to_minutes(minutes)
        }
        Cell::Duration(minutes) => to_minutes(*minutes),
        Cell::Number(n) => number_to_minutes(*n),
        Cell::Text(s) => {
            if s.trim().is_empty() {
                return 0;
            }
            if s.contains(':') {
                if let Some(minutes) = parse_clock(s) {
                    return to_minutes(minutes);
                }
            }
            match parse_loose_number(s) {
                Some(n) => number_to_minutes(n),
                None => 0,
            }
        }
        Cell::Bool(_) => 0,
    }
}

/// `coerce_time` rendered as zero-padded "HH:MM". Hours do not wrap at 24.
pub fn format_time_string(cell: &Cell) -> String {
    minutes_to_clock(coerce_time(cell))
}

pub fn minutes_to_clock(minutes: Minutes) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Rescale a fraction in (0, 1] to 0-100 when the target format is percent.
///
/// Spreadsheets store "98%" as 0.98; dashboard percentages live on 0-100.
/// Zero and values above 1 pass through, as does every non-percent format.
pub fn coerce_percent(value: f64, format: ObjectiveFormat) -> f64 {
    if format == ObjectiveFormat::Percent && value > 0.0 && value <= 1.0 {
        value * 100.0
    } else {
        value
    }
}

/// Numeric value of a cell; malformed input is 0.
pub fn coerce_number(cell: &Cell) -> f64 {
    match cell {
        Cell::Empty => 0.0,
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Number(_) => 0.0,
        Cell::Text(s) => parse_loose_number(s).unwrap_or(0.0),
        Cell::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Cell::DateTime(dt) => datetime_to_serial(dt),
        Cell::Duration(minutes) => minutes / MINUTES_PER_DAY,
    }
}

/// Non-negative integer count (days, incidents, ranking).
pub fn coerce_count(cell: &Cell) -> u32 {
    let n = coerce_number(cell).round();
    if n <= 0.0 {
        0
    } else if n >= u32::MAX as f64 {
        u32::MAX
    } else {
        n as u32
    }
}

/// Display text of a cell. Integral numbers have no decimal point.
pub fn coerce_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => format_number(*n),
        Cell::Bool(b) => b.to_string(),
        Cell::DateTime(dt) => {
            if dt.num_seconds_from_midnight() == 0 {
                dt.format("%Y-%m-%d").to_string()
            } else {
                dt.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }
        Cell::Duration(minutes) => minutes_to_clock(to_minutes(*minutes)),
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn number_to_minutes(n: f64) -> Minutes {
    if !n.is_finite() {
        return 0;
    }
    if n > 0.0 && n < SERIAL_FRACTION_LIMIT {
        to_minutes(n * MINUTES_PER_DAY)
    } else {
        to_minutes(n)
    }
}

/// Round half up and clamp into the `Minutes` range.
fn to_minutes(minutes: f64) -> Minutes {
    if !minutes.is_finite() || minutes <= 0.0 {
        return 0;
    }
    let rounded = (minutes + 0.5).floor();
    if rounded >= Minutes::MAX as f64 {
        Minutes::MAX
    } else {
        rounded as Minutes
    }
}

/// "HH:MM" or "HH:MM:SS": leading numbers of the first two parts.
fn parse_clock(s: &str) -> Option<f64> {
    let mut parts = s.split(':');
    let hours = parse_leading_number(parts.next()?)?;
    let minutes = parse_leading_number(parts.next()?)?;
    Some(hours * 60.0 + minutes)
}

/// Whole-string numeric parse: trimmed, empty is 0, trailing junk is invalid.
fn parse_loose_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}
