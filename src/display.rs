//! Formatting helpers for whatever renders the dashboard.
//!
//! Nothing here draws. These functions turn stored values into the strings
//! and chart series a screen shows, so every front end formats alike.

use serde::{Deserialize, Serialize};

use crate::classifier::is_favorable;
use crate::ingest::coerce::minutes_to_clock;
use crate::types::{FreightRecord, Minutes, StayTimeRecord, WasteRecord};

/// Decimal places kept when printing chart numbers.
const CHART_DECIMALS: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    #[default]
    Number,
    /// Values are minutes.
    Time,
}

/// Zero-padded "HH:MM" (115 -> "01:55").
pub fn minutes_to_time(minutes: Minutes) -> String {
    minutes_to_clock(minutes)
}

/// One decimal and a percent sign (98.5 -> "98.5%").
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Axis / label text for a chart value.
///
/// Time values render as "H:MM" without padding the hours; numbers get
/// thousands separators.
pub fn format_chart_value(value: f64, format: ValueFormat) -> String {
    match format {
        ValueFormat::Time => {
            let value = if value.is_finite() { value } else { 0.0 };
            let mut hours = (value / 60.0).floor();
            let mut mins = (value - hours * 60.0).round();
            if mins >= 60.0 {
                hours += 1.0;
                mins -= 60.0;
            }
            format!("{}:{:02}", hours as i64, mins as i64)
        }
        ValueFormat::Number => group_thousands(value),
    }
}

/// "1234567.5" -> "1,234,567.5"; trailing fractional zeros dropped.
fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = format!("{:.*}", CHART_DECIMALS, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Difference between a bar and its reference line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variance {
    pub text: String,
    pub favorable: bool,
}

/// `bar - line` as tooltip text, e.g. "+150", "-1,200" or "+0:05 min".
pub fn format_variance(bar: f64, line: f64, format: ValueFormat, lower_is_better: bool) -> Variance {
    let diff = bar - line;
    let sign = if diff > 0.0 {
        "+"
    } else if diff < 0.0 {
        "-"
    } else {
        ""
    };
    let text = match format {
        ValueFormat::Time => format!("{}{} min", sign, format_chart_value(diff.abs(), format)),
        ValueFormat::Number => format!("{}{}", sign, group_thousands(diff.abs())),
    };
    Variance {
        text,
        favorable: is_favorable(diff, lower_is_better),
    }
}

// ---------------------------------------------------------------------------
// Chart series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub label: String,
    pub bar: f64,
    pub line: Option<f64>,
}

/// Bars with an optional reference line, plus how to read them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub bar_label: String,
    pub line_label: String,
    pub value_format: ValueFormat,
    pub lower_is_better: bool,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn variance(&self, point: &ChartPoint) -> Option<Variance> {
        point
            .line
            .map(|line| format_variance(point.bar, line, self.value_format, self.lower_is_better))
    }

    pub fn format_value(&self, value: f64) -> String {
        format_chart_value(value, self.value_format)
    }
}

/// Actual vs planned trips per day.
pub fn freight_series(records: &[FreightRecord]) -> ChartSeries {
    ChartSeries {
        bar_label: "Real".to_string(),
        line_label: "Plan".to_string(),
        value_format: ValueFormat::Number,
        lower_is_better: false,
        points: records
            .iter()
            .map(|r| ChartPoint {
                label: r.day.clone(),
                bar: r.real,
                line: Some(r.planned),
            })
            .collect(),
    }
}

/// Actual vs goal stay time per day, in minutes.
pub fn stay_time_series(records: &[StayTimeRecord]) -> ChartSeries {
    ChartSeries {
        bar_label: "Real".to_string(),
        line_label: "Meta".to_string(),
        value_format: ValueFormat::Time,
        lower_is_better: true,
        points: records
            .iter()
            .map(|r| ChartPoint {
                label: r.day.clone(),
                bar: r.real as f64,
                line: Some(r.goal as f64),
            })
            .collect(),
    }
}

pub fn waste_series(records: &[WasteRecord]) -> ChartSeries {
    ChartSeries {
        bar_label: "Real".to_string(),
        line_label: "Meta".to_string(),
        value_format: ValueFormat::Number,
        lower_is_better: true,
        points: records
            .iter()
            .map(|r| ChartPoint {
                label: r.material.clone(),
                bar: r.real,
                line: Some(r.target),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_to_time() {
        assert_eq!(minutes_to_time(115), "01:55");
        assert_eq!(minutes_to_time(0), "00:00");
        assert_eq!(minutes_to_time(1500), "25:00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(98.5), "98.5%");
        assert_eq!(format_percent(100.0), "100.0%");
        assert_eq!(format_percent(12.0), "12.0%");
    }

    #[test]
    fn test_format_chart_value_time() {
        assert_eq!(format_chart_value(65.0, ValueFormat::Time), "1:05");
        assert_eq!(format_chart_value(50.0, ValueFormat::Time), "0:50");
        assert_eq!(format_chart_value(59.6, ValueFormat::Time), "1:00");
    }

    #[test]
    fn test_format_chart_value_number() {
        assert_eq!(format_chart_value(1234.5, ValueFormat::Number), "1,234.5");
        assert_eq!(format_chart_value(3000.0, ValueFormat::Number), "3,000");
        assert_eq!(format_chart_value(1234567.0, ValueFormat::Number), "1,234,567");
        assert_eq!(format_chart_value(999.0, ValueFormat::Number), "999");
        assert_eq!(format_chart_value(-1500.25, ValueFormat::Number), "-1,500.25");
        assert_eq!(format_chart_value(0.1 + 0.2, ValueFormat::Number), "0.3");
        assert_eq!(format_chart_value(-0.0, ValueFormat::Number), "0");
    }

    #[test]
    fn test_format_variance_number() {
        let v = format_variance(3150.0, 3000.0, ValueFormat::Number, false);
        assert_eq!(v.text, "+150");
        assert!(v.favorable);

        let v = format_variance(1250.5, 800.0, ValueFormat::Number, true);
        assert_eq!(v.text, "+450.5");
        assert!(!v.favorable);
    }

    #[test]
    fn test_format_variance_time() {
        let v = format_variance(60.0, 55.0, ValueFormat::Time, true);
        assert_eq!(v.text, "+0:05 min");
        assert!(!v.favorable);

        let v = format_variance(50.0, 55.0, ValueFormat::Time, true);
        assert_eq!(v.text, "-0:05 min");
        assert!(v.favorable);

        let v = format_variance(55.0, 55.0, ValueFormat::Time, true);
        assert_eq!(v.text, "0:00 min");
        assert!(v.favorable);
    }

    #[test]
    fn test_series_builders() {
        let freight = freight_series(&[FreightRecord {
            day: "Dia 1".into(),
            planned: 3000.0,
            real: 2900.0,
        }]);
        assert!(!freight.lower_is_better);
        let v = freight.variance(&freight.points[0]).unwrap();
        assert_eq!(v.text, "-100");
        assert!(!v.favorable);

        let stay = stay_time_series(&[StayTimeRecord {
            day: "D1".into(),
            real: 65,
            goal: 60,
        }]);
        assert_eq!(stay.value_format, ValueFormat::Time);
        assert_eq!(stay.format_value(65.0), "1:05");
        assert_eq!(stay.points[0].line, Some(60.0));

        let waste = waste_series(&[WasteRecord {
            material: "Pet".into(),
            real: 150.0,
            target: 200.0,
        }]);
        assert!(waste.variance(&waste.points[0]).unwrap().favorable);
    }
}
