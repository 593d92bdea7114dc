//! KPI status classification and the weighted bonus score.
//!
//! Each bonus objective is placed in one of four ordinal tiers from its
//! accumulated value and its min / sat / exc thresholds. The tiers then feed
//! a weighted composite ("Bono Planta") expressed as a 0-100 percentage and
//! a coarse label.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::BonusObjective;

/// Performance tier of a single objective, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PerformanceTier {
    Excelente,
    Satisfactorio,
    Minimo,
    Bajo,
}

impl PerformanceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excelente => "Excelente",
            Self::Satisfactorio => "Satisfactorio",
            Self::Minimo => "Minimo",
            Self::Bajo => "Bajo",
        }
    }

    /// Share of the objective's weight credited to the composite score.
    pub fn score_factor(&self) -> f64 {
        match self {
            Self::Excelente => 1.0,
            Self::Satisfactorio => 0.85,
            Self::Minimo => 0.70,
            Self::Bajo => 0.0,
        }
    }
}

impl std::fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `value` against the threshold triple.
///
/// Direction is inferred: when `exc < min` lower values are better and the
/// comparisons are `<=`, otherwise `>=`.
pub fn classify(value: f64, min: f64, sat: f64, exc: f64) -> PerformanceTier {
    let lower_is_better = exc < min;

    if lower_is_better {
        if value <= exc {
            PerformanceTier::Excelente
        } else if value <= sat {
            PerformanceTier::Satisfactorio
        } else if value <= min {
            PerformanceTier::Minimo
        } else {
            PerformanceTier::Bajo
        }
    } else if value >= exc {
        PerformanceTier::Excelente
    } else if value >= sat {
        PerformanceTier::Satisfactorio
    } else if value >= min {
        PerformanceTier::Minimo
    } else {
        PerformanceTier::Bajo
    }
}

/// Coarse label of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositeLabel {
    Alto,
    Medio,
    Bajo,
}

impl CompositeLabel {
    fn from_percentage(percentage: f64) -> Self {
        if percentage >= 95.0 {
            Self::Alto
        } else if percentage >= 80.0 {
            Self::Medio
        } else {
            Self::Bajo
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alto => "Alto",
            Self::Medio => "Medio",
            Self::Bajo => "Bajo",
        }
    }
}

impl std::fmt::Display for CompositeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeScore {
    /// Rounded, capped at 100.
    pub percentage: u32,
    pub label: CompositeLabel,
}

/// Leading-number parse: optional sign, digits, optional fraction and exponent.
fn leading_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)")
            .expect("leading number regex is valid")
    })
}

/// Parse the numeric prefix of `text` ("20%" -> 20, "12abc" -> 12, "N/A" -> None).
pub fn parse_leading_number(text: &str) -> Option<f64> {
    leading_number_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Parse a weight like `"20%"`. Non-numeric weights (`"N/A"`) return `None`
/// and are excluded from the composite entirely.
pub fn parse_weight(weight: &str) -> Option<f64> {
    parse_leading_number(&weight.replace('%', ""))
}

/// Weighted composite over all objectives with a numeric weight.
pub fn composite_score(objectives: &[BonusObjective]) -> CompositeScore {
    let mut total_score = 0.0;
    let mut total_weight = 0.0;

    for obj in objectives {
        if let Some(w) = parse_weight(&obj.weight) {
            total_weight += w;
            total_score += w * obj.status().score_factor();
        }
    }

    let percentage = if total_weight > 0.0 {
        (total_score / total_weight) * 100.0
    } else {
        0.0
    };

    CompositeScore {
        percentage: percentage.round().clamp(0.0, 100.0) as u32,
        label: CompositeLabel::from_percentage(percentage),
    }
}

/// Whether a bar-minus-goal difference is good news for the given direction.
pub fn is_favorable(diff: f64, lower_is_better: bool) -> bool {
    if lower_is_better {
        diff <= 0.0
    } else {
        diff >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObjectiveFormat, Thresholds};

    fn objective(weight: &str, thresholds: Thresholds, accumulated: f64) -> BonusObjective {
        BonusObjective::new("obj", thresholds, accumulated, weight, ObjectiveFormat::Number)
    }

    #[test]
    fn test_classify_higher_is_better() {
        assert_eq!(classify(99.5, 97.0, 98.0, 99.0), PerformanceTier::Excelente);
        assert_eq!(classify(99.0, 97.0, 98.0, 99.0), PerformanceTier::Excelente);
        assert_eq!(classify(98.0, 97.0, 98.0, 99.0), PerformanceTier::Satisfactorio);
        assert_eq!(classify(97.0, 97.0, 98.0, 99.0), PerformanceTier::Minimo);
        assert_eq!(classify(90.0, 97.0, 98.0, 99.0), PerformanceTier::Bajo);
    }

    #[test]
    fn test_classify_lower_is_better() {
        assert_eq!(classify(58.0, 65.0, 62.0, 60.0), PerformanceTier::Excelente);
        assert_eq!(classify(60.0, 65.0, 62.0, 60.0), PerformanceTier::Excelente);
        assert_eq!(classify(61.0, 65.0, 62.0, 60.0), PerformanceTier::Satisfactorio);
        assert_eq!(classify(64.0, 65.0, 62.0, 60.0), PerformanceTier::Minimo);
        assert_eq!(classify(70.0, 65.0, 62.0, 60.0), PerformanceTier::Bajo);
    }

    #[test]
    fn test_classify_equal_thresholds_is_higher_is_better() {
        // exc == min is not "lower is better"
        assert_eq!(classify(5.0, 5.0, 5.0, 5.0), PerformanceTier::Excelente);
        assert_eq!(classify(4.9, 5.0, 5.0, 5.0), PerformanceTier::Bajo);
    }

    #[test]
    fn test_classify_small_fractions() {
        // Desabasto / tasa de llenado
        assert_eq!(
            classify(0.0065, 0.0079, 0.0070, 0.0061),
            PerformanceTier::Satisfactorio
        );
    }

    #[test]
    fn test_parse_weight() {
        assert_eq!(parse_weight("20%"), Some(20.0));
        assert_eq!(parse_weight(" 12.5 %"), Some(12.5));
        assert_eq!(parse_weight("30"), Some(30.0));
        assert_eq!(parse_weight("N/A"), None);
        assert_eq!(parse_weight(""), None);
    }

    #[test]
    fn test_parse_leading_number() {
        assert_eq!(parse_leading_number("12abc"), Some(12.0));
        assert_eq!(parse_leading_number("-3.5"), Some(-3.5));
        assert_eq!(parse_leading_number(".5"), Some(0.5));
        assert_eq!(parse_leading_number("1e2x"), Some(100.0));
        assert_eq!(parse_leading_number("abc"), None);
    }

    #[test]
    fn test_composite_two_objectives() {
        let objs = vec![
            objective("20%", Thresholds::new(97.0, 98.0, 99.0), 99.5),
            objective("30%", Thresholds::new(97.0, 98.0, 99.0), 90.0),
        ];
        let score = composite_score(&objs);
        assert_eq!(score.percentage, 40);
        assert_eq!(score.label, CompositeLabel::Bajo);
    }

    #[test]
    fn test_composite_excludes_non_numeric_weight() {
        let objs = vec![
            objective("50%", Thresholds::new(97.0, 98.0, 99.0), 98.0),
            objective("N/A", Thresholds::new(97.0, 98.0, 99.0), 10.0),
        ];
        let score = composite_score(&objs);
        assert_eq!(score.percentage, 85);
        assert_eq!(score.label, CompositeLabel::Medio);
    }

    #[test]
    fn test_composite_all_excellent_is_alto() {
        let objs = vec![
            objective("40%", Thresholds::new(1.0, 2.0, 3.0), 3.0),
            objective("60%", Thresholds::new(3.0, 2.0, 1.0), 1.0),
        ];
        let score = composite_score(&objs);
        assert_eq!(score.percentage, 100);
        assert_eq!(score.label, CompositeLabel::Alto);
    }

    #[test]
    fn test_composite_no_weights_is_zero() {
        let objs = vec![objective("N/A", Thresholds::new(1.0, 2.0, 3.0), 3.0)];
        let score = composite_score(&objs);
        assert_eq!(score.percentage, 0);
        assert_eq!(score.label, CompositeLabel::Bajo);
        assert_eq!(composite_score(&[]).percentage, 0);
    }

    #[test]
    fn test_is_favorable() {
        assert!(is_favorable(5.0, false));
        assert!(!is_favorable(-5.0, false));
        assert!(is_favorable(-5.0, true));
        assert!(is_favorable(0.0, true));
        assert!(!is_favorable(5.0, true));
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(PerformanceTier::Minimo.to_string(), "Minimo");
        assert_eq!(CompositeLabel::Medio.to_string(), "Medio");
    }
}
