//! Bonus sheet: apply incoming results to existing objectives.
//!
//! Rows never create objectives. A row is matched to an objective by
//! description (exact, case-insensitive, then substring either way), and
//! only the objective's accumulated value is overwritten. The objective's
//! own format picks the coercion for the incoming value.

use super::coerce::{coerce_number, coerce_percent, coerce_text, coerce_time};
use super::workbook::{Cell, Sheet};
use crate::types::{BonusObjective, ObjectiveFormat};

const DESCRIPTION_COLUMNS: &[&str] = &["Indicador", "Description", "Descripcion"];
const RESULT_COLUMNS: &[&str] = &["Resultado", "Accumulated", "Real", "accumulated"];

/// Jaro-Winkler score above which an unmatched row's nearest objective is logged.
const NEAR_MISS_SIMILARITY: f64 = 0.75;

/// Index of the objective a description refers to.
///
/// Exact (trimmed, case-insensitive) match wins; otherwise the first
/// objective in declaration order where either description contains the
/// other. Substring matching can be ambiguous; first match wins.
pub fn match_objective(objectives: &[BonusObjective], description: &str) -> Option<usize> {
    let wanted = description.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    if let Some(idx) = objectives
        .iter()
        .position(|o| o.description.trim().to_lowercase() == wanted)
    {
        return Some(idx);
    }

    objectives.iter().position(|o| {
        let have = o.description.trim().to_lowercase();
        !have.is_empty() && (have.contains(&wanted) || wanted.contains(&have))
    })
}

/// Value to store for an objective of `format` from a raw result cell.
pub fn coerce_result(cell: &Cell, format: ObjectiveFormat) -> f64 {
    match format {
        ObjectiveFormat::Time => coerce_time(cell) as f64,
        ObjectiveFormat::Percent => coerce_percent(coerce_number(cell), format),
        ObjectiveFormat::Currency | ObjectiveFormat::Number => coerce_number(cell),
    }
}

/// Outcome of applying a bonus sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct BonusApplication {
    pub objectives: Vec<BonusObjective>,
    pub matched_rows: usize,
    pub skipped_rows: usize,
}

/// Apply every row of the bonus sheet to a copy of `current`.
///
/// Rows without a description or result, and rows that match no objective,
/// are skipped without error. Later rows win when several hit the same
/// objective.
pub fn apply_bonus_sheet(sheet: &Sheet, current: &[BonusObjective]) -> BonusApplication {
    let mut objectives = current.to_vec();
    let mut matched_rows = 0;
    let mut skipped_rows = 0;

    for row in &sheet.rows {
        let description = row.first_present(DESCRIPTION_COLUMNS).map(coerce_text);
        let result = row.first_present(RESULT_COLUMNS);

        let (description, result) = match (description, result) {
            (Some(d), Some(r)) if !d.is_empty() => (d, r),
            _ => {
                skipped_rows += 1;
                continue;
            }
        };

        match match_objective(&objectives, &description) {
            Some(idx) => {
                let target = &mut objectives[idx];
                let value = coerce_result(result, target.format);
                log::debug!(
                    "Bonus row '{}' -> '{}' = {} ({})",
                    description,
                    target.description,
                    value,
                    target.format.as_str()
                );
                target.set_accumulated(value);
                matched_rows += 1;
            }
            None => {
                if let Some(near) = closest_description(&objectives, &description) {
                    log::debug!(
                        "Bonus row '{}' matched no objective (closest: '{}')",
                        description,
                        near
                    );
                } else {
                    log::debug!("Bonus row '{}' matched no objective", description);
                }
                skipped_rows += 1;
            }
        }
    }

    BonusApplication {
        objectives,
        matched_rows,
        skipped_rows,
    }
}

/// Nearest objective description, for diagnostics only.
fn closest_description<'a>(objectives: &'a [BonusObjective], description: &str) -> Option<&'a str> {
    let wanted = description.to_lowercase();
    objectives
        .iter()
        .map(|o| {
            (
                o.description.as_str(),
                strsim::jaro_winkler(&o.description.to_lowercase(), &wanted),
            )
        })
        .filter(|(_, score)| *score >= NEAR_MISS_SIMILARITY)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(d, _)| d)
}
