//! Workbook ingestion pipeline.
//!
//! Raw workbook bytes -> sheet lookup -> keyed rows -> per-field coercion ->
//! typed records. The pipeline owns no state: it hands back an
//! [`ImportOutcome`] for the state owner to commit. Bonus rows stay raw
//! until commit, because they are matched against the objectives current
//! at that moment.
//!
//! Failure is graded. A file that is not a workbook is the only error. An
//! empty sheet counts as absent, a malformed cell reads as zero, and a bonus
//! row with no matching objective is skipped.

pub mod bonus;
pub mod coerce;
pub mod mapping;
pub mod workbook;

use std::path::Path;

use crate::error::IngestError;
use crate::types::{
    BonusObjective, CrewRecord, DowntimeRecord, FreightRecord, SafetyPatch, StayTimeRecord,
    WarehousePatch, WasteRecord,
};

pub use bonus::BonusApplication;
pub use workbook::{find_sheet_containing, lookup_sheet, Cell, Row, Sheet, Workbook};

/// Collections produced by one ingestion pass. `None` means the sheet was
/// absent or empty and the current collection must be left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub safety: Option<SafetyPatch>,
    pub warehouse: Option<WarehousePatch>,
    pub freight: Option<Vec<FreightRecord>>,
    pub stay_time: Option<Vec<StayTimeRecord>>,
    pub crews: Option<Vec<CrewRecord>>,
    pub waste: Option<Vec<WasteRecord>>,
    pub downtime: Option<Vec<DowntimeRecord>>,
    /// Bonus sheet with data, applied to the live objectives on commit.
    pub bonus_sheet: Option<Sheet>,
    /// Number of sheets applied.
    pub updated_count: usize,
}

impl ImportOutcome {
    /// Readable file but no sheet yielded data.
    pub fn is_empty(&self) -> bool {
        self.updated_count == 0
    }

    /// Operator-facing summary line.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            "No se encontraron datos válidos.".to_string()
        } else {
            format!("¡Éxito! Se actualizaron {} secciones.", self.updated_count)
        }
    }

    /// Match the bonus rows against `current`. `None` without a bonus sheet.
    pub fn apply_bonus(&self, current: &[BonusObjective]) -> Option<BonusApplication> {
        let sheet = self.bonus_sheet.as_ref()?;
        let applied = bonus::apply_bonus_sheet(sheet, current);
        log::info!(
            "Bonus sheet '{}': {} rows matched, {} skipped",
            sheet.name,
            applied.matched_rows,
            applied.skipped_rows
        );
        Some(applied)
    }
}

/// Run every registered sheet through its mapping, in a fixed order.
pub fn ingest_workbook(workbook: &Workbook) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();

    let present = |(name, aliases): (&str, &[&str])| {
        lookup_sheet(workbook, name, aliases).filter(|s| {
            if !s.has_data() {
                log::info!("Sheet '{}' has no data rows; skipped", s.name);
            }
            s.has_data()
        })
    };

    if let Some(sheet) = present(mapping::SAFETY_SHEET) {
        outcome.safety = mapping::map_safety(sheet);
        outcome.updated_count += 1;
    }

    if let Some(sheet) = present(mapping::WAREHOUSE_SHEET) {
        outcome.warehouse = mapping::map_warehouse(sheet);
        outcome.updated_count += 1;
    }

    if let Some(sheet) = present(mapping::FREIGHT_SHEET) {
        outcome.freight = Some(mapping::map_freight(sheet));
        outcome.updated_count += 1;
    }

    if let Some(sheet) = present(mapping::STAY_TIME_SHEET) {
        outcome.stay_time = Some(mapping::map_stay_time(sheet));
        outcome.updated_count += 1;
    }

    if let Some(sheet) = present(mapping::CREW_SHEET) {
        outcome.crews = Some(mapping::map_crews(sheet));
        outcome.updated_count += 1;
    }

    if let Some(sheet) = present(mapping::WASTE_SHEET) {
        outcome.waste = Some(mapping::map_waste(sheet));
        outcome.updated_count += 1;
    }

    if let Some(sheet) = present(mapping::DOWNTIME_SHEET) {
        outcome.downtime = Some(mapping::map_downtime(sheet));
        outcome.updated_count += 1;
    }

    if let Some(sheet) = find_sheet_containing(workbook, mapping::BONUS_SHEET_NEEDLES)
        .filter(|s| s.has_data())
    {
        outcome.bonus_sheet = Some(sheet.clone());
        outcome.updated_count += 1;
    }

    log::info!(
        "Ingested workbook ({} sheets): {} sections updated",
        workbook.sheets().len(),
        outcome.updated_count
    );
    outcome
}

pub fn import_bytes(bytes: &[u8]) -> Result<ImportOutcome, IngestError> {
    let workbook = Workbook::from_bytes(bytes)?;
    Ok(ingest_workbook(&workbook))
}

pub fn import_file(path: &Path) -> Result<ImportOutcome, IngestError> {
    let workbook = Workbook::open(path)?;
    Ok(ingest_workbook(&workbook))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::PerformanceTier;
    use crate::types::{ObjectiveFormat, Thresholds};

    fn objectives() -> Vec<BonusObjective> {
        vec![BonusObjective::new(
            "Cumplimiento programas Fleteo",
            Thresholds::new(97.0, 98.0, 99.0),
            98.5,
            "30%",
            ObjectiveFormat::Percent,
        )]
    }

    #[test]
    fn test_stay_time_end_to_end() {
        let wb = Workbook::from_sheets(vec![Sheet::from_rows(
            "TiempoEstancia",
            vec![Row::new(vec![
                ("day".into(), Cell::text("D1")),
                ("real".into(), Cell::text("01:05")),
                ("goal".into(), Cell::Number(0.0416)),
            ])],
        )]);
        let outcome = ingest_workbook(&wb);
        assert_eq!(outcome.updated_count, 1);
        assert_eq!(
            outcome.stay_time,
            Some(vec![StayTimeRecord {
                day: "D1".into(),
                real: 65,
                goal: 60,
            }])
        );
        assert!(outcome.freight.is_none());
    }

    #[test]
    fn test_empty_sheet_not_counted() {
        let wb = Workbook::from_sheets(vec![
            Sheet::new("Fleteo", vec!["day".into(), "planned".into()], vec![]),
            Sheet::new("Mermas", vec!["material".into()], vec![vec![Cell::Empty]]),
        ]);
        let outcome = ingest_workbook(&wb);
        assert!(outcome.is_empty());
        assert!(outcome.freight.is_none());
        assert!(outcome.waste.is_none());
        assert_eq!(outcome.summary(), "No se encontraron datos válidos.");
    }

    #[test]
    fn test_unknown_sheets_ignored() {
        let wb = Workbook::from_sheets(vec![Sheet::from_rows(
            "Notas",
            vec![Row::from_pairs(vec![("x", 1.0)])],
        )]);
        assert!(ingest_workbook(&wb).is_empty());
    }

    #[test]
    fn test_bonus_sheet_located_by_substring() {
        let wb = Workbook::from_sheets(vec![Sheet::from_rows(
            "Indicadores Planta",
            vec![Row::new(vec![
                ("Indicador".into(), Cell::text("Fleteo")),
                ("Resultado".into(), Cell::Number(0.995)),
            ])],
        )]);
        let outcome = ingest_workbook(&wb);
        let objs = outcome.apply_bonus(&objectives()).unwrap().objectives;
        assert!((objs[0].accumulated() - 99.5).abs() < 1e-9);
        assert_eq!(objs[0].status(), PerformanceTier::Excelente);
        assert_eq!(outcome.updated_count, 1);
    }

    #[test]
    fn test_bonus_sheet_with_no_matches_still_counted() {
        let wb = Workbook::from_sheets(vec![Sheet::from_rows(
            "Bono",
            vec![Row::new(vec![
                ("Indicador".into(), Cell::text("Otro")),
                ("Resultado".into(), Cell::Number(1.0)),
            ])],
        )]);
        let outcome = ingest_workbook(&wb);
        assert_eq!(outcome.updated_count, 1);
        let applied = outcome.apply_bonus(&objectives()).unwrap();
        assert_eq!(applied.objectives, objectives());
        assert_eq!(applied.skipped_rows, 1);
    }

    #[test]
    fn test_multiple_sheets_counted_independently() {
        let wb = Workbook::from_sheets(vec![
            Sheet::from_rows(
                "seguridad",
                vec![Row::from_pairs(vec![("daysWithoutAccident", 100.0)])],
            ),
            Sheet::from_rows(
                "Almacén",
                vec![Row::from_pairs(vec![("ptReal", 12000.0), ("ptCap", 22000.0)])],
            ),
            Sheet::from_rows(
                "TiempoPerdido",
                vec![Row::new(vec![
                    ("line".into(), Cell::text("LINEA001")),
                    ("lostTime".into(), Cell::Number(0.08)),
                ])],
            ),
        ]);
        let outcome = ingest_workbook(&wb);
        assert_eq!(outcome.updated_count, 3);
        assert_eq!(outcome.safety.as_ref().unwrap().days_without_accident, Some(100));
        assert_eq!(outcome.warehouse.as_ref().unwrap().pt_cap, Some(22000.0));
        assert_eq!(outcome.downtime.as_ref().unwrap()[0].lost_time, 115);
        assert!(outcome.apply_bonus(&objectives()).is_none());
        assert_eq!(outcome.summary(), "¡Éxito! Se actualizaron 3 secciones.");
    }

    #[test]
    fn test_import_bytes_unreadable() {
        let err = import_bytes(b"PK\x03\x04 broken").unwrap_err();
        assert!(matches!(err, IngestError::Unreadable(_)));
    }

    #[test]
    fn test_import_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = import_file(&dir.path().join("nope.xlsx")).unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));
    }
}
