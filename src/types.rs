use serde::{Deserialize, Serialize};

use crate::classifier::{classify, PerformanceTier};

/// Duration in whole minutes, the canonical form of every time KPI.
pub type Minutes = u32;

/// Safety counters shown on the "Seguridad y Almacén" widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyData {
    pub days_without_accident: u32,
    pub record_days: u32,
    pub previous_record: u32,
    pub lti: u32,
    pub mti: u32,
    pub fac: u32,
}

/// Partial update for [`SafetyData`]. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafetyPatch {
    pub days_without_accident: Option<u32>,
    pub record_days: Option<u32>,
    pub previous_record: Option<u32>,
    pub lti: Option<u32>,
    pub mti: Option<u32>,
    pub fac: Option<u32>,
}

impl SafetyPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, safety: &mut SafetyData) {
        if let Some(v) = self.days_without_accident {
            safety.days_without_accident = v;
        }
        if let Some(v) = self.record_days {
            safety.record_days = v;
        }
        if let Some(v) = self.previous_record {
            safety.previous_record = v;
        }
        if let Some(v) = self.lti {
            safety.lti = v;
        }
        if let Some(v) = self.mti {
            safety.mti = v;
        }
        if let Some(v) = self.fac {
            safety.fac = v;
        }
    }
}

/// Warehouse occupancy: finished product (PT) and raw material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseData {
    pub pt_real: f64,
    pub pt_cap: f64,
    pub mat_real: f64,
    pub mat_cap: f64,
}

impl WarehouseData {
    /// Finished-product occupancy as a 0-100 percentage (0 when capacity is unset).
    pub fn pt_occupancy(&self) -> f64 {
        occupancy(self.pt_real, self.pt_cap)
    }

    pub fn mat_occupancy(&self) -> f64 {
        occupancy(self.mat_real, self.mat_cap)
    }
}

fn occupancy(real: f64, cap: f64) -> f64 {
    if cap > 0.0 {
        real / cap * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarehousePatch {
    pub pt_real: Option<f64>,
    pub pt_cap: Option<f64>,
    pub mat_real: Option<f64>,
    pub mat_cap: Option<f64>,
}

impl WarehousePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, warehouse: &mut WarehouseData) {
        if let Some(v) = self.pt_real {
            warehouse.pt_real = v;
        }
        if let Some(v) = self.pt_cap {
            warehouse.pt_cap = v;
        }
        if let Some(v) = self.mat_real {
            warehouse.mat_real = v;
        }
        if let Some(v) = self.mat_cap {
            warehouse.mat_cap = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreightRecord {
    pub day: String,
    pub planned: f64,
    pub real: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayTimeRecord {
    pub day: String,
    pub real: Minutes,
    pub goal: Minutes,
}

/// One crew's shift results. Times are kept as "HH:MM" strings for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewRecord {
    pub name: String,
    pub pdf: f64,
    pub stay_time: String,
    pub plant_time: String,
    pub pallets_average: f64,
    pub security: f64,
    pub total_sum: f64,
    pub ranking: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrewPatch {
    pub name: Option<String>,
    pub pdf: Option<f64>,
    pub stay_time: Option<String>,
    pub plant_time: Option<String>,
    pub pallets_average: Option<f64>,
    pub security: Option<f64>,
    pub total_sum: Option<f64>,
    pub ranking: Option<u32>,
}

impl CrewPatch {
    pub fn apply_to(self, crew: &mut CrewRecord) {
        if let Some(v) = self.name {
            crew.name = v;
        }
        if let Some(v) = self.pdf {
            crew.pdf = v;
        }
        if let Some(v) = self.stay_time {
            crew.stay_time = v;
        }
        if let Some(v) = self.plant_time {
            crew.plant_time = v;
        }
        if let Some(v) = self.pallets_average {
            crew.pallets_average = v;
        }
        if let Some(v) = self.security {
            crew.security = v;
        }
        if let Some(v) = self.total_sum {
            crew.total_sum = v;
        }
        if let Some(v) = self.ranking {
            crew.ranking = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteRecord {
    pub material: String,
    pub real: f64,
    pub target: f64,
}

/// Forklift downtime per line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DowntimeRecord {
    pub line: String,
    pub lost_time: Minutes,
    pub crew: String,
    pub pdf: f64,
}

/// How a bonus objective's values are entered and displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveFormat {
    Currency,
    Percent,
    Time,
    #[default]
    Number,
}

impl ObjectiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Currency => "currency",
            Self::Percent => "percent",
            Self::Time => "time",
            Self::Number => "number",
        }
    }
}

/// Minimum / satisfactory / excellent thresholds of a bonus objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min: f64,
    pub sat: f64,
    pub exc: f64,
}

impl Thresholds {
    pub fn new(min: f64, sat: f64, exc: f64) -> Self {
        Self { min, sat, exc }
    }

    /// Direction of improvement is never stored: excellent below minimum means lower wins.
    pub fn lower_is_better(&self) -> bool {
        self.exc < self.min
    }
}

/// A plant bonus objective.
///
/// `status` is a cache of [`classify`] over `accumulated` and the thresholds.
/// It is private so that every writer goes through a method that recomputes
/// it; deserialized values discard whatever status was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredObjective")]
pub struct BonusObjective {
    pub description: String,
    #[serde(flatten)]
    thresholds: Thresholds,
    accumulated: f64,
    pub weight: String,
    pub format: ObjectiveFormat,
    status: PerformanceTier,
}

impl BonusObjective {
    pub fn new(
        description: impl Into<String>,
        thresholds: Thresholds,
        accumulated: f64,
        weight: impl Into<String>,
        format: ObjectiveFormat,
    ) -> Self {
        let status = classify(accumulated, thresholds.min, thresholds.sat, thresholds.exc);
        Self {
            description: description.into(),
            thresholds,
            accumulated,
            weight: weight.into(),
            format,
            status,
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    pub fn status(&self) -> PerformanceTier {
        self.status
    }

    pub fn lower_is_better(&self) -> bool {
        self.thresholds.lower_is_better()
    }

    /// Distance from the excellent threshold (`accumulated - exc`).
    pub fn variance(&self) -> f64 {
        self.accumulated - self.thresholds.exc
    }

    pub fn set_accumulated(&mut self, accumulated: f64) {
        self.accumulated = accumulated;
        self.refresh_status();
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
        self.refresh_status();
    }

    pub fn apply_patch(&mut self, patch: BonusPatch) {
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(v) = patch.min {
            self.thresholds.min = v;
        }
        if let Some(v) = patch.sat {
            self.thresholds.sat = v;
        }
        if let Some(v) = patch.exc {
            self.thresholds.exc = v;
        }
        if let Some(v) = patch.accumulated {
            self.accumulated = v;
        }
        if let Some(v) = patch.weight {
            self.weight = v;
        }
        if let Some(v) = patch.format {
            self.format = v;
        }
        self.refresh_status();
    }

    fn refresh_status(&mut self) {
        self.status = classify(
            self.accumulated,
            self.thresholds.min,
            self.thresholds.sat,
            self.thresholds.exc,
        );
    }
}

/// Persisted / remote shape of a bonus objective. Any stored status is ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredObjective {
    description: String,
    min: f64,
    sat: f64,
    exc: f64,
    accumulated: f64,
    #[serde(default)]
    weight: String,
    #[serde(default)]
    format: ObjectiveFormat,
}

impl From<StoredObjective> for BonusObjective {
    fn from(raw: StoredObjective) -> Self {
        BonusObjective::new(
            raw.description,
            Thresholds::new(raw.min, raw.sat, raw.exc),
            raw.accumulated,
            raw.weight,
            raw.format,
        )
    }
}

/// Manual edit of one bonus objective row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BonusPatch {
    pub description: Option<String>,
    pub min: Option<f64>,
    pub sat: Option<f64>,
    pub exc: Option<f64>,
    pub accumulated: Option<f64>,
    pub weight: Option<String>,
    pub format: Option<ObjectiveFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetId {
    Safety,
    Freight,
    Downtime,
    #[serde(rename = "stayTime")]
    StayTime,
    WasteDiscipline,
    Bonus,
    Crew,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub id: WidgetId,
    pub label: String,
}

impl WidgetConfig {
    pub fn new(id: WidgetId, label: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
        }
    }
}

/// Default widget order on the dashboard.
pub fn default_layout() -> Vec<WidgetConfig> {
    vec![
        WidgetConfig::new(WidgetId::Safety, "Seguridad y Almacén"),
        WidgetConfig::new(WidgetId::Freight, "Fleteo"),
        WidgetConfig::new(WidgetId::Downtime, "Tiempo Perdido (Montacargas)"),
        WidgetConfig::new(WidgetId::StayTime, "Tiempo de Estancia"),
        WidgetConfig::new(WidgetId::WasteDiscipline, "Merma y Disciplina"),
        WidgetConfig::new(WidgetId::Bonus, "Objetivos Bono Planta"),
        WidgetConfig::new(WidgetId::Crew, "Resultados Tripulación"),
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    #[default]
    High,
    Eco,
}

impl PerformanceMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::High => Self::Eco,
            Self::Eco => Self::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stay_time_objective() -> BonusObjective {
        BonusObjective::new(
            "Tiempo de estancia",
            Thresholds::new(65.0, 62.0, 60.0),
            60.0,
            "20%",
            ObjectiveFormat::Time,
        )
    }

    #[test]
    fn test_status_computed_on_construction() {
        assert_eq!(stay_time_objective().status(), PerformanceTier::Excelente);
    }

    #[test]
    fn test_set_accumulated_recomputes_status() {
        let mut obj = stay_time_objective();
        obj.set_accumulated(70.0);
        assert_eq!(obj.status(), PerformanceTier::Bajo);
        obj.set_accumulated(63.0);
        assert_eq!(obj.status(), PerformanceTier::Minimo);
    }

    #[test]
    fn test_set_thresholds_recomputes_status() {
        let mut obj = stay_time_objective();
        obj.set_thresholds(Thresholds::new(65.0, 62.0, 55.0));
        assert_eq!(obj.status(), PerformanceTier::Satisfactorio);
    }

    #[test]
    fn test_apply_patch_recomputes_status() {
        let mut obj = stay_time_objective();
        obj.apply_patch(BonusPatch {
            accumulated: Some(64.0),
            weight: Some("25%".to_string()),
            ..Default::default()
        });
        assert_eq!(obj.status(), PerformanceTier::Minimo);
        assert_eq!(obj.weight, "25%");
    }

    #[test]
    fn test_deserialize_ignores_stored_status() {
        let json = r#"{
            "description": "Cumplimiento programas Fleteo",
            "min": 97, "sat": 98, "exc": 99,
            "accumulated": 90,
            "weight": "30%",
            "format": "percent",
            "status": "Excelente"
        }"#;
        let obj: BonusObjective = serde_json::from_str(json).unwrap();
        assert_eq!(obj.status(), PerformanceTier::Bajo);
        assert_eq!(obj.format, ObjectiveFormat::Percent);
    }

    #[test]
    fn test_serialize_is_flat_camel_case() {
        let value = serde_json::to_value(stay_time_objective()).unwrap();
        assert_eq!(value["min"], 65.0);
        assert_eq!(value["exc"], 60.0);
        assert_eq!(value["status"], "Excelente");
        assert_eq!(value["format"], "time");
    }

    #[test]
    fn test_lower_is_better_inferred() {
        assert!(stay_time_objective().lower_is_better());
        assert!(!Thresholds::new(97.0, 98.0, 99.0).lower_is_better());
    }

    #[test]
    fn test_safety_patch_merges_present_fields() {
        let mut safety = SafetyData {
            days_without_accident: 87,
            record_days: 289,
            ..Default::default()
        };
        SafetyPatch {
            lti: Some(2),
            ..Default::default()
        }
        .apply_to(&mut safety);
        assert_eq!(safety.days_without_accident, 87);
        assert_eq!(safety.lti, 2);
    }

    #[test]
    fn test_widget_id_serialization() {
        assert_eq!(serde_json::to_value(WidgetId::StayTime).unwrap(), "stayTime");
        assert_eq!(
            serde_json::to_value(WidgetId::WasteDiscipline).unwrap(),
            "waste_discipline"
        );
    }

    #[test]
    fn test_warehouse_occupancy() {
        let wh = WarehouseData {
            pt_real: 18500.0,
            pt_cap: 22000.0,
            mat_real: 0.0,
            mat_cap: 0.0,
        };
        assert!((wh.pt_occupancy() - 84.09).abs() < 0.01);
        assert_eq!(wh.mat_occupancy(), 0.0);
    }
}
