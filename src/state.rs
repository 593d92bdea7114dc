//! Dashboard state owner.
//!
//! One `DashboardStore` is built at startup and shared by `Arc`. All writers
//! go through it: the admin CLI, the workbook import, the simulation ticks
//! and the remote sync loop. Each local mutation bumps `lastUpdate`, is
//! mirrored to local storage, and is announced on a broadcast channel so the
//! sync loop can push it.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::classifier::{composite_score, CompositeScore};
use crate::error::StateError;
use crate::ingest::bonus::match_objective;
use crate::ingest::ImportOutcome;
use crate::storage::LocalStorage;
use crate::types::{
    default_layout, BonusObjective, BonusPatch, CrewPatch, CrewRecord, DowntimeRecord,
    FreightRecord, MoveDirection, ObjectiveFormat, PerformanceMode, SafetyData, SafetyPatch,
    StayTimeRecord, Thresholds, WarehouseData, WarehousePatch, WasteRecord, WidgetConfig,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub const DEFAULT_ANNOUNCEMENT: &str = "⚠️ AVISO: Auditoría de Seguridad programada para el próximo Jueves. Mantener áreas despejadas. ⚠️";

// ---------------------------------------------------------------------------
// Persisted state
// ---------------------------------------------------------------------------

/// Everything the dashboard shows. Serialized as-is to local storage and to
/// the remote store. Missing keys read as empty (the remote store drops
/// empty arrays).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardState {
    pub safety: SafetyData,
    pub warehouse: WarehouseData,
    pub freight: Vec<FreightRecord>,
    pub stay_time: Vec<StayTimeRecord>,
    pub crews: Vec<CrewRecord>,
    pub waste: Vec<WasteRecord>,
    pub downtime: Vec<DowntimeRecord>,
    pub bonus_objectives: Vec<BonusObjective>,
    pub layout: Vec<WidgetConfig>,
    pub announcement: String,
    pub is_simulation_active: bool,
    pub performance_mode: PerformanceMode,
    pub last_update: DateTime<Utc>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            safety: SafetyData::default(),
            warehouse: WarehouseData::default(),
            freight: Vec::new(),
            stay_time: Vec::new(),
            crews: Vec::new(),
            waste: Vec::new(),
            downtime: Vec::new(),
            bonus_objectives: Vec::new(),
            layout: default_layout(),
            announcement: String::new(),
            is_simulation_active: false,
            performance_mode: PerformanceMode::default(),
            last_update: DateTime::<Utc>::default(),
        }
    }
}

impl DashboardState {
    /// Parse a stored or remote document. The root must be a JSON object;
    /// missing keys fall back to their defaults.
    pub fn from_json(text: &str) -> Result<Self, String> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        if !value.is_object() {
            return Err("expected a JSON object at the root".to_string());
        }
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    /// Demo data shown until a workbook is imported.
    pub fn seeded() -> Self {
        let mut rng = rand::rng();

        let freight = (1..=22)
            .map(|i| FreightRecord {
                day: format!("Dia {}", i),
                planned: 3000.0,
                real: (2800 + crate::simulation::int_between(&mut rng, 0, 399)) as f64,
            })
            .collect();

        let stay_time = (1..=22)
            .map(|i| StayTimeRecord {
                day: format!("D{}", i),
                real: (50 + crate::simulation::int_between(&mut rng, 0, 14)) as u32,
                goal: 55,
            })
            .collect();

        Self {
            safety: SafetyData {
                days_without_accident: 87,
                record_days: 289,
                previous_record: 467,
                lti: 0,
                mti: 0,
                fac: 0,
            },
            warehouse: WarehouseData {
                pt_real: 18500.0,
                pt_cap: 22000.0,
                mat_real: 4200.0,
                mat_cap: 5000.0,
            },
            freight,
            stay_time,
            crews: vec![
                seed_crew("ARMAGEDOM", 1.12, "00:50", "00:46", 14433.0, 18.0, 1),
                seed_crew("CRACKS", 1.03, "00:58", "00:53", 15606.0, 16.0, 2),
                seed_crew("GLADIADORES", 0.98, "01:05", "00:54", 20597.0, 14.0, 3),
                seed_crew("X-MEN", 1.06, "00:52", "00:45", 15980.0, 13.0, 4),
            ],
            waste: vec![
                WasteRecord {
                    material: "Pet".into(),
                    real: 1250.50,
                    target: 800.00,
                },
                WasteRecord {
                    material: "Etiqueta".into(),
                    real: 150.00,
                    target: 200.00,
                },
                WasteRecord {
                    material: "Taparrosca".into(),
                    real: 450.75,
                    target: 300.00,
                },
            ],
            downtime: vec![
                seed_downtime("LINEA001", 115, "ARMAGEDOM", 1.12),
                seed_downtime("LINEA002", 204, "CRACKS", 1.03),
                seed_downtime("LINEA003", 97, "GLADIADORES", 0.98),
                seed_downtime("LINEA004", 417, "X-MEN", 1.06),
            ],
            bonus_objectives: vec![
                BonusObjective::new(
                    "Merma producto terminado",
                    Thresholds::new(319633.0, 312974.0, 306315.0),
                    300000.0,
                    "20%",
                    ObjectiveFormat::Currency,
                ),
                BonusObjective::new(
                    "Cumplimiento programas Fleteo",
                    Thresholds::new(97.0, 98.0, 99.0),
                    98.5,
                    "30%",
                    ObjectiveFormat::Percent,
                ),
                BonusObjective::new(
                    "Tiempo de estancia",
                    Thresholds::new(65.0, 62.0, 60.0),
                    60.0,
                    "20%",
                    ObjectiveFormat::Time,
                ),
                BonusObjective::new(
                    "Desabasto / Tasa de llenado",
                    Thresholds::new(0.0079, 0.0070, 0.0061),
                    0.0065,
                    "30%",
                    ObjectiveFormat::Number,
                ),
                BonusObjective::new(
                    "Merma Materia Prima",
                    Thresholds::new(12000.0, 9000.0, 7000.0),
                    8500.0,
                    "N/A",
                    ObjectiveFormat::Currency,
                ),
            ],
            layout: default_layout(),
            announcement: DEFAULT_ANNOUNCEMENT.to_string(),
            is_simulation_active: false,
            performance_mode: PerformanceMode::High,
            last_update: Utc::now(),
        }
    }
}

fn seed_crew(
    name: &str,
    pdf: f64,
    stay_time: &str,
    plant_time: &str,
    pallets_average: f64,
    total_sum: f64,
    ranking: u32,
) -> CrewRecord {
    CrewRecord {
        name: name.to_string(),
        pdf,
        stay_time: stay_time.to_string(),
        plant_time: plant_time.to_string(),
        pallets_average,
        security: 5.0,
        total_sum,
        ranking,
    }
}

fn seed_downtime(line: &str, lost_time: u32, crew: &str, pdf: f64) -> DowntimeRecord {
    DowntimeRecord {
        line: line.to_string(),
        lost_time,
        crew: crew.to_string(),
        pdf,
    }
}

// ---------------------------------------------------------------------------
// Change notification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Safety,
    Warehouse,
    Freight,
    StayTime,
    Crews,
    Waste,
    Downtime,
    BonusObjectives,
    Layout,
    Announcement,
    Simulation,
    PerformanceMode,
    /// Several sections at once (import, remote snapshot).
    All,
}

/// Where a change came from. Remote changes are never pushed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOrigin {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEvent {
    pub section: Section,
    pub origin: ChangeOrigin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Cloud,
    #[default]
    Local,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct DashboardStore {
    state: RwLock<DashboardState>,
    storage: Option<LocalStorage>,
    sync_status: Mutex<SyncStatus>,
    events: broadcast::Sender<StoreEvent>,
}

impl DashboardStore {
    pub fn new(state: DashboardState, storage: Option<LocalStorage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(state),
            storage,
            sync_status: Mutex::new(SyncStatus::Local),
            events,
        }
    }

    /// Load from `storage`, falling back to demo data when nothing usable
    /// is stored.
    pub fn open(storage: LocalStorage) -> Self {
        let state = match storage.load() {
            Ok(Some(state)) => {
                log::info!("Loaded dashboard state from {}", storage.path().display());
                state
            }
            Ok(None) => {
                log::info!("No stored dashboard state; using demo data");
                DashboardState::seeded()
            }
            Err(e) => {
                log::warn!("Failed to load stored state: {}; using demo data", e);
                DashboardState::seeded()
            }
        };
        Self::new(state, Some(storage))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> DashboardState {
        self.state.read().clone()
    }

    pub fn sync_status(&self) -> SyncStatus {
        *self.sync_status.lock()
    }

    pub fn set_sync_status(&self, status: SyncStatus) {
        let mut guard = self.sync_status.lock();
        if *guard != status {
            log::info!("Sync status: {:?} -> {:?}", *guard, status);
            *guard = status;
        }
    }

    /// Run `f` under the write lock, then commit as a local change.
    ///
    /// `f` must check its preconditions before touching the state: an `Err`
    /// skips the commit but keeps whatever `f` already wrote.
    pub fn mutate<T>(
        &self,
        section: Section,
        f: impl FnOnce(&mut DashboardState) -> Result<T, StateError>,
    ) -> Result<T, StateError> {
        let mut state = self.state.write();
        let value = f(&mut state)?;
        state.last_update = Utc::now();
        self.persist(&state);
        drop(state);
        self.notify(section, ChangeOrigin::Local);
        Ok(value)
    }

    fn set<F: FnOnce(&mut DashboardState)>(&self, section: Section, f: F) {
        // infallible closures cannot hit the error path
        let _ = self.mutate(section, |s| {
            f(s);
            Ok(())
        });
    }

    fn persist(&self, state: &DashboardState) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save(state) {
                log::warn!("Failed to persist dashboard state: {}", e);
            }
        }
    }

    fn notify(&self, section: Section, origin: ChangeOrigin) {
        // no receivers is fine
        let _ = self.events.send(StoreEvent { section, origin });
    }

    // -- single-record updates ------------------------------------------------

    pub fn update_safety(&self, patch: SafetyPatch) {
        self.set(Section::Safety, |s| patch.apply_to(&mut s.safety));
    }

    pub fn update_warehouse(&self, patch: WarehousePatch) {
        self.set(Section::Warehouse, |s| patch.apply_to(&mut s.warehouse));
    }

    pub fn update_announcement(&self, text: &str) {
        self.set(Section::Announcement, |s| s.announcement = text.to_string());
    }

    // -- collection replacement -----------------------------------------------

    pub fn replace_freight(&self, records: Vec<FreightRecord>) {
        self.set(Section::Freight, |s| s.freight = records);
    }

    pub fn replace_stay_time(&self, records: Vec<StayTimeRecord>) {
        self.set(Section::StayTime, |s| s.stay_time = records);
    }

    pub fn replace_crews(&self, records: Vec<CrewRecord>) {
        self.set(Section::Crews, |s| s.crews = records);
    }

    pub fn replace_waste(&self, records: Vec<WasteRecord>) {
        self.set(Section::Waste, |s| s.waste = records);
    }

    pub fn replace_downtime(&self, records: Vec<DowntimeRecord>) {
        self.set(Section::Downtime, |s| s.downtime = records);
    }

    pub fn replace_bonus_objectives(&self, objectives: Vec<BonusObjective>) {
        self.set(Section::BonusObjectives, |s| s.bonus_objectives = objectives);
    }

    // -- indexed edits --------------------------------------------------------

    pub fn update_crew(&self, index: usize, patch: CrewPatch) -> Result<(), StateError> {
        self.mutate(Section::Crews, |s| {
            let len = s.crews.len();
            let crew = s.crews.get_mut(index).ok_or(StateError::IndexOutOfRange {
                collection: "crews",
                index,
                len,
            })?;
            patch.apply_to(crew);
            Ok(())
        })
    }

    /// Merge a partial edit into one objective; its status is recomputed.
    pub fn update_bonus_raw(&self, index: usize, patch: BonusPatch) -> Result<(), StateError> {
        self.mutate(Section::BonusObjectives, |s| {
            let len = s.bonus_objectives.len();
            let objective =
                s.bonus_objectives
                    .get_mut(index)
                    .ok_or(StateError::IndexOutOfRange {
                        collection: "bonusObjectives",
                        index,
                        len,
                    })?;
            objective.apply_patch(patch);
            Ok(())
        })
    }

    /// Set the accumulated value of the objective `description` refers to.
    /// Returns the index of the updated objective.
    pub fn update_bonus_result(&self, description: &str, value: f64) -> Result<usize, StateError> {
        self.mutate(Section::BonusObjectives, |s| {
            let idx = match_objective(&s.bonus_objectives, description)
                .ok_or_else(|| StateError::NoMatchingObjective(description.to_string()))?;
            s.bonus_objectives[idx].set_accumulated(value);
            Ok(idx)
        })
    }

    /// Swap a widget with its neighbour. Returns false when already at the
    /// edge in that direction.
    pub fn move_widget(&self, index: usize, direction: MoveDirection) -> Result<bool, StateError> {
        {
            let state = self.state.read();
            let len = state.layout.len();
            if index >= len {
                return Err(StateError::IndexOutOfRange {
                    collection: "layout",
                    index,
                    len,
                });
            }
            let at_edge = match direction {
                MoveDirection::Up => index == 0,
                MoveDirection::Down => index + 1 >= len,
            };
            if at_edge {
                return Ok(false);
            }
        }

        self.mutate(Section::Layout, |s| {
            let target = match direction {
                MoveDirection::Up => index.checked_sub(1),
                MoveDirection::Down => Some(index + 1).filter(|t| *t < s.layout.len()),
            };
            match target {
                Some(t) if index < s.layout.len() => {
                    s.layout.swap(index, t);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    // -- flags ----------------------------------------------------------------

    pub fn set_simulation_active(&self, active: bool) {
        log::info!("Simulation {}", if active { "started" } else { "stopped" });
        self.set(Section::Simulation, |s| s.is_simulation_active = active);
    }

    pub fn is_simulation_active(&self) -> bool {
        self.state.read().is_simulation_active
    }

    pub fn toggle_performance_mode(&self) -> PerformanceMode {
        self.mutate(Section::PerformanceMode, |s| {
            s.performance_mode = s.performance_mode.toggled();
            Ok(s.performance_mode)
        })
        .unwrap_or_default()
    }

    // -- bulk paths -----------------------------------------------------------

    /// Commit an ingestion result. Sheets that produced nothing leave their
    /// collection untouched. Bonus rows are matched against the objectives
    /// under the same write lock, so edits made since the file was read
    /// survive. The simulation is switched off so it does not overwrite
    /// imported data. Returns the number of sections updated.
    pub fn apply_import(&self, outcome: ImportOutcome) -> usize {
        if outcome.is_empty() {
            log::info!("Import produced no data; state unchanged");
            return 0;
        }
        let count = outcome.updated_count;
        self.set(Section::All, |s| {
            let bonus = outcome.apply_bonus(&s.bonus_objectives);
            if let Some(patch) = &outcome.safety {
                patch.apply_to(&mut s.safety);
            }
            if let Some(patch) = &outcome.warehouse {
                patch.apply_to(&mut s.warehouse);
            }
            if let Some(records) = outcome.freight {
                s.freight = records;
            }
            if let Some(records) = outcome.stay_time {
                s.stay_time = records;
            }
            if let Some(records) = outcome.crews {
                s.crews = records;
            }
            if let Some(records) = outcome.waste {
                s.waste = records;
            }
            if let Some(records) = outcome.downtime {
                s.downtime = records;
            }
            if let Some(applied) = bonus {
                s.bonus_objectives = applied.objectives;
            }
            s.is_simulation_active = false;
        });
        log::info!("Applied import: {} sections updated", count);
        count
    }

    /// Adopt a remote snapshot when it is strictly newer than ours.
    /// Returns whether it was applied. Not announced as a local change.
    pub fn apply_remote(&self, remote: DashboardState) -> bool {
        let mut state = self.state.write();
        if remote.last_update <= state.last_update {
            log::debug!(
                "Ignoring remote snapshot from {} (local {})",
                remote.last_update,
                state.last_update
            );
            return false;
        }
        log::info!("Applying remote snapshot from {}", remote.last_update);
        *state = remote;
        self.persist(&state);
        drop(state);
        self.notify(Section::All, ChangeOrigin::Remote);
        true
    }

    // -- derived views --------------------------------------------------------

    pub fn bonus_global(&self) -> CompositeScore {
        composite_score(&self.state.read().bonus_objectives)
    }

    /// Crew ranked 1, else the first crew, else a "-" placeholder.
    pub fn best_crew(&self) -> CrewRecord {
        let state = self.state.read();
        state
            .crews
            .iter()
            .find(|c| c.ranking == 1)
            .or_else(|| state.crews.first())
            .cloned()
            .unwrap_or_else(|| CrewRecord {
                name: "-".to_string(),
                ..CrewRecord::default()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{CompositeLabel, PerformanceTier};
    use crate::ingest::{ingest_workbook, Cell, Row, Sheet, Workbook};
    use crate::types::WidgetId;
    use chrono::Duration;

    fn store() -> DashboardStore {
        DashboardStore::new(DashboardState::seeded(), None)
    }

    #[test]
    fn test_seeded_data_shape() {
        let state = DashboardState::seeded();
        assert_eq!(state.freight.len(), 22);
        assert_eq!(state.stay_time.len(), 22);
        assert!(state
            .freight
            .iter()
            .all(|f| (2800.0..3200.0).contains(&f.real) && f.planned == 3000.0));
        assert!(state.stay_time.iter().all(|s| (50..65).contains(&s.real) && s.goal == 55));
        assert_eq!(state.crews.len(), 4);
        assert_eq!(state.bonus_objectives.len(), 5);
        assert_eq!(state.layout.len(), 7);
        assert_eq!(state.bonus_objectives[2].status(), PerformanceTier::Excelente);
    }

    #[test]
    fn test_missing_keys_deserialize_to_empty() {
        let state: DashboardState =
            serde_json::from_str(r#"{"announcement":"hola","lastUpdate":"2024-05-01T10:00:00Z"}"#)
                .unwrap();
        assert_eq!(state.announcement, "hola");
        assert!(state.freight.is_empty());
        assert_eq!(state.layout, default_layout());
    }

    #[test]
    fn test_from_json_requires_object_root() {
        assert!(DashboardState::from_json("[]").is_err());
        assert!(DashboardState::from_json("42").is_err());
        assert!(DashboardState::from_json("{ nope").is_err());
        let state = DashboardState::from_json(r#"{"announcement":"hola"}"#).unwrap();
        assert_eq!(state.announcement, "hola");
        assert!(state.crews.is_empty());
    }

    #[test]
    fn test_stored_status_is_recomputed() {
        let json = r#"{"bonusObjectives":[{"description":"Fleteo","min":97,"sat":98,"exc":99,
            "accumulated":99.5,"weight":"30%","format":"percent","status":"Bajo"}]}"#;
        let state: DashboardState = serde_json::from_str(json).unwrap();
        assert_eq!(state.bonus_objectives[0].status(), PerformanceTier::Excelente);
    }

    #[test]
    fn test_mutation_bumps_last_update_and_notifies() {
        let store = store();
        let mut rx = store.subscribe();
        let before = store.snapshot().last_update;

        store.update_announcement("Nuevo aviso");

        let after = store.snapshot();
        assert_eq!(after.announcement, "Nuevo aviso");
        assert!(after.last_update >= before);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.section, Section::Announcement);
        assert_eq!(event.origin, ChangeOrigin::Local);
    }

    #[test]
    fn test_update_safety_partial() {
        let store = store();
        store.update_safety(SafetyPatch {
            lti: Some(2),
            ..SafetyPatch::default()
        });
        let safety = store.snapshot().safety;
        assert_eq!(safety.lti, 2);
        assert_eq!(safety.days_without_accident, 87);
    }

    #[test]
    fn test_update_crew_out_of_range() {
        let store = store();
        let err = store.update_crew(9, CrewPatch::default()).unwrap_err();
        assert!(matches!(
            err,
            StateError::IndexOutOfRange {
                collection: "crews",
                index: 9,
                len: 4
            }
        ));
    }

    #[test]
    fn test_update_bonus_raw_recomputes_status() {
        let store = store();
        store
            .update_bonus_raw(
                1,
                BonusPatch {
                    accumulated: Some(96.0),
                    ..BonusPatch::default()
                },
            )
            .unwrap();
        assert_eq!(store.snapshot().bonus_objectives[1].status(), PerformanceTier::Bajo);
    }

    #[test]
    fn test_update_bonus_result_by_description() {
        let store = store();
        let idx = store.update_bonus_result("fleteo", 99.2).unwrap();
        assert_eq!(idx, 1);
        let obj = &store.snapshot().bonus_objectives[1];
        assert_eq!(obj.accumulated(), 99.2);
        assert_eq!(obj.status(), PerformanceTier::Excelente);

        assert!(matches!(
            store.update_bonus_result("Ausentismo", 1.0),
            Err(StateError::NoMatchingObjective(_))
        ));
    }

    #[test]
    fn test_move_widget() {
        let store = store();
        assert!(store.move_widget(1, MoveDirection::Up).unwrap());
        let layout = store.snapshot().layout;
        assert_eq!(layout[0].id, WidgetId::Freight);
        assert_eq!(layout[1].id, WidgetId::Safety);

        assert!(!store.move_widget(0, MoveDirection::Up).unwrap());
        assert!(!store.move_widget(6, MoveDirection::Down).unwrap());
        assert!(store.move_widget(7, MoveDirection::Down).is_err());
    }

    #[test]
    fn test_toggle_performance_mode() {
        let store = store();
        assert_eq!(store.toggle_performance_mode(), PerformanceMode::Eco);
        assert_eq!(store.toggle_performance_mode(), PerformanceMode::High);
    }

    #[test]
    fn test_apply_import_replaces_only_present_sections() {
        let store = store();
        store.set_simulation_active(true);
        let crews_before = store.snapshot().crews;

        let outcome = ImportOutcome {
            stay_time: Some(vec![StayTimeRecord {
                day: "D1".into(),
                real: 65,
                goal: 60,
            }]),
            updated_count: 1,
            ..ImportOutcome::default()
        };
        assert_eq!(store.apply_import(outcome), 1);

        let state = store.snapshot();
        assert_eq!(state.stay_time.len(), 1);
        assert_eq!(state.crews, crews_before);
        assert!(!state.is_simulation_active);
    }

    #[test]
    fn test_apply_import_keeps_edits_made_after_reading_file() {
        let store = store();
        let outcome = ingest_workbook(&Workbook::from_sheets(vec![Sheet::from_rows(
            "Bono",
            vec![Row::new(vec![
                ("Indicador".into(), Cell::text("Fleteo")),
                ("Resultado".into(), Cell::Number(0.99)),
            ])],
        )]));

        // edit lands between reading the workbook and committing it
        store
            .update_bonus_raw(
                0,
                BonusPatch {
                    weight: Some("45%".into()),
                    ..BonusPatch::default()
                },
            )
            .unwrap();
        assert_eq!(store.apply_import(outcome), 1);

        let objectives = store.snapshot().bonus_objectives;
        assert_eq!(objectives[0].weight, "45%");
        assert!((objectives[1].accumulated() - 99.0).abs() < 1e-9);
        assert_eq!(objectives[1].status(), PerformanceTier::Excelente);
    }

    #[test]
    fn test_apply_empty_import_is_noop() {
        let store = store();
        store.set_simulation_active(true);
        assert_eq!(store.apply_import(ImportOutcome::default()), 0);
        assert!(store.is_simulation_active());
    }

    #[test]
    fn test_apply_remote_only_when_newer() {
        let store = store();
        let mut rx = store.subscribe();
        let local = store.snapshot();

        let mut stale = local.clone();
        stale.announcement = "viejo".into();
        stale.last_update = local.last_update - Duration::seconds(10);
        assert!(!store.apply_remote(stale));
        assert_eq!(store.snapshot().announcement, local.announcement);

        let mut fresh = local.clone();
        fresh.announcement = "remoto".into();
        fresh.last_update = local.last_update + Duration::seconds(10);
        assert!(store.apply_remote(fresh.clone()));
        assert_eq!(store.snapshot(), fresh);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.origin, ChangeOrigin::Remote);
    }

    #[test]
    fn test_bonus_global_for_seed() {
        // 20 + 30*0.85 + 20 + 30*0.85 = 91 of 100 weighted points; N/A ignored
        let score = store().bonus_global();
        assert_eq!(score.percentage, 91);
        assert_eq!(score.label, CompositeLabel::Medio);
    }

    #[test]
    fn test_best_crew() {
        let store = store();
        assert_eq!(store.best_crew().name, "ARMAGEDOM");

        store.replace_crews(vec![CrewRecord {
            name: "SOLO".into(),
            ranking: 3,
            ..CrewRecord::default()
        }]);
        assert_eq!(store.best_crew().name, "SOLO");

        store.replace_crews(Vec::new());
        let placeholder = store.best_crew();
        assert_eq!(placeholder.name, "-");
        assert_eq!(placeholder.total_sum, 0.0);
    }

    #[test]
    fn test_open_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = DashboardStore::open(LocalStorage::new(&path));
        store.update_announcement("persistido");
        drop(store);

        let reopened = DashboardStore::open(LocalStorage::new(&path));
        assert_eq!(reopened.snapshot().announcement, "persistido");
    }

    #[test]
    fn test_open_corrupt_falls_back_to_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "[]").unwrap();
        let store = DashboardStore::open(LocalStorage::new(&path));
        assert_eq!(store.snapshot().crews.len(), 4);
    }
}
