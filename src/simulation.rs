//! Demo-mode simulation.
//!
//! While the simulation flag is on, freight and stay time drift every slow
//! tick and safety / warehouse figures every fast tick, so an unattended
//! screen looks alive. Importing a workbook turns the flag off.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Uniform};

use crate::state::{DashboardStore, Section};
use crate::types::{FreightRecord, SafetyData, StayTimeRecord, WarehouseData};

const FREIGHT_UP_PROBABILITY: f64 = 0.7;
const INCIDENT_CHANGE_PROBABILITY: f64 = 0.1;
const STAY_TIME_FLOOR: i64 = 20;
const STAY_TIME_CEILING: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Freight and stay time.
    pub slow_interval: Duration,
    /// Safety and warehouse.
    pub fast_interval: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            slow_interval: Duration::from_secs(30),
            fast_interval: Duration::from_secs(15),
        }
    }
}

// ---------------------------------------------------------------------------
// Sampling helpers
// ---------------------------------------------------------------------------

/// Uniform integer in `low..=high`.
pub fn int_between<R: Rng + ?Sized>(rng: &mut R, low: i64, high: i64) -> i64 {
    match Uniform::new_inclusive(low, high) {
        Ok(dist) => dist.sample(rng),
        Err(_) => low,
    }
}

fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    match Bernoulli::new(p) {
        Ok(dist) => dist.sample(rng),
        Err(_) => false,
    }
}

fn plus_or_minus_one<R: Rng + ?Sized>(rng: &mut R, value: u32) -> u32 {
    if chance(rng, 0.5) {
        value.saturating_add(1)
    } else {
        value.saturating_sub(1)
    }
}

// ---------------------------------------------------------------------------
// Randomizers
// ---------------------------------------------------------------------------

/// Mostly upward drift of actual freight. A day that overshoots 110% of
/// plan is pulled back to 85% of plan.
pub fn randomize_freight<R: Rng + ?Sized>(
    records: &[FreightRecord],
    rng: &mut R,
) -> Vec<FreightRecord> {
    records
        .iter()
        .map(|item| {
            let adjustment = if chance(rng, FREIGHT_UP_PROBABILITY) {
                int_between(rng, 5, 29)
            } else {
                int_between(rng, -5, 4)
            };
            let mut real = (item.real + adjustment as f64).max(0.0);
            if real > item.planned * 1.1 {
                real = item.planned * 0.85;
            }
            FreightRecord {
                real,
                ..item.clone()
            }
        })
        .collect()
}

pub fn randomize_stay_time<R: Rng + ?Sized>(
    records: &[StayTimeRecord],
    rng: &mut R,
) -> Vec<StayTimeRecord> {
    records
        .iter()
        .map(|item| {
            let real = (item.real as i64 + int_between(rng, -5, 4))
                .clamp(STAY_TIME_FLOOR, STAY_TIME_CEILING);
            StayTimeRecord {
                real: real as u32,
                ..item.clone()
            }
        })
        .collect()
}

/// Rare +/-1 changes to LTI and MTI, never below zero.
pub fn randomize_safety<R: Rng + ?Sized>(safety: &SafetyData, rng: &mut R) -> SafetyData {
    let mut next = safety.clone();
    if chance(rng, INCIDENT_CHANGE_PROBABILITY) {
        if chance(rng, 0.5) {
            next.lti = plus_or_minus_one(rng, next.lti);
        }
        if chance(rng, 0.5) {
            next.mti = plus_or_minus_one(rng, next.mti);
        }
    }
    next
}

/// Occupancy jitter kept within `0..=capacity`.
pub fn randomize_warehouse<R: Rng + ?Sized>(warehouse: &WarehouseData, rng: &mut R) -> WarehouseData {
    let pt_var = int_between(rng, -250, 249) as f64;
    let mat_var = int_between(rng, -100, 99) as f64;
    WarehouseData {
        pt_real: (warehouse.pt_real + pt_var).min(warehouse.pt_cap).max(0.0),
        mat_real: (warehouse.mat_real + mat_var).min(warehouse.mat_cap).max(0.0),
        ..warehouse.clone()
    }
}

// ---------------------------------------------------------------------------
// Ticks
// ---------------------------------------------------------------------------

/// Freight and stay time. No-op while the simulation is off.
pub fn slow_tick(store: &DashboardStore) -> bool {
    if !store.is_simulation_active() {
        return false;
    }
    let mut rng = rand::rng();
    let _ = store.mutate(Section::Freight, |s| {
        s.freight = randomize_freight(&s.freight, &mut rng);
        Ok(())
    });
    let _ = store.mutate(Section::StayTime, |s| {
        s.stay_time = randomize_stay_time(&s.stay_time, &mut rng);
        Ok(())
    });
    true
}

/// Safety and warehouse. No-op while the simulation is off.
pub fn fast_tick(store: &DashboardStore) -> bool {
    if !store.is_simulation_active() {
        return false;
    }
    let mut rng = rand::rng();
    let _ = store.mutate(Section::Safety, |s| {
        s.safety = randomize_safety(&s.safety, &mut rng);
        s.warehouse = randomize_warehouse(&s.warehouse, &mut rng);
        Ok(())
    });
    true
}

/// Drive both ticks until the task is dropped.
pub async fn run_simulation(store: Arc<DashboardStore>, config: SimulationConfig) {
    log::info!(
        "Simulation loop started (slow {:?}, fast {:?})",
        config.slow_interval,
        config.fast_interval
    );
    let mut slow = tokio::time::interval(config.slow_interval);
    let mut fast = tokio::time::interval(config.fast_interval);
    // both intervals fire immediately; skip that first tick
    slow.tick().await;
    fast.tick().await;

    loop {
        tokio::select! {
            _ = slow.tick() => {
                if slow_tick(&store) {
                    log::debug!("Simulation: freight and stay time updated");
                }
            }
            _ = fast.tick() => {
                if fast_tick(&store) {
                    log::debug!("Simulation: safety and warehouse updated");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DashboardState;

    #[test]
    fn test_int_between_bounds() {
        let mut rng = rand::rng();
        for _ in 0..500 {
            let v = int_between(&mut rng, -5, 4);
            assert!((-5..=4).contains(&v));
        }
        assert_eq!(int_between(&mut rng, 3, 3), 3);
        assert_eq!(int_between(&mut rng, 5, 1), 5);
    }

    #[test]
    fn test_randomize_freight_stays_in_band() {
        let mut rng = rand::rng();
        let records = vec![
            FreightRecord {
                day: "Dia 1".into(),
                planned: 3000.0,
                real: 2900.0,
            },
            FreightRecord {
                day: "Dia 2".into(),
                planned: 100.0,
                real: 0.0,
            },
        ];
        for _ in 0..200 {
            let next = randomize_freight(&records, &mut rng);
            assert_eq!(next[0].day, "Dia 1");
            assert!((2895.0..=2929.0).contains(&next[0].real));
            assert!(next[1].real >= 0.0);
        }
    }

    #[test]
    fn test_randomize_freight_resets_overshoot() {
        let mut rng = rand::rng();
        let records = vec![FreightRecord {
            day: "Dia 1".into(),
            planned: 1000.0,
            real: 1100.0,
        }];
        for _ in 0..100 {
            let real = randomize_freight(&records, &mut rng)[0].real;
            assert!(real == 850.0 || (1095.0..=1100.0).contains(&real), "{}", real);
        }
    }

    #[test]
    fn test_randomize_stay_time_clamped() {
        let mut rng = rand::rng();
        let records = vec![
            StayTimeRecord {
                day: "D1".into(),
                real: 20,
                goal: 55,
            },
            StayTimeRecord {
                day: "D2".into(),
                real: 120,
                goal: 55,
            },
        ];
        for _ in 0..200 {
            let next = randomize_stay_time(&records, &mut rng);
            assert!((20..=24).contains(&next[0].real));
            assert!((115..=120).contains(&next[1].real));
            assert_eq!(next[0].goal, 55);
        }
    }

    #[test]
    fn test_randomize_safety_never_negative() {
        let mut rng = rand::rng();
        let mut safety = SafetyData::default();
        for _ in 0..500 {
            safety = randomize_safety(&safety, &mut rng);
            assert_eq!(safety.days_without_accident, 0);
        }
    }

    #[test]
    fn test_randomize_warehouse_within_capacity() {
        let mut rng = rand::rng();
        let full = WarehouseData {
            pt_real: 22000.0,
            pt_cap: 22000.0,
            mat_real: 0.0,
            mat_cap: 5000.0,
        };
        for _ in 0..200 {
            let next = randomize_warehouse(&full, &mut rng);
            assert!(next.pt_real <= 22000.0 && next.pt_real >= 21750.0);
            assert!(next.mat_real >= 0.0 && next.mat_real <= 99.0);
            assert_eq!(next.pt_cap, 22000.0);
        }
    }

    #[test]
    fn test_ticks_noop_while_inactive() {
        let store = DashboardStore::new(DashboardState::seeded(), None);
        let before = store.snapshot();
        assert!(!slow_tick(&store));
        assert!(!fast_tick(&store));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_slow_tick_updates_when_active() {
        let store = DashboardStore::new(DashboardState::seeded(), None);
        store.set_simulation_active(true);
        let mut rx = store.subscribe();
        assert!(slow_tick(&store));
        assert_eq!(rx.try_recv().unwrap().section, Section::Freight);
        assert_eq!(rx.try_recv().unwrap().section, Section::StayTime);
    }
}
