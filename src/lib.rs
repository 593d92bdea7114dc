//! Plant operations dashboard core.
//!
//! Shift KPIs (safety, freight, stay time, crews, bonus objectives,
//! warehouse, waste, forklift downtime) held by one [`state::DashboardStore`],
//! bulk-loaded from spreadsheet workbooks through [`ingest`], scored by
//! [`classifier`], mirrored locally by [`storage`] and remotely by [`sync`].

pub mod classifier;
pub mod config;
pub mod display;
pub mod error;
pub mod ingest;
pub mod report;
pub mod simulation;
pub mod state;
pub mod storage;
pub mod sync;
pub mod template;
pub mod types;

pub use error::DashboardError;
pub use state::{DashboardState, DashboardStore};
