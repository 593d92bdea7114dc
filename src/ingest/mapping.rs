//! Per-sheet row mapping.
//!
//! Each sheet has a fixed set of output fields, each fed by an ordered list
//! of accepted column headers. Duration fields go through `coerce_time`,
//! everything else is numeric or text passthrough.

use super::coerce::{coerce_count, coerce_number, coerce_text, coerce_time, format_time_string};
use super::workbook::{Cell, Row, Sheet};
use crate::types::{
    CrewRecord, DowntimeRecord, FreightRecord, SafetyPatch, StayTimeRecord, WarehousePatch,
    WasteRecord,
};

/// Canonical sheet names and the alternative names accepted for each.
pub const SAFETY_SHEET: (&str, &[&str]) = ("Seguridad", &["Safety"]);
pub const WAREHOUSE_SHEET: (&str, &[&str]) = ("Almacen", &["Almacén", "Warehouse"]);
pub const FREIGHT_SHEET: (&str, &[&str]) = ("Fleteo", &["Freight"]);
pub const STAY_TIME_SHEET: (&str, &[&str]) = ("TiempoEstancia", &["Tiempo Estancia", "StayTime"]);
pub const CREW_SHEET: (&str, &[&str]) = ("Tripulacion", &["Tripulación", "Crews"]);
pub const WASTE_SHEET: (&str, &[&str]) = ("Mermas", &["Waste"]);
pub const DOWNTIME_SHEET: (&str, &[&str]) = ("TiempoPerdido", &["Tiempo Perdido", "Downtime"]);

/// Substrings that identify the bonus sheet, matched against lowercased names.
pub const BONUS_SHEET_NEEDLES: &[&str] = &["bono", "indicador"];

const DAY: &[&str] = &["day", "Dia", "Day"];

// ---------------------------------------------------------------------------
// Column readers
// ---------------------------------------------------------------------------

fn text(row: &Row, columns: &[&str]) -> String {
    row.first_present(columns).map(coerce_text).unwrap_or_default()
}

fn number(row: &Row, columns: &[&str]) -> f64 {
    row.first_present(columns).map(coerce_number).unwrap_or(0.0)
}

fn minutes(row: &Row, columns: &[&str]) -> u32 {
    row.first_present(columns).map(coerce_time).unwrap_or(0)
}

fn clock(row: &Row, columns: &[&str]) -> String {
    format_time_string(row.first_present(columns).unwrap_or(&Cell::Empty))
}

fn opt_number(row: &Row, columns: &[&str]) -> Option<f64> {
    row.first_present(columns).map(coerce_number)
}

fn opt_count(row: &Row, columns: &[&str]) -> Option<u32> {
    row.first_present(columns).map(coerce_count)
}

// ---------------------------------------------------------------------------
// Single-record sheets: first data row, present columns only
// ---------------------------------------------------------------------------

pub fn map_safety(sheet: &Sheet) -> Option<SafetyPatch> {
    let row = sheet.rows.first()?;
    Some(SafetyPatch {
        days_without_accident: opt_count(
            row,
            &["daysWithoutAccident", "DiasSinAccidente", "Dias sin accidente"],
        ),
        record_days: opt_count(row, &["recordDays", "DiasRecord"]),
        previous_record: opt_count(row, &["previousRecord", "RecordAnterior"]),
        lti: opt_count(row, &["lti"]),
        mti: opt_count(row, &["mti"]),
        fac: opt_count(row, &["fac"]),
    })
}

pub fn map_warehouse(sheet: &Sheet) -> Option<WarehousePatch> {
    let row = sheet.rows.first()?;
    Some(WarehousePatch {
        pt_real: opt_number(row, &["ptReal", "PTReal"]),
        pt_cap: opt_number(row, &["ptCap", "PTCapacidad"]),
        mat_real: opt_number(row, &["matReal", "MatReal"]),
        mat_cap: opt_number(row, &["matCap", "MatCapacidad"]),
    })
}

// ---------------------------------------------------------------------------
// Collection sheets
// ---------------------------------------------------------------------------

pub fn map_freight(sheet: &Sheet) -> Vec<FreightRecord> {
    sheet
        .rows
        .iter()
        .map(|row| FreightRecord {
            day: text(row, DAY),
            planned: number(row, &["planned", "Planeado", "Plan"]),
            real: number(row, &["real"]),
        })
        .collect()
}

pub fn map_stay_time(sheet: &Sheet) -> Vec<StayTimeRecord> {
    sheet
        .rows
        .iter()
        .map(|row| StayTimeRecord {
            day: text(row, DAY),
            real: minutes(row, &["real"]),
            goal: minutes(row, &["goal", "meta"]),
        })
        .collect()
}

pub fn map_crews(sheet: &Sheet) -> Vec<CrewRecord> {
    sheet
        .rows
        .iter()
        .map(|row| CrewRecord {
            name: text(row, &["name", "Nombre", "Tripulacion"]),
            pdf: number(row, &["pdf"]),
            stay_time: clock(row, &["stayTime", "TiempoEstancia"]),
            plant_time: clock(row, &["plantTime", "TiempoPlanta"]),
            pallets_average: number(row, &["palletsAverage", "PromedioTarimas"]),
            security: number(row, &["security", "Seguridad"]),
            total_sum: number(row, &["totalSum", "Total"]),
            ranking: row
                .first_present(&["ranking", "Posicion"])
                .map(coerce_count)
                .unwrap_or(0),
        })
        .collect()
}

pub fn map_waste(sheet: &Sheet) -> Vec<WasteRecord> {
    sheet
        .rows
        .iter()
        .map(|row| WasteRecord {
            material: text(row, &["material"]),
            real: number(row, &["real"]),
            target: number(row, &["target", "Meta", "Objetivo"]),
        })
        .collect()
}

pub fn map_downtime(sheet: &Sheet) -> Vec<DowntimeRecord> {
    sheet
        .rows
        .iter()
        .map(|row| DowntimeRecord {
            line: text(row, &["line", "Linea"]),
            lost_time: minutes(row, &["lostTime", "TiempoPerdido"]),
            crew: text(row, &["crew", "Tripulacion"]),
            pdf: number(row, &["pdf"]),
        })
        .collect()
}
