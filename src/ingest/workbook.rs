//! In-memory workbook model and the calamine reader that fills it.
//!
//! Each sheet is reduced to a header row plus data rows keyed by header
//! text, the same shape a "sheet to JSON" conversion produces: blank header
//! cells are dropped and fully blank rows are skipped.

use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::coerce::coerce_text;
use crate::error::IngestError;

/// A single cell value, independent of the file format it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date or time-of-day cell.
    DateTime(NaiveDateTime),
    /// Duration-formatted cell, in minutes.
    Duration(f64),
}

impl Cell {
    pub fn text(s: &str) -> Self {
        Cell::Text(s.to_string())
    }

    /// Empty or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::text(s)
    }
}

/// One data row: `(header, cell)` pairs in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Cell)>,
}

impl Row {
    pub fn new(cells: Vec<(String, Cell)>) -> Self {
        Self { cells }
    }

    /// Build a row from literal pairs (tests and in-memory front ends).
    pub fn from_pairs<C: Into<Cell>>(pairs: Vec<(&str, C)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }

    /// Cell under `column`: exact header first, then case/accent-insensitive.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        if let Some((_, cell)) = self.cells.iter().find(|(h, _)| h == column) {
            return Some(cell);
        }
        let wanted = normalize_key(column);
        self.cells
            .iter()
            .find(|(h, _)| normalize_key(h) == wanted)
            .map(|(_, cell)| cell)
    }

    /// First non-blank cell among `aliases`, in alias order.
    pub fn first_present(&self, aliases: &[&str]) -> Option<&Cell> {
        aliases
            .iter()
            .filter_map(|alias| self.get(alias))
            .find(|cell| !cell.is_blank())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, c)| c.is_blank())
    }

    pub fn cells(&self) -> &[(String, Cell)] {
        &self.cells
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    /// Key raw grid rows by header. Columns with a blank header and rows with
    /// no non-blank cell are dropped.
    pub fn new(name: &str, headers: Vec<String>, grid: Vec<Vec<Cell>>) -> Self {
        let rows = grid
            .into_iter()
            .map(|cells| {
                Row::new(
                    headers
                        .iter()
                        .zip(cells)
                        .filter(|(h, _)| !h.trim().is_empty())
                        .map(|(h, c)| (h.trim().to_string(), c))
                        .collect(),
                )
            })
            .filter(|row| !row.is_blank())
            .collect();

        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    pub fn from_rows(name: &str, rows: Vec<Row>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for row in &rows {
            for (h, _) in row.cells() {
                if !headers.contains(h) {
                    headers.push(h.clone());
                }
            }
        }
        Self {
            name: name.to_string(),
            headers,
            rows: rows.into_iter().filter(|r| !r.is_blank()).collect(),
        }
    }

    /// A sheet with no data rows after the header counts as absent.
    pub fn has_data(&self) -> bool {
        !self.rows.is_empty()
    }

    fn from_range(name: &str, range: &Range<Data>) -> Self {
        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header) => header
                .iter()
                .map(|c| coerce_text(&convert_cell(c)).trim().to_string())
                .collect(),
            None => return Self::new(name, Vec::new(), Vec::new()),
        };
        let grid = rows
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();
        Self::new(name, headers, grid)
    }
}

/// Named sheets in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    /// Parse xlsx / xlsm / xls / ods bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IngestError> {
        let mut reader = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| IngestError::Unreadable(e.to_string()))?;

        let mut sheets = Vec::new();
        for name in reader.sheet_names() {
            match reader.worksheet_range(&name) {
                Ok(range) => sheets.push(Sheet::from_range(&name, &range)),
                Err(e) => log::warn!("Skipping unreadable sheet '{}': {}", name, e),
            }
        }

        log::debug!("Workbook read: {} sheets", sheets.len());
        Ok(Self { sheets })
    }

    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let bytes = std::fs::read(path).map_err(|e| IngestError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Find a sheet by exact name, then by case- and accent-insensitive match of
/// the canonical name or any alias against every sheet name.
pub fn lookup_sheet<'a>(
    workbook: &'a Workbook,
    canonical_name: &str,
    aliases: &[&str],
) -> Option<&'a Sheet> {
    if let Some(sheet) = workbook.sheets.iter().find(|s| s.name == canonical_name) {
        return Some(sheet);
    }

    let wanted: Vec<String> = std::iter::once(canonical_name)
        .chain(aliases.iter().copied())
        .map(normalize_key)
        .collect();

    workbook
        .sheets
        .iter()
        .find(|s| wanted.contains(&normalize_key(&s.name)))
}

/// First sheet whose lowercased name contains any of `needles`.
pub fn find_sheet_containing<'a>(workbook: &'a Workbook, needles: &[&str]) -> Option<&'a Sheet> {
    workbook.sheets.iter().find(|s| {
        let name = s.name.to_lowercase();
        needles.iter().any(|n| name.contains(n))
    })
}

/// Lowercase, strip accents, keep only alphanumerics.
///
/// Example: "Tiempo Estancía" -> "tiempoestancia"
pub fn normalize_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

// ---------------------------------------------------------------------------
// calamine conversion
// ---------------------------------------------------------------------------

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::Error(_) => Cell::Empty,
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            if dt.is_duration() {
                Cell::Duration(serial * 1440.0)
            } else {
                serial_to_datetime(serial)
                    .map(Cell::DateTime)
                    .unwrap_or(Cell::Number(serial))
            }
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => parse_iso_duration(s)
            .map(Cell::Duration)
            .unwrap_or_else(|| Cell::Text(s.clone())),
    }
}

fn spreadsheet_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Spreadsheet serial (days since 1899-12-30, fraction = time of day).
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let millis = (serial * 86_400_000.0).round() as i64;
    spreadsheet_epoch()?.checked_add_signed(chrono::Duration::milliseconds(millis))
}

/// Inverse of [`serial_to_datetime`].
pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    match spreadsheet_epoch() {
        Some(epoch) => (*dt - epoch).num_milliseconds() as f64 / 86_400_000.0,
        None => 0.0,
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    for fmt in ["%H:%M:%S%.f", "%H:%M:%S"] {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return spreadsheet_epoch().map(|e| e.date().and_time(t));
        }
    }
    None
}

fn iso_duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^P(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
        )
        .expect("ISO duration regex is valid")
    })
}

/// `PT1H5M` -> 65.0 minutes.
fn parse_iso_duration(s: &str) -> Option<f64> {
    let caps = iso_duration_re().captures(s.trim())?;
    let part = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    Some(part(1) * 1440.0 + part(2) * 60.0 + part(3) + part(4) / 60.0)
}
