//! Spreadsheet template export.
//!
//! Writes the current state as a workbook with one sheet per section,
//! using the same sheet names and column headers the importer reads, so an
//! operator can download, edit and re-import it. The bonus sheet only
//! carries the columns an operator needs to fill in results.
//!
//! The xlsx package is written by hand (zip + quick-xml): inline strings,
//! plain numeric cells, no styles.

use std::io::{Cursor, Write};
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::TemplateError;
use crate::ingest::mapping;
use crate::state::DashboardState;

pub const TEMPLATE_FILE_NAME: &str = "Dashboard_Plantilla.xlsx";
pub const BONUS_SHEET_NAME: &str = "Bono";

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";
const CT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

// ---------------------------------------------------------------------------
// Template model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateCell {
    Text(String),
    Number(f64),
}

impl From<&str> for TemplateCell {
    fn from(s: &str) -> Self {
        TemplateCell::Text(s.to_string())
    }
}

impl From<String> for TemplateCell {
    fn from(s: String) -> Self {
        TemplateCell::Text(s)
    }
}

impl From<f64> for TemplateCell {
    fn from(n: f64) -> Self {
        TemplateCell::Number(n)
    }
}

impl From<u32> for TemplateCell {
    fn from(n: u32) -> Self {
        TemplateCell::Number(n as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<TemplateCell>>,
}

impl TemplateSheet {
    fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn row(mut self, cells: Vec<TemplateCell>) -> Self {
        self.rows.push(cells);
        self
    }

    fn rows<T>(mut self, items: &[T], f: impl Fn(&T) -> Vec<TemplateCell>) -> Self {
        self.rows.extend(items.iter().map(f));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateWorkbook {
    pub sheets: Vec<TemplateSheet>,
}

/// One sheet per section, in import order, filled with the current values.
pub fn build_template(state: &DashboardState) -> TemplateWorkbook {
    let s = &state.safety;
    let w = &state.warehouse;

    let sheets = vec![
        TemplateSheet::new(
            mapping::SAFETY_SHEET.0,
            &["daysWithoutAccident", "recordDays", "previousRecord", "lti", "mti", "fac"],
        )
        .row(vec![
            s.days_without_accident.into(),
            s.record_days.into(),
            s.previous_record.into(),
            s.lti.into(),
            s.mti.into(),
            s.fac.into(),
        ]),
        TemplateSheet::new(mapping::WAREHOUSE_SHEET.0, &["ptReal", "ptCap", "matReal", "matCap"])
            .row(vec![w.pt_real.into(), w.pt_cap.into(), w.mat_real.into(), w.mat_cap.into()]),
        TemplateSheet::new(mapping::FREIGHT_SHEET.0, &["day", "planned", "real"]).rows(
            &state.freight,
            |f| vec![f.day.as_str().into(), f.planned.into(), f.real.into()],
        ),
        TemplateSheet::new(mapping::STAY_TIME_SHEET.0, &["day", "real", "goal"]).rows(
            &state.stay_time,
            |r| vec![r.day.as_str().into(), r.real.into(), r.goal.into()],
        ),
        TemplateSheet::new(
            mapping::CREW_SHEET.0,
            &[
                "name",
                "pdf",
                "stayTime",
                "plantTime",
                "palletsAverage",
                "security",
                "totalSum",
                "ranking",
            ],
        )
        .rows(&state.crews, |c| {
            vec![
                c.name.as_str().into(),
                c.pdf.into(),
                c.stay_time.as_str().into(),
                c.plant_time.as_str().into(),
                c.pallets_average.into(),
                c.security.into(),
                c.total_sum.into(),
                c.ranking.into(),
            ]
        }),
        TemplateSheet::new(mapping::WASTE_SHEET.0, &["material", "real", "target"]).rows(
            &state.waste,
            |m| vec![m.material.as_str().into(), m.real.into(), m.target.into()],
        ),
        TemplateSheet::new(mapping::DOWNTIME_SHEET.0, &["line", "lostTime", "crew", "pdf"]).rows(
            &state.downtime,
            |d| {
                vec![
                    d.line.as_str().into(),
                    d.lost_time.into(),
                    d.crew.as_str().into(),
                    d.pdf.into(),
                ]
            },
        ),
        TemplateSheet::new(
            BONUS_SHEET_NAME,
            &["Indicador", "MIN", "SAT", "EXC", "Resultado", "Peso"],
        )
        .rows(&state.bonus_objectives, |b| {
            let t = b.thresholds();
            vec![
                b.description.as_str().into(),
                t.min.into(),
                t.sat.into(),
                t.exc.into(),
                b.accumulated().into(),
                b.weight.as_str().into(),
            ]
        }),
    ];

    TemplateWorkbook { sheets }
}

// ---------------------------------------------------------------------------
// xlsx writer
// ---------------------------------------------------------------------------

struct XmlPart {
    writer: Writer<Vec<u8>>,
}

impl XmlPart {
    fn new() -> Result<Self, TemplateError> {
        let mut part = Self {
            writer: Writer::new(Vec::new()),
        };
        part.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(part)
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), TemplateError> {
        self.writer
            .write_event(event)
            .map_err(|e| TemplateError::Xml(e.to_string()))
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), TemplateError> {
        let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.event(Event::Start(elem))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), TemplateError> {
        let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.event(Event::Empty(elem))
    }

    fn end(&mut self, name: &str) -> Result<(), TemplateError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text(&mut self, text: &str) -> Result<(), TemplateError> {
        self.event(Event::Text(BytesText::new(text)))
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Spreadsheet column letters for a zero-based index (0 -> A, 26 -> AA).
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn format_number(n: f64) -> String {
    if n.is_finite() {
        format!("{}", n)
    } else {
        "0".to_string()
    }
}

fn write_cell(part: &mut XmlPart, reference: &str, cell: &TemplateCell) -> Result<(), TemplateError> {
    match cell {
        TemplateCell::Text(text) if text.is_empty() => Ok(()),
        TemplateCell::Text(text) => {
            part.start("c", &[("r", reference), ("t", "inlineStr")])?;
            part.start("is", &[])?;
            part.start("t", &[("xml:space", "preserve")])?;
            part.text(text)?;
            part.end("t")?;
            part.end("is")?;
            part.end("c")
        }
        TemplateCell::Number(n) => {
            part.start("c", &[("r", reference)])?;
            part.start("v", &[])?;
            part.text(&format_number(*n))?;
            part.end("v")?;
            part.end("c")
        }
    }
}

fn worksheet_xml(sheet: &TemplateSheet) -> Result<Vec<u8>, TemplateError> {
    let mut part = XmlPart::new()?;
    part.start("worksheet", &[("xmlns", NS_MAIN)])?;
    part.start("sheetData", &[])?;

    let header_row: Vec<TemplateCell> = sheet.headers.iter().map(|h| h.as_str().into()).collect();
    for (r, cells) in std::iter::once(&header_row).chain(sheet.rows.iter()).enumerate() {
        let row_number = (r + 1).to_string();
        part.start("row", &[("r", row_number.as_str())])?;
        for (c, cell) in cells.iter().enumerate() {
            let reference = format!("{}{}", column_name(c), row_number);
            write_cell(&mut part, &reference, cell)?;
        }
        part.end("row")?;
    }

    part.end("sheetData")?;
    part.end("worksheet")?;
    Ok(part.finish())
}

fn content_types_xml(sheet_count: usize) -> Result<Vec<u8>, TemplateError> {
    let mut part = XmlPart::new()?;
    part.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    part.empty("Default", &[("Extension", "rels"), ("ContentType", CT_RELS)])?;
    part.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    part.empty(
        "Override",
        &[("PartName", "/xl/workbook.xml"), ("ContentType", CT_WORKBOOK)],
    )?;
    for i in 1..=sheet_count {
        let name = format!("/xl/worksheets/sheet{}.xml", i);
        part.empty("Override", &[("PartName", name.as_str()), ("ContentType", CT_WORKSHEET)])?;
    }
    part.end("Types")?;
    Ok(part.finish())
}

fn package_rels_xml() -> Result<Vec<u8>, TemplateError> {
    let mut part = XmlPart::new()?;
    part.start("Relationships", &[("xmlns", NS_PKG_REL)])?;
    part.empty(
        "Relationship",
        &[("Id", "rId1"), ("Type", REL_OFFICE_DOCUMENT), ("Target", "xl/workbook.xml")],
    )?;
    part.end("Relationships")?;
    Ok(part.finish())
}

fn workbook_xml(sheets: &[TemplateSheet]) -> Result<Vec<u8>, TemplateError> {
    let mut part = XmlPart::new()?;
    part.start("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)])?;
    part.start("sheets", &[])?;
    for (i, sheet) in sheets.iter().enumerate() {
        let id = (i + 1).to_string();
        let rel = format!("rId{}", i + 1);
        part.empty(
            "sheet",
            &[("name", sheet.name.as_str()), ("sheetId", id.as_str()), ("r:id", rel.as_str())],
        )?;
    }
    part.end("sheets")?;
    part.end("workbook")?;
    Ok(part.finish())
}

fn workbook_rels_xml(sheet_count: usize) -> Result<Vec<u8>, TemplateError> {
    let mut part = XmlPart::new()?;
    part.start("Relationships", &[("xmlns", NS_PKG_REL)])?;
    for i in 1..=sheet_count {
        let id = format!("rId{}", i);
        let target = format!("worksheets/sheet{}.xml", i);
        part.empty(
            "Relationship",
            &[("Id", id.as_str()), ("Type", REL_WORKSHEET), ("Target", target.as_str())],
        )?;
    }
    part.end("Relationships")?;
    Ok(part.finish())
}

/// Serialize a template as xlsx bytes.
pub fn write_xlsx(workbook: &TemplateWorkbook) -> Result<Vec<u8>, TemplateError> {
    let sheet_count = workbook.sheets.len();
    let mut parts: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".to_string(), content_types_xml(sheet_count)?),
        ("_rels/.rels".to_string(), package_rels_xml()?),
        ("xl/workbook.xml".to_string(), workbook_xml(&workbook.sheets)?),
        ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels_xml(sheet_count)?),
    ];
    for (i, sheet) in workbook.sheets.iter().enumerate() {
        parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), worksheet_xml(sheet)?));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(name.as_str(), options)
            .map_err(|e| TemplateError::Zip(e.to_string()))?;
        zip.write_all(&bytes)
            .map_err(|e| TemplateError::Zip(e.to_string()))?;
    }
    let cursor = zip.finish().map_err(|e| TemplateError::Zip(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Build the template for `state` and write it to `path`.
pub fn export_template(state: &DashboardState, path: &Path) -> Result<usize, TemplateError> {
    let bytes = write_xlsx(&build_template(state))?;
    std::fs::write(path, &bytes).map_err(|e| TemplateError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    log::info!("Wrote template to {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes.len())
}
