//! Ingestion of upstream extraction tables
//!
//! The document-parsing pipeline writes one row per field with the columns
//! `Field`, `Extracted_Value`, `Confidence`, `Page_Number` and, for files
//! covering several plans, `Group_Name`. Tables arrive as CSV, spreadsheet
//! or JSON; all three are normalised here into [`ExtractedField`] rows so
//! nothing downstream re-parses raw cells.

use crate::error::{ReviewError, Result};
use crate::types::{ExtractedField, FieldValue};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

const FIELD_COLUMN: &str = "field";
const VALUE_COLUMN: &str = "extracted_value";
const CONFIDENCE_COLUMN: &str = "confidence";
const PAGE_COLUMN: &str = "page_number";
const GROUP_COLUMN: &str = "group_name";

/// Field labels as the upstream pipeline writes them, in checklist order.
pub const UPSTREAM_LABELS: &[&str] = &[
    "Group Name",
    "Group Eff Date",
    "TPA",
    "UR Vendor",
    "PPO Network",
    "Min Hour Requirement",
    "Retirees",
    "BOD Directors Officers",
    "Dependent Definitions",
    "Req Adding Dependents",
    "Dependent to Age 26",
    "Grandchildren",
    "Termination Provisions",
    "Open Enrollment",
    "Leave of Absence",
    "Medically Necessary",
    "E&I",
    "R&C",
    "Workers Comp",
    "Transplant",
    "ETS Gene Therapy",
    "COB",
    "COBRA",
    "Subrogation",
    "Infertility",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionTable {
    rows: Vec<ExtractedField>,
}

/// Column positions found in a header row.
struct Columns {
    field: usize,
    value: Option<usize>,
    confidence: Option<usize>,
    page: Option<usize>,
    group: Option<usize>,
}

impl Columns {
    fn locate(headers: &[String]) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().to_lowercase().replace(' ', "_") == name)
        };

        let field = find(FIELD_COLUMN).ok_or_else(|| {
            ReviewError::Ingestion(format!(
                "missing required column 'Field' (found: {})",
                headers.join(", ")
            ))
        })?;
        let columns = Self {
            field,
            value: find(VALUE_COLUMN),
            confidence: find(CONFIDENCE_COLUMN),
            page: find(PAGE_COLUMN),
            group: find(GROUP_COLUMN),
        };
        if columns.value.is_none() {
            warn!("No 'Extracted_Value' column; every field will be treated as missing");
        }
        Ok(columns)
    }
}

impl ExtractionTable {
    pub fn new(rows: Vec<ExtractedField>) -> Self {
        Self { rows }
    }

    /// Load a table, choosing the reader by file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let table = match ext.as_str() {
            "csv" => Self::from_csv_reader(std::fs::File::open(path)?)?,
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Self::from_spreadsheet(path)?,
            "json" => Self::from_json_str(&std::fs::read_to_string(path)?)?,
            _ => {
                return Err(ReviewError::Ingestion(format!(
                    "unsupported extraction file format '{}' ({})",
                    ext,
                    path.display()
                )))
            }
        };

        info!("Loaded {} extraction rows from {}", table.len(), path.display());
        let groups = table.groups();
        if !groups.is_empty() {
            info!("Found {} group(s): {}", groups.len(), groups.join(", "));
        }
        Ok(table)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(|c| Some(c.to_string())).collect());
        }

        Self::from_cells(&headers, rows)
    }

    /// First worksheet of an Excel/ODS workbook.
    pub fn from_spreadsheet(path: &Path) -> Result<Self> {
        use calamine::{open_workbook_auto, Data, Reader};

        let mut workbook = open_workbook_auto(path).map_err(|e| {
            ReviewError::Spreadsheet(format!("failed to open {}: {}", path.display(), e))
        })?;
        let sheet = workbook.sheet_names().first().cloned().ok_or_else(|| {
            ReviewError::Spreadsheet(format!("{} has no worksheets", path.display()))
        })?;
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| ReviewError::Spreadsheet(format!("failed to read sheet '{}': {}", sheet, e)))?;

        let mut cell_rows = range.rows().map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty | Data::Error(_) => None,
                    Data::String(s) => Some(s.clone()),
                    Data::Float(f) => Some(f.to_string()),
                    Data::Int(i) => Some(i.to_string()),
                    Data::Bool(b) => Some(b.to_string()),
                    Data::DateTime(_) => Some(cell.to_string()),
                    Data::DateTimeIso(s) => Some(s.clone()),
                    Data::DurationIso(s) => Some(s.clone()),
                })
                .collect::<Vec<Option<String>>>()
        });

        let headers: Vec<String> = cell_rows
            .next()
            .ok_or_else(|| ReviewError::Ingestion(format!("sheet '{}' is empty", sheet)))?
            .into_iter()
            .map(|h| h.unwrap_or_default())
            .collect();

        Self::from_cells(&headers, cell_rows.collect())
    }

    /// A JSON array of row objects keyed by column name.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let objects = value
            .as_array()
            .ok_or_else(|| ReviewError::Ingestion("expected a JSON array of rows".to_string()))?;

        let mut headers: Vec<String> = Vec::new();
        for object in objects {
            let object = object.as_object().ok_or_else(|| {
                ReviewError::Ingestion("every JSON row must be an object".to_string())
            })?;
            for key in object.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = objects
            .iter()
            .filter_map(|o| o.as_object())
            .map(|object| {
                headers
                    .iter()
                    .map(|h| match object.get(h) {
                        None | Some(serde_json::Value::Null) => None,
                        Some(serde_json::Value::String(s)) => Some(s.clone()),
                        Some(other) => Some(other.to_string()),
                    })
                    .collect()
            })
            .collect();

        Self::from_cells(&headers, rows)
    }

    fn from_cells(headers: &[String], rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        let columns = Columns::locate(headers)?;
        let cell = |row: &[Option<String>], idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i).cloned().flatten())
        };

        let mut parsed = Vec::with_capacity(rows.len());
        for (line, row) in rows.iter().enumerate() {
            let Some(field_name) = cell(row, Some(columns.field))
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
            else {
                warn!("Skipping extraction row {} with no field name", line + 1);
                continue;
            };

            parsed.push(ExtractedField {
                value: FieldValue::parse(cell(row, columns.value).as_deref()),
                confidence: parse_confidence(&field_name, cell(row, columns.confidence).as_deref()),
                source_page: parse_page(cell(row, columns.page).as_deref()),
                group_name: cell(row, columns.group)
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty()),
                field_name,
            });
        }

        Ok(Self { rows: parsed })
    }

    /// Every upstream label with nothing found, for groups with no data.
    pub fn blank_template() -> Self {
        Self::new(
            UPSTREAM_LABELS
                .iter()
                .map(|label| ExtractedField {
                    field_name: label.to_string(),
                    value: FieldValue::Missing,
                    confidence: 0.0,
                    source_page: None,
                    group_name: None,
                })
                .collect(),
        )
    }

    pub fn rows(&self) -> &[ExtractedField] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct group names, first-seen order.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for name in self.rows.iter().filter_map(|r| r.group_name.as_ref()) {
            if !groups.contains(name) {
                groups.push(name.clone());
            }
        }
        groups
    }

    /// Rows of one group. Tables without a group column belong to every group.
    pub fn for_group(&self, group_name: &str) -> Self {
        if self.rows.iter().all(|r| r.group_name.is_none()) {
            return self.clone();
        }
        Self::new(
            self.rows
                .iter()
                .filter(|r| {
                    r.group_name
                        .as_deref()
                        .is_some_and(|g| g.eq_ignore_ascii_case(group_name.trim()))
                })
                .cloned()
                .collect(),
        )
    }

    /// Ordered label -> value pairs. A repeated label takes the later value
    /// at the earlier position.
    pub fn field_values(&self) -> Vec<(String, FieldValue)> {
        let mut values: Vec<(String, FieldValue)> = Vec::new();
        for row in &self.rows {
            match values.iter_mut().find(|(label, _)| *label == row.field_name) {
                Some(slot) => slot.1 = row.value.clone(),
                None => values.push((row.field_name.clone(), row.value.clone())),
            }
        }
        values
    }

    pub fn average_confidence(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        self.rows.iter().map(|r| r.confidence).sum::<f64>() / self.rows.len() as f64
    }
}

fn parse_confidence(field: &str, raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return 0.0;
    };
    match raw.parse::<f64>() {
        Ok(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => {
            warn!("Confidence '{}' for {} is not a number; using 0.0", raw, field);
            0.0
        }
    }
}

fn parse_page(raw: Option<&str>) -> Option<u32> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    if let Ok(page) = raw.parse::<u32>() {
        return Some(page);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
            Some(f as u32)
        }
        _ => None,
    }
}
