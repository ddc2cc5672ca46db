use crate::error::LoadError;
use crate::types::{CanonicalTable, Field, InterventionRow};
use crate::util::{excel_serial_to_date, normalize_header, parse_date, parse_number};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

// Keys are `normalize_header` output, so accents, case and apostrophe style
// do not matter in the source file.
static HEADER_ALIASES: Lazy<HashMap<&'static str, Field>> = Lazy::new(|| {
    HashMap::from([
        ("date", Field::Date),
        ("date d'intervention", Field::Date),
        ("intervention date", Field::Date),
        ("intervention type", Field::InterventionType),
        ("type d'intervention", Field::InterventionType),
        ("type intervention", Field::InterventionType),
        ("location", Field::Location),
        ("localisation", Field::Location),
        ("lieu", Field::Location),
        ("crew", Field::Crew),
        ("team", Field::Crew),
        ("equipe", Field::Crew),
        ("duration", Field::Duration),
        ("duree", Field::Duration),
        ("cost", Field::Cost),
        ("cout", Field::Cost),
        ("montant", Field::Cost),
        ("observations", Field::Observations),
        ("observation", Field::Observations),
        ("notes", Field::Observations),
        ("remarks", Field::Observations),
    ])
});

/// Parsing knobs coming from the `[parsing]` configuration section.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Extra chrono formats tried before the built-in date layouts.
    pub date_formats: Vec<String>,
    /// CSV delimiter; sniffed from the header line when `None`.
    pub delimiter: Option<u8>,
    /// Force or forbid the decimal comma; derived from the delimiter when `None`.
    pub decimal_comma: Option<bool>,
}

/// A source cell before typing. Spreadsheet numbers stay numbers so the
/// decimal-comma setting only ever applies to text.
#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    Text(String),
    Number(f64),
}

static EMPTY_CELL: RawCell = RawCell::Text(String::new());

impl RawCell {
    fn text(&self) -> String {
        match self {
            RawCell::Text(s) => s.clone(),
            RawCell::Number(v) => v.to_string(),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, RawCell::Text(s) if s.is_empty())
    }
}

/// First sheet of the upload.
struct RawSheet {
    headers: Vec<String>,
    /// (1-based source line, cells)
    rows: Vec<(usize, Vec<RawCell>)>,
    /// Applies to text cells only.
    decimal_comma: bool,
}

enum Slot {
    Field(Field),
    Extra(usize),
    Ignored,
}

/// Logical column a header names, if any.
pub fn field_for(header: &str) -> Option<Field> {
    HEADER_ALIASES.get(normalize_header(header).as_str()).copied()
}

pub fn load(bytes: &[u8], file_name: &str) -> Result<CanonicalTable, LoadError> {
    load_with(bytes, file_name, &LoadOptions::default())
}

/// Parse an uploaded file into a canonical table.
///
/// The parser is chosen from the extension of `file_name`. Every row must
/// carry a parseable date; a single bad date cell fails the whole load.
pub fn load_with(
    bytes: &[u8],
    file_name: &str,
    opts: &LoadOptions,
) -> Result<CanonicalTable, LoadError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    debug!(file_name, ext = %ext, bytes = bytes.len(), "selecting parser");

    let raw = if ext == "csv" {
        read_csv(bytes, opts)?
    } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        read_spreadsheet(bytes, opts)?
    } else if ext.is_empty() {
        return Err(LoadError::UnsupportedFormat(file_name.to_string()));
    } else {
        return Err(LoadError::UnsupportedFormat(format!(".{ext}")));
    };

    let table = build_table(raw, opts)?;
    info!(
        file_name,
        rows = table.len(),
        columns = table.columns.len() + table.extra_columns.len(),
        "file loaded"
    );
    Ok(table)
}

fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
    let count = |d: u8| header.iter().filter(|b| **b == d).count();
    let commas = count(b',');
    [b';', b'\t']
        .into_iter()
        .map(|d| (d, count(d)))
        .filter(|(_, n)| *n > commas)
        .max_by_key(|(_, n)| *n)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

fn read_csv(bytes: &[u8], opts: &LoadOptions) -> Result<RawSheet, LoadError> {
    let delimiter = opts.delimiter.unwrap_or_else(|| sniff_delimiter(bytes));
    let decimal_comma = opts.decimal_comma.unwrap_or(delimiter != b',');
    debug!(delimiter = %(delimiter as char).escape_default(), decimal_comma, "reading CSV");

    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        let cells = record
            .iter()
            .map(|c| RawCell::Text(c.trim().to_string()))
            .collect();
        rows.push((line, cells));
    }
    Ok(RawSheet {
        headers,
        rows,
        decimal_comma,
    })
}

fn read_spreadsheet(bytes: &[u8], opts: &LoadOptions) -> Result<RawSheet, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook.worksheet_range_at(0).ok_or(LoadError::EmptySheet)??;
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = sheet_rows
        .next()
        .map(|r| r.iter().map(|c| to_raw_cell(c, false).text()).collect())
        .unwrap_or_default();
    let date_col = headers.iter().position(|h| field_for(h) == Some(Field::Date));

    let rows = sheet_rows
        .enumerate()
        .map(|(idx, r)| {
            let cells = r
                .iter()
                .enumerate()
                .map(|(col, c)| to_raw_cell(c, Some(col) == date_col))
                .collect();
            // +1 for the header row, +1 for 1-based numbering
            (first_row + idx + 2, cells)
        })
        .collect();

    Ok(RawSheet {
        headers,
        rows,
        decimal_comma: opts.decimal_comma.unwrap_or(false),
    })
}

/// Convert a spreadsheet cell. Date cells become `YYYY-MM-DD` text using the
/// workbook's own date system; in the date column, plain numbers are 1900
/// serials whose date format was lost.
fn to_raw_cell(cell: &Data, in_date_column: bool) -> RawCell {
    let iso = |d: NaiveDate| RawCell::Text(d.format("%Y-%m-%d").to_string());
    let serial_date = |serial: f64| {
        excel_serial_to_date(serial)
            .map(iso)
            .unwrap_or(RawCell::Number(serial))
    };
    match cell {
        Data::String(v) | Data::DateTimeIso(v) | Data::DurationIso(v) => {
            RawCell::Text(v.trim().to_string())
        }
        Data::DateTime(v) => match v.as_datetime() {
            Some(dt) => iso(dt.date()),
            None => RawCell::Number(v.as_f64()),
        },
        Data::Float(v) if in_date_column => serial_date(*v),
        Data::Int(v) if in_date_column => serial_date(*v as f64),
        Data::Float(v) => RawCell::Number(*v),
        Data::Int(v) => RawCell::Number(*v as f64),
        Data::Bool(v) => RawCell::Text(v.to_string()),
        Data::Error(_) | Data::Empty => RawCell::Text(String::new()),
    }
}

fn build_table(raw: RawSheet, opts: &LoadOptions) -> Result<CanonicalTable, LoadError> {
    if raw.headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::NoHeader);
    }

    let mut columns: Vec<Field> = Vec::new();
    let mut extra_columns: Vec<String> = Vec::new();
    let mut slots = Vec::with_capacity(raw.headers.len());
    for header in &raw.headers {
        match field_for(header) {
            Some(field) if !columns.contains(&field) => {
                columns.push(field);
                slots.push(Slot::Field(field));
            }
            Some(field) => {
                warn!(header = %header, column = field.name(), "duplicate column ignored");
                slots.push(Slot::Ignored);
            }
            None if header.is_empty() => slots.push(Slot::Ignored),
            None => {
                slots.push(Slot::Extra(extra_columns.len()));
                extra_columns.push(header.clone());
            }
        }
    }
    let date_idx = slots
        .iter()
        .position(|s| matches!(s, Slot::Field(Field::Date)))
        .ok_or(LoadError::MissingDateColumn)?;

    let mut rows = Vec::with_capacity(raw.rows.len());
    let mut blank_rows = 0usize;
    for (line, cells) in &raw.rows {
        if cells.iter().all(|c| c.is_empty()) {
            blank_rows += 1;
            continue;
        }
        let cell = |i: usize| cells.get(i).unwrap_or(&EMPTY_CELL);

        let raw_date = cell(date_idx).text();
        let date = parse_date(&raw_date, &opts.date_formats).ok_or_else(|| {
            LoadError::InvalidDate {
                row: *line,
                value: raw_date.clone(),
            }
        })?;

        let mut row = InterventionRow::new(date);
        row.extra = vec![String::new(); extra_columns.len()];
        for (i, slot) in slots.iter().enumerate() {
            let value = cell(i);
            match slot {
                Slot::Field(Field::Date) | Slot::Ignored => {}
                Slot::Field(Field::InterventionType) => row.intervention_type = text(value),
                Slot::Field(Field::Location) => row.location = text(value),
                Slot::Field(Field::Crew) => row.crew = text(value),
                Slot::Field(Field::Observations) => row.observations = text(value),
                Slot::Field(field @ (Field::Duration | Field::Cost)) => {
                    let parsed = number(value, *line, *field, raw.decimal_comma)?;
                    if *field == Field::Duration {
                        row.duration = parsed;
                    } else {
                        row.cost = parsed;
                    }
                }
                Slot::Extra(j) => row.extra[*j] = value.text(),
            }
        }
        rows.push(row);
    }

    if blank_rows > 0 {
        debug!(blank_rows, "skipped blank rows");
    }
    Ok(CanonicalTable {
        columns,
        extra_columns,
        rows,
    })
}

fn text(value: &RawCell) -> Option<String> {
    (!value.is_empty()).then(|| value.text())
}

fn number(
    value: &RawCell,
    row: usize,
    field: Field,
    decimal_comma: bool,
) -> Result<Option<f64>, LoadError> {
    let parsed = match value {
        RawCell::Text(s) if s.is_empty() => return Ok(None),
        RawCell::Text(s) => parse_number(s, decimal_comma),
        RawCell::Number(v) => Some(*v).filter(|v| v.is_finite()),
    };
    match parsed {
        Some(v) if v >= 0.0 => Ok(Some(v)),
        _ => Err(LoadError::InvalidNumber {
            row,
            column: field.name(),
            value: value.text(),
        }),
    }
}
