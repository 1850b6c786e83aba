//! Reader for OOXML workbooks (`.xlsx`, `.xlsm`).
//!
//! Only cell values are read: styles, formulas and number formats are
//! ignored. Each worksheet becomes a [`Table`] whose header is the first
//! non-empty row, the same shape `pandas.read_excel(sheet_name=None)`
//! produces:
//! - blank header cells are named `Unnamed: {index}`,
//! - repeated header names get `.1`, `.2`, ... suffixes,
//! - fully blank rows are dropped,
//! - booleans render as `True`/`False` and integral numbers without `.0`,
//! - numbers styled with a date or time format render as
//!   `YYYY-MM-DD HH:MM:SS` (or `HH:MM:SS` for pure times).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read, Seek};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::table::Table;

// Local element names, compared without namespace prefix.
const TAG_SHEET: &[u8] = b"sheet";
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";
const TAG_PHONETIC_TEXT: &[u8] = b"rPh";
const TAG_TEXT: &[u8] = b"t";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";
const TAG_INLINE_STRING: &[u8] = b"is";
const TAG_VALUE: &[u8] = b"v";
const TAG_WORKBOOK_PROPERTIES: &[u8] = b"workbookPr";
const TAG_CUSTOM_FORMATS: &[u8] = b"numFmts";
const TAG_CUSTOM_FORMAT: &[u8] = b"numFmt";
const TAG_FORMAT_INDEXES: &[u8] = b"cellXfs";
const TAG_FORMAT_INDEX: &[u8] = b"xf";

const PART_WORKBOOK: &str = "xl/workbook.xml";
const PART_WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const PART_SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const PART_STYLES: &str = "xl/styles.xml";

/// Sheet size limits of the OOXML format (`XFD1048576`).
pub const MAX_COLUMNS: usize = 16_384;
pub const MAX_ROWS: usize = 1_048_576;

/// Largest serial Excel can display (9999-12-31).
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("not a spreadsheet archive: {0}")]
    Zip(#[from] ZipError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid text encoding: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    #[error("workbook part '{0}' is missing")]
    MissingPart(String),

    #[error("unknown XML entity '{0}'")]
    Entity(String),

    #[error("invalid shared string reference '{0}'")]
    SharedString(String),

    #[error("invalid cell reference '{0}'")]
    CellReference(String),

    #[error("workbook contains no worksheets")]
    NoWorksheets,
}

/// One tab of a workbook, in workbook order.
#[derive(Debug, Clone, PartialEq)]
pub struct Worksheet {
    pub name: String,
    pub table: Table,
}

/// Parses every worksheet of an OOXML workbook held in memory.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<Worksheet>, XlsxError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;

    let relationships = load_relationships(&mut zip)?;
    let (sheets, is_1904) = load_workbook(&mut zip, &relationships)?;
    if sheets.is_empty() {
        return Err(XlsxError::NoWorksheets);
    }
    let shared_strings = load_shared_strings(&mut zip)?;
    let number_formats = load_number_formats(&mut zip, is_1904)?;

    let mut worksheets = Vec::with_capacity(sheets.len());
    for (name, path) in sheets {
        let xml = read_part(&mut zip, &path)?.ok_or_else(|| XlsxError::MissingPart(path.clone()))?;
        let cells = read_cells(&xml, &shared_strings, &number_formats)?;
        worksheets.push(Worksheet {
            name,
            table: cells_to_table(cells),
        });
    }
    Ok(worksheets)
}

macro_rules! xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}

struct XmlReader<'a> {
    reader: Reader<&'a [u8]>,
    buffer: Vec<u8>,
}

impl<'a> XmlReader<'a> {
    fn new(xml: &'a [u8]) -> Self {
        let mut reader = Reader::from_reader(xml);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);
        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    fn next(&mut self) -> Result<Option<Event<'_>>, XlsxError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

fn attribute(event: &BytesStart<'_>, name: &str) -> Result<Option<String>, XlsxError> {
    match event.try_get_attribute(name)? {
        Some(attribute) => Ok(Some(attribute.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Reads an archive entry, matching its name case-insensitively.
fn read_part<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>, XlsxError> {
    let pattern = name.replace('\\', "/");
    let path = zip
        .file_names()
        .find(|file_name| pattern.eq_ignore_ascii_case(file_name))
        .map(str::to_owned);
    let Some(path) = path else {
        return Ok(None);
    };
    let mut file = zip.by_name(&path)?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// Maps relationship ids to worksheet paths inside the archive.
fn load_relationships<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<HashMap<String, String>, XlsxError> {
    let xml = read_part(zip, PART_WORKBOOK_RELS)?
        .ok_or_else(|| XlsxError::MissingPart(PART_WORKBOOK_RELS.to_string()))?;
    let mut reader = XmlReader::new(&xml);
    let mut relationships = HashMap::new();
    xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = attribute(&event, "Id")?;
            let kind = attribute(&event, "Type")?;
            let target = attribute(&event, "Target")?;
            if kind.map(|kind| kind.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id, to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

fn to_zip_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

/// Worksheet `(name, path)` pairs in workbook order, and whether the
/// workbook counts dates from 1904.
fn load_workbook<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> Result<(Vec<(String, String)>, bool), XlsxError> {
    let xml = read_part(zip, PART_WORKBOOK)?.ok_or_else(|| XlsxError::MissingPart(PART_WORKBOOK.to_string()))?;
    let mut reader = XmlReader::new(&xml);
    let mut sheets = Vec::new();
    let mut is_1904 = false;
    xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET => {
            let mut name = None;
            let mut id = None;
            for result in event.attributes() {
                let attribute = result?;
                match attribute.key.local_name().as_ref() {
                    b"name" => name = Some(attribute.unescape_value()?.into_owned()),
                    b"id" => id = Some(attribute.unescape_value()?.into_owned()),
                    _ => (),
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id) {
                    sheets.push((name, path.clone()));
                }
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = attribute(&event, "date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// How a numeric cell is displayed, decided by its style.
#[derive(Debug, Clone, Copy, PartialEq)]
enum NumberFormat {
    Number,
    Date { is_1904: bool },
    Time { is_1904: bool },
    DateTime { is_1904: bool },
}

impl NumberFormat {
    fn from_builtin_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(NumberFormat::DateTime { is_1904 }),
            "14" | "15" | "16" | "17" => Some(NumberFormat::Date { is_1904 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(NumberFormat::Time { is_1904 }),
            _ => None,
        }
    }

    /// Classifies a custom format code by the date and time tokens outside
    /// quoted literals, escapes and bracketed sections.
    fn from_format_code(code: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in code.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,
                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,
                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),
                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }
        match (is_date, is_time) {
            (true, true) => NumberFormat::DateTime { is_1904 },
            (true, false) => NumberFormat::Date { is_1904 },
            (false, true) => NumberFormat::Time { is_1904 },
            (false, false) => NumberFormat::Number,
        }
    }
}

/// Number formats indexed by cell style (`cellXfs` order).
fn load_number_formats<R: Read + Seek>(zip: &mut ZipArchive<R>, is_1904: bool) -> Result<Vec<NumberFormat>, XlsxError> {
    let Some(xml) = read_part(zip, PART_STYLES)? else {
        return Ok(Vec::new());
    };
    let mut reader = XmlReader::new(&xml);
    let mut custom_formats = HashMap::<String, NumberFormat>::new();
    let mut format_ids = Vec::<String>::new();
    let mut custom_formats_context = false;
    let mut format_indexes_context = false;
    xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.local_name().as_ref() == TAG_CUSTOM_FORMAT => {
            let id = attribute(&event, "numFmtId")?;
            let code = attribute(&event, "formatCode")?;
            if let Some((id, code)) = id.zip(code) {
                custom_formats.insert(id, NumberFormat::from_format_code(&code, is_1904));
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.local_name().as_ref() == TAG_FORMAT_INDEX => {
            format_ids.push(attribute(&event, "numFmtId")?.unwrap_or_else(|| "0".to_string()));
        }
    });

    Ok(format_ids
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| NumberFormat::from_builtin_id(id, is_1904))
                .unwrap_or(NumberFormat::Number)
        })
        .collect())
}

fn load_shared_strings<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Vec<String>, XlsxError> {
    let Some(xml) = read_part(zip, PART_SHARED_STRINGS)? else {
        return Ok(Vec::new());
    };
    let mut reader = XmlReader::new(&xml);
    let mut strings = Vec::new();
    xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
            strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(strings)
}

/// Collects text up to `end_tag`, skipping phonetic runs.
fn read_string_value(reader: &mut XmlReader<'_>, end_tag: &[u8], is_text_content: bool) -> Result<String, XlsxError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text && !is_phonetic_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text && !is_phonetic_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text && !is_phonetic_text => push_reference(&mut text, &event)?,
    });
    Ok(text)
}

fn push_reference(text: &mut String, reference: &BytesRef<'_>) -> Result<(), XlsxError> {
    let raw = reference.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        }
        .map_err(|_| XlsxError::Entity(raw.to_string()))?;
        if let Some(character) = char::from_u32(code) {
            text.push(character);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
    } else {
        return Err(XlsxError::Entity(raw.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    FormulaString,
    Boolean,
    Error,
    Date,
}

impl CellKind {
    fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") => CellKind::InlineString,
            Some("str") => CellKind::FormulaString,
            Some("b") => CellKind::Boolean,
            Some("e") => CellKind::Error,
            Some("d") => CellKind::Date,
            _ => CellKind::Number,
        }
    }
}

type Cells = BTreeMap<usize, BTreeMap<usize, String>>;

/// Reads the non-empty cell values of one worksheet keyed by row then column.
fn read_cells(xml: &[u8], shared_strings: &[String], number_formats: &[NumberFormat]) -> Result<Cells, XlsxError> {
    let mut reader = XmlReader::new(xml);
    let mut cells = Cells::new();
    let mut next_row = 0usize;
    let mut row = 0usize;
    let mut next_col = 0usize;
    let mut position = (0usize, 0usize);
    let mut kind = CellKind::Number;
    let mut format = NumberFormat::Number;
    let mut value = String::new();

    xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
            row = match attribute(&event, "r")? {
                Some(r) => r
                    .parse::<usize>()
                    .ok()
                    .filter(|&number| number <= MAX_ROWS)
                    .and_then(|number| number.checked_sub(1))
                    .ok_or(XlsxError::CellReference(r))?,
                None => next_row,
            };
            next_col = 0;
        }
        Event::End(event) if event.local_name().as_ref() == TAG_ROW => {
            next_row = row + 1;
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
            position = match attribute(&event, "r")? {
                Some(reference) => {
                    reference_to_index(&reference).ok_or(XlsxError::CellReference(reference))?
                }
                None if next_col < MAX_COLUMNS && row < MAX_ROWS => (row, next_col),
                None => return Err(XlsxError::CellReference(index_to_reference(row, next_col))),
            };
            next_col = position.1 + 1;
            kind = CellKind::from_attribute(attribute(&event, "t")?.as_deref());
            format = attribute(&event, "s")?
                .and_then(|style| style.parse::<usize>().ok())
                .and_then(|style| number_formats.get(style).copied())
                .unwrap_or(NumberFormat::Number);
            value.clear();
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
            if let Some(rendered) = render_value(kind, format, &value, shared_strings)? {
                cells.entry(position.0).or_default().insert(position.1, rendered);
            }
            value.clear();
        }
    });
    Ok(cells)
}

fn render_value(
    kind: CellKind,
    format: NumberFormat,
    raw: &str,
    shared_strings: &[String],
) -> Result<Option<String>, XlsxError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let rendered = match kind {
        CellKind::SharedString => {
            let index = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| XlsxError::SharedString(raw.to_string()))?;
            shared_strings
                .get(index)
                .cloned()
                .ok_or_else(|| XlsxError::SharedString(raw.to_string()))?
        }
        CellKind::Boolean => match raw.trim() {
            "1" | "true" | "TRUE" => "True".to_string(),
            _ => "False".to_string(),
        },
        CellKind::Error => return Ok(None),
        CellKind::Number => format_date(format, raw).unwrap_or_else(|| format_number(raw)),
        CellKind::InlineString | CellKind::FormulaString | CellKind::Date => raw.to_string(),
    };
    if rendered.is_empty() {
        Ok(None)
    } else {
        Ok(Some(rendered))
    }
}

/// Renders a date-styled serial, or `None` when the cell is a plain number
/// or the serial is outside the calendar Excel can display.
fn format_date(format: NumberFormat, raw: &str) -> Option<String> {
    let (is_1904, pattern) = match format {
        NumberFormat::Number => return None,
        NumberFormat::Date { is_1904 } | NumberFormat::DateTime { is_1904 } => (is_1904, "%Y-%m-%d %H:%M:%S"),
        NumberFormat::Time { is_1904 } => (is_1904, "%H:%M:%S"),
    };
    let serial = raw.trim().parse::<f64>().ok()?;
    if !serial.is_finite() || !(0.0..=MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }
    let pattern = if matches!(format, NumberFormat::Time { .. }) && serial >= 1.0 {
        "%Y-%m-%d %H:%M:%S"
    } else {
        pattern
    };
    Some(serial_to_datetime(serial, is_1904)?.format(pattern).to_string())
}

/// Converts an Excel serial into a timestamp. The 1900 system counts the
/// nonexistent 1900-02-29, so serials before it are shifted by one day.
fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    let mut days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    if is_1904 {
        days += 1462;
    } else if days < 60 {
        days += 1;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    base.checked_add_signed(TimeDelta::try_days(days)?)?
        .checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

/// Renders a numeric cell: integral values lose the fractional part.
pub fn format_number(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 => {
            format!("{}", number as i64)
        }
        Ok(number) if number.is_finite() => format!("{number}"),
        _ => raw.to_string(),
    }
}

/// Converts an `A1`-style reference into zero-based `(row, col)`.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for letter in letters.chars() {
        if !letter.is_ascii_alphabetic() {
            return None;
        }
        let digit = letter.to_ascii_uppercase() as usize - 'A' as usize + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
        if col > MAX_COLUMNS {
            return None;
        }
    }
    let row = digits.parse::<usize>().ok().filter(|&row| row <= MAX_ROWS)?.checked_sub(1)?;
    Some((row, col - 1))
}

/// Converts zero-based `(row, col)` into an `A1`-style reference.
pub fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &(row + 1).to_string()
}

fn cells_to_table(mut cells: Cells) -> Table {
    let Some(header_row) = cells.keys().next().copied() else {
        return Table::default();
    };
    let header = cells.remove(&header_row).unwrap_or_default();
    let width = cells
        .values()
        .chain(std::iter::once(&header))
        .filter_map(|row| row.keys().next_back())
        .max()
        .map(|last| last + 1)
        .unwrap_or(0);

    let mut used = HashSet::new();
    let mut columns = Vec::with_capacity(width);
    for index in 0..width {
        let name = header
            .get(&index)
            .cloned()
            .unwrap_or_else(|| format!("Unnamed: {index}"));
        let name = if used.contains(&name) {
            let mut suffix = 1;
            loop {
                let candidate = format!("{name}.{suffix}");
                if !used.contains(&candidate) {
                    break candidate;
                }
                suffix += 1;
            }
        } else {
            name
        };
        used.insert(name.clone());
        columns.push(name);
    }

    let mut table = Table::new(columns);
    for (_, row) in cells {
        if row.is_empty() {
            continue;
        }
        let mut record = vec![None; width];
        for (col, value) in row {
            record[col] = Some(value);
        }
        table.push_record(record);
    }
    table
}

/// Builds small in-memory workbooks for tests.
#[cfg(any(test, feature = "test-export-mocks"))]
pub mod fixture {
    use std::io::{Cursor, Write};

    use quick_xml::escape::escape;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::index_to_reference;

    /// Writes a workbook with one worksheet per `(tab name, rows)` entry.
    ///
    /// Cells that parse as numbers are stored as numeric cells, empty strings
    /// are left out, everything else goes through the shared string table.
    pub fn workbook_bytes(tabs: &[(&str, Vec<Vec<&str>>)]) -> Vec<u8> {
        let mut shared = Vec::<String>::new();
        let mut worksheets = Vec::new();
        for (_, rows) in tabs {
            let mut xml = String::from(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
            );
            for (r, row) in rows.iter().enumerate() {
                xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
                for (c, cell) in row.iter().enumerate() {
                    if cell.is_empty() {
                        continue;
                    }
                    let reference = index_to_reference(r, c);
                    if cell.parse::<f64>().is_ok() {
                        xml.push_str(&format!(r#"<c r="{reference}"><v>{cell}</v></c>"#));
                    } else {
                        let index = match shared.iter().position(|s| s == cell) {
                            Some(index) => index,
                            None => {
                                shared.push(cell.to_string());
                                shared.len() - 1
                            }
                        };
                        xml.push_str(&format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#));
                    }
                }
                xml.push_str("</row>");
            }
            xml.push_str("</sheetData></worksheet>");
            worksheets.push(xml);
        }

        let mut workbook = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, (name, _)) in tabs.iter().enumerate() {
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(*name),
                i + 1,
                i + 1
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }
        workbook.push_str("</sheets></workbook>");
        rels.push_str("</Relationships>");

        let mut strings = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
            shared.len()
        );
        for s in &shared {
            strings.push_str(&format!("<si><t>{}</t></si>", escape(s.as_str())));
        }
        strings.push_str("</sst>");

        let mut parts = vec![
            ("xl/workbook.xml".to_string(), workbook),
            ("xl/_rels/workbook.xml.rels".to_string(), rels),
            ("xl/sharedStrings.xml".to_string(), strings),
        ];
        for (i, xml) in worksheets.into_iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), xml));
        }
        zip_parts(&parts)
    }

    /// Zips arbitrary `(path, content)` parts.
    pub fn zip_parts(parts: &[(String, String)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, content) in parts {
            writer
                .start_file(path.as_str(), SimpleFileOptions::default())
                .expect("start zip entry");
            writer.write_all(content.as_bytes()).expect("write zip entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::{workbook_bytes, zip_parts};
    use super::*;

    #[test]
    fn reads_tabs_in_workbook_order() {
        let bytes = workbook_bytes(&[
            ("BOM", vec![vec!["assembly", "description", "qty"], vec!["A1", "Widget", "5"]]),
            ("Notes", vec![vec!["note"], vec!["hello"]]),
        ]);
        let sheets = read_workbook(&bytes).unwrap();

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "BOM");
        assert_eq!(sheets[0].table.columns, vec!["assembly", "description", "qty"]);
        assert_eq!(
            sheets[0].table.records,
            vec![vec![Some("A1".to_string()), Some("Widget".to_string()), Some("5".to_string())]]
        );
        assert_eq!(sheets[1].name, "Notes");
        assert_eq!(sheets[1].table.value(0, "note"), Some("hello"));
    }

    #[test]
    fn blank_and_duplicate_headers_are_named_like_pandas() {
        let bytes = workbook_bytes(&[(
            "Sheet1",
            vec![vec!["part", "", "part", "part"], vec!["x", "y", "z", "w"]],
        )]);
        let sheets = read_workbook(&bytes).unwrap();
        assert_eq!(
            sheets[0].table.columns,
            vec!["part", "Unnamed: 1", "part.1", "part.2"]
        );
    }

    #[test]
    fn blank_rows_are_skipped_and_short_rows_padded() {
        let bytes = workbook_bytes(&[(
            "Sheet1",
            vec![
                vec!["assembly", "description"],
                vec!["A1"],
                vec![],
                vec!["A2", "Gadget", "extra"],
            ],
        )]);
        let table = &read_workbook(&bytes).unwrap()[0].table;
        assert_eq!(table.columns, vec!["assembly", "description", "Unnamed: 2"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "description"), None);
        assert_eq!(table.value(1, "Unnamed: 2"), Some("extra"));
    }

    #[test]
    fn inline_boolean_and_error_cells() {
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>name</t></is></c><c r="B1" t="inlineStr"><is><t>flag</t></is></c><c r="C1" t="inlineStr"><is><t>value</t></is></c></row>
            <row r="2"><c r="A2" t="inlineStr"><is><t>Bolt &amp; Nut</t></is></c><c r="B2" t="b"><v>1</v></c><c r="C2" t="e"><v>#N/A</v></c></row>
            <row r="3"><c r="A3" t="str"><v>calc</v></c><c r="B3" t="b"><v>0</v></c><c r="C3"><v>2.5</v></c></row>
        </sheetData></worksheet>"#;
        let bytes = zip_parts(&[
            (
                "xl/workbook.xml".to_string(),
                r#"<workbook xmlns:r="r"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
            ),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                r#"<Relationships><Relationship Id="rId1" Type="http://x/worksheet" Target="/xl/worksheets/data.xml"/></Relationships>"#.to_string(),
            ),
            ("xl/worksheets/data.xml".to_string(), sheet.to_string()),
        ]);

        let table = &read_workbook(&bytes).unwrap()[0].table;
        assert_eq!(table.value(0, "name"), Some("Bolt & Nut"));
        assert_eq!(table.value(0, "flag"), Some("True"));
        assert_eq!(table.value(0, "value"), None);
        assert_eq!(table.value(1, "name"), Some("calc"));
        assert_eq!(table.value(1, "flag"), Some("False"));
        assert_eq!(table.value(1, "value"), Some("2.5"));
    }

    #[test]
    fn non_zip_content_is_rejected() {
        let err = read_workbook(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, XlsxError::Zip(_)), "got {err:?}");
    }

    #[test]
    fn archive_without_workbook_part_is_rejected() {
        let bytes = zip_parts(&[("hello.txt".to_string(), "hi".to_string())]);
        let err = read_workbook(&bytes).unwrap_err();
        assert!(matches!(err, XlsxError::MissingPart(_)), "got {err:?}");
    }

    #[test]
    fn references_round_trip() {
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("AB12"), Some((11, 27)));
        assert_eq!(reference_to_index("12"), None);
        assert_eq!(index_to_reference(11, 27), "AB12");
        assert_eq!(index_to_reference(0, 25), "Z1");
    }

    fn single_sheet_workbook(workbook_properties: &str, styles: Option<&str>, rows: &str) -> Vec<u8> {
        let mut parts = vec![
            (
                "xl/workbook.xml".to_string(),
                format!(r#"<workbook xmlns:r="r">{workbook_properties}<sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#),
            ),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                r#"<Relationships><Relationship Id="rId1" Type="http://x/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
            ),
            ("xl/worksheets/sheet1.xml".to_string(), format!("<worksheet><sheetData>{rows}</sheetData></worksheet>")),
        ];
        if let Some(styles) = styles {
            parts.push(("xl/styles.xml".to_string(), styles.to_string()));
        }
        zip_parts(&parts)
    }

    const DATE_STYLES: &str = r#"<styleSheet>
        <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd hh:mm"/></numFmts>
        <cellStyleXfs count="1"><xf numFmtId="14"/></cellStyleXfs>
        <cellXfs count="4"><xf numFmtId="0"/><xf numFmtId="14"/><xf numFmtId="164"/><xf numFmtId="21"/></cellXfs>
    </styleSheet>"#;

    #[test]
    fn oversized_column_references_are_rejected() {
        assert_eq!(reference_to_index("XFD1048576"), Some((1_048_575, 16_383)));
        assert_eq!(reference_to_index("XFE1"), None);
        assert_eq!(reference_to_index("A1048577"), None);

        for reference in ["ZZZZZZZZZZZZZZZ1", "ZZZZZZZ1"] {
            let bytes = single_sheet_workbook("", None, &format!(r#"<row r="1"><c r="{reference}"><v>1</v></c></row>"#));
            match read_workbook(&bytes) {
                Err(XlsxError::CellReference(found)) => assert_eq!(found, reference),
                other => panic!("expected a cell reference error for {reference}, got {other:?}"),
            }
        }
    }

    #[test]
    fn date_styled_numbers_render_as_timestamps() {
        let rows = r#"<row r="1"><c r="A1" t="inlineStr"><is><t>date</t></is></c><c r="B1" t="inlineStr"><is><t>stamp</t></is></c><c r="C1" t="inlineStr"><is><t>time</t></is></c><c r="D1" t="inlineStr"><is><t>plain</t></is></c><c r="E1" t="inlineStr"><is><t>qty</t></is></c></row>
            <row r="2"><c r="A2" s="1"><v>45306</v></c><c r="B2" s="2"><v>45306.5</v></c><c r="C2" s="3"><v>0.75</v></c><c r="D2" s="0"><v>45306</v></c><c r="E2"><v>3.5</v></c></row>"#;
        let bytes = single_sheet_workbook("", Some(DATE_STYLES), rows);

        let table = &read_workbook(&bytes).unwrap()[0].table;
        assert_eq!(table.value(0, "date"), Some("2024-01-15 00:00:00"));
        assert_eq!(table.value(0, "stamp"), Some("2024-01-15 12:00:00"));
        assert_eq!(table.value(0, "time"), Some("18:00:00"));
        assert_eq!(table.value(0, "plain"), Some("45306"));
        assert_eq!(table.value(0, "qty"), Some("3.5"));
    }

    #[test]
    fn dates_follow_the_1904_system() {
        let rows = r#"<row r="1"><c r="A1" t="inlineStr"><is><t>date</t></is></c></row><row r="2"><c r="A2" s="1"><v>43844</v></c></row>"#;
        let bytes = single_sheet_workbook(r#"<workbookPr date1904="1"/>"#, Some(DATE_STYLES), rows);

        let table = &read_workbook(&bytes).unwrap()[0].table;
        assert_eq!(table.value(0, "date"), Some("2024-01-15 00:00:00"));
    }

    #[test]
    fn custom_formats_are_classified_outside_literals() {
        assert_eq!(NumberFormat::from_format_code("dd/mm/yyyy", false), NumberFormat::Date { is_1904: false });
        assert_eq!(NumberFormat::from_format_code("h:mm:ss", false), NumberFormat::Time { is_1904: false });
        assert_eq!(NumberFormat::from_format_code("yyyy-mm-dd hh:mm", true), NumberFormat::DateTime { is_1904: true });
        assert_eq!(NumberFormat::from_format_code(r#"0.00" days""#, false), NumberFormat::Number);
        assert_eq!(NumberFormat::from_format_code("[Red]0.00", false), NumberFormat::Number);
        assert_eq!(NumberFormat::from_format_code(r"0\d", false), NumberFormat::Number);
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(format_number("5"), "5");
        assert_eq!(format_number("5.0"), "5");
        assert_eq!(format_number("3.25"), "3.25");
        assert_eq!(format_number("abc"), "abc");
    }
}
