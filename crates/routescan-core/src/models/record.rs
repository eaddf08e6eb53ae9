//! Extracted manifest records and the result table built from them.

use std::collections::HashSet;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ScanError, ValidationError};

use super::query::Query;

/// Column headers of the results table, in order.
const COLUMNS: [&str; 5] = ["RouteID", "LocationNumber", "StoreName", "PDF", "PageNumber"];

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// An 8-digit delivery route identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RouteId(String);

impl RouteId {
    /// Parse a route identifier, trimming surrounding whitespace.
    pub fn parse(value: &str) -> std::result::Result<Self, ValidationError> {
        let value = value.trim();
        if is_digits(value, 8) {
            Ok(Self(value.to_string()))
        } else {
            Err(ValidationError::RouteId(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A 4-digit store/site location number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationNumber(String);

impl LocationNumber {
    /// Parse a location number, trimming surrounding whitespace.
    pub fn parse(value: &str) -> std::result::Result<Self, ValidationError> {
        let value = value.trim();
        if is_digits(value, 4) {
            Ok(Self(value.to_string()))
        } else {
            Err(ValidationError::LocationNumber(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype_conversions {
    ($ty:ty) => {
        impl TryFrom<String> for $ty {
            type Error = ValidationError;

            fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }
    };
}

string_newtype_conversions!(RouteId);
string_newtype_conversions!(LocationNumber);

/// One route mention on one page, paired with its location and store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    #[serde(rename = "RouteID")]
    pub route_id: RouteId,

    #[serde(rename = "LocationNumber")]
    pub location_number: LocationNumber,

    #[serde(rename = "StoreName")]
    pub store_name: String,

    /// Source document, relative to the scanned input directory.
    #[serde(rename = "PDF")]
    pub pdf: String,

    /// 1-based page number within `pdf`.
    #[serde(rename = "PageNumber")]
    pub page_number: u32,
}

impl ExtractionRecord {
    /// Key the result table is deduplicated on.
    pub fn dedup_key(&self) -> (&RouteId, &LocationNumber, &str, u32) {
        (&self.route_id, &self.location_number, &self.pdf, self.page_number)
    }

    /// Whether this record answers the given query.
    pub fn matches(&self, query: &Query) -> bool {
        self.route_id == query.route_id && self.location_number == query.location_number
    }
}

/// Ordered collection of records from every processed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    records: Vec<ExtractionRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records in the order given.
    pub fn extend(&mut self, records: impl IntoIterator<Item = ExtractionRecord>) {
        self.records.extend(records);
    }

    /// Drop later duplicates of (RouteID, LocationNumber, PDF, PageNumber).
    ///
    /// The first occurrence is kept and survivors keep their relative order.
    /// Returns the number of removed rows.
    pub fn dedup(&mut self) -> usize {
        let before = self.records.len();
        let mut seen = HashSet::with_capacity(before);
        self.records.retain(|record| {
            let (route_id, location_number, pdf, page_number) = record.dedup_key();
            seen.insert((
                route_id.clone(),
                location_number.clone(),
                pdf.to_string(),
                page_number,
            ))
        });

        let removed = before - self.records.len();
        if removed > 0 {
            debug!("Removed {} duplicate records", removed);
        }
        removed
    }

    /// Linear lookup of every record matching the query.
    pub fn find<'a>(&'a self, query: &'a Query) -> impl Iterator<Item = &'a ExtractionRecord> + 'a {
        self.records.iter().filter(move |r| r.matches(query))
    }

    pub fn records(&self) -> &[ExtractionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the table as CSV with a header row.
    ///
    /// An empty set still produces the header.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        wtr.write_record(COLUMNS)?;
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Read a table previously written by [`ResultSet::write_csv`].
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let records = rdr
            .deserialize::<ExtractionRecord>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { records })
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn read_json<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write the table as a single-sheet workbook with a header row.
    ///
    /// Identifiers are stored as text so leading zeros survive.
    pub fn write_xlsx(&self, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in (0u16..).zip(COLUMNS) {
            sheet.write_string(0, col, name)?;
        }
        for (row, record) in (1u32..).zip(&self.records) {
            sheet.write_string(row, 0, record.route_id.as_str())?;
            sheet.write_string(row, 1, record.location_number.as_str())?;
            sheet.write_string(row, 2, record.store_name.as_str())?;
            sheet.write_string(row, 3, record.pdf.as_str())?;
            sheet.write_number(row, 4, record.page_number)?;
        }
        workbook.save(path)?;
        Ok(())
    }

    /// Read the first sheet of a workbook written by [`ResultSet::write_xlsx`].
    pub fn read_xlsx(path: &Path) -> Result<Self> {
        let mut workbook: Xlsx<_> = calamine::open_workbook(path)?;
        let Some(range) = workbook.worksheet_range_at(0) else {
            return Ok(Self::new());
        };
        let range = range?;

        let mut records = Vec::new();
        for (index, row) in range.rows().enumerate().skip(1) {
            if row.iter().all(|cell| matches!(cell, Data::Empty)) {
                continue;
            }
            records.push(record_from_row(index + 1, row)?);
        }
        Ok(Self { records })
    }

    /// Save to `path` in the format its extension names: `.json`, `.xlsx`,
    /// or CSV for anything else.
    pub fn save(&self, path: &Path) -> Result<()> {
        match TableFormat::of(path) {
            TableFormat::Xlsx => self.write_xlsx(path)?,
            format => {
                let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
                if format == TableFormat::Json {
                    self.write_json(&mut file)?;
                } else {
                    self.write_csv(&mut file)?;
                }
                file.flush()?;
            }
        }
        info!("Results saved to {}", path.display());
        Ok(())
    }

    /// Load from `path`, choosing the format the same way as [`ResultSet::save`].
    pub fn load(path: &Path) -> Result<Self> {
        match TableFormat::of(path) {
            TableFormat::Xlsx => Self::read_xlsx(path),
            TableFormat::Json => Self::read_json(std::io::BufReader::new(std::fs::File::open(path)?)),
            TableFormat::Csv => Self::read_csv(std::io::BufReader::new(std::fs::File::open(path)?)),
        }
    }
}

impl FromIterator<ExtractionRecord> for ResultSet {
    fn from_iter<I: IntoIterator<Item = ExtractionRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Csv,
    Json,
    Xlsx,
}

impl TableFormat {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => Self::Xlsx,
            _ => Self::Csv,
        }
    }
}

/// Spreadsheet cells as text. Whole numbers print without a fraction.
fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        Some(Data::Float(f)) if f.fract() == 0.0 => format!("{}", *f as i64),
        Some(cell) => cell.to_string(),
        None => String::new(),
    }
}

fn record_from_row(row: usize, cells: &[Data]) -> Result<ExtractionRecord> {
    let text = |col: usize| cell_text(cells.get(col));
    let page = text(4);
    let page_number = page.trim().parse().map_err(|_| ScanError::Table {
        row,
        message: format!("invalid page number {:?}", page),
    })?;
    Ok(ExtractionRecord {
        route_id: RouteId::parse(&text(0))?,
        location_number: LocationNumber::parse(&text(1))?,
        store_name: text(2),
        pdf: text(3),
        page_number,
    })
}
