//! Lookup queries loaded from a `RouteID,LocationNumber` CSV file.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, ValidationError};

use super::record::{LocationNumber, RouteId};

/// A (route, location) pair to search the result table for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub route_id: RouteId,
    pub location_number: LocationNumber,
}

impl Query {
    pub fn parse(route_id: &str, location_number: &str) -> std::result::Result<Self, ValidationError> {
        Ok(Self {
            route_id: RouteId::parse(route_id)?,
            location_number: LocationNumber::parse(location_number)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    #[serde(rename = "RouteID", default)]
    route_id: String,
    #[serde(rename = "LocationNumber", default)]
    location_number: String,
}

/// Load queries from a CSV file.
///
/// See [`read_queries`] for the row handling rules.
pub fn load_queries(path: &Path) -> Result<Vec<Query>> {
    let file = std::fs::File::open(path)?;
    read_queries(file)
}

/// Read queries from CSV data with `RouteID` and `LocationNumber` headers.
///
/// Rows with an empty field are skipped silently. Rows whose fields fail the
/// 8-digit / 4-digit format, or that cannot be decoded at all, are skipped
/// with a warning. Parsing always continues with the next row.
pub fn read_queries<R: Read>(reader: R) -> Result<Vec<Query>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut queries = Vec::new();
    for (index, row) in rdr.deserialize::<QueryRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping unreadable CSV row {}: {}", line, e);
                continue;
            }
        };

        if row.route_id.is_empty() || row.location_number.is_empty() {
            debug!("Skipping CSV row {} with an empty field", line);
            continue;
        }

        match Query::parse(&row.route_id, &row.location_number) {
            Ok(query) => queries.push(query),
            Err(e) => warn!(
                "Invalid formats in CSV row {}: RouteID='{}', LocationNumber='{}' ({})",
                line, row.route_id, row.location_number, e
            ),
        }
    }

    debug!("Loaded {} valid queries", queries.len());
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_malformed_rows_are_skipped() {
        let csv = "RouteID,LocationNumber\n\
                   123,1234\n\
                   12345678,1234\n\
                   87654321,12\n\
                   ,1234\n\
                   11112222, 0042 \n";
        let queries = read_queries(csv.as_bytes()).unwrap();
        assert_eq!(
            queries,
            vec![
                Query::parse("12345678", "1234").unwrap(),
                Query::parse("11112222", "0042").unwrap(),
            ]
        );
    }

    #[test]
    fn test_missing_column_yields_no_queries() {
        let csv = "RouteID,Store\n12345678,Acme\n";
        assert!(read_queries(csv.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_extra_columns_and_short_rows() {
        let csv = "Note,RouteID,LocationNumber\nfirst,12345678,1234\nshort\nthird,87654321,4321\n";
        let queries = read_queries(csv.as_bytes()).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].route_id.as_str(), "87654321");
    }
}
