//! Typed query results.

use serde::Serialize;

use crate::db::{CellValue, ResultRow};
use crate::error::GeoError;

/// One row of the `postalcodes` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostalCodeRecord {
    pub countrycode: String,
    pub postalcode: String,
    pub placename: String,
    pub admin1name: String,
    pub admin2name: String,
    pub admin3name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One row of the `geoname` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceRecord {
    pub geonameid: Option<i64>,
    pub name: String,
    pub fclass: String,
    pub fcode: String,
    pub country: String,
    pub admin1: String,
    pub admin2: String,
    pub population: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// A record plus its distance from the query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestResult<T> {
    #[serde(flatten)]
    pub record: T,
    pub distance_km: f64,
    /// Nearest postal code of the same country; place results only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postalcode: Option<String>,
}

/// Conversion from a decoded row, by column name.
pub trait FromResultRow: Sized {
    fn from_row(row: &ResultRow, operation: &'static str) -> Result<Self, GeoError>;

    /// Postal code attached by the nearest-postal-code lookup, if the
    /// query shape has one.
    fn attached_postalcode(_row: &ResultRow) -> Option<String> {
        None
    }
}

impl FromResultRow for PostalCodeRecord {
    fn from_row(row: &ResultRow, operation: &'static str) -> Result<Self, GeoError> {
        let cols = RowReader { row, operation };
        Ok(Self {
            countrycode: cols.text("countrycode")?,
            postalcode: cols.text("postalcode")?,
            placename: cols.text("placename")?,
            admin1name: cols.text("admin1name")?,
            admin2name: cols.text("admin2name")?,
            admin3name: cols.text("admin3name")?,
            latitude: cols.float("latitude")?,
            longitude: cols.float("longitude")?,
        })
    }
}

impl FromResultRow for PlaceRecord {
    fn from_row(row: &ResultRow, operation: &'static str) -> Result<Self, GeoError> {
        let cols = RowReader { row, operation };
        Ok(Self {
            geonameid: cols.optional_integer("geonameid")?,
            name: cols.text("name")?,
            fclass: cols.text("fclass")?,
            fcode: cols.text("fcode")?,
            country: cols.text("country")?,
            admin1: cols.text("admin1")?,
            admin2: cols.text("admin2")?,
            population: cols.optional_integer("population")?.unwrap_or(0).max(0),
            latitude: cols.float("latitude")?,
            longitude: cols.float("longitude")?,
        })
    }

    fn attached_postalcode(row: &ResultRow) -> Option<String> {
        row.get("postalcode")
            .and_then(CellValue::as_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl<T: FromResultRow> NearestResult<T> {
    pub fn from_row(row: &ResultRow, operation: &'static str) -> Result<Self, GeoError> {
        let distance_km = RowReader { row, operation }.float("distance_km")?;
        Ok(Self {
            record: T::from_row(row, operation)?,
            // rounding in the trigonometry can leave -0.0 or a few ulps below 0
            distance_km: if distance_km > 0.0 { distance_km } else { 0.0 },
            postalcode: T::attached_postalcode(row),
        })
    }
}

/// Map a whole result set, preserving order.
pub fn map_rows<T: FromResultRow>(
    rows: &[ResultRow],
    operation: &'static str,
) -> Result<Vec<NearestResult<T>>, GeoError> {
    rows.iter()
        .map(|row| NearestResult::from_row(row, operation))
        .collect()
}

struct RowReader<'a> {
    row: &'a ResultRow,
    operation: &'static str,
}

impl RowReader<'_> {
    fn cell(&self, column: &str) -> Result<&CellValue, GeoError> {
        self.row.get(column).ok_or_else(|| self.shape(column, "is missing from the result"))
    }

    fn shape(&self, column: &str, problem: &str) -> GeoError {
        GeoError::RowShape {
            operation: self.operation,
            column: column.to_string(),
            problem: problem.to_string(),
        }
    }

    /// Text column where NULL reads as empty.
    fn text(&self, column: &str) -> Result<String, GeoError> {
        Ok(self.cell(column)?.as_text().unwrap_or_default())
    }

    fn float(&self, column: &str) -> Result<f64, GeoError> {
        let cell = self.cell(column)?;
        if cell.is_null() {
            return Err(self.shape(column, "is NULL"));
        }
        cell.as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.shape(column, &format!("is not a finite number: {}", cell.display())))
    }

    fn optional_integer(&self, column: &str) -> Result<Option<i64>, GeoError> {
        let cell = self.cell(column)?;
        if cell.is_null() {
            return Ok(None);
        }
        cell.as_i64()
            .map(Some)
            .ok_or_else(|| self.shape(column, &format!("is not an integer: {}", cell.display())))
    }
}
