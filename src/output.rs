//! Rendering of query results as text, JSON or CSV.

use std::fmt::Write as _;

use clap::ValueEnum;
use serde::Serialize;

use crate::engine::Strategy;
use crate::model::{NearestResult, PlaceRecord, PostalCodeRecord};
use crate::request::DistanceQueryRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// One JSON document with both result lists
    Json,
    /// One CSV table, both entity kinds, `kind` column first
    Csv,
}

/// Everything printed for one invocation.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    #[serde(flatten)]
    pub request: &'a DistanceQueryRequest,
    pub strategy: Strategy,
    pub strategy_label: &'static str,
    pub postal_codes: &'a [NearestResult<PostalCodeRecord>],
    pub places: &'a [NearestResult<PlaceRecord>],
}

impl<'a> Report<'a> {
    pub fn new(
        request: &'a DistanceQueryRequest,
        strategy: Strategy,
        postal_codes: &'a [NearestResult<PostalCodeRecord>],
        places: &'a [NearestResult<PlaceRecord>],
    ) -> Self {
        Self {
            request,
            strategy,
            strategy_label: strategy.label(),
            postal_codes,
            places,
        }
    }

    pub fn render(&self, format: OutputFormat) -> serde_json::Result<String> {
        match format {
            OutputFormat::Text => Ok(self.to_text()),
            OutputFormat::Json => serde_json::to_string_pretty(self),
            OutputFormat::Csv => Ok(self.to_csv()),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "GeoNames reverse geocoder");
        let _ = writeln!(out, "  Latitude  : {:?}", self.request.latitude());
        let _ = writeln!(out, "  Longitude : {:?}", self.request.longitude());
        let _ = writeln!(out, "  Results   : {}", self.request.limit());
        if let Some(country) = self.request.country() {
            let _ = writeln!(out, "  Country   : {country}");
        }
        let _ = writeln!(out, "  Strategy  : {}", self.strategy_label);
        let _ = writeln!(out, "{rule}\n");

        if self.postal_codes.is_empty() {
            out.push_str("No postal-code data found for these coordinates.\n\n");
        } else {
            let _ = writeln!(
                out,
                "Nearest postal-code entries ({} result(s)):\n",
                self.postal_codes.len()
            );
            for result in self.postal_codes {
                write_postal_block(&mut out, result);
            }
        }

        let _ = writeln!(out, "{}\n", "-".repeat(60));

        if self.places.is_empty() {
            out.push_str("No geoname entries found.\n\n");
        } else {
            let _ = writeln!(
                out,
                "Nearest geoname entries ({} result(s)):\n",
                self.places.len()
            );
            for result in self.places {
                write_place_block(&mut out, result);
            }
        }
        out
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(
            "kind,country,postalcode,name,admin1,admin2,admin3,geonameid,feature,population,latitude,longitude,distance_km\n",
        );

        for result in self.postal_codes {
            let r = &result.record;
            let cells = [
                "postalcode".to_string(),
                r.countrycode.clone(),
                r.postalcode.clone(),
                r.placename.clone(),
                r.admin1name.clone(),
                r.admin2name.clone(),
                r.admin3name.clone(),
                String::new(),
                String::new(),
                String::new(),
                r.latitude.to_string(),
                r.longitude.to_string(),
                format!("{:.3}", result.distance_km),
            ];
            push_csv_row(&mut output, &cells);
        }

        for result in self.places {
            let r = &result.record;
            let cells = [
                "place".to_string(),
                r.country.clone(),
                result.postalcode.clone().unwrap_or_default(),
                r.name.clone(),
                r.admin1.clone(),
                r.admin2.clone(),
                String::new(),
                r.geonameid.map(|id| id.to_string()).unwrap_or_default(),
                format!("{}/{}", r.fclass, r.fcode),
                r.population.to_string(),
                r.latitude.to_string(),
                r.longitude.to_string(),
                format!("{:.3}", result.distance_km),
            ];
            push_csv_row(&mut output, &cells);
        }

        output
    }
}

fn write_postal_block(out: &mut String, result: &NearestResult<PostalCodeRecord>) {
    let r = &result.record;
    let _ = writeln!(out, "  Country     : {}", r.countrycode);
    let _ = writeln!(out, "  Postal code : {}", r.postalcode);
    let _ = writeln!(out, "  Place       : {}", r.placename);
    for (label, value) in [
        ("Admin 3", &r.admin3name),
        ("Admin 2", &r.admin2name),
        ("Admin 1", &r.admin1name),
    ] {
        if !value.is_empty() {
            let _ = writeln!(out, "  {label:<12}: {value}");
        }
    }
    let _ = writeln!(out, "  Coordinates : {:?}, {:?}", r.latitude, r.longitude);
    let _ = writeln!(out, "  Distance    : {:.3} km\n", result.distance_km);
}

fn write_place_block(out: &mut String, result: &NearestResult<PlaceRecord>) {
    let r = &result.record;
    if let Some(id) = r.geonameid {
        let _ = writeln!(out, "  GeoName ID  : {id}");
    }
    let _ = writeln!(out, "  Name        : {}", r.name);
    let _ = writeln!(out, "  Country     : {}", r.country);
    let _ = writeln!(out, "  Feature     : {}/{}", r.fclass, r.fcode);
    let _ = writeln!(out, "  Population  : {}", group_thousands(r.population));
    if let Some(code) = &result.postalcode {
        let _ = writeln!(out, "  Postal code : {code}");
    }
    let _ = writeln!(out, "  Coordinates : {:?}, {:?}", r.latitude, r.longitude);
    let _ = writeln!(out, "  Distance    : {:.3} km\n", result.distance_km);
}

/// `2138551` → `2,138,551`
fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn push_csv_row(output: &mut String, cells: &[String]) {
    let escaped: Vec<String> = cells.iter().map(|c| csv_escape(c)).collect();
    output.push_str(&escaped.join(","));
    output.push('\n');
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
