//! Shared GeoNames fixture for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use geonear::engine::haversine_km;

/// (countrycode, postalcode, placename, admin1name, admin2name, latitude, longitude)
pub type PostalRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    Option<f64>,
    Option<f64>,
);

/// (geonameid, name, fclass, fcode, country, population, latitude, longitude)
pub type PlaceRow = (
    i64,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    Option<i64>,
    Option<f64>,
    Option<f64>,
);

pub const POSTAL_ROWS: &[PostalRow] = &[
    ("MX", "A", "Alpha", "", "", Some(19.0), Some(-99.0)),
    ("MX", "B", "Bravo", "", "", Some(19.5), Some(-99.5)),
    ("FR", "75004", "Paris 04", "Île-de-France", "Paris", Some(48.8543), Some(2.3576)),
    ("FR", "75001", "Paris 01", "Île-de-France", "Paris", Some(48.8625), Some(2.3364)),
    ("FR", "69001", "Lyon 01", "Auvergne-Rhône-Alpes", "Rhône", Some(45.7676), Some(4.8345)),
    ("FR", "99999", "Nowhere", "", "", None, None),
    ("BE", "1000", "Bruxelles", "Bruxelles-Capitale", "", Some(50.8467), Some(4.3525)),
    ("DE", "52062", "Aachen", "Nordrhein-Westfalen", "", Some(50.7766), Some(6.0834)),
    ("KI", "INSIDE", "Inside", "", "", Some(4.4), Some(-150.0)),
    ("KI", "OUTSIDE", "Outside", "", "", Some(-4.6), Some(-150.0)),
    ("SE", "NORTH60", "Sixty north", "", "", Some(60.0), Some(15.5)),
    ("FJ", "EAST", "Dateline east", "", "", Some(-17.0), Some(-179.9)),
    ("IS", "", "Uncoded", "", "", Some(66.54), Some(-18.0)),
];

pub const PLACE_ROWS: &[PlaceRow] = &[
    (3530597, "Mexico City", "P", "PPLC", "MX", Some(12_294_193), Some(19.42847), Some(-99.12766)),
    (2988507, "Paris", "P", "PPLC", "FR", Some(2_138_551), Some(48.85341), Some(2.3488)),
    (2980916, "Saint-Denis", "P", "PPLA3", "FR", None, Some(48.93564), Some(2.35387)),
    (2996944, "Lyon", "P", "PPLA", "FR", Some(522_969), Some(45.74846), Some(4.84671)),
    (2995469, "Marseille", "P", "PPLA", "FR", Some(870_731), Some(43.29695), Some(5.38107)),
    (3038334, "Bastia", "P", "PPLA2", "FR", Some(41_001), Some(42.70278), Some(9.45)),
    (2993458, "Monaco", "P", "PPLC", "MC", Some(32_965), Some(43.73333), Some(7.41667)),
    (2800866, "Brussels", "P", "PPLC", "BE", Some(1_019_022), Some(50.85045), Some(4.34878)),
    (3247449, "Aachen", "P", "PPLA3", "DE", Some(265_208), Some(50.77664), Some(6.08342)),
    (9999999, "Unplaced", "P", "PPL", "FR", Some(1), None, None),
    (9999998, "Dateline", "P", "PPL", "FJ", Some(500), Some(-17.05), Some(-179.95)),
];

pub const CREATE_TABLES: &str = "
    CREATE TABLE postalcodes (
        countrycode CHAR(2),
        postalcode  VARCHAR(20),
        placename   VARCHAR(180),
        admin1name  VARCHAR(100),
        admin2name  VARCHAR(100),
        admin3name  VARCHAR(100),
        latitude    DOUBLE PRECISION,
        longitude   DOUBLE PRECISION
    );
    CREATE TABLE geoname (
        geonameid  INTEGER,
        name       VARCHAR(200),
        asciiname  VARCHAR(200),
        latitude   DOUBLE PRECISION,
        longitude  DOUBLE PRECISION,
        fclass     CHAR(1),
        fcode      VARCHAR(10),
        country    VARCHAR(3),
        admin1     VARCHAR(20),
        admin2     VARCHAR(80),
        population BIGINT
    );
";

fn sql_float(v: Option<f64>) -> String {
    v.map_or_else(|| "NULL".to_string(), |v| format!("{v:?}"))
}

fn sql_text(s: &str) -> String {
    if s.is_empty() {
        "NULL".to_string()
    } else {
        format!("'{}'", s.replace('\'', "''"))
    }
}

/// INSERT statements for the whole fixture, valid on SQLite and PostgreSQL.
pub fn insert_statements() -> String {
    let mut sql = String::new();
    for (cc, code, place, a1, a2, lat, lon) in POSTAL_ROWS {
        sql.push_str(&format!(
            "INSERT INTO postalcodes VALUES ({}, {}, {}, {}, {}, NULL, {}, {});\n",
            sql_text(cc),
            sql_text(code),
            sql_text(place),
            sql_text(a1),
            sql_text(a2),
            sql_float(*lat),
            sql_float(*lon)
        ));
    }
    for (id, name, fclass, fcode, country, population, lat, lon) in PLACE_ROWS {
        sql.push_str(&format!(
            "INSERT INTO geoname VALUES ({id}, {}, {}, {}, {}, {}, {}, {}, NULL, NULL, {});\n",
            sql_text(name),
            sql_text(name),
            sql_float(*lat),
            sql_float(*lon),
            sql_text(fclass),
            sql_text(fcode),
            sql_text(country),
            population.map_or_else(|| "NULL".to_string(), |p| p.to_string())
        ));
    }
    sql
}

/// `sqlite://` URL for an absolute fixture path.
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite:///{}", path.display())
}

/// Write the fixture to `<dir>/geonames.db` and return its path.
pub fn create_sqlite_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("geonames.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(CREATE_TABLES).unwrap();
    conn.execute_batch(&insert_statements()).unwrap();
    path
}

/// Postal code nearest to the point by brute force, within `radius_km`.
pub fn brute_force_nearest_postal(lat: f64, lon: f64, radius_km: f64) -> Option<&'static str> {
    POSTAL_ROWS
        .iter()
        .filter_map(|(_, code, _, _, _, plat, plon)| {
            let d = haversine_km(lat, lon, (*plat)?, (*plon)?, 6371.0);
            (d <= radius_km).then_some((*code, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(code, _)| code)
}

/// Query points used by the cross-strategy comparisons. Each lies well
/// inside the pre-filter radius of its nearest fixture row.
pub const PROBE_POINTS: &[(f64, f64)] = &[
    (19.4326, -99.1332),
    (48.8566, 2.3522),
    (45.7, 4.9),
    (50.8, 4.5),
    (50.7, 6.0),
    (60.0, 10.0),
    (-17.0, 179.9),
];
