//! Statement assembly for the two query shapes.
//!
//! Both follow the same skeleton: non-NULL coordinates, strategy
//! pre-filter, optional country filter, `ORDER BY distance_km`, `LIMIT`.
//! Place queries additionally attach the nearest postal code of the same
//! country inside the degree box around each place.

use super::distance::{
    push_degree_box, push_distance_km, push_pairwise_order, push_prefilter, PointColumns,
    SearchSettings,
};
use super::sql::SqlBuilder;
use super::strategy::Strategy;
use crate::db::{PlaceholderStyle, SqlParam, Statement};
use crate::request::DistanceQueryRequest;

pub const POSTAL_OPERATION: &str = "nearest postal-code query";
pub const PLACE_OPERATION: &str = "nearest place query";

const POSTAL_COLUMNS: &str = "countrycode, postalcode, placename, \
     admin1name, admin2name, admin3name, latitude, longitude";

const PLACE_COLUMNS: &str = "g.geonameid, g.name, g.fclass, g.fcode, g.country, \
     g.admin1, g.admin2, g.population, g.latitude, g.longitude";

/// Nearest rows of `postalcodes` to the request point.
pub fn build_postal_query(
    strategy: Strategy,
    style: PlaceholderStyle,
    settings: &SearchSettings,
    request: &DistanceQueryRequest,
) -> Statement {
    let (lat, lon) = (request.latitude(), request.longitude());
    let cols = PointColumns::of(None);
    let mut b = SqlBuilder::new(style);

    b.push_sql(&format!("SELECT {POSTAL_COLUMNS}, "));
    push_distance_km(&mut b, strategy, settings, &cols, lat, lon);
    b.push_sql(" AS distance_km FROM postalcodes");
    b.push_sql(" WHERE latitude IS NOT NULL AND longitude IS NOT NULL AND ");
    push_prefilter(&mut b, strategy, settings, &cols, lat, lon);
    if let Some(country) = request.country() {
        b.push_sql(" AND countrycode = ")
            .push_param(SqlParam::Text(country.to_string()));
    }
    push_order_and_limit(&mut b, request);
    b.finish()
}

/// Nearest rows of `geoname` to the request point, each with the postal
/// code closest to the place itself.
pub fn build_place_query(
    strategy: Strategy,
    style: PlaceholderStyle,
    settings: &SearchSettings,
    request: &DistanceQueryRequest,
) -> Statement {
    let (lat, lon) = (request.latitude(), request.longitude());
    let place = PointColumns::of(Some("g"));
    let mut b = SqlBuilder::new(style);

    b.push_sql(&format!("SELECT {PLACE_COLUMNS}, "));
    push_distance_km(&mut b, strategy, settings, &place, lat, lon);
    b.push_sql(" AS distance_km, ");

    match strategy {
        Strategy::Geodesic(_) | Strategy::GreatCircle => {
            // LATERAL lets the KNN operator walk the GIST index per place
            b.push_sql("pc.postalcode FROM geoname g LEFT JOIN LATERAL (");
            push_nearest_postal_lookup(&mut b, strategy, settings, &place);
            b.push_sql(") pc ON true");
        }
        Strategy::Haversine => {
            // correlated scalar sub-select, understood by MySQL and SQLite
            b.push_sql("(");
            push_nearest_postal_lookup(&mut b, strategy, settings, &place);
            b.push_sql(") AS postalcode FROM geoname g");
        }
    }

    b.push_sql(" WHERE g.latitude IS NOT NULL AND g.longitude IS NOT NULL AND ");
    push_prefilter(&mut b, strategy, settings, &place, lat, lon);
    if let Some(country) = request.country() {
        b.push_sql(" AND g.country = ")
            .push_param(SqlParam::Text(country.to_string()));
    }
    push_order_and_limit(&mut b, request);
    b.finish()
}

/// `SELECT p.postalcode ... LIMIT 1` for the postal code nearest `place`.
fn push_nearest_postal_lookup(
    b: &mut SqlBuilder,
    strategy: Strategy,
    settings: &SearchSettings,
    place: &PointColumns,
) {
    let postal = PointColumns::of(Some("p"));
    b.push_sql(
        "SELECT p.postalcode FROM postalcodes p \
         WHERE p.countrycode = g.country \
         AND p.latitude IS NOT NULL AND p.longitude IS NOT NULL AND ",
    );
    push_degree_box(b, settings, &postal, place);
    b.push_sql(" ORDER BY ");
    match strategy {
        Strategy::Haversine => push_pairwise_order(b, strategy, settings, place, &postal),
        _ => push_pairwise_order(b, strategy, settings, &postal, place),
    }
    b.push_sql(" LIMIT 1");
}

fn push_order_and_limit(b: &mut SqlBuilder, request: &DistanceQueryRequest) {
    b.push_sql(" ORDER BY distance_km LIMIT ")
        .push_param(SqlParam::Int(i64::from(request.limit())));
}
