//! Request validation.
//!
//! A [`DistanceQueryRequest`] can only be built through
//! [`DistanceQueryRequest::new`], so every request that reaches the engine
//! has in-range coordinates, a positive limit and a normalised country code.

use serde::Serialize;

use crate::error::GeoError;

/// Number of results returned when the caller does not ask for a count.
pub const DEFAULT_LIMIT: u32 = 3;

/// A validated "nearest rows to this point" request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceQueryRequest {
    latitude: f64,
    longitude: f64,
    limit: u32,
    country: Option<String>,
}

impl DistanceQueryRequest {
    /// Validate raw inputs. `limit` defaults to [`DEFAULT_LIMIT`]; an empty
    /// or whitespace-only country means "search all countries".
    pub fn new(
        latitude: Option<f64>,
        longitude: Option<f64>,
        limit: Option<u32>,
        country: Option<&str>,
    ) -> Result<Self, GeoError> {
        let latitude = check_coordinate("latitude", latitude, 90.0)?;
        let longitude = check_coordinate("longitude", longitude, 180.0)?;

        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(GeoError::Validation(
                "result count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            latitude,
            longitude,
            limit,
            country: normalize_country(country)?,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }
}

fn check_coordinate(name: &str, value: Option<f64>, bound: f64) -> Result<f64, GeoError> {
    let value = value.ok_or_else(|| GeoError::Validation(format!("{name} is required")))?;
    if !value.is_finite() {
        return Err(GeoError::Validation(format!("{name} must be a finite number")));
    }
    if !(-bound..=bound).contains(&value) {
        return Err(GeoError::Validation(format!(
            "{name} must be between -{bound} and {bound}, got {value}"
        )));
    }
    Ok(value)
}

fn normalize_country(country: Option<&str>) -> Result<Option<String>, GeoError> {
    let Some(raw) = country.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    if raw.len() != 2 || !raw.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(GeoError::Validation(format!(
            "country must be an ISO 3166-1 alpha-2 code (e.g. MX, FR), got {raw:?}"
        )));
    }
    Ok(Some(raw.to_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(lat: f64, lon: f64) -> Result<DistanceQueryRequest, GeoError> {
        DistanceQueryRequest::new(Some(lat), Some(lon), None, None)
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(request(91.0, 0.0), Err(GeoError::Validation(_))));
        assert!(matches!(request(-90.5, 0.0), Err(GeoError::Validation(_))));
        assert!(matches!(request(0.0, 200.0), Err(GeoError::Validation(_))));
        assert!(matches!(request(0.0, -180.01), Err(GeoError::Validation(_))));
    }

    #[test]
    fn test_boundary_values_accepted() {
        let req = request(-90.0, 180.0).unwrap();
        assert_eq!(req.latitude(), -90.0);
        assert_eq!(req.longitude(), 180.0);
        assert!(request(90.0, -180.0).is_ok());
    }

    #[test]
    fn test_missing_and_non_finite_rejected() {
        let err = DistanceQueryRequest::new(None, Some(1.0), None, None).unwrap_err();
        assert!(err.to_string().contains("latitude is required"));
        let err = DistanceQueryRequest::new(Some(1.0), None, None, None).unwrap_err();
        assert!(err.to_string().contains("longitude is required"));
        assert!(request(f64::NAN, 0.0).is_err());
        assert!(request(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_defaults() {
        let req = request(19.4326, -99.1332).unwrap();
        assert_eq!(req.limit(), DEFAULT_LIMIT);
        assert_eq!(req.country(), None);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = DistanceQueryRequest::new(Some(0.0), Some(0.0), Some(0), None).unwrap_err();
        assert!(matches!(err, GeoError::Validation(_)));
    }

    #[test]
    fn test_country_normalized() {
        let req = DistanceQueryRequest::new(Some(48.85), Some(2.35), Some(5), Some(" fr ")).unwrap();
        assert_eq!(req.country(), Some("FR"));
        assert_eq!(req.limit(), 5);

        let req = DistanceQueryRequest::new(Some(48.85), Some(2.35), None, Some("  ")).unwrap();
        assert_eq!(req.country(), None);
    }

    #[test]
    fn test_bad_country_rejected() {
        for bad in ["FRA", "F", "1X", "É1"] {
            let result = DistanceQueryRequest::new(Some(0.0), Some(0.0), None, Some(bad));
            assert!(result.is_err(), "{bad} should be rejected");
        }
    }
}
