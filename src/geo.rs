//! Great-circle distance on a spherical Earth.
//!
//! The same formula is used in two places: [`great_circle_km`] for in-process
//! checks (e.g. filtering Places candidates), and [`distance_sql`] for the
//! nearby query, so both agree on what "within radius" means.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Spherical law of cosines. The `acos` argument is clamped to [-1, 1]:
/// for identical points rounding can push it just above 1.0 and yield NaN.
pub fn great_circle_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lon1) = (a.latitude.to_radians(), a.longitude.to_radians());
    let (lat2, lon2) = (b.latitude.to_radians(), b.longitude.to_radians());

    let cos_angle = lat1.cos() * lat2.cos() * (lon2 - lon1).cos() + lat1.sin() * lat2.sin();
    EARTH_RADIUS_KM * cos_angle.clamp(-1.0, 1.0).acos()
}

/// SQL expression for the distance in km between the bound point
/// (`$lat_param`, `$lon_param`) and the row's `latitude` / `longitude` columns.
pub fn distance_sql(lat_param: usize, lon_param: usize, alias: &str) -> String {
    format!(
        "({EARTH_RADIUS_KM} * acos(LEAST(1.0, GREATEST(-1.0,
            cos(radians(${lat_param}::float8)) * cos(radians({alias}.latitude))
              * cos(radians({alias}.longitude) - radians(${lon_param}::float8))
            + sin(radians(${lat_param}::float8)) * sin(radians({alias}.latitude))
        ))))"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELHI: GeoPoint = GeoPoint { latitude: 28.70, longitude: 77.10 };
    const NAGPUR: GeoPoint = GeoPoint { latitude: 20.00, longitude: 78.00 };

    #[test]
    fn same_point_is_zero_not_nan() {
        for p in [DELHI, NAGPUR, GeoPoint::new(0.0, 0.0), GeoPoint::new(-33.8688, 151.2093)] {
            let d = great_circle_km(p, p);
            assert!(!d.is_nan());
            assert!(d.abs() < 1e-6, "distance to self was {d}");
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (DELHI, NAGPUR),
            (GeoPoint::new(12.97, 77.59), GeoPoint::new(19.07, 72.87)),
            (GeoPoint::new(-45.0, 170.0), GeoPoint::new(45.0, -170.0)),
        ];
        for (a, b) in pairs {
            assert!((great_circle_km(a, b) - great_circle_km(b, a)).abs() < 1e-9);
        }
    }

    #[test]
    fn delhi_to_nagpur_is_far() {
        let d = great_circle_km(DELHI, NAGPUR);
        // ~970 km along the great circle
        assert!(d > 900.0 && d < 1050.0, "got {d}");
    }

    #[test]
    fn antipodes_stay_finite() {
        let d = great_circle_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn sql_fragment_clamps_and_uses_bound_params() {
        let sql = distance_sql(1, 2, "p");
        assert!(sql.contains("LEAST(1.0, GREATEST(-1.0"));
        assert!(sql.contains("radians($1::float8)"));
        assert!(sql.contains("radians($2::float8)"));
        assert!(sql.contains("p.latitude"));
    }
}
