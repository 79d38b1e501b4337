use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::{
    error::{ApiError, FieldError},
    geo::{self, GeoPoint},
    models::{
        pagination::{Page, Pagination, DEFAULT_LIMIT},
        preschool::{ListingCard, Preschool},
    },
    services::preschools::PreschoolService,
};

pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Raw query string. Numbers arrive as text so malformed values become field errors.
#[derive(Debug, Deserialize, Default)]
pub struct NearbyQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub radius: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyParams {
    pub center: GeoPoint,
    pub radius_km: f64,
    pub page: Page,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SearchParams {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
}

impl From<&NearbyParams> for SearchParams {
    fn from(p: &NearbyParams) -> Self {
        Self { latitude: p.center.latitude, longitude: p.center.longitude, radius: p.radius_km }
    }
}

fn parse_number<T: std::str::FromStr>(
    errors: &mut Vec<FieldError>,
    field: &str,
    raw: Option<&str>,
) -> Option<T> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(FieldError::new(field, "must be a number"));
            None
        }
    }
}

impl NearbyQuery {
    pub fn parse(&self) -> Result<NearbyParams, ApiError> {
        let mut errors = Vec::new();

        let latitude = parse_number::<f64>(&mut errors, "latitude", self.latitude.as_deref());
        let longitude = parse_number::<f64>(&mut errors, "longitude", self.longitude.as_deref());
        let radius = parse_number::<f64>(&mut errors, "radius", self.radius.as_deref());
        let limit = parse_number::<i64>(&mut errors, "limit", self.limit.as_deref());
        let offset = parse_number::<i64>(&mut errors, "offset", self.offset.as_deref());

        if self.latitude.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            errors.push(FieldError::new("latitude", "is required"));
        }
        if self.longitude.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            errors.push(FieldError::new("longitude", "is required"));
        }
        if let Some(lat) = latitude {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                errors.push(FieldError::new("latitude", "must be between -90 and 90"));
            }
        }
        if let Some(lon) = longitude {
            if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                errors.push(FieldError::new("longitude", "must be between -180 and 180"));
            }
        }
        if radius.is_some_and(|r| !r.is_finite()) {
            errors.push(FieldError::new("radius", "must be a number"));
        }

        ApiError::check(errors)?;

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Ok(NearbyParams {
                center: GeoPoint::new(latitude, longitude),
                radius_km: radius.unwrap_or(DEFAULT_RADIUS_KM),
                page: Page::new(limit, offset, DEFAULT_LIMIT),
            }),
            _ => Err(ApiError::BadRequest("Latitude and longitude are required".into())),
        }
    }
}

#[derive(Debug, FromRow)]
struct NearbyRow {
    #[sqlx(flatten)]
    preschool: Preschool,
    distance: f64,
}

/// `FROM ... WHERE distance <= $3` shared by the page and count queries.
/// `$1`/`$2` are the center, `$3` the radius in km.
fn within_radius_sql() -> String {
    format!(
        " FROM (
            SELECT p.*, {distance} AS distance
            FROM preschools p
            WHERE p.latitude IS NOT NULL AND p.longitude IS NOT NULL
          ) AS nearby
          WHERE nearby.distance <= $3::float8",
        distance = geo::distance_sql(1, 2, "p"),
    )
}

pub struct NearbyService;

impl NearbyService {
    pub async fn search(
        pool: &PgPool,
        params: &NearbyParams,
    ) -> anyhow::Result<(Vec<ListingCard>, Pagination)> {
        if params.radius_km <= 0.0 {
            return Ok((Vec::new(), params.page.with_total(0)));
        }

        let from_where = within_radius_sql();
        let NearbyParams { center, radius_km, page } = *params;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*){from_where}"))
            .bind(center.latitude)
            .bind(center.longitude)
            .bind(radius_km)
            .fetch_one(pool)
            .await?;

        let rows: Vec<NearbyRow> = sqlx::query_as(&format!(
            "SELECT *{from_where} ORDER BY nearby.distance ASC, nearby.id ASC LIMIT $4 OFFSET $5"
        ))
        .bind(center.latitude)
        .bind(center.longitude)
        .bind(radius_km)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?;

        tracing::debug!(
            "nearby search ({}, {}) r={}km -> {} of {}",
            center.latitude,
            center.longitude,
            radius_km,
            rows.len(),
            total
        );

        let rows = rows
            .into_iter()
            .map(|r| (r.preschool, Some(r.distance)))
            .collect();
        let cards = PreschoolService::attach_relations(pool, rows).await?;
        Ok((cards, page.with_total(total)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(lat: Option<&str>, lon: Option<&str>, radius: Option<&str>) -> NearbyQuery {
        NearbyQuery {
            latitude: lat.map(Into::into),
            longitude: lon.map(Into::into),
            radius: radius.map(Into::into),
            ..Default::default()
        }
    }

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_apply() {
        let params = query(Some("19.07"), Some("72.87"), None).parse().unwrap();
        assert_eq!(params.radius_km, DEFAULT_RADIUS_KM);
        assert_eq!(params.page, Page { limit: 20, offset: 0 });
    }

    #[test]
    fn missing_coordinates_are_reported() {
        let err = query(None, Some("72.87"), None).parse().unwrap_err();
        assert_eq!(fields(err), ["latitude"]);
    }

    #[test]
    fn non_numeric_coordinates_are_reported() {
        let err = query(Some("north"), Some("east"), None).parse().unwrap_err();
        assert_eq!(fields(err), ["latitude", "longitude"]);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let err = query(Some("91"), Some("72.87"), None).parse().unwrap_err();
        assert_eq!(fields(err), ["latitude"]);
    }

    #[test]
    fn non_positive_radius_is_accepted_for_short_circuit() {
        let params = query(Some("19.07"), Some("72.87"), Some("-3")).parse().unwrap();
        assert_eq!(params.radius_km, -3.0);
    }

    #[test]
    fn count_and_page_share_the_radius_predicate() {
        let sql = within_radius_sql();
        assert!(sql.contains("p.latitude IS NOT NULL AND p.longitude IS NOT NULL"));
        assert!(sql.contains("nearby.distance <= $3::float8"));
        assert!(sql.contains("LEAST(1.0, GREATEST(-1.0"));
    }

    // ── Against Postgres ───────────────────────────────────────────────────────

    async fn insert_listing(pool: &PgPool, name: &str, coords: Option<(f64, f64)>) -> i64 {
        sqlx::query_scalar("INSERT INTO preschools (name, latitude, longitude) VALUES ($1, $2, $3) RETURNING id")
            .bind(name)
            .bind(coords.map(|c| c.0))
            .bind(coords.map(|c| c.1))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn params(latitude: f64, longitude: f64, radius_km: f64, limit: i64) -> NearbyParams {
        NearbyParams {
            center: GeoPoint::new(latitude, longitude),
            radius_km,
            page: Page::new(Some(limit), None, DEFAULT_LIMIT),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn delhi_listing_is_found_and_nagpur_is_not(pool: PgPool) {
        let delhi = insert_listing(&pool, "Little Lamps Delhi", Some((28.70, 77.10))).await;
        insert_listing(&pool, "Nagpur Nursery", Some((20.00, 78.00))).await;
        insert_listing(&pool, "Unmapped Playschool", None).await;

        let (cards, pagination) = NearbyService::search(&pool, &params(28.70, 77.10, 5.0, 20)).await.unwrap();

        assert_eq!(cards.iter().map(|c| c.preschool.id).collect::<Vec<_>>(), [delhi]);
        assert!(cards[0].distance.unwrap().abs() < 1e-6);
        assert_eq!(pagination.total, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn listings_without_coordinates_never_match(pool: PgPool) {
        insert_listing(&pool, "No latitude", None).await;
        sqlx::query("INSERT INTO preschools (name, latitude) VALUES ('Half mapped', 28.70)")
            .execute(&pool)
            .await
            .unwrap();

        let (cards, pagination) = NearbyService::search(&pool, &params(28.70, 77.10, 20_000.0, 20)).await.unwrap();
        assert!(cards.is_empty());
        assert_eq!(pagination.total, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn total_counts_every_match_regardless_of_limit(pool: PgPool) {
        let near = insert_listing(&pool, "Near", Some((28.70, 77.10))).await;
        insert_listing(&pool, "Far", Some((20.00, 78.00))).await;
        insert_listing(&pool, "Unmapped", None).await;

        let (cards, pagination) = NearbyService::search(&pool, &params(28.70, 77.10, 20_000.0, 1)).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].preschool.id, near);
        assert_eq!(pagination.total, 2);
        assert_eq!(pagination.limit, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn results_are_ordered_by_distance(pool: PgPool) {
        let far = insert_listing(&pool, "Gurgaon", Some((28.46, 77.03))).await;
        let near = insert_listing(&pool, "Rohini", Some((28.72, 77.11))).await;

        let (cards, _) = NearbyService::search(&pool, &params(28.70, 77.10, 50.0, 20)).await.unwrap();
        assert_eq!(cards.iter().map(|c| c.preschool.id).collect::<Vec<_>>(), [near, far]);
        assert!(cards[0].distance < cards[1].distance);
    }
}
