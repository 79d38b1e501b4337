use std::collections::HashMap;

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    error::{ApiError, ApiResult},
    models::{
        admission::AdmissionDetail,
        franchise::FranchiseDetail,
        pagination::{Page, Pagination},
        preschool::{
            AdmissionSummary, CreatePreschoolRequest, ListingCard, Preschool, PreschoolDetail,
            PreschoolImage, UpdatePreschoolRequest,
        },
        review::PublicReview,
    },
    services::{details::AdmissionService, images::ImageService},
};

/// Catalog filters shared by the public and admin listings.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub city: Option<String>,
    pub min_fee: Option<f64>,
    pub max_fee: Option<f64>,
    pub min_rating: Option<f64>,
    pub verified: Option<bool>,
}

/// Builds `{select} FROM ... WHERE <filters>` so page and count share one predicate.
fn filtered_query<'a>(select: &str, f: &ListingFilter) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(select);
    qb.push(" FROM preschools p LEFT JOIN admission_details a ON a.preschool_id = p.id WHERE TRUE");
    if let Some(city) = f.city.as_ref().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        qb.push(" AND p.city ILIKE ").push_bind(city.to_string());
    }
    if let Some(verified) = f.verified {
        qb.push(" AND p.verified_status = ").push_bind(verified);
    }
    // Fee filters test the monthly band for overlap with [min_fee, max_fee].
    if let Some(min_fee) = f.min_fee {
        qb.push(" AND COALESCE(a.monthly_fee_max, a.monthly_fee_min) >= ")
            .push_bind(min_fee);
    }
    if let Some(max_fee) = f.max_fee {
        qb.push(" AND COALESCE(a.monthly_fee_min, a.monthly_fee_max) <= ")
            .push_bind(max_fee);
    }
    if let Some(min_rating) = f.min_rating {
        qb.push(" AND a.verified_rating >= ").push_bind(min_rating);
    }
    qb
}

pub struct PreschoolService;

impl PreschoolService {
    pub async fn list(
        pool: &PgPool,
        filter: &ListingFilter,
        page: Page,
    ) -> anyhow::Result<(Vec<ListingCard>, Pagination)> {
        let total: i64 = filtered_query("SELECT COUNT(*)", filter)
            .build_query_scalar()
            .fetch_one(pool)
            .await?;

        let mut qb = filtered_query("SELECT p.*", filter);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let rows: Vec<Preschool> = qb.build_query_as().fetch_all(pool).await?;

        let cards = Self::attach_relations(pool, rows.into_iter().map(|p| (p, None)).collect()).await?;
        Ok((cards, page.with_total(total)))
    }

    /// Loads admission summaries and images for a page of listings, keeping input order.
    pub async fn attach_relations(
        pool: &PgPool,
        rows: Vec<(Preschool, Option<f64>)>,
    ) -> anyhow::Result<Vec<ListingCard>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|(p, _)| p.id).collect();

        let admissions: Vec<AdmissionSummary> = sqlx::query_as(
            "SELECT preschool_id, monthly_fee_min, monthly_fee_max, annual_fee_min, annual_fee_max,
                    verified_rating, total_reviews
             FROM admission_details WHERE preschool_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let images: Vec<PreschoolImage> = sqlx::query_as(
            "SELECT * FROM preschool_images WHERE preschool_id = ANY($1)
             ORDER BY is_primary DESC, id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut admissions: HashMap<i64, AdmissionSummary> =
            admissions.into_iter().map(|a| (a.preschool_id, a)).collect();
        let mut images_by_id: HashMap<i64, Vec<PreschoolImage>> = HashMap::new();
        for image in images {
            images_by_id.entry(image.preschool_id).or_default().push(image);
        }

        Ok(rows
            .into_iter()
            .map(|(preschool, distance)| ListingCard {
                admission: admissions.remove(&preschool.id),
                images: images_by_id.remove(&preschool.id).unwrap_or_default(),
                distance,
                preschool,
            })
            .collect())
    }

    pub async fn get_detail(pool: &PgPool, id: i64) -> ApiResult<PreschoolDetail> {
        let preschool = sqlx::query_as::<_, Preschool>("SELECT * FROM preschools WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Preschool not found".into()))?;

        let images = sqlx::query_as::<_, PreschoolImage>(
            "SELECT * FROM preschool_images WHERE preschool_id = $1 ORDER BY is_primary DESC, id",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let admission = sqlx::query_as::<_, AdmissionDetail>(
            "SELECT * FROM admission_details WHERE preschool_id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let franchise = sqlx::query_as::<_, FranchiseDetail>(
            "SELECT * FROM franchise_details WHERE preschool_id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let reviews = sqlx::query_as::<_, PublicReview>(
            "SELECT id, preschool_id, parent_name, rating, facilities_rating, teachers_rating,
                    curriculum_rating, safety_rating, review_text, created_at
             FROM reviews WHERE preschool_id = $1 AND verified = TRUE
             ORDER BY created_at DESC",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(PreschoolDetail { preschool, images, admission, franchise, reviews })
    }

    pub async fn find(pool: &PgPool, id: i64) -> anyhow::Result<Option<Preschool>> {
        let preschool = sqlx::query_as::<_, Preschool>("SELECT * FROM preschools WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(preschool)
    }

    pub async fn exists_by_place_id(conn: &mut PgConnection, place_id: &str) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM preschools WHERE google_place_id = $1)",
        )
        .bind(place_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists)
    }

    /// Creates the listing with its admission, franchise and image rows in one transaction.
    pub async fn create(pool: &PgPool, req: &CreatePreschoolRequest) -> ApiResult<Preschool> {
        let mut tx = pool.begin().await?;
        let preschool = Self::create_in(&mut tx, req).await?;
        tx.commit().await?;
        tracing::info!("created preschool {} ({})", preschool.id, preschool.name);
        Ok(preschool)
    }

    /// Same as [`Self::create`] but inside a caller-owned transaction.
    pub async fn create_in(
        conn: &mut PgConnection,
        req: &CreatePreschoolRequest,
    ) -> ApiResult<Preschool> {
        if let Some(place_id) = req.google_place_id.as_deref() {
            if Self::exists_by_place_id(conn, place_id).await? {
                return Err(ApiError::Conflict("Preschool already exists".into()));
            }
        }

        let preschool = sqlx::query_as::<_, Preschool>(
            "INSERT INTO preschools
                (name, address, city, state, pincode, latitude, longitude, phone, email, website,
                 google_place_id, google_map_url, established_year, verified_status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *",
        )
        .bind(req.name.trim())
        .bind(&req.address)
        .bind(&req.city)
        .bind(&req.state)
        .bind(&req.pincode)
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.website)
        .bind(&req.google_place_id)
        .bind(&req.google_map_url)
        .bind(req.established_year)
        .bind(req.verified_status.unwrap_or(false))
        .fetch_one(&mut *conn)
        .await?;

        let admission = req.admission.clone().unwrap_or_default();
        AdmissionService::upsert_in(conn, preschool.id, &admission).await?;

        sqlx::query("INSERT INTO franchise_details (preschool_id) VALUES ($1)")
            .bind(preschool.id)
            .execute(&mut *conn)
            .await?;

        for image in &req.images {
            ImageService::insert_in(conn, preschool.id, &image.image_url, image.is_primary).await?;
        }

        Ok(preschool)
    }

    /// Partial update of the listing plus optional admission upsert and primary image
    /// replacement, all committed together.
    pub async fn update(pool: &PgPool, id: i64, req: &UpdatePreschoolRequest) -> ApiResult<Preschool> {
        let mut tx = pool.begin().await?;

        let preschool = sqlx::query_as::<_, Preschool>(
            "UPDATE preschools
             SET name             = COALESCE($1, name),
                 address          = COALESCE($2, address),
                 city             = COALESCE($3, city),
                 state            = COALESCE($4, state),
                 pincode          = COALESCE($5, pincode),
                 latitude         = COALESCE($6, latitude),
                 longitude        = COALESCE($7, longitude),
                 phone            = COALESCE($8, phone),
                 email            = COALESCE($9, email),
                 website          = COALESCE($10, website),
                 google_map_url   = COALESCE($11, google_map_url),
                 established_year = COALESCE($12, established_year),
                 verified_status  = COALESCE($13, verified_status),
                 updated_at       = NOW()
             WHERE id = $14
             RETURNING *",
        )
        .bind(req.name.as_deref().map(str::trim))
        .bind(&req.address)
        .bind(&req.city)
        .bind(&req.state)
        .bind(&req.pincode)
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(&req.phone)
        .bind(&req.email)
        .bind(&req.website)
        .bind(&req.google_map_url)
        .bind(req.established_year)
        .bind(req.verified_status)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Preschool not found".into()))?;

        if let Some(admission) = &req.admission {
            AdmissionService::upsert_in(&mut tx, id, admission).await?;
        }
        if let Some(url) = req.primary_image_url.as_deref() {
            ImageService::replace_primary_in(&mut tx, id, url).await?;
        }

        tx.commit().await?;
        Ok(preschool)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> ApiResult<()> {
        // FK cascades remove admission, franchise, images and reviews
        let result = sqlx::query("DELETE FROM preschools WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Preschool not found".into()));
        }
        Ok(())
    }

    pub async fn bulk_verify(pool: &PgPool, ids: &[i64]) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "UPDATE preschools SET verified_status = TRUE, updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn bulk_delete(pool: &PgPool, ids: &[i64]) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM preschools WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_predicates() {
        let qb = filtered_query("SELECT COUNT(*)", &ListingFilter::default());
        assert!(qb.sql().ends_with("WHERE TRUE"));
    }

    #[test]
    fn filters_are_bound_not_interpolated() {
        let filter = ListingFilter {
            city: Some("Pune'; DROP TABLE preschools; --".into()),
            min_fee: Some(5000.0),
            max_fee: Some(9000.0),
            min_rating: Some(4.0),
            verified: Some(true),
        };
        let qb = filtered_query("SELECT p.*", &filter);
        let sql = qb.sql();
        assert!(!sql.contains("DROP TABLE"));
        assert!(sql.contains("p.city ILIKE $1"));
        assert!(sql.contains("p.verified_status = $2"));
        assert!(sql.contains("a.verified_rating >= $5"));
    }

    #[test]
    fn blank_city_is_ignored() {
        let filter = ListingFilter { city: Some("  ".into()), ..Default::default() };
        assert!(!filtered_query("SELECT 1", &filter).sql().contains("ILIKE"));
    }
}
