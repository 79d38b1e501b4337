use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    error::{ApiError, ApiResult},
    models::{
        pagination::{Page, Pagination},
        review::{PublicReview, Review, ReviewWithPreschool, SubmitReviewRequest, UpdateReviewRequest},
    },
    services::details::AdmissionService,
};

const PUBLIC_COLUMNS: &str = "r.id, r.preschool_id, r.parent_name, r.rating, r.facilities_rating,
    r.teachers_rating, r.curriculum_rating, r.safety_rating, r.review_text, r.created_at";

pub struct ReviewService;

impl ReviewService {
    pub async fn list_verified(
        pool: &PgPool,
        preschool_id: Option<i64>,
        page: Page,
    ) -> anyhow::Result<(Vec<PublicReview>, Pagination)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews r
             WHERE r.verified = TRUE AND ($1::bigint IS NULL OR r.preschool_id = $1)",
        )
        .bind(preschool_id)
        .fetch_one(pool)
        .await?;

        let reviews = sqlx::query_as::<_, PublicReview>(&format!(
            "SELECT {PUBLIC_COLUMNS} FROM reviews r
             WHERE r.verified = TRUE AND ($1::bigint IS NULL OR r.preschool_id = $1)
             ORDER BY r.created_at DESC, r.id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(preschool_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?;

        Ok((reviews, page.with_total(total)))
    }

    /// New reviews stay unverified until a moderator approves them.
    pub async fn submit(pool: &PgPool, preschool_id: i64, req: &SubmitReviewRequest) -> ApiResult<Review> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM preschools WHERE id = $1)")
            .bind(preschool_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(ApiError::NotFound("Preschool not found".into()));
        }

        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews
                (preschool_id, parent_name, parent_email, rating, facilities_rating,
                 teachers_rating, curriculum_rating, safety_rating, review_text, verified)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)
             RETURNING *",
        )
        .bind(preschool_id)
        .bind(req.parent_name.trim())
        .bind(req.parent_email.trim())
        .bind(req.rating)
        .bind(req.facilities_rating)
        .bind(req.teachers_rating)
        .bind(req.curriculum_rating)
        .bind(req.safety_rating)
        .bind(req.review_text.as_deref().map(str::trim))
        .fetch_one(pool)
        .await?;
        Ok(review)
    }

    pub async fn pending(pool: &PgPool) -> anyhow::Result<Vec<ReviewWithPreschool>> {
        let rows = sqlx::query_as::<_, ReviewWithPreschool>(
            "SELECT r.*, p.name AS preschool_name, p.city AS preschool_city
             FROM reviews r JOIN preschools p ON p.id = r.preschool_id
             WHERE r.verified = FALSE
             ORDER BY r.created_at ASC, r.id ASC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn admin_list(
        pool: &PgPool,
        preschool_id: Option<i64>,
        verified: Option<bool>,
        page: Page,
    ) -> anyhow::Result<(Vec<ReviewWithPreschool>, Pagination)> {
        let total: i64 = admin_query("SELECT COUNT(*)", preschool_id, verified)
            .build_query_scalar()
            .fetch_one(pool)
            .await?;

        let mut qb = admin_query(
            "SELECT r.*, p.name AS preschool_name, p.city AS preschool_city",
            preschool_id,
            verified,
        );
        qb.push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let rows: Vec<ReviewWithPreschool> = qb.build_query_as().fetch_all(pool).await?;

        Ok((rows, page.with_total(total)))
    }

    pub async fn verify(pool: &PgPool, id: i64) -> ApiResult<Review> {
        let mut tx = pool.begin().await?;
        let review = sqlx::query_as::<_, Review>(
            "UPDATE reviews SET verified = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;

        AdmissionService::recompute_rating_in(&mut tx, review.preschool_id).await?;
        tx.commit().await?;
        Ok(review)
    }

    /// Rejection deletes the review.
    pub async fn reject(pool: &PgPool, id: i64) -> ApiResult<()> {
        let mut tx = pool.begin().await?;
        let preschool_id = Self::delete_in(&mut tx, id).await?;
        AdmissionService::recompute_rating_in(&mut tx, preschool_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn admin_update(pool: &PgPool, id: i64, req: &UpdateReviewRequest) -> ApiResult<Review> {
        let mut tx = pool.begin().await?;
        let review = sqlx::query_as::<_, Review>(
            "UPDATE reviews
             SET parent_name       = COALESCE($1, parent_name),
                 rating            = COALESCE($2, rating),
                 facilities_rating = COALESCE($3, facilities_rating),
                 teachers_rating   = COALESCE($4, teachers_rating),
                 curriculum_rating = COALESCE($5, curriculum_rating),
                 safety_rating     = COALESCE($6, safety_rating),
                 review_text       = COALESCE($7, review_text),
                 verified          = COALESCE($8, verified),
                 updated_at        = NOW()
             WHERE id = $9
             RETURNING *",
        )
        .bind(&req.parent_name)
        .bind(req.rating)
        .bind(req.facilities_rating)
        .bind(req.teachers_rating)
        .bind(req.curriculum_rating)
        .bind(req.safety_rating)
        .bind(&req.review_text)
        .bind(req.verified)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;

        AdmissionService::recompute_rating_in(&mut tx, review.preschool_id).await?;
        tx.commit().await?;
        Ok(review)
    }

    pub async fn admin_delete(pool: &PgPool, id: i64) -> ApiResult<()> {
        Self::reject(pool, id).await
    }

    /// Verifies every listed review and refreshes the ratings of the listings they touch.
    pub async fn bulk_verify(pool: &PgPool, ids: &[i64]) -> anyhow::Result<u64> {
        let mut tx = pool.begin().await?;
        let affected: Vec<i64> = sqlx::query_scalar(
            "UPDATE reviews SET verified = TRUE, updated_at = NOW()
             WHERE id = ANY($1)
             RETURNING preschool_id",
        )
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;

        let count = affected.len() as u64;
        Self::recompute_many_in(&mut tx, affected).await?;
        tx.commit().await?;
        Ok(count)
    }

    pub async fn bulk_delete(pool: &PgPool, ids: &[i64]) -> anyhow::Result<u64> {
        let mut tx = pool.begin().await?;
        let affected: Vec<i64> =
            sqlx::query_scalar("DELETE FROM reviews WHERE id = ANY($1) RETURNING preschool_id")
                .bind(ids)
                .fetch_all(&mut *tx)
                .await?;

        let count = affected.len() as u64;
        Self::recompute_many_in(&mut tx, affected).await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn delete_in(conn: &mut PgConnection, id: i64) -> ApiResult<i64> {
        sqlx::query_scalar("DELETE FROM reviews WHERE id = $1 RETURNING preschool_id")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| ApiError::NotFound("Review not found".into()))
    }

    async fn recompute_many_in(conn: &mut PgConnection, mut preschool_ids: Vec<i64>) -> anyhow::Result<()> {
        preschool_ids.sort_unstable();
        preschool_ids.dedup();
        for preschool_id in preschool_ids {
            AdmissionService::recompute_rating_in(conn, preschool_id).await?;
        }
        Ok(())
    }
}

fn admin_query<'a>(select: &str, preschool_id: Option<i64>, verified: Option<bool>) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(select);
    qb.push(" FROM reviews r JOIN preschools p ON p.id = r.preschool_id WHERE TRUE");
    if let Some(id) = preschool_id {
        qb.push(" AND r.preschool_id = ").push_bind(id);
    }
    if let Some(verified) = verified {
        qb.push(" AND r.verified = ").push_bind(verified);
    }
    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_filters_bind_in_order() {
        let sql = admin_query("SELECT COUNT(*)", Some(7), Some(false)).sql().to_string();
        assert!(sql.contains("r.preschool_id = $1"));
        assert!(sql.contains("r.verified = $2"));
    }

    #[test]
    fn public_projection_omits_email() {
        assert!(!PUBLIC_COLUMNS.contains("parent_email"));
        assert!(!PUBLIC_COLUMNS.contains("verified"));
    }

    // ── Against Postgres ───────────────────────────────────────────────────────

    const RATINGS: [f64; 6] = [5.0, 4.0, 3.0, 4.0, 5.0, 3.0];

    async fn listing_with_pending_reviews(pool: &PgPool, name: &str) -> (i64, Vec<i64>) {
        let preschool_id: i64 = sqlx::query_scalar("INSERT INTO preschools (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap();
        let mut review_ids = Vec::new();
        for rating in RATINGS {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO reviews (preschool_id, parent_name, rating) VALUES ($1, 'Parent', $2) RETURNING id",
            )
            .bind(preschool_id)
            .bind(rating)
            .fetch_one(pool)
            .await
            .unwrap();
            review_ids.push(id);
        }
        (preschool_id, review_ids)
    }

    async fn derived_rating(pool: &PgPool, preschool_id: i64) -> (f64, i32) {
        sqlx::query_as("SELECT verified_rating, total_reviews FROM admission_details WHERE preschool_id = $1")
            .bind(preschool_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn concurrent_verifications_keep_the_count_exact(pool: PgPool) {
        let mut listings = Vec::new();
        for n in 0..8 {
            listings.push(listing_with_pending_reviews(&pool, &format!("School {n}")).await);
        }

        let mut handles = Vec::new();
        for (_, review_ids) in &listings {
            for &id in review_ids {
                let pool = pool.clone();
                handles.push(tokio::spawn(async move { ReviewService::verify(&pool, id).await }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for (preschool_id, _) in &listings {
            let (rating, total) = derived_rating(&pool, *preschool_id).await;
            assert_eq!(total, RATINGS.len() as i32, "listing {preschool_id}");
            assert_eq!(rating, 4.0, "listing {preschool_id}");
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn rejecting_a_verified_review_lowers_the_count(pool: PgPool) {
        let (preschool_id, review_ids) = listing_with_pending_reviews(&pool, "Sunrise Kids").await;
        assert_eq!(ReviewService::bulk_verify(&pool, &review_ids).await.unwrap(), 6);
        assert_eq!(derived_rating(&pool, preschool_id).await, (4.0, 6));

        // the first review is a 5
        ReviewService::reject(&pool, review_ids[0]).await.unwrap();
        assert_eq!(derived_rating(&pool, preschool_id).await, (3.8, 5));
    }
}
