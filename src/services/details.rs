use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    error::{ApiError, ApiResult},
    models::{
        admission::{AdmissionDetail, AdmissionInput},
        franchise::{FranchiseDetail, FranchiseOpportunitiesQuery, FranchiseOpportunity, UpdateFranchiseRequest},
        pagination::{Page, Pagination, DEFAULT_LIMIT},
    },
};

pub struct AdmissionService;

impl AdmissionService {
    /// Inserts the admission row or merges the provided fields into the existing one.
    pub async fn upsert_in(
        conn: &mut PgConnection,
        preschool_id: i64,
        input: &AdmissionInput,
    ) -> anyhow::Result<AdmissionDetail> {
        let detail = sqlx::query_as::<_, AdmissionDetail>(
            "INSERT INTO admission_details
                (preschool_id, monthly_fee_min, monthly_fee_max, annual_fee_min, annual_fee_max,
                 registration_fee, hidden_charges, age_criteria, academic_year_start)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (preschool_id) DO UPDATE
             SET monthly_fee_min     = COALESCE(EXCLUDED.monthly_fee_min, admission_details.monthly_fee_min),
                 monthly_fee_max     = COALESCE(EXCLUDED.monthly_fee_max, admission_details.monthly_fee_max),
                 annual_fee_min      = COALESCE(EXCLUDED.annual_fee_min, admission_details.annual_fee_min),
                 annual_fee_max      = COALESCE(EXCLUDED.annual_fee_max, admission_details.annual_fee_max),
                 registration_fee    = COALESCE(EXCLUDED.registration_fee, admission_details.registration_fee),
                 hidden_charges      = COALESCE(EXCLUDED.hidden_charges, admission_details.hidden_charges),
                 age_criteria        = COALESCE(EXCLUDED.age_criteria, admission_details.age_criteria),
                 academic_year_start = COALESCE(EXCLUDED.academic_year_start, admission_details.academic_year_start),
                 updated_at          = NOW()
             RETURNING *",
        )
        .bind(preschool_id)
        .bind(input.monthly_fee_min)
        .bind(input.monthly_fee_max)
        .bind(input.annual_fee_min)
        .bind(input.annual_fee_max)
        .bind(input.registration_fee)
        .bind(&input.hidden_charges)
        .bind(&input.age_criteria)
        .bind(&input.academic_year_start)
        .fetch_one(&mut *conn)
        .await?;
        Ok(detail)
    }

    /// `POST /admin/admission`: returns the row and whether it was newly created.
    pub async fn upsert(
        pool: &PgPool,
        preschool_id: i64,
        input: &AdmissionInput,
    ) -> ApiResult<(AdmissionDetail, bool)> {
        let mut tx = pool.begin().await?;

        let listing_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM preschools WHERE id = $1)")
                .bind(preschool_id)
                .fetch_one(&mut *tx)
                .await?;
        if !listing_exists {
            return Err(ApiError::NotFound("Preschool not found".into()));
        }

        let existed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM admission_details WHERE preschool_id = $1)",
        )
        .bind(preschool_id)
        .fetch_one(&mut *tx)
        .await?;

        let detail = Self::upsert_in(&mut tx, preschool_id, input).await?;
        tx.commit().await?;
        Ok((detail, !existed))
    }

    /// `PUT /details/admission/{preschool_id}`: partial update of an existing row.
    pub async fn update(
        pool: &PgPool,
        preschool_id: i64,
        input: &AdmissionInput,
    ) -> ApiResult<AdmissionDetail> {
        sqlx::query_as::<_, AdmissionDetail>(
            "UPDATE admission_details
             SET monthly_fee_min     = COALESCE($1, monthly_fee_min),
                 monthly_fee_max     = COALESCE($2, monthly_fee_max),
                 annual_fee_min      = COALESCE($3, annual_fee_min),
                 annual_fee_max      = COALESCE($4, annual_fee_max),
                 registration_fee    = COALESCE($5, registration_fee),
                 hidden_charges      = COALESCE($6, hidden_charges),
                 age_criteria        = COALESCE($7, age_criteria),
                 academic_year_start = COALESCE($8, academic_year_start),
                 updated_at          = NOW()
             WHERE preschool_id = $9
             RETURNING *",
        )
        .bind(input.monthly_fee_min)
        .bind(input.monthly_fee_max)
        .bind(input.annual_fee_min)
        .bind(input.annual_fee_max)
        .bind(input.registration_fee)
        .bind(&input.hidden_charges)
        .bind(&input.age_criteria)
        .bind(&input.academic_year_start)
        .bind(preschool_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Admission details not found".into()))
    }

    /// Recomputes the derived rating and review count from verified reviews.
    ///
    /// Takes a transaction-scoped advisory lock on the listing first, so concurrent
    /// recomputes for one listing run one after another and each aggregate statement
    /// sees the reviews committed by the previous holder.
    pub async fn recompute_rating_in(conn: &mut PgConnection, preschool_id: i64) -> anyhow::Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(preschool_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            "INSERT INTO admission_details (preschool_id, verified_rating, total_reviews)
             SELECT $1,
                    COALESCE(ROUND(AVG(rating)::numeric, 2)::float8, 0),
                    COUNT(*)::int
             FROM reviews WHERE preschool_id = $1 AND verified = TRUE
             ON CONFLICT (preschool_id) DO UPDATE
             SET verified_rating = EXCLUDED.verified_rating,
                 total_reviews   = EXCLUDED.total_reviews,
                 updated_at      = NOW()",
        )
        .bind(preschool_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Overrides the seeded rating of a freshly imported listing.
    pub async fn seed_rating_in(conn: &mut PgConnection, preschool_id: i64, rating: f64) -> anyhow::Result<()> {
        sqlx::query("UPDATE admission_details SET verified_rating = $1 WHERE preschool_id = $2")
            .bind(rating.clamp(0.0, 5.0))
            .bind(preschool_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

pub struct FranchiseService;

impl FranchiseService {
    pub async fn update(
        pool: &PgPool,
        preschool_id: i64,
        req: &UpdateFranchiseRequest,
    ) -> ApiResult<FranchiseDetail> {
        sqlx::query_as::<_, FranchiseDetail>(
            "UPDATE franchise_details
             SET franchise_available = COALESCE($1, franchise_available),
                 initial_investment  = COALESCE($2, initial_investment),
                 royalty_percentage  = COALESCE($3, royalty_percentage),
                 royalty_type        = COALESCE($4, royalty_type),
                 franchise_terms     = COALESCE($5, franchise_terms),
                 support_provided    = COALESCE($6, support_provided),
                 updated_at          = NOW()
             WHERE preschool_id = $7
             RETURNING *",
        )
        .bind(req.franchise_available)
        .bind(req.initial_investment)
        .bind(req.royalty_percentage)
        .bind(req.royalty_type.map(|t| t.as_str()))
        .bind(&req.franchise_terms)
        .bind(&req.support_provided)
        .bind(preschool_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Franchise details not found".into()))
    }

    pub async fn opportunities(
        pool: &PgPool,
        query: &FranchiseOpportunitiesQuery,
    ) -> anyhow::Result<(Vec<FranchiseOpportunity>, Pagination)> {
        let page = Page::new(query.limit, query.offset, DEFAULT_LIMIT);

        let total: i64 = opportunities_query("SELECT COUNT(*)", query)
            .build_query_scalar()
            .fetch_one(pool)
            .await?;

        let mut qb = opportunities_query(
            "SELECT f.*, p.name AS preschool_name, p.city AS preschool_city,
                    p.phone AS preschool_phone, p.email AS preschool_email",
            query,
        );
        qb.push(" ORDER BY f.created_at DESC, f.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let rows: Vec<FranchiseOpportunity> = qb.build_query_as().fetch_all(pool).await?;

        Ok((rows, page.with_total(total)))
    }
}

fn opportunities_query<'a>(select: &str, q: &FranchiseOpportunitiesQuery) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(select);
    qb.push(
        " FROM franchise_details f JOIN preschools p ON p.id = f.preschool_id
          WHERE f.franchise_available = TRUE",
    );
    if let Some(min) = q.min_investment {
        qb.push(" AND f.initial_investment >= ").push_bind(min);
    }
    if let Some(max) = q.max_investment {
        qb.push(" AND f.initial_investment <= ").push_bind(max);
    }
    if let Some(city) = q.city.as_ref().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        qb.push(" AND p.city ILIKE ").push_bind(city.to_string());
    }
    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opportunity_filters_only_available_franchises() {
        let q = FranchiseOpportunitiesQuery {
            min_investment: Some(500000.0),
            city: Some("Chennai".into()),
            ..Default::default()
        };
        let sql = opportunities_query("SELECT COUNT(*)", &q).sql().to_string();
        assert!(sql.contains("f.franchise_available = TRUE"));
        assert!(sql.contains("f.initial_investment >= $1"));
        assert!(sql.contains("p.city ILIKE $2"));
        assert!(!sql.contains("initial_investment <="));
    }
}
