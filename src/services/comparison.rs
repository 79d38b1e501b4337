use std::collections::HashSet;

use serde_json::{json, Value};
use sqlx::PgPool;

use crate::{
    error::{ApiError, ApiResult},
    models::comparison::{
        AdmissionBreakdown, AdmissionComparisonRow, ComparisonCandidate, ComparisonHistory,
        ComparisonKind, FeeColumns, FranchiseComparisonRow, MAX_COMPARE, MIN_COMPARE,
    },
    services::metrics::COMPARISONS_COUNTER,
};

const HISTORY_LIMIT: i64 = 10;

/// Drops repeated ids (first occurrence wins) and checks the 2..=4 bound on what is left.
pub fn check_selection(ids: &[i64]) -> ApiResult<Vec<i64>> {
    let mut seen = HashSet::new();
    let unique: Vec<i64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if !(MIN_COMPARE..=MAX_COMPARE).contains(&unique.len()) {
        return Err(ApiError::BadRequest(format!(
            "Please select {MIN_COMPARE}-{MAX_COMPARE} preschools to compare"
        )));
    }
    Ok(unique)
}

/// Midpoint of a fee band; a single bound stands in for both; no bound is zero.
pub fn band_estimate(min: Option<f64>, max: Option<f64>) -> f64 {
    match (min, max) {
        (Some(lo), Some(hi)) => (lo + hi) / 2.0,
        (Some(v), None) | (None, Some(v)) => v,
        (None, None) => 0.0,
    }
}

/// Twelve months of the monthly estimate plus the annual estimate and the registration fee.
pub fn total_annual_cost(fees: &FeeColumns) -> f64 {
    band_estimate(fees.monthly_fee_min, fees.monthly_fee_max) * 12.0
        + band_estimate(fees.annual_fee_min, fees.annual_fee_max)
        + fees.registration_fee.unwrap_or(0.0)
}

fn breakdown(fees: FeeColumns) -> AdmissionBreakdown {
    AdmissionBreakdown {
        monthly_fee_min: fees.monthly_fee_min.unwrap_or(0.0),
        monthly_fee_max: fees.monthly_fee_max.unwrap_or(0.0),
        annual_fee_min: fees.annual_fee_min.unwrap_or(0.0),
        annual_fee_max: fees.annual_fee_max.unwrap_or(0.0),
        registration_fee: fees.registration_fee.unwrap_or(0.0),
        hidden_charges: fees.hidden_charges.unwrap_or_else(|| json!({})),
        age_criteria: fees.age_criteria,
        academic_year_start: fees.academic_year_start,
        verified_rating: fees.verified_rating.unwrap_or(0.0),
        total_reviews: fees.total_reviews.unwrap_or(0),
    }
}

/// Cheapest first. The sort is stable, so equal totals keep the input order.
pub fn rank(candidates: Vec<ComparisonCandidate>) -> Vec<AdmissionComparisonRow> {
    let mut rows: Vec<AdmissionComparisonRow> = candidates
        .into_iter()
        .map(|c| {
            let total_annual_cost = total_annual_cost(&c.fees);
            AdmissionComparisonRow {
                id: c.id,
                name: c.name,
                city: c.city,
                phone: c.phone,
                email: c.email,
                website: c.website,
                admission: breakdown(c.fees),
                total_annual_cost,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.total_annual_cost.total_cmp(&b.total_annual_cost));
    rows
}

pub struct ComparisonService;

impl ComparisonService {
    pub async fn compare_admission(pool: &PgPool, ids: &[i64]) -> ApiResult<Vec<AdmissionComparisonRow>> {
        let ids = check_selection(ids)?;

        let candidates: Vec<ComparisonCandidate> = sqlx::query_as(
            "SELECT p.id, p.name, p.city, p.phone, p.email, p.website,
                    a.monthly_fee_min, a.monthly_fee_max, a.annual_fee_min, a.annual_fee_max,
                    a.registration_fee, a.hidden_charges, a.age_criteria, a.academic_year_start,
                    a.verified_rating, a.total_reviews
             FROM preschools p
             LEFT JOIN admission_details a ON a.preschool_id = p.id
             WHERE p.id = ANY($1)
             ORDER BY p.id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        if candidates.is_empty() {
            return Err(ApiError::NotFound("Preschools not found".into()));
        }
        Ok(rank(candidates))
    }

    /// Listings without an available franchise are left out rather than rejected.
    pub async fn compare_franchise(pool: &PgPool, ids: &[i64]) -> ApiResult<Vec<FranchiseComparisonRow>> {
        let ids = check_selection(ids)?;

        let rows = sqlx::query_as::<_, FranchiseComparisonRow>(
            "SELECT p.id, p.name, p.city,
                    f.franchise_available,
                    COALESCE(f.initial_investment, 0) AS initial_investment,
                    COALESCE(f.royalty_percentage, 0) AS royalty_percentage,
                    f.royalty_type,
                    COALESCE(f.franchise_terms, '{}'::jsonb) AS franchise_terms,
                    COALESCE(f.support_provided, '{}'::jsonb) AS support_provided
             FROM preschools p
             JOIN franchise_details f ON f.preschool_id = p.id
             WHERE p.id = ANY($1) AND f.franchise_available = TRUE
             ORDER BY p.id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn history(pool: &PgPool, user_ip: &str) -> anyhow::Result<Vec<ComparisonHistory>> {
        let rows = sqlx::query_as::<_, ComparisonHistory>(
            "SELECT * FROM comparison_history
             WHERE user_ip = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(user_ip)
        .bind(HISTORY_LIMIT)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    async fn insert_history(
        pool: &PgPool,
        user_ip: &str,
        ids: &Value,
        kind: ComparisonKind,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO comparison_history (user_ip, compared_preschool_ids, comparison_type)
             VALUES ($1, $2, $3)",
        )
        .bind(user_ip)
        .bind(ids)
        .bind(kind.to_string())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Fire-and-forget history append. A failed insert is only logged.
    pub fn record(pool: PgPool, user_ip: String, ids: Vec<i64>, kind: ComparisonKind) {
        COMPARISONS_COUNTER.with_label_values(&[&kind.to_string()]).inc();
        tokio::spawn(async move {
            let ids = json!(ids);
            if let Err(e) = Self::insert_history(&pool, &user_ip, &ids, kind).await {
                tracing::warn!("Failed to record {kind} comparison for {user_ip}: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, fees: FeeColumns) -> ComparisonCandidate {
        ComparisonCandidate {
            id,
            name: format!("School {id}"),
            city: Some("Bengaluru".into()),
            phone: None,
            email: None,
            website: None,
            fees,
        }
    }

    #[test]
    fn band_estimate_cases() {
        assert_eq!(band_estimate(Some(8000.0), Some(12000.0)), 10000.0);
        assert_eq!(band_estimate(Some(8000.0), None), 8000.0);
        assert_eq!(band_estimate(None, Some(12000.0)), 12000.0);
        assert_eq!(band_estimate(None, None), 0.0);
    }

    #[test]
    fn total_cost_combines_monthly_annual_and_registration() {
        let fees = FeeColumns {
            monthly_fee_min: Some(10000.0),
            monthly_fee_max: Some(14000.0),
            annual_fee_min: Some(20000.0),
            registration_fee: Some(5000.0),
            ..Default::default()
        };
        // 12000 * 12 + 20000 + 5000
        assert_eq!(total_annual_cost(&fees), 169000.0);
    }

    #[test]
    fn cheaper_school_ranks_first() {
        let a = candidate(
            1,
            FeeColumns {
                monthly_fee_min: Some(12000.0),
                monthly_fee_max: Some(16000.0),
                annual_fee_min: Some(10000.0),
                annual_fee_max: Some(10000.0),
                registration_fee: Some(7000.0),
                ..Default::default()
            },
        );
        let b = candidate(
            2,
            FeeColumns {
                monthly_fee_min: Some(7000.0),
                monthly_fee_max: Some(7000.0),
                registration_fee: Some(12000.0),
                ..Default::default()
            },
        );
        let ranked = rank(vec![a, b]);
        assert_eq!(ranked.iter().map(|r| r.id).collect::<Vec<_>>(), [2, 1]);
        assert_eq!(ranked[0].total_annual_cost, 96000.0);
        assert_eq!(ranked[1].total_annual_cost, 185000.0);
    }

    #[test]
    fn missing_admission_costs_zero_and_ties_keep_order() {
        let ranked = rank(vec![
            candidate(3, FeeColumns::default()),
            candidate(5, FeeColumns::default()),
        ]);
        assert_eq!(ranked.iter().map(|r| r.id).collect::<Vec<_>>(), [3, 5]);
        assert_eq!(ranked[0].total_annual_cost, 0.0);
        assert_eq!(ranked[0].admission.hidden_charges, json!({}));
    }

    #[test]
    fn serialized_row_uses_camel_case_total() {
        let row = &rank(vec![candidate(1, FeeColumns::default())])[0];
        let v = serde_json::to_value(row).unwrap();
        assert!(v.get("totalAnnualCost").is_some());
    }

    #[test]
    fn selection_bounds() {
        assert!(check_selection(&[1]).is_err());
        assert!(check_selection(&[1, 2]).is_ok());
        assert!(check_selection(&[1, 2, 3, 4]).is_ok());
        assert!(check_selection(&[1, 2, 3, 4, 5]).is_err());
        assert!(check_selection(&[]).is_err());
    }

    #[test]
    fn repeated_ids_count_once() {
        assert!(check_selection(&[5, 5]).is_err());
        assert_eq!(check_selection(&[3, 1, 3, 2]).unwrap(), [3, 1, 2]);
        assert_eq!(check_selection(&[1, 2, 1, 2, 3, 4]).unwrap(), [1, 2, 3, 4]);
    }
}
