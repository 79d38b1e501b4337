use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

pub const MIN_COMPARE: usize = 2;
pub const MAX_COMPARE: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    Admission,
    Franchise,
}

impl std::fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComparisonKind::Admission => "admission",
            ComparisonKind::Franchise => "franchise",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareRequest {
    #[serde(default)]
    pub preschool_ids: Vec<i64>,
}

/// Immutable audit row; compared ids are stored as a JSON array.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ComparisonHistory {
    pub id: i64,
    pub user_ip: Option<String>,
    pub compared_preschool_ids: Value,
    pub comparison_type: String,
    pub created_at: DateTime<Utc>,
}

/// Listing columns fetched for a comparison, joined with its admission row.
#[derive(Debug, Clone, FromRow)]
pub struct ComparisonCandidate {
    pub id: i64,
    pub name: String,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    #[sqlx(flatten)]
    pub fees: FeeColumns,
}

#[derive(Debug, Clone, Default, FromRow)]
pub struct FeeColumns {
    pub monthly_fee_min: Option<f64>,
    pub monthly_fee_max: Option<f64>,
    pub annual_fee_min: Option<f64>,
    pub annual_fee_max: Option<f64>,
    pub registration_fee: Option<f64>,
    pub hidden_charges: Option<Value>,
    pub age_criteria: Option<String>,
    pub academic_year_start: Option<String>,
    pub verified_rating: Option<f64>,
    pub total_reviews: Option<i32>,
}


#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdmissionBreakdown {
    pub monthly_fee_min: f64,
    pub monthly_fee_max: f64,
    pub annual_fee_min: f64,
    pub annual_fee_max: f64,
    pub registration_fee: f64,
    pub hidden_charges: Value,
    pub age_criteria: Option<String>,
    pub academic_year_start: Option<String>,
    pub verified_rating: f64,
    pub total_reviews: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdmissionComparisonRow {
    pub id: i64,
    pub name: String,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub admission: AdmissionBreakdown,
    #[serde(rename = "totalAnnualCost")]
    pub total_annual_cost: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FranchiseComparisonRow {
    pub id: i64,
    pub name: String,
    pub city: Option<String>,
    pub franchise_available: bool,
    pub initial_investment: f64,
    pub royalty_percentage: f64,
    pub royalty_type: String,
    pub franchise_terms: Value,
    pub support_provided: Value,
}
