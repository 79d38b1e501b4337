use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::{
    error::FieldError,
    validation::{check_non_negative, check_range},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RoyaltyType {
    Flat,
    Percentage,
}

impl RoyaltyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoyaltyType::Flat => "flat",
            RoyaltyType::Percentage => "percentage",
        }
    }
}

/// DB row; royalty_type is TEXT with a CHECK constraint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FranchiseDetail {
    pub id: i64,
    pub preschool_id: i64,
    pub franchise_available: bool,
    pub initial_investment: Option<f64>,
    pub royalty_percentage: Option<f64>,
    pub royalty_type: String,
    pub franchise_terms: Option<Value>,
    pub support_provided: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateFranchiseRequest {
    pub franchise_available: Option<bool>,
    pub initial_investment: Option<f64>,
    pub royalty_percentage: Option<f64>,
    pub royalty_type: Option<RoyaltyType>,
    pub franchise_terms: Option<Value>,
    pub support_provided: Option<Value>,
}

impl UpdateFranchiseRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_non_negative(&mut errors, "initial_investment", self.initial_investment);
        check_range(&mut errors, "royalty_percentage", self.royalty_percentage, 0.0, 100.0);
        errors
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FranchiseOpportunitiesQuery {
    pub min_investment: Option<f64>,
    pub max_investment: Option<f64>,
    pub city: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FranchiseOpportunity {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub franchise: FranchiseDetail,
    pub preschool_name: String,
    pub preschool_city: Option<String>,
    pub preschool_phone: Option<String>,
    pub preschool_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn royalty_type_is_restricted() {
        let ok: UpdateFranchiseRequest =
            serde_json::from_value(json!({ "royalty_type": "flat" })).unwrap();
        assert_eq!(ok.royalty_type, Some(RoyaltyType::Flat));
        let bad: Result<UpdateFranchiseRequest, _> =
            serde_json::from_value(json!({ "royalty_type": "tiered" }));
        assert!(bad.is_err());
    }

    #[test]
    fn royalty_percentage_is_bounded() {
        let req = UpdateFranchiseRequest { royalty_percentage: Some(120.0), ..Default::default() };
        assert_eq!(req.validate()[0].field, "royalty_percentage");
    }
}
