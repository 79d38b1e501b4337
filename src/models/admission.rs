use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::{
    error::FieldError,
    validation::{check_band, check_non_negative},
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdmissionDetail {
    pub id: i64,
    pub preschool_id: i64,
    pub monthly_fee_min: Option<f64>,
    pub monthly_fee_max: Option<f64>,
    pub annual_fee_min: Option<f64>,
    pub annual_fee_max: Option<f64>,
    pub registration_fee: Option<f64>,
    pub hidden_charges: Option<Value>,
    pub age_criteria: Option<String>,
    pub academic_year_start: Option<String>,
    pub verified_rating: f64,
    pub total_reviews: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable admission fields. Rating and review count are derived and never accepted here.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AdmissionInput {
    pub monthly_fee_min: Option<f64>,
    pub monthly_fee_max: Option<f64>,
    pub annual_fee_min: Option<f64>,
    pub annual_fee_max: Option<f64>,
    pub registration_fee: Option<f64>,
    pub hidden_charges: Option<Value>,
    pub age_criteria: Option<String>,
    pub academic_year_start: Option<String>,
}

impl AdmissionInput {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_non_negative(&mut errors, "monthly_fee_min", self.monthly_fee_min);
        check_non_negative(&mut errors, "monthly_fee_max", self.monthly_fee_max);
        check_non_negative(&mut errors, "annual_fee_min", self.annual_fee_min);
        check_non_negative(&mut errors, "annual_fee_max", self.annual_fee_max);
        check_non_negative(&mut errors, "registration_fee", self.registration_fee);
        check_band(&mut errors, "monthly_fee", self.monthly_fee_min, self.monthly_fee_max);
        check_band(&mut errors, "annual_fee", self.annual_fee_min, self.annual_fee_max);
        if let Some(charges) = &self.hidden_charges {
            if !(charges.is_object() || charges.is_string()) {
                errors.push(FieldError::new("hidden_charges", "must be an object or a string"));
            }
        }
        errors
    }
}

/// Body of `POST /admin/admission`: create-or-update by listing id.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertAdmissionRequest {
    pub preschool_id: i64,
    pub monthly_fee_min: Option<f64>,
    pub monthly_fee_max: Option<f64>,
    pub annual_fee_min: Option<f64>,
    pub annual_fee_max: Option<f64>,
    pub registration_fee: Option<f64>,
    pub hidden_charges: Option<Value>,
    pub age_criteria: Option<String>,
    pub academic_year_start: Option<String>,
}

impl UpsertAdmissionRequest {
    pub fn into_parts(self) -> (i64, AdmissionInput) {
        (
            self.preschool_id,
            AdmissionInput {
                monthly_fee_min: self.monthly_fee_min,
                monthly_fee_max: self.monthly_fee_max,
                annual_fee_min: self.annual_fee_min,
                annual_fee_max: self.annual_fee_max,
                registration_fee: self.registration_fee,
                hidden_charges: self.hidden_charges,
                age_criteria: self.age_criteria,
                academic_year_start: self.academic_year_start,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inverted_band_and_negative_fee_are_reported() {
        let input = AdmissionInput {
            monthly_fee_min: Some(20000.0),
            monthly_fee_max: Some(10000.0),
            registration_fee: Some(-5.0),
            hidden_charges: Some(json!([1, 2])),
            ..Default::default()
        };
        let fields: Vec<_> = input.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["registration_fee", "monthly_fee", "hidden_charges"]);
    }

    #[test]
    fn derived_fields_cannot_be_set() {
        let res: Result<AdmissionInput, _> = serde_json::from_value(json!({ "verified_rating": 5 }));
        assert!(res.is_err());
    }
}
