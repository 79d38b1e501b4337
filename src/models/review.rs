use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::FieldError,
    validation::{check_email, check_range, require_non_blank},
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub preschool_id: i64,
    pub parent_name: Option<String>,
    pub parent_email: Option<String>,
    pub rating: f64,
    pub facilities_rating: Option<f64>,
    pub teachers_rating: Option<f64>,
    pub curriculum_rating: Option<f64>,
    pub safety_rating: Option<f64>,
    pub review_text: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection without the reviewer email.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PublicReview {
    pub id: i64,
    pub preschool_id: i64,
    pub parent_name: Option<String>,
    pub rating: f64,
    pub facilities_rating: Option<f64>,
    pub teachers_rating: Option<f64>,
    pub curriculum_rating: Option<f64>,
    pub safety_rating: Option<f64>,
    pub review_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Review joined with the listing it belongs to (moderation queues).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewWithPreschool {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub review: Review,
    pub preschool_name: String,
    pub preschool_city: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListReviewsQuery {
    pub preschool_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AdminListReviewsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub preschool_id: Option<i64>,
    pub verified: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SubmitReviewRequest {
    pub parent_name: String,
    pub parent_email: String,
    pub rating: f64,
    pub facilities_rating: Option<f64>,
    pub teachers_rating: Option<f64>,
    pub curriculum_rating: Option<f64>,
    pub safety_rating: Option<f64>,
    pub review_text: Option<String>,
}

impl SubmitReviewRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_non_blank(&mut errors, "parent_name", Some(&self.parent_name));
        require_non_blank(&mut errors, "parent_email", Some(&self.parent_email));
        if !self.parent_email.trim().is_empty() {
            check_email(&mut errors, "parent_email", Some(&self.parent_email));
        }
        check_range(&mut errors, "rating", Some(self.rating), 1.0, 5.0);
        check_sub_ratings(
            &mut errors,
            self.facilities_rating,
            self.teachers_rating,
            self.curriculum_rating,
            self.safety_rating,
        );
        errors
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateReviewRequest {
    pub parent_name: Option<String>,
    pub rating: Option<f64>,
    pub facilities_rating: Option<f64>,
    pub teachers_rating: Option<f64>,
    pub curriculum_rating: Option<f64>,
    pub safety_rating: Option<f64>,
    pub review_text: Option<String>,
    pub verified: Option<bool>,
}

impl UpdateReviewRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_range(&mut errors, "rating", self.rating, 1.0, 5.0);
        check_sub_ratings(
            &mut errors,
            self.facilities_rating,
            self.teachers_rating,
            self.curriculum_rating,
            self.safety_rating,
        );
        errors
    }
}

fn check_sub_ratings(
    errors: &mut Vec<FieldError>,
    facilities: Option<f64>,
    teachers: Option<f64>,
    curriculum: Option<f64>,
    safety: Option<f64>,
) {
    check_range(errors, "facilities_rating", facilities, 1.0, 5.0);
    check_range(errors, "teachers_rating", teachers, 1.0, 5.0);
    check_range(errors, "curriculum_rating", curriculum, 1.0, 5.0);
    check_range(errors, "safety_rating", safety, 1.0, 5.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SubmitReviewRequest {
        SubmitReviewRequest {
            parent_name: "Asha".into(),
            parent_email: "asha@example.in".into(),
            rating: 4.5,
            ..Default::default()
        }
    }

    #[test]
    fn valid_review_passes() {
        assert!(valid().validate().is_empty());
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let req = SubmitReviewRequest { rating: 0.0, safety_rating: Some(7.0), ..valid() };
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["rating", "safety_rating"]);
    }

    #[test]
    fn blank_email_reports_once() {
        let req = SubmitReviewRequest { parent_email: " ".into(), ..valid() };
        assert_eq!(req.validate().len(), 1);
    }
}
