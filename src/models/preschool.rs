use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{admission::{AdmissionDetail, AdmissionInput}, franchise::FranchiseDetail, review::PublicReview};
use crate::{
    error::FieldError,
    validation::{check_email, check_range, check_url, require_non_blank},
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Preschool {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub google_place_id: Option<String>,
    pub google_map_url: Option<String>,
    pub verified_status: bool,
    pub established_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PreschoolImage {
    pub id: i64,
    pub preschool_id: i64,
    pub image_url: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// Fee/rating columns shown on catalog cards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdmissionSummary {
    pub preschool_id: i64,
    pub monthly_fee_min: Option<f64>,
    pub monthly_fee_max: Option<f64>,
    pub annual_fee_min: Option<f64>,
    pub annual_fee_max: Option<f64>,
    pub verified_rating: f64,
    pub total_reviews: i32,
}

/// A listing as returned by list and nearby searches.
#[derive(Debug, Clone, Serialize)]
pub struct ListingCard {
    #[serde(flatten)]
    pub preschool: Preschool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub admission: Option<AdmissionSummary>,
    pub images: Vec<PreschoolImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreschoolDetail {
    #[serde(flatten)]
    pub preschool: Preschool,
    pub images: Vec<PreschoolImage>,
    pub admission: Option<AdmissionDetail>,
    pub franchise: Option<FranchiseDetail>,
    pub reviews: Vec<PublicReview>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListPreschoolsQuery {
    pub city: Option<String>,
    pub min_fee: Option<f64>,
    pub max_fee: Option<f64>,
    pub min_rating: Option<f64>,
    pub verified: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AdminListPreschoolsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub city: Option<String>,
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewImage {
    pub image_url: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// Body of `POST /admin/images`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddImageRequest {
    pub preschool_id: i64,
    pub image_url: String,
    #[serde(default)]
    pub is_primary: bool,
}

impl AddImageRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_non_blank(&mut errors, "image_url", Some(&self.image_url));
        if !self.image_url.trim().is_empty() {
            check_url(&mut errors, "image_url", Some(&self.image_url));
        }
        errors
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateImageRequest {
    pub is_primary: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CreatePreschoolRequest {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub google_place_id: Option<String>,
    pub google_map_url: Option<String>,
    pub established_year: Option<i32>,
    pub verified_status: Option<bool>,
    pub admission: Option<AdmissionInput>,
    #[serde(default)]
    pub images: Vec<NewImage>,
}

impl CreatePreschoolRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_non_blank(&mut errors, "name", Some(&self.name));
        validate_contact_fields(
            &mut errors,
            self.email.as_deref(),
            self.website.as_deref(),
            self.latitude,
            self.longitude,
            self.established_year,
        );
        if self.latitude.is_some() != self.longitude.is_some() {
            errors.push(FieldError::new("latitude", "latitude and longitude must be set together"));
        }
        if let Some(admission) = &self.admission {
            errors.extend(admission.validate());
        }
        for (i, image) in self.images.iter().enumerate() {
            check_url(&mut errors, &format!("images.{i}.image_url"), Some(&image.image_url));
        }
        if self.images.iter().filter(|i| i.is_primary).count() > 1 {
            errors.push(FieldError::new("images", "at most one image can be primary"));
        }
        errors
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdatePreschoolRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub google_map_url: Option<String>,
    pub established_year: Option<i32>,
    pub verified_status: Option<bool>,
    pub admission: Option<AdmissionInput>,
    /// Replaces the current primary image.
    pub primary_image_url: Option<String>,
}

impl UpdatePreschoolRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.is_some() {
            require_non_blank(&mut errors, "name", self.name.as_deref());
        }
        validate_contact_fields(
            &mut errors,
            self.email.as_deref(),
            self.website.as_deref(),
            self.latitude,
            self.longitude,
            self.established_year,
        );
        if self.latitude.is_some() != self.longitude.is_some() {
            errors.push(FieldError::new("latitude", "latitude and longitude must be set together"));
        }
        if let Some(admission) = &self.admission {
            errors.extend(admission.validate());
        }
        check_url(&mut errors, "primary_image_url", self.primary_image_url.as_deref());
        errors
    }
}

fn validate_contact_fields(
    errors: &mut Vec<FieldError>,
    email: Option<&str>,
    website: Option<&str>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    established_year: Option<i32>,
) {
    check_email(errors, "email", email);
    check_url(errors, "website", website);
    check_range(errors, "latitude", latitude, -90.0, 90.0);
    check_range(errors, "longitude", longitude, -180.0, 180.0);
    if let Some(year) = established_year {
        if !(1800..=2100).contains(&year) {
            errors.push(FieldError::new("established_year", "must be a plausible year"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_name_and_paired_coordinates() {
        let req = CreatePreschoolRequest {
            name: "  ".into(),
            latitude: Some(28.7),
            ..Default::default()
        };
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"name".to_string()));
        assert!(fields.contains(&"latitude".to_string()));
    }

    #[test]
    fn create_rejects_two_primary_images() {
        let req = CreatePreschoolRequest {
            name: "Little Steps".into(),
            images: vec![
                NewImage { image_url: "https://img.example/a.jpg".into(), is_primary: true },
                NewImage { image_url: "https://img.example/b.jpg".into(), is_primary: true },
            ],
            ..Default::default()
        };
        assert!(req.validate().iter().any(|e| e.field == "images"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<CreatePreschoolRequest, _> =
            serde_json::from_str(r#"{"name":"A","verified":true}"#);
        assert!(res.is_err());
    }
}
