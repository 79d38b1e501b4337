//! Small field checks shared by the request structs' `validate()` methods.

use crate::error::FieldError;

pub fn require_non_blank(errors: &mut Vec<FieldError>, field: &str, value: Option<&str>) {
    if value.map(str::trim).unwrap_or_default().is_empty() {
        errors.push(FieldError::new(field, "is required"));
    }
}

pub fn check_email(errors: &mut Vec<FieldError>, field: &str, value: Option<&str>) {
    if let Some(v) = value {
        if !is_email(v) {
            errors.push(FieldError::new(field, "must be a valid email"));
        }
    }
}

pub fn check_url(errors: &mut Vec<FieldError>, field: &str, value: Option<&str>) {
    if let Some(v) = value {
        let v = v.trim();
        let ok = (v.starts_with("http://") || v.starts_with("https://"))
            && v.len() > "https://".len()
            && !v.contains(char::is_whitespace);
        if !ok {
            errors.push(FieldError::new(field, "must be a valid http(s) URL"));
        }
    }
}

pub fn check_range(errors: &mut Vec<FieldError>, field: &str, value: Option<f64>, min: f64, max: f64) {
    if let Some(v) = value {
        if !v.is_finite() || v < min || v > max {
            errors.push(FieldError::new(field, format!("must be between {min} and {max}")));
        }
    }
}

pub fn check_non_negative(errors: &mut Vec<FieldError>, field: &str, value: Option<f64>) {
    if let Some(v) = value {
        if !v.is_finite() || v < 0.0 {
            errors.push(FieldError::new(field, "must be zero or greater"));
        }
    }
}

/// Rejects min > max when both bounds are set.
pub fn check_band(errors: &mut Vec<FieldError>, field: &str, min: Option<f64>, max: Option<f64>) {
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            errors.push(FieldError::new(field, "minimum cannot exceed maximum"));
        }
    }
}

pub fn is_email(value: &str) -> bool {
    let value = value.trim();
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_email("parent@example.in"));
        assert!(!is_email("parent@example"));
        assert!(!is_email("@example.in"));
        assert!(!is_email("a@b@c.in"));
        assert!(!is_email("pa rent@example.in"));
    }

    #[test]
    fn band_and_ranges() {
        let mut errors = Vec::new();
        check_band(&mut errors, "monthly_fee", Some(20000.0), Some(10000.0));
        check_range(&mut errors, "rating", Some(6.0), 1.0, 5.0);
        check_non_negative(&mut errors, "registration_fee", Some(-1.0));
        check_url(&mut errors, "website", Some("www.school.in"));
        require_non_blank(&mut errors, "name", None);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["monthly_fee", "rating", "registration_fee", "website", "name"]);
    }
}
