use serde::Deserialize;

use crate::{
    error::FieldError,
    validation::{check_email, require_non_blank},
};

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ContactRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_non_blank(&mut errors, "name", Some(&self.name));
        require_non_blank(&mut errors, "email", Some(&self.email));
        if !self.email.trim().is_empty() {
            check_email(&mut errors, "email", Some(&self.email));
        }
        require_non_blank(&mut errors, "message", Some(&self.message));
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_listed() {
        let req: ContactRequest = serde_json::from_str(r#"{"phone":"98100"}"#).unwrap();
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["name", "email", "message"]);
    }
}
