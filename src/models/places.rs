use serde::{Deserialize, Serialize};

use crate::{error::FieldError, validation::require_non_blank};

pub const DEFAULT_IMPORT_RADIUS_M: u32 = 10_000;
/// Upper bound the Places nearby search accepts.
pub const MAX_IMPORT_RADIUS_M: u32 = 50_000;
pub const SEARCH_RADIUS_M: u32 = 5_000;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ImportRequest {
    #[serde(default)]
    pub location: String,
    /// Meters.
    pub radius: Option<u32>,
}

impl ImportRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_non_blank(&mut errors, "location", Some(&self.location));
        if let Some(r) = self.radius {
            if r == 0 || r > MAX_IMPORT_RADIUS_M {
                errors.push(FieldError::new(
                    "radius",
                    format!("must be between 1 and {MAX_IMPORT_RADIUS_M} meters"),
                ));
            }
        }
        errors
    }

    pub fn radius_m(&self) -> u32 {
        self.radius.unwrap_or(DEFAULT_IMPORT_RADIUS_M)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PlacesSearchQuery {
    pub query: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct ImportSummary {
    pub added: u64,
    pub skipped: u64,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_defaults_and_bounds() {
        let req = ImportRequest { location: "Pune".into(), radius: None };
        assert!(req.validate().is_empty());
        assert_eq!(req.radius_m(), DEFAULT_IMPORT_RADIUS_M);

        let req = ImportRequest { location: " ".into(), radius: Some(60_000) };
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["location", "radius"]);
    }
}
