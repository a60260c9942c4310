//! University records and the provider's raw payload.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Record, Validate};

/// A university as returned to callers.
pub type University = Record<UniversityFields>;

/// Stored university fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversityFields {
    #[serde(default)]
    pub web_pages: Vec<String>,

    #[serde(default)]
    pub state_province: Option<String>,

    pub name: String,

    pub domains: Vec<String>,

    pub country: String,

    pub alpha_two_code: String,
}

/// Partial university update; only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniversityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_pages: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_province: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_two_code: Option<String>,
}

fn check_not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!(
            "university {field} must not be empty"
        )));
    }
    Ok(())
}

fn check_domains(domains: &[String]) -> Result<()> {
    match domains.first() {
        Some(first) if !first.trim().is_empty() => Ok(()),
        _ => Err(AppError::validation(
            "university domains must contain at least one domain",
        )),
    }
}

impl Validate for UniversityFields {
    fn validate(&self) -> Result<()> {
        check_not_blank("name", &self.name)?;
        check_not_blank("country", &self.country)?;
        check_domains(&self.domains)
    }
}

impl Validate for UniversityPatch {
    fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_not_blank("name", name)?;
        }
        if let Some(country) = &self.country {
            check_not_blank("country", country)?;
        }
        if let Some(domains) = &self.domains {
            check_domains(domains)?;
        }
        Ok(())
    }
}

/// A candidate record as sent by the external provider. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawUniversity {
    #[serde(default)]
    pub web_pages: Option<Vec<String>>,

    /// The upstream service spells this key `state-province`.
    #[serde(default, alias = "state-province")]
    pub state_province: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub domains: Option<Vec<String>>,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub alpha_two_code: Option<String>,
}

impl RawUniversity {
    /// Document id derived from the first domain, if there is a usable one.
    pub fn natural_key(&self) -> Option<&str> {
        self.domains
            .as_ref()
            .and_then(|d| d.first())
            .map(String::as_str)
            .filter(|d| !d.trim().is_empty())
    }

    pub fn into_fields(self) -> UniversityFields {
        UniversityFields {
            web_pages: self.web_pages.unwrap_or_default(),
            state_province: self.state_province,
            name: self.name.unwrap_or_default(),
            domains: self.domains.unwrap_or_default(),
            country: self.country.unwrap_or_default(),
            alpha_two_code: self.alpha_two_code.unwrap_or_default(),
        }
    }
}

/// Counts reported by a fetch-and-save run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    pub total_fetched: usize,
    pub total_saved: usize,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_natural_key_is_first_domain() {
        let raw: RawUniversity = serde_json::from_value(json!({
            "name": "X University",
            "domains": ["x.edu", "y.edu"],
        }))
        .unwrap();
        assert_eq!(raw.natural_key(), Some("x.edu"));
    }

    #[test]
    fn test_natural_key_missing_or_empty() {
        let empty: RawUniversity = serde_json::from_value(json!({ "domains": [] })).unwrap();
        assert_eq!(empty.natural_key(), None);

        let absent: RawUniversity = serde_json::from_value(json!({ "name": "N" })).unwrap();
        assert_eq!(absent.natural_key(), None);

        let null: RawUniversity = serde_json::from_value(json!({ "domains": null })).unwrap();
        assert_eq!(null.natural_key(), None);
    }

    #[test]
    fn test_accepts_hyphenated_state_province() {
        let raw: RawUniversity = serde_json::from_value(json!({
            "state-province": "Ontario",
            "domains": ["u.ca"],
        }))
        .unwrap();
        assert_eq!(raw.state_province.as_deref(), Some("Ontario"));

        let fields = raw.into_fields();
        assert_eq!(fields.state_province.as_deref(), Some("Ontario"));
        assert!(fields.web_pages.is_empty());
        assert_eq!(fields.domains, vec!["u.ca".to_string()]);
    }

    #[test]
    fn test_validation_requires_domain() {
        let mut fields = UniversityFields {
            web_pages: vec![],
            state_province: None,
            name: "U".into(),
            domains: vec![],
            country: "Kenya".into(),
            alpha_two_code: "KE".into(),
        };
        assert!(fields.validate().is_err());

        fields.domains = vec!["u.ke".into()];
        assert!(fields.validate().is_ok());

        let patch = UniversityPatch {
            domains: Some(vec![]),
            ..UniversityPatch::default()
        };
        assert!(patch.validate().is_err());
    }
}
