//! Banks and insurance companies admins can be assigned to.

use serde::{Deserialize, Serialize};

use bamboo_core::InstitutionKind;

/// An institution row (either table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub full_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: InstitutionKind,
    #[serde(skip)]
    pub is_active: bool,
}

impl Institution {
    #[must_use]
    pub fn summary(&self) -> InstitutionSummary {
        InstitutionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            full_name: self.full_name.clone(),
            kind: self.kind,
        }
    }
}

/// Institution data embedded in admin responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstitutionSummary {
    pub id: String,
    pub name: String,
    pub full_name: Option<String>,
    #[serde(skip)]
    pub kind: InstitutionKind,
}

/// Active institutions grouped for assignment pickers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssignableInstitutions {
    pub banks: Vec<Institution>,
    pub insurance_companies: Vec<Institution>,
    pub total_banks: usize,
    pub total_insurance: usize,
}

impl AssignableInstitutions {
    /// Split a mixed list by kind, keeping only active entries.
    #[must_use]
    pub fn from_active(institutions: Vec<Institution>) -> Self {
        let (banks, insurance_companies): (Vec<_>, Vec<_>) = institutions
            .into_iter()
            .filter(|institution| institution.is_active)
            .partition(|institution| institution.kind == InstitutionKind::Bank);

        Self {
            total_banks: banks.len(),
            total_insurance: insurance_companies.len(),
            banks,
            insurance_companies,
        }
    }
}

/// Institution seed entry (CLI YAML import).
#[derive(Debug, Clone, Deserialize)]
pub struct InstitutionSeed {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn institution(id: &str, kind: InstitutionKind, is_active: bool) -> Institution {
        Institution {
            id: id.to_string(),
            name: id.to_uppercase(),
            full_name: None,
            kind,
            is_active,
        }
    }

    #[test]
    fn test_from_active_partitions_and_counts() {
        let grouped = AssignableInstitutions::from_active(vec![
            institution("bgfi", InstitutionKind::Bank, true),
            institution("ugb", InstitutionKind::Bank, false),
            institution("ogar", InstitutionKind::Insurance, true),
        ]);
        assert_eq!(grouped.total_banks, 1);
        assert_eq!(grouped.total_insurance, 1);
        assert_eq!(grouped.banks.first().map(|b| b.id.as_str()), Some("bgfi"));
    }

    #[test]
    fn test_institution_serializes_type() {
        let value = serde_json::to_value(institution("ogar", InstitutionKind::Insurance, true))
            .unwrap_or_default();
        assert_eq!(value["type"], "insurance");
        assert!(value.get("is_active").is_none());
    }
}
