//! Seed the institution reference tables from a YAML file.
//!
//! ```yaml
//! banks:
//!   - id: bgfi
//!     name: BGFIBank
//!     full_name: BGFIBank Gabon
//! insurance_companies:
//!   - id: ogar
//!     name: OGAR
//!     is_active: false
//! ```
//!
//! Existing rows with the same id are updated in place.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use bamboo_backoffice::db::InstitutionRepository;
use bamboo_backoffice::models::InstitutionSeed;
use bamboo_core::InstitutionKind;

/// Top-level seed file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InstitutionsFile {
    pub banks: Vec<InstitutionSeed>,
    pub insurance_companies: Vec<InstitutionSeed>,
}

impl InstitutionsFile {
    /// Entries paired with their table.
    pub fn entries(&self) -> impl Iterator<Item = (InstitutionKind, &InstitutionSeed)> {
        self.banks
            .iter()
            .map(|seed| (InstitutionKind::Bank, seed))
            .chain(
                self.insurance_companies
                    .iter()
                    .map(|seed| (InstitutionKind::Insurance, seed)),
            )
    }

    /// Reject blank or duplicate ids before touching the database.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for (kind, seed) in self.entries() {
            if seed.id.trim().is_empty() {
                errors.push(format!("{}: entry with empty id", kind.label()));
            } else if !seen.insert((kind, seed.id.as_str())) {
                errors.push(format!("{}: duplicate id {}", kind.label(), seed.id));
            }
            if seed.name.trim().is_empty() {
                errors.push(format!("{} {}: name is required", kind.label(), seed.id));
            }
        }
        errors
    }
}

/// Upsert banks and insurance companies from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails.
pub async fn institutions(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading institutions from file");
    let content = tokio::fs::read_to_string(path).await?;
    let file: InstitutionsFile = serde_yaml::from_str(&content)?;

    let errors = file.validate();
    if !errors.is_empty() {
        for err in &errors {
            tracing::error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = super::connect().await?;
    let repo = InstitutionRepository::new(&pool);

    let mut written = 0usize;
    for (kind, seed) in file.entries() {
        repo.upsert(kind, seed).await?;
        written += 1;
    }

    info!(
        banks = file.banks.len(),
        insurance_companies = file.insurance_companies.len(),
        written,
        "Seeding complete!"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_validate() {
        let file: InstitutionsFile = serde_yaml::from_str(
            r"
banks:
  - id: bgfi
    name: BGFIBank
  - id: bgfi
    name: BGFIBank Gabon
insurance_companies:
  - id: ogar
    name: OGAR
    is_active: false
",
        )
        .unwrap();

        assert_eq!(file.entries().count(), 3);
        assert!(!file.insurance_companies[0].is_active);
        assert!(file.banks[0].is_active);

        let errors = file.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate id bgfi"));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let file: InstitutionsFile = serde_yaml::from_str("banks: []").unwrap();
        assert!(file.insurance_companies.is_empty());
        assert!(file.validate().is_empty());
    }
}
