//! Admin roles and institution assignment.
//!
//! A back-office admin is either unscoped (`super_admin`, `moderator`) or
//! scoped to exactly one institution (`bank_admin` → a bank,
//! `insurance_admin` → an insurance company). [`RoleAssignment`] carries the
//! assignment inside the role variant so an illegal combination cannot be
//! represented once a request has been validated.

use serde::{Deserialize, Serialize};

use super::id::{BankId, InsuranceCompanyId};

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "backoffice.admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full access, including admin management. Protected from the
    /// management endpoints themselves.
    SuperAdmin,
    /// Manages the products and applications of one bank.
    BankAdmin,
    /// Manages the products and applications of one insurance company.
    InsuranceAdmin,
    /// Cross-institution moderation without an assignment.
    Moderator,
}

impl AdminRole {
    /// Every role, in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::SuperAdmin,
        Self::BankAdmin,
        Self::InsuranceAdmin,
        Self::Moderator,
    ];

    /// The wire/database spelling of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::BankAdmin => "bank_admin",
            Self::InsuranceAdmin => "insurance_admin",
            Self::Moderator => "moderator",
        }
    }

    #[must_use]
    pub const fn is_super_admin(self) -> bool {
        matches!(self, Self::SuperAdmin)
    }

    /// The institution kind this role must be assigned to, if any.
    #[must_use]
    pub const fn institution_kind(self) -> Option<InstitutionKind> {
        match self {
            Self::BankAdmin => Some(InstitutionKind::Bank),
            Self::InsuranceAdmin => Some(InstitutionKind::Insurance),
            Self::SuperAdmin | Self::Moderator => None,
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "bank_admin" => Ok(Self::BankAdmin),
            "insurance_admin" => Ok(Self::InsuranceAdmin),
            "moderator" => Ok(Self::Moderator),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

/// Kind of institution an admin can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionKind {
    Bank,
    Insurance,
}

impl InstitutionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Insurance => "insurance",
        }
    }

    /// Name used in user-facing messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Insurance => "insurance company",
        }
    }
}

impl std::fmt::Display for InstitutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a role/assignment combination is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("a bank must be assigned to a bank_admin")]
    MissingBank,

    #[error("an insurance company must be assigned to an insurance_admin")]
    MissingInsuranceCompany,

    /// An assignment id was supplied that the (unchanged) role cannot hold.
    #[error("a {role} cannot be assigned to a {}", kind.label())]
    Mismatch {
        role: AdminRole,
        kind: InstitutionKind,
    },

    /// Stored columns violate the role invariant.
    #[error("stored assignment for {role} is inconsistent")]
    Inconsistent { role: AdminRole },
}

/// A validated role together with its institution assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoleAssignment {
    SuperAdmin,
    BankAdmin { bank_id: BankId },
    InsuranceAdmin { insurance_company_id: InsuranceCompanyId },
    Moderator,
}

fn present<T: AsRef<str>>(id: Option<T>) -> Option<T> {
    id.filter(|id| !id.as_ref().trim().is_empty())
}

impl RoleAssignment {
    /// Validate a creation request.
    ///
    /// The id matching the role is required; the other one is dropped. Both
    /// are dropped for `super_admin` and `moderator`. Blank ids count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::MissingBank`] or
    /// [`AssignmentError::MissingInsuranceCompany`] naming the missing institution.
    pub fn from_request(
        role: AdminRole,
        bank_id: Option<BankId>,
        insurance_company_id: Option<InsuranceCompanyId>,
    ) -> Result<Self, AssignmentError> {
        match role {
            AdminRole::SuperAdmin => Ok(Self::SuperAdmin),
            AdminRole::Moderator => Ok(Self::Moderator),
            AdminRole::BankAdmin => present(bank_id)
                .map(|bank_id| Self::BankAdmin { bank_id })
                .ok_or(AssignmentError::MissingBank),
            AdminRole::InsuranceAdmin => present(insurance_company_id)
                .map(|insurance_company_id| Self::InsuranceAdmin {
                    insurance_company_id,
                })
                .ok_or(AssignmentError::MissingInsuranceCompany),
        }
    }

    /// Validate a partial update against the current assignment.
    ///
    /// - With an explicit `role`, behaves like [`Self::from_request`] except
    ///   that a missing id falls back to the current assignment of the same kind.
    /// - Without a `role`, the current role is kept; an id of the role's own
    ///   kind reassigns, an id of any other kind is a [`AssignmentError::Mismatch`].
    ///
    /// # Errors
    ///
    /// Returns an [`AssignmentError`] when the resulting combination is invalid.
    pub fn resolve_update(
        &self,
        role: Option<AdminRole>,
        bank_id: Option<BankId>,
        insurance_company_id: Option<InsuranceCompanyId>,
    ) -> Result<Self, AssignmentError> {
        let bank_id = present(bank_id);
        let insurance_company_id = present(insurance_company_id);

        let role = match role {
            Some(role) => role,
            None => {
                let current = self.role();
                if bank_id.is_some() && current != AdminRole::BankAdmin {
                    return Err(AssignmentError::Mismatch {
                        role: current,
                        kind: InstitutionKind::Bank,
                    });
                }
                if insurance_company_id.is_some() && current != AdminRole::InsuranceAdmin {
                    return Err(AssignmentError::Mismatch {
                        role: current,
                        kind: InstitutionKind::Insurance,
                    });
                }
                current
            }
        };

        Self::from_request(
            role,
            bank_id.or_else(|| self.bank_id().cloned()),
            insurance_company_id.or_else(|| self.insurance_company_id().cloned()),
        )
    }

    /// Rebuild an assignment from stored columns.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentError::Inconsistent`] if the columns break the
    /// role invariant (only possible if the database constraint was bypassed).
    pub fn from_columns(
        role: AdminRole,
        bank_id: Option<BankId>,
        insurance_company_id: Option<InsuranceCompanyId>,
    ) -> Result<Self, AssignmentError> {
        let inconsistent = AssignmentError::Inconsistent { role };
        match (role, bank_id, insurance_company_id) {
            (AdminRole::SuperAdmin, None, None) => Ok(Self::SuperAdmin),
            (AdminRole::Moderator, None, None) => Ok(Self::Moderator),
            (AdminRole::BankAdmin, Some(bank_id), None) => Ok(Self::BankAdmin { bank_id }),
            (AdminRole::InsuranceAdmin, None, Some(insurance_company_id)) => {
                Ok(Self::InsuranceAdmin {
                    insurance_company_id,
                })
            }
            _ => Err(inconsistent),
        }
    }

    #[must_use]
    pub const fn role(&self) -> AdminRole {
        match self {
            Self::SuperAdmin => AdminRole::SuperAdmin,
            Self::BankAdmin { .. } => AdminRole::BankAdmin,
            Self::InsuranceAdmin { .. } => AdminRole::InsuranceAdmin,
            Self::Moderator => AdminRole::Moderator,
        }
    }

    #[must_use]
    pub const fn bank_id(&self) -> Option<&BankId> {
        match self {
            Self::BankAdmin { bank_id } => Some(bank_id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn insurance_company_id(&self) -> Option<&InsuranceCompanyId> {
        match self {
            Self::InsuranceAdmin {
                insurance_company_id,
            } => Some(insurance_company_id),
            _ => None,
        }
    }
}
