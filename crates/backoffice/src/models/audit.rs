//! Audit log entries for mutating admin actions.

use serde::Serialize;
use serde_json::Value;

use bamboo_core::AdminUserId;

/// Verb recorded on an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Admin who performed the action.
    pub actor: AdminUserId,
    pub action: AuditAction,
    /// e.g. `admin_user`, `credit_application`
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
}

impl AuditEntry {
    #[must_use]
    pub fn new(
        actor: &AdminUserId,
        action: AuditAction,
        entity_type: &'static str,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.clone(),
            action,
            entity_type,
            entity_id: Some(entity_id.into()),
            old_values: None,
            new_values: None,
        }
    }

    #[must_use]
    pub fn old(mut self, values: Value) -> Self {
        self.old_values = Some(values);
        self
    }

    #[must_use]
    pub fn new_values(mut self, values: Value) -> Self {
        self.new_values = Some(values);
        self
    }
}
