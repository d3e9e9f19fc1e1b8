//! Per-admin capability flags.
//!
//! Stored as a nested JSON map:
//!
//! ```json
//! {
//!   "products": {"create": true, "read": true, "update": true, "delete": false},
//!   "simulations": {"read": true},
//!   "applications": {"manage": true}
//! }
//! ```
//!
//! Requests never send this map directly. Creation sends five boolean
//! [`PermissionToggles`]; updates send any subset of them as a
//! [`PermissionPatch`] which is merged key by key into the stored map.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPermissions {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationPermissions {
    pub read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationPermissions {
    pub manage: bool,
}

/// The full permission map of an admin.
///
/// Missing keys in stored JSON deserialize as `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub products: ProductPermissions,
    pub simulations: SimulationPermissions,
    pub applications: ApplicationPermissions,
}

impl Permissions {
    /// Every capability granted. Used for bootstrapped super admins.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            products: ProductPermissions {
                create: true,
                read: true,
                update: true,
                delete: true,
            },
            simulations: SimulationPermissions { read: true },
            applications: ApplicationPermissions { manage: true },
        }
    }
}

/// The five capability switches offered when creating an admin.
///
/// All default to `true`. `products.read` is not a toggle: it is always granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionToggles {
    pub can_create_products: bool,
    pub can_edit_products: bool,
    pub can_delete_products: bool,
    pub can_view_simulations: bool,
    pub can_manage_applications: bool,
}

impl Default for PermissionToggles {
    fn default() -> Self {
        Self {
            can_create_products: true,
            can_edit_products: true,
            can_delete_products: true,
            can_view_simulations: true,
            can_manage_applications: true,
        }
    }
}

impl From<PermissionToggles> for Permissions {
    fn from(toggles: PermissionToggles) -> Self {
        Self {
            products: ProductPermissions {
                create: toggles.can_create_products,
                read: true,
                update: toggles.can_edit_products,
                delete: toggles.can_delete_products,
            },
            simulations: SimulationPermissions {
                read: toggles.can_view_simulations,
            },
            applications: ApplicationPermissions {
                manage: toggles.can_manage_applications,
            },
        }
    }
}

/// A partial update of the five toggles. `None` leaves the stored flag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionPatch {
    pub can_create_products: Option<bool>,
    pub can_edit_products: Option<bool>,
    pub can_delete_products: Option<bool>,
    pub can_view_simulations: Option<bool>,
    pub can_manage_applications: Option<bool>,
}

impl PermissionPatch {
    /// True when no toggle is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.can_create_products.is_none()
            && self.can_edit_products.is_none()
            && self.can_delete_products.is_none()
            && self.can_view_simulations.is_none()
            && self.can_manage_applications.is_none()
    }

    /// Merge this patch into `existing`, touching only the keys present.
    ///
    /// ```
    /// use bamboo_core::{PermissionPatch, PermissionToggles, Permissions};
    ///
    /// let existing = Permissions::from(PermissionToggles::default());
    /// let patch = PermissionPatch {
    ///     can_edit_products: Some(false),
    ///     ..PermissionPatch::default()
    /// };
    /// let merged = patch.merge(existing);
    /// assert!(!merged.products.update);
    /// assert!(merged.products.delete);
    /// ```
    #[must_use]
    pub fn merge(self, existing: Permissions) -> Permissions {
        let mut merged = existing;
        if let Some(value) = self.can_create_products {
            merged.products.create = value;
        }
        if let Some(value) = self.can_edit_products {
            merged.products.update = value;
        }
        if let Some(value) = self.can_delete_products {
            merged.products.delete = value;
        }
        if let Some(value) = self.can_view_simulations {
            merged.simulations.read = value;
        }
        if let Some(value) = self.can_manage_applications {
            merged.applications.manage = value;
        }
        merged
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_toggles_always_grant_product_read() {
        let toggles = PermissionToggles {
            can_create_products: false,
            can_edit_products: false,
            can_delete_products: false,
            can_view_simulations: false,
            can_manage_applications: false,
        };
        let permissions = Permissions::from(toggles);
        assert!(permissions.products.read);
        assert!(!permissions.products.create);
        assert!(!permissions.applications.manage);
    }

    #[test]
    fn test_toggles_default_to_true() {
        let toggles: PermissionToggles = serde_json::from_str("{}").unwrap();
        assert_eq!(Permissions::from(toggles), Permissions::full());
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let existing = Permissions::from(PermissionToggles {
            can_delete_products: false,
            ..PermissionToggles::default()
        });
        let patch = PermissionPatch::default();
        assert!(patch.is_empty());
        assert_eq!(patch.merge(existing), existing);
    }

    #[test]
    fn test_patch_preserves_unmentioned_keys() {
        let existing = Permissions::full();
        let patch = PermissionPatch {
            can_edit_products: Some(false),
            can_manage_applications: Some(false),
            ..PermissionPatch::default()
        };
        let merged = patch.merge(existing);
        assert!(!merged.products.update);
        assert!(!merged.applications.manage);
        assert!(merged.products.delete);
        assert!(merged.products.create);
        assert!(merged.simulations.read);
    }

    #[test]
    fn test_stored_map_missing_keys_deserialize_false() {
        let stored = r#"{"products": {"read": true}}"#;
        let permissions: Permissions = serde_json::from_str(stored).unwrap();
        assert!(permissions.products.read);
        assert!(!permissions.products.delete);
        assert!(!permissions.applications.manage);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Permissions::full()).unwrap();
        assert_eq!(json["products"]["read"], true);
        assert_eq!(json["simulations"]["read"], true);
        assert_eq!(json["applications"]["manage"], true);
    }
}
