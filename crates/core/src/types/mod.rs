//! Core types for the Bamboo back office.
//!
//! This module provides type-safe wrappers for the back-office domain.

pub mod email;
pub mod id;
pub mod metadata;
pub mod permissions;
pub mod phone;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use metadata::Metadata;
pub use permissions::{
    ApplicationPermissions, PermissionPatch, PermissionToggles, Permissions, ProductPermissions,
    SimulationPermissions,
};
pub use phone::{PhoneError, PhoneNumber, normalize_phone};
pub use role::{AdminRole, AssignmentError, InstitutionKind, RoleAssignment};
pub use status::*;
