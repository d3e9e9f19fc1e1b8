//! Bamboo Core - Domain types for the financial back office.
//!
//! This crate provides the types shared by the back-office service, the CLI
//! and the integration tests:
//! - typed string identifiers for every persisted entity
//! - validated contact channels ([`Email`], [`PhoneNumber`])
//! - the admin role model ([`AdminRole`], [`RoleAssignment`]) and the
//!   permission map with its merge-on-update semantics
//! - closed status sets for credit, savings and insurance applications
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. The optional `postgres` feature adds `sqlx` encode/decode
//! implementations so the types can be bound directly in queries.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
