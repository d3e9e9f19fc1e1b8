//! Bamboo back office library.
//!
//! This crate provides the back-office service as a library, allowing it to
//! be tested and reused by the CLI.
//!
//! # Surfaces
//!
//! - Admin API (cookie sessions): admin login, admin management by super
//!   admins, processing of credit, savings and insurance applications
//! - End-user API (bearer tokens): registration with verification codes,
//!   login, profile, notifications, application submission and history
//!
//! Every admin mutation is written to the audit log.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
