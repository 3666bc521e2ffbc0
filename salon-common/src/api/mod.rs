//! API module for shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Shared types
//!
//! The server wraps these with axum extractors and responses.

pub mod auth;
pub mod types;

pub use auth::{
    generate_admin_secret, secrets_match, Action, Credential, Policy, Resource, SharedSecretPolicy,
};
pub use types::{ApiResponse, ErrorBody};
