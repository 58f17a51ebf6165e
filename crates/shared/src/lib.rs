//! Shared types, token service, and configuration for fxgate.
//!
//! This crate provides common types used across all other crates:
//! - Roles and JWT claims
//! - The token service (issuance, verification, revocation)
//! - Auth request/response payloads
//! - Configuration management

pub mod auth;
pub mod config;
pub mod jwt;

pub use auth::{Claims, RefreshClaims, Role};
pub use config::AppConfig;
pub use jwt::{JwtConfig, JwtError, JwtService};
