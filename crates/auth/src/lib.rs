//! `taskgate-auth`: token issuance/verification and role-based permissions.
//!
//! This crate is intentionally decoupled from HTTP and storage: tokens come
//! in and out as strings, permission checks are pure functions, and the only
//! state it holds is the used-refresh-token registry its consumers layer in
//! front of rotation.

pub mod claims;
pub mod config;
pub mod permissions;
pub mod principal;
pub mod replay;
pub mod role;
pub mod token;

pub use claims::{AccessClaims, RefreshClaims, REFRESH_TOKEN_TYPE};
pub use config::{AuthConfig, ConfigError};
pub use permissions::{has_any_permission, has_permission, Action, Resource};
pub use principal::Principal;
pub use replay::UsedTokenRegistry;
pub use role::Role;
pub use token::{TokenError, TokenPair, TokenService};
