//! `taskgate-core`: shared foundation for the auth core.
//!
//! Pure primitives only (no HTTP, no storage, no crypto).

pub mod error;
pub mod id;

pub use error::{CoreError, CoreResult};
pub use id::UserId;
