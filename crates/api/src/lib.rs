//! HTTP boundary: credential transport, the access decision guard, and the
//! session endpoints (refresh/logout/me).

pub mod app;
pub mod errors;
pub mod guard;
pub mod identity;
pub mod refresh_gate;
pub mod transport;
