//! API handlers for Vetrina.
//!
//! Route handlers are grouped by concern: `auth` owns the verification and
//! login flows, `me` the authenticated profile, `health` and `root` the
//! operational endpoints.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;
