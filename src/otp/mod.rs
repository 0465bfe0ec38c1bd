//! One-time-passcode issuance and verification.
//!
//! A verification request is a single database row keyed by
//! `(purpose, contact)`: a salted hash of a short numeric code, a failed
//! attempt counter, an expiry, and an optional opaque payload carried from
//! issuance to verification. Issuing replaces any previous row for the same
//! key; verifying either consumes the row (success), bumps the attempt
//! counter, or deletes the row (expiry, attempt limit). All mutations happen
//! under a row lock so concurrent submissions for the same key serialize.

pub mod code;
pub mod models;
pub mod repo;
pub mod service;

pub use models::{Channel, Purpose};
pub use service::{DenyReason, IssuedCode, VerifyOutcome};
