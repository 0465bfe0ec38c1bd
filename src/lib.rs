//! # Vetrina (Customer Authentication)
//!
//! `vetrina` is the customer authentication service for the Vetrina
//! storefront. It handles account registration, contact verification,
//! password reset, password and Google sign-in, and stateless sessions.
//!
//! ## Verification Codes
//!
//! All code-based workflows share one state machine keyed by
//! `(purpose, contact)`: a contact can hold one active code per purpose,
//! codes are single use, expire after a configurable TTL, and are
//! invalidated after too many wrong attempts. Only a salted hash of each
//! code is stored.
//!
//! ## Sessions
//!
//! Sessions are stateless `HS256` JWTs. Nothing is stored server-side;
//! a token is valid until it expires or the signing secret rotates.

pub mod api;
pub mod cli;
pub mod otp;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
