//! Verification request types shared by the repo, service, and handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Workflow a code was issued for. Scopes uniqueness: the same contact can
/// hold one active code per purpose.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Register,
    Verify,
    Reset,
}

impl Purpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Verify => "verify",
            Self::Reset => "reset",
        }
    }
}

/// Delivery channel, derived from the shape of the normalized contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Email,
    Phone,
}

impl Channel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

/// A verification row as read under lock during verification.
#[derive(Debug)]
pub(crate) struct VerificationRow {
    pub(crate) id: Uuid,
    pub(crate) code_hash: Vec<u8>,
    pub(crate) code_salt: Vec<u8>,
    pub(crate) attempts: i32,
    pub(crate) payload_json: Option<String>,
    /// Evaluated in SQL against the database clock, never parsed from strings.
    pub(crate) expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn purpose_round_trips_as_snake_case() -> Result<()> {
        for (purpose, text) in [
            (Purpose::Register, "\"register\""),
            (Purpose::Verify, "\"verify\""),
            (Purpose::Reset, "\"reset\""),
        ] {
            assert_eq!(serde_json::to_string(&purpose)?, text);
            let decoded: Purpose = serde_json::from_str(text)?;
            assert_eq!(decoded, purpose);
        }
        Ok(())
    }

    #[test]
    fn purpose_rejects_unknown_variants() {
        let decoded: Result<Purpose, _> = serde_json::from_str("\"login\"");
        assert!(decoded.is_err());
    }

    #[test]
    fn as_str_matches_serde_names() -> Result<()> {
        for purpose in [Purpose::Register, Purpose::Verify, Purpose::Reset] {
            let json = serde_json::to_string(&purpose)?;
            assert_eq!(json.trim_matches('"'), purpose.as_str());
        }
        Ok(())
    }
}
