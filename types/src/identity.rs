//! Normalized voter / creator identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::VotegateError;

/// A wallet identity, normalized for comparison.
///
/// Wallet addresses arrive from the front end in mixed (checksum) case; two
/// spellings of the same address must map to the same voter, so the stored
/// form is trimmed and lower-cased.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Normalize a raw identity string.
    pub fn parse(raw: &str) -> Result<Self, VotegateError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(VotegateError::InvalidIdentity(
                "identity must not be empty".into(),
            ));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(VotegateError::InvalidIdentity(format!(
                "identity contains whitespace: {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Return the normalized identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = VotegateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}
