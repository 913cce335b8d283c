//! Session identifiers and transaction references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a voting session.
///
/// Sessions confirmed by the ledger carry the decimal id the contract
/// assigned; sessions recorded while the ledger was unreachable carry a
/// `local-<n>` id so the two namespaces never collide.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub const LOCAL_PREFIX: &'static str = "local-";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// A locally generated id.
    pub fn local(seq: u64) -> Self {
        Self(format!("{}{seq}", Self::LOCAL_PREFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(Self::LOCAL_PREFIX)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Reference to a submitted ledger transaction (`0x`-prefixed hex).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..10).unwrap_or(&self.0);
        write!(f, "TxRef({short})")
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_ids_are_prefixed() {
        let id = SessionId::local(7);
        assert_eq!(id.as_str(), "local-7");
        assert!(id.is_local());
        assert!(!SessionId::new("7").is_local());
    }

    #[test]
    fn tx_ref_is_hex() {
        let tx = TxRef::from_bytes(&[0xde, 0xad, 0x01]);
        assert_eq!(tx.as_str(), "0xdead01");
        assert_eq!(format!("{tx:?}"), "TxRef(0xdead01)");
    }
}
