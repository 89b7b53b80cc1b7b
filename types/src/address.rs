//! Identity address type: `0x` followed by 40 hex characters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// An account address identifying a student, lecturer, or administrator.
///
/// Addresses are case-insensitive: parsing normalises them to lowercase, so
/// two addresses that differ only in letter case compare equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityAddress(String);

impl IdentityAddress {
    /// The standard prefix for all identity addresses.
    pub const PREFIX: &'static str = "0x";

    /// Number of hex characters after the prefix (20 bytes).
    pub const HEX_LEN: usize = 40;

    /// Parse and normalise an address.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        let Some(body) = lower.strip_prefix(Self::PREFIX) else {
            return Err(TypeError::InvalidAddress(trimmed.to_string()));
        };
        if body.len() != Self::HEX_LEN || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidAddress(trimmed.to_string()));
        }
        Ok(Self(lower))
    }

    /// Build an address from the 20 raw bytes it encodes.
    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        let mut s = String::with_capacity(Self::PREFIX.len() + Self::HEX_LEN);
        s.push_str(Self::PREFIX);
        for b in bytes {
            s.push_str(&format!("{:02x}", b));
        }
        Self(s)
    }

    /// Return the normalised address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes of the normalised string, used as storage keys.
    pub fn as_key(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for IdentityAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IdentityAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IdentityAddress {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<IdentityAddress> for String {
    fn from(addr: IdentityAddress) -> Self {
        addr.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "0x61d6f5D4a07D20b5373555592C607b144165dF73";

    #[test]
    fn parse_normalises_case() {
        let addr = IdentityAddress::parse(MIXED).unwrap();
        assert_eq!(addr.as_str(), MIXED.to_ascii_lowercase());
        assert_eq!(addr, IdentityAddress::parse(&MIXED.to_ascii_uppercase().replace("0X", "0x")).unwrap());
    }

    #[test]
    fn parse_accepts_uppercase_prefix() {
        let upper = MIXED.to_ascii_uppercase();
        assert!(IdentityAddress::parse(&upper).is_ok());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(IdentityAddress::parse("61d6f5d4a07d20b5373555592c607b144165df73").is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(IdentityAddress::parse("0x61d6f5").is_err());
        assert!(IdentityAddress::parse(&format!("{MIXED}00")).is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!(IdentityAddress::parse("0xzzd6f5d4a07d20b5373555592c607b144165df73").is_err());
    }

    #[test]
    fn from_bytes_formats_lowercase_hex() {
        let addr = IdentityAddress::from_bytes(&[0xAB; 20]);
        assert_eq!(addr.as_str(), format!("0x{}", "ab".repeat(20)));
        assert!(IdentityAddress::parse(addr.as_str()).is_ok());
    }

    #[test]
    fn serde_rejects_invalid_string() {
        let err = serde_json::from_str::<IdentityAddress>("\"not-an-address\"");
        assert!(err.is_err());
        let ok: IdentityAddress = serde_json::from_str(&format!("\"{MIXED}\"")).unwrap();
        assert_eq!(ok.as_str(), MIXED.to_ascii_lowercase());
    }
}
