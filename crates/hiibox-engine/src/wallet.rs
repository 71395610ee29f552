use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WalletAddressError {
    #[error("Wallet address must start with 0x: {0}")]
    MissingPrefix(String),

    #[error("Wallet address must have 40 hex digits, got {0}")]
    InvalidLength(usize),

    #[error("Wallet address is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// An EVM wallet address in canonical form (`0x` + 40 lowercase hex digits)
///
/// Accounts are keyed by this form, so `0xABC…` and `0xabc…` are the same user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WalletAddress {
    type Err = WalletAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| WalletAddressError::MissingPrefix(trimmed.to_string()))?;

        if digits.len() != 40 {
            return Err(WalletAddressError::InvalidLength(digits.len()));
        }
        hex::decode(digits)?;

        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = WalletAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        let upper: WalletAddress = "0xAbCdEf0123456789aBcDeF0123456789ABCDEF01".parse().unwrap();
        let lower: WalletAddress = " 0xabcdef0123456789abcdef0123456789abcdef01 ".parse().unwrap();

        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "abcdef0123456789abcdef0123456789abcdef01".parse::<WalletAddress>(),
            Err(WalletAddressError::MissingPrefix(_))
        ));
        assert_eq!(
            "0x1234".parse::<WalletAddress>(),
            Err(WalletAddressError::InvalidLength(4))
        );
        assert!(matches!(
            "0xzz00000000000000000000000000000000000000".parse::<WalletAddress>(),
            Err(WalletAddressError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_serde_goes_through_validation() {
        let json = "\"0x00000000000000000000000000000000000000AA\"";
        let address: WalletAddress = serde_json::from_str(json).unwrap();
        assert_eq!(
            serde_json::to_string(&address).unwrap(),
            "\"0x00000000000000000000000000000000000000aa\""
        );
        assert!(serde_json::from_str::<WalletAddress>("\"0x12\"").is_err());
    }
}
