//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Keys**: `PublicKey`, `PrivateKey`, `KeyPair`, `TokenId`
//! - **Network**: `Network` and its endpoints
//! - **Amounts**: `parse_amount`, fee constants
//! - **Tokens**: `TokenRecord`, `TokenStatus`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{AmountError, KeyError, NetworkError, StatusError};

// =============================================================================
// CLUSTER A: KEYS
// =============================================================================

/// The base58 alphabet (Bitcoin ordering, no `0`, `O`, `I`, `l`).
pub const BASE58_ALPHABET: &[u8; 58] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Every account address starts with this prefix.
pub const PUBLIC_KEY_PREFIX: &str = "B62";

/// Length of a base58 account address.
pub const PUBLIC_KEY_LEN: usize = 55;

/// Every private key starts with this prefix.
pub const PRIVATE_KEY_PREFIX: &str = "EK";

/// Length of a base58 private key.
pub const PRIVATE_KEY_LEN: usize = 52;

fn validate_base58(
    kind: &'static str,
    value: &str,
    prefix: &'static str,
    len: usize,
) -> Result<(), KeyError> {
    if !value.starts_with(prefix) {
        return Err(KeyError::BadPrefix {
            kind,
            expected: prefix,
        });
    }
    if value.len() != len {
        return Err(KeyError::BadLength {
            kind,
            expected: len,
            actual: value.chars().count(),
        });
    }
    if let Some(character) = value.chars().find(|c| !c.is_ascii() || !BASE58_ALPHABET.contains(&(*c as u8))) {
        return Err(KeyError::BadCharacter { kind, character });
    }
    Ok(())
}

/// Map arbitrary bytes onto the base58 alphabet, cycling the input as needed.
///
/// Not a base58 encoding: the output is only guaranteed to consist of
/// alphabet characters, which is what key-shaped identifiers need.
pub fn base58_digits(bytes: &[u8], len: usize) -> String {
    if bytes.is_empty() {
        return "1".repeat(len);
    }
    bytes
        .iter()
        .cycle()
        .take(len)
        .map(|b| BASE58_ALPHABET[(*b as usize) % BASE58_ALPHABET.len()] as char)
        .collect()
}

/// A base58 account address (`B62…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(String);

impl PublicKey {
    /// Parse and validate a base58 address.
    pub fn from_base58(value: &str) -> Result<Self, KeyError> {
        let value = value.trim();
        validate_base58("public", value, PUBLIC_KEY_PREFIX, PUBLIC_KEY_LEN)?;
        Ok(Self(value.to_string()))
    }

    /// An address-shaped key whose digits are taken from `digest`.
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(format!(
            "{}{}",
            PUBLIC_KEY_PREFIX,
            base58_digits(digest, PUBLIC_KEY_LEN - PUBLIC_KEY_PREFIX.len())
        ))
    }

    /// The base58 form of this address.
    pub fn to_base58(&self) -> &str {
        &self.0
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_base58(&value)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A base58 private key (`EK…`).
///
/// `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrivateKey(String);

impl PrivateKey {
    /// Parse and validate a base58 private key.
    pub fn from_base58(value: &str) -> Result<Self, KeyError> {
        let value = value.trim();
        validate_base58("private", value, PRIVATE_KEY_PREFIX, PRIVATE_KEY_LEN)?;
        Ok(Self(value.to_string()))
    }

    /// A key-shaped value whose digits are taken from `entropy`.
    pub fn from_entropy(entropy: &[u8]) -> Self {
        Self(format!(
            "{}{}",
            PRIVATE_KEY_PREFIX,
            base58_digits(entropy, PRIVATE_KEY_LEN - PRIVATE_KEY_PREFIX.len())
        ))
    }

    /// The base58 form of this key.
    pub fn to_base58(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}…)", &self.0[..PRIVATE_KEY_PREFIX.len() + 1])
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl TryFrom<String> for PrivateKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_base58(&value)
    }
}

impl From<PrivateKey> for String {
    fn from(key: PrivateKey) -> Self {
        key.0
    }
}

/// A private key together with its derived address.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

/// Token identifier derived from a token contract address (a field element,
/// rendered in decimal).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CLUSTER B: NETWORK
// =============================================================================

/// GraphQL endpoint used for the development network.
pub const DEVNET_GRAPHQL_URL: &str = "https://proxy.devnet.minaexplorer.com/graphql";

/// GraphQL endpoint used for mainnet.
pub const MAINNET_GRAPHQL_URL: &str = "https://api.minascan.io/archive/mainnet/v1/graphql";

/// Target network for contract calls and indexer queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Network {
    #[default]
    Devnet,
    Mainnet,
}

impl Network {
    /// GraphQL endpoint of the network (also the indexer).
    pub fn graphql_url(&self) -> &'static str {
        match self {
            Network::Devnet => DEVNET_GRAPHQL_URL,
            Network::Mainnet => MAINNET_GRAPHQL_URL,
        }
    }

    /// Lowercase name used in explorer URLs.
    pub fn slug(&self) -> &'static str {
        match self {
            Network::Devnet => "devnet",
            Network::Mainnet => "mainnet",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Devnet => "Devnet",
            Network::Mainnet => "Mainnet",
        }
    }
}

impl FromStr for Network {
    type Err = NetworkError;

    /// Case-insensitive: stored selections are sometimes lowercased.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Network::Devnet),
            "mainnet" => Ok(Network::Mainnet),
            _ => Err(NetworkError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLUSTER C: AMOUNTS
// =============================================================================

/// Smallest currency units per whole coin.
pub const NANOMINA_PER_MINA: u64 = 1_000_000_000;

/// Fee attached to deploy transactions built by the worker (0.1 coin).
pub const DEPLOY_FEE_NANOMINA: u64 = 100_000_000;

/// Fee the wallet is asked to pay when broadcasting (in whole coins).
pub const DEFAULT_WALLET_FEE: f64 = 0.1;

/// Parse a token amount given as a decimal string.
pub fn parse_amount(value: &str) -> Result<u64, AmountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AmountError::Empty);
    }
    value
        .parse::<u64>()
        .map_err(|_| AmountError::Invalid(value.to_string()))
}

// =============================================================================
// CLUSTER D: TOKENS
// =============================================================================

/// Lifecycle of a token in the local list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
    Launched,
    Pending,
}

impl FromStr for TokenStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Launched" => Ok(TokenStatus::Launched),
            "Pending" => Ok(TokenStatus::Pending),
            other => Err(StatusError(other.to_string())),
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStatus::Launched => f.write_str("Launched"),
            TokenStatus::Pending => f.write_str("Pending"),
        }
    }
}

/// One entry in the persisted token list.
///
/// Fields are kept as plain strings: the list is stored unvalidated and an
/// imported address may not parse as a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub id: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_private_key: Option<String>,
    pub status: TokenStatus,
}

impl TokenRecord {
    /// A freshly launched token with a random id.
    pub fn launched(
        address: impl Into<String>,
        admin_public_key: Option<String>,
        admin_private_key: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            address: address.into(),
            admin_public_key,
            admin_private_key,
            status: TokenStatus::Launched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_public_key() -> String {
        format!("B62q{}", base58_digits(&[7, 19, 42], PUBLIC_KEY_LEN - 4))
    }

    fn sample_private_key() -> String {
        format!("EKE{}", base58_digits(&[3, 5, 8, 13], PRIVATE_KEY_LEN - 3))
    }

    #[test]
    fn test_public_key_roundtrip() {
        let raw = sample_public_key();
        let key = PublicKey::from_base58(&raw).unwrap();
        assert_eq!(key.to_base58(), raw);
        assert_eq!(key.to_string(), raw);
    }

    #[test]
    fn test_public_key_rejects_bad_prefix() {
        let raw = sample_public_key().replacen("B62", "B63", 1);
        assert!(matches!(
            PublicKey::from_base58(&raw),
            Err(KeyError::BadPrefix { .. })
        ));
    }

    #[test]
    fn test_public_key_rejects_bad_length() {
        assert!(matches!(
            PublicKey::from_base58("B62qshort"),
            Err(KeyError::BadLength { actual: 9, .. })
        ));
    }

    #[test]
    fn test_public_key_rejects_non_base58() {
        let mut raw = sample_public_key();
        raw.replace_range(10..11, "0");
        assert!(matches!(
            PublicKey::from_base58(&raw),
            Err(KeyError::BadCharacter { character: '0', .. })
        ));
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let key = PrivateKey::from_base58(&sample_private_key()).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains(key.to_base58()));
        assert!(debug.starts_with("PrivateKey(EKE"));
    }

    #[test]
    fn test_key_serde_validates() {
        let json = format!("\"{}\"", sample_public_key());
        let key: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), json);

        let bad: Result<PublicKey, _> = serde_json::from_str("\"not-a-key\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_generated_keys_parse() {
        let private = PrivateKey::from_entropy(&[9, 200, 31, 77]);
        assert!(PrivateKey::from_base58(private.to_base58()).is_ok());

        let public = PublicKey::from_digest(&[1, 2, 3]);
        assert!(PublicKey::from_base58(public.to_base58()).is_ok());
    }

    #[test]
    fn test_base58_digits_only_alphabet() {
        let digits = base58_digits(&[0, 57, 58, 255], 20);
        assert_eq!(digits.len(), 20);
        assert!(digits.bytes().all(|b| BASE58_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_network_parse_is_case_insensitive() {
        assert_eq!("devnet".parse::<Network>().unwrap(), Network::Devnet);
        assert_eq!("Mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("Testnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_network_endpoints() {
        assert_eq!(Network::Devnet.graphql_url(), DEVNET_GRAPHQL_URL);
        assert_eq!(Network::Mainnet.slug(), "mainnet");
        assert_eq!(Network::default(), Network::Devnet);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("99").unwrap(), 99);
        assert_eq!(parse_amount(" 1000 ").unwrap(), 1000);
        assert_eq!(parse_amount(""), Err(AmountError::Empty));
        assert!(matches!(parse_amount("-1"), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_amount("1.5"), Err(AmountError::Invalid(_))));
    }

    #[test]
    fn test_token_record_wire_format() {
        let record = TokenRecord {
            id: "1".into(),
            address: "B62qtoken".into(),
            admin_public_key: Some("B62qadmin".into()),
            admin_private_key: None,
            status: TokenStatus::Launched,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["adminPublicKey"], "B62qadmin");
        assert!(json.get("adminPrivateKey").is_none());
        assert_eq!(json["status"], "Launched");
    }

    #[test]
    fn test_launched_record_has_unique_id() {
        let a = TokenRecord::launched("B62qa", None, None);
        let b = TokenRecord::launched("B62qa", None, None);
        assert_ne!(a.id, b.id);
        assert_eq!(a.status, TokenStatus::Launched);
    }
}
