//! # Error Types
//!
//! Parse errors for the shared domain types.

use thiserror::Error;

/// Errors from parsing base58 keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Key does not start with the expected prefix.
    #[error("Invalid {kind} key: expected prefix '{expected}'")]
    BadPrefix { kind: &'static str, expected: &'static str },

    /// Key has the wrong length.
    #[error("Invalid {kind} key: expected {expected} characters, got {actual}")]
    BadLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Key contains a character outside the base58 alphabet.
    #[error("Invalid {kind} key: character '{character}' is not base58")]
    BadCharacter { kind: &'static str, character: char },
}

/// Errors from parsing token amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Amount string is empty.
    #[error("Amount is empty")]
    Empty,

    /// Amount is not an unsigned integer or overflows 64 bits.
    #[error("Invalid amount '{0}': expected an unsigned 64-bit integer")]
    Invalid(String),
}

/// Errors from parsing a network name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Network name is not one of the supported networks.
    #[error("Invalid network: {0}")]
    Unknown(String),
}

/// Errors from parsing a token status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid token status: {0}")]
pub struct StatusError(pub String);
