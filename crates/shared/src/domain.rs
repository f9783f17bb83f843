use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexIdError {
    #[error("{kind} is empty")]
    Empty { kind: &'static str },
    #[error("{kind} must start with 0x: {value}")]
    MissingPrefix { kind: &'static str, value: String },
    #[error("{kind} must have {expected} hex digits, got {actual}: {value}")]
    InvalidLength {
        kind: &'static str,
        value: String,
        expected: usize,
        actual: usize,
    },
    #[error("{kind} contains non-hex characters: {value}")]
    InvalidCharacters { kind: &'static str, value: String },
}

fn parse_prefixed_hex(
    kind: &'static str,
    raw: &str,
    expected: usize,
) -> Result<String, HexIdError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(HexIdError::Empty { kind });
    }
    let Some(digits) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) else {
        return Err(HexIdError::MissingPrefix {
            kind,
            value: raw.to_string(),
        });
    };
    if digits.len() != expected {
        return Err(HexIdError::InvalidLength {
            kind,
            value: raw.to_string(),
            expected,
            actual: digits.len(),
        });
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(HexIdError::InvalidCharacters {
            kind,
            value: raw.to_string(),
        });
    }
    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

macro_rules! hex_newtype {
    ($name:ident, $kind:literal, $digits:expr) => {
        /// Lowercased, `0x`-prefixed hex identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub const HEX_DIGITS: usize = $digits;

            pub fn parse(raw: &str) -> Result<Self, HexIdError> {
                parse_prefixed_hex($kind, raw, $digits).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Hex digits without the `0x` prefix.
            pub fn digits(&self) -> &str {
                &self.0[2..]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = HexIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = HexIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

hex_newtype!(AccountAddress, "address", 40);
hex_newtype!(TxHash, "transaction hash", 64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkRole {
    Sidechain,
    Rootchain,
}

impl NetworkRole {
    /// Key of this network inside the published network document.
    pub fn document_key(self) -> &'static str {
        match self {
            NetworkRole::Sidechain => "Matic",
            NetworkRole::Rootchain => "Main",
        }
    }
}

impl fmt::Display for NetworkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkRole::Sidechain => f.write_str("sidechain"),
            NetworkRole::Rootchain => f.write_str("rootchain"),
        }
    }
}
