//! EVM chain identifiers for claim links.
//!
//! Claim links only ever live on EIP-155 networks, so a chain is identified by its
//! numeric chain id alone. The id appears in three places on the wire:
//!
//! - the `c` parameter of a claim URL, as a decimal string;
//! - escrow API request and response bodies, as a JSON number;
//! - the `chainId` field of every EIP-712 domain the SDK builds.
//!
//! # Examples
//!
//! ```
//! use linkdrop_types::chain::ChainId;
//!
//! let base: ChainId = "8453".parse().unwrap();
//! assert_eq!(base.inner(), 8453);
//! assert_eq!(base.network_name(), Some("base"));
//! assert!(base.is_supported());
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

use crate::networks;

/// A numeric EIP-155 chain id.
///
/// # Serialization
///
/// Serializes to a JSON number. Deserializes from a number or a decimal string,
/// since the escrow API is not consistent about which one it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(u64);

impl ChainId {
    pub const fn new(chain_id: u64) -> Self {
        Self(chain_id)
    }

    pub const fn inner(&self) -> u64 {
        self.0
    }

    /// Creates a chain ID from the network name used by the escrow API, e.g. `base`.
    ///
    /// ```
    /// use linkdrop_types::chain::ChainId;
    ///
    /// assert_eq!(ChainId::from_network_name("polygon"), Some(ChainId::new(137)));
    /// assert!(ChainId::from_network_name("unknown").is_none());
    /// ```
    pub fn from_network_name(network_name: &str) -> Option<Self> {
        networks::chain_id_by_network_name(network_name)
    }

    /// Returns the escrow API path segment for this chain, if the chain is known.
    pub fn network_name(&self) -> Option<&'static str> {
        networks::network_name_by_chain_id(*self)
    }

    /// Whether Linkdrop escrow contracts and API hosts exist for this chain.
    pub fn is_supported(&self) -> bool {
        self.network_name().is_some()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ChainId> for u64 {
    fn from(value: ChainId) -> Self {
        value.0
    }
}

/// Error returned when parsing a chain id that is not a decimal integer.
#[derive(Debug, thiserror::Error)]
#[error("Invalid chain id format {0}")]
pub struct ChainIdFormatError(String);

impl FromStr for ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ChainIdFormatError(s.into()));
        }
        s.parse::<u64>()
            .map(ChainId)
            .map_err(|_| ChainIdFormatError(s.into()))
    }
}

impl Serialize for ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ChainIdVisitor;

        impl de::Visitor<'_> for ChainIdVisitor {
            type Value = ChainId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a chain id as a number or a decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(ChainId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(ChainId)
                    .map_err(|_| E::custom(ChainIdFormatError(v.to_string())))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                if v.fract() == 0.0 && v >= 0.0 && v <= u64::MAX as f64 {
                    Ok(ChainId(v as u64))
                } else {
                    Err(E::custom(ChainIdFormatError(v.to_string())))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                ChainId::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ChainIdVisitor)
    }
}
