//! Serde adapter for integers the escrow API exchanges as decimal strings.
//!
//! Amounts, token ids and expirations travel as `"1000000"` rather than JSON numbers
//! (which lose precision above 2^53) or `0x`-hex (alloy's default for `U256`).
//! Deserialization also accepts plain JSON integers.
//!
//! ```
//! use alloy_primitives::U256;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Fee {
//!     #[serde(with = "linkdrop_types::decimal")]
//!     amount: U256,
//! }
//!
//! let fee: Fee = serde_json::from_str(r#"{"amount":"1000000000000000000000"}"#).unwrap();
//! assert_eq!(serde_json::to_string(&fee).unwrap(), r#"{"amount":"1000000000000000000000"}"#);
//! ```

use serde::{Deserializer, Serializer, de};
use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::str::FromStr;

pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FromStr,
    T::Err: Display,
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(DecimalVisitor(PhantomData))
}

struct DecimalVisitor<T>(PhantomData<T>);

impl<T> de::Visitor<'_> for DecimalVisitor<T>
where
    T: FromStr,
    T::Err: Display,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal integer string or a non-negative integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        let v = v.trim();
        if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
            return Err(E::custom(format!("invalid decimal integer {v:?}")));
        }
        T::from_str(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
        T::from_str(&v.to_string()).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
        if v < 0 {
            return Err(E::custom(format!("negative integer {v}")));
        }
        T::from_str(&v.to_string()).map_err(E::custom)
    }
}

/// Same as the parent module for `Option<T>`; `null` and a missing field map to `None`.
pub mod option {
    use super::*;
    use serde::Deserialize;
    use serde::de::Visitor;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(value) => serializer.collect_str(value),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Text(text)) if text.is_empty() => Ok(None),
            Some(Raw::Text(text)) => DecimalVisitor::<T>(PhantomData)
                .visit_str::<D::Error>(&text)
                .map(Some),
            Some(Raw::Number(number)) => T::from_str(&number.to_string())
                .map(Some)
                .map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Amounts {
        #[serde(with = "crate::decimal")]
        amount: U256,
        #[serde(default, with = "crate::decimal::option", skip_serializing_if = "Option::is_none")]
        token_id: Option<U256>,
    }

    #[test]
    fn test_decimal_rejects_hex() {
        let result = serde_json::from_str::<Amounts>(r#"{"amount":"0x10"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decimal_accepts_number() {
        let parsed: Amounts = serde_json::from_str(r#"{"amount":42}"#).unwrap();
        assert_eq!(parsed.amount, U256::from(42));
        assert_eq!(parsed.token_id, None);
    }

    #[test]
    fn test_decimal_option_round_trip() {
        let value = Amounts {
            amount: U256::from(7),
            token_id: Some(U256::from(12345)),
        };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"amount":"7","token_id":"12345"}"#);
        assert_eq!(serde_json::from_str::<Amounts>(&json).unwrap(), value);
    }
}
