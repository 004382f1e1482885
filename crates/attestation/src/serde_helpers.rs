//! Numbers that arrive either as JSON numbers or as decimal / `0x` hex strings.

use alloy_primitives::U256;
use serde::{de::Error as _, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

fn parse_u256<E: serde::de::Error>(text: &str) -> Result<U256, E> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(text, 10),
    };
    parsed.map_err(|e| E::custom(format!("invalid number {:?}: {}", text, e)))
}

fn deserialize_u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(U256::from(n)),
        NumberOrString::String(s) => parse_u256(&s),
    }
}

fn deserialize_narrow<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<U256>,
{
    let value = deserialize_u256(deserializer)?;
    T::try_from(value).map_err(|_| D::Error::custom(format!("number {} out of range", value)))
}

pub(crate) mod u256 {
    use super::*;
    use serde::Serializer;

    pub(crate) fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserialize_u256(deserializer)
    }
}

pub(crate) mod u64_flexible {
    use super::*;
    use serde::Serializer;

    pub(crate) fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(*value)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserialize_narrow(deserializer)
    }
}

pub(crate) mod u32_flexible {
    use super::*;
    use serde::Serializer;

    pub(crate) fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(*value)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        deserialize_narrow(deserializer)
    }
}

pub(crate) mod u8_flexible {
    use super::*;
    use serde::Serializer;

    pub(crate) fn serialize<S: Serializer>(value: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*value)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        deserialize_narrow(deserializer)
    }
}

/// Verifiers expect `requiredConfirmations` as a decimal string.
pub(crate) mod u16_string {
    use super::*;
    use serde::Serializer;

    pub(crate) fn serialize<S: Serializer>(value: &u16, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        deserialize_narrow(deserializer)
    }
}
