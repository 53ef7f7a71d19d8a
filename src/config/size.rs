//! Byte size parsing for configuration fields

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SizeParseError {
    #[error("invalid size literal: {0:?}")]
    InvalidLiteral(String),

    #[error("unknown size unit: {0:?}")]
    UnknownUnit(String),
}

/// Byte count accepted either as a plain integer or as a literal with a
/// unit suffix, e.g. `"10MB"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = SizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits_end = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let (digits, unit) = s.split_at(digits_end);

        let value: u64 = digits
            .parse()
            .map_err(|_| SizeParseError::InvalidLiteral(s.to_string()))?;

        let factor = match unit.trim().to_ascii_uppercase().as_str() {
            "" | "B" => 1,
            "K" | "KB" => 1 << 10,
            "M" | "MB" => 1 << 20,
            "G" | "GB" => 1 << 30,
            other => return Err(SizeParseError::UnknownUnit(other.to_string())),
        };

        Ok(ByteSize(value * factor))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(u64, &str); 3] = [(1 << 30, "GB"), (1 << 20, "MB"), (1 << 10, "KB")];

        for (factor, unit) in UNITS {
            if self.0 >= factor && self.0 % factor == 0 {
                return write!(f, "{}{}", self.0 / factor, unit);
            }
        }
        write!(f, "{}B", self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct SizeVisitor;

        impl serde::de::Visitor<'_> for SizeVisitor {
            type Value = ByteSize;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a byte count or a size literal like \"10MB\"")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ByteSize(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom("byte size must not be negative"))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SizeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_bytes() {
        assert_eq!("4096".parse::<ByteSize>().unwrap().as_u64(), 4096);
        assert_eq!("0".parse::<ByteSize>().unwrap().as_u64(), 0);
    }

    #[test]
    fn parses_unit_suffixes() {
        assert_eq!("1KB".parse::<ByteSize>().unwrap().as_u64(), 1024);
        assert_eq!("10MB".parse::<ByteSize>().unwrap().as_u64(), 10 * 1024 * 1024);
        assert_eq!("2G".parse::<ByteSize>().unwrap().as_u64(), 2 * 1024 * 1024 * 1024);
        assert_eq!(" 5 MB ".parse::<ByteSize>().unwrap().as_u64(), 5 * 1024 * 1024);
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<ByteSize>().is_err());
        assert!("MB".parse::<ByteSize>().is_err());
        assert!("10XB".parse::<ByteSize>().is_err());
    }

    #[test]
    fn displays_largest_exact_unit() {
        assert_eq!(ByteSize(10 * 1024 * 1024).to_string(), "10MB");
        assert_eq!(ByteSize(1536).to_string(), "1536B");
    }

    #[test]
    fn deserializes_from_integer_and_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            size: ByteSize,
        }

        let from_int: Wrapper = serde_json::from_str(r#"{"size": 2048}"#).unwrap();
        assert_eq!(from_int.size.as_u64(), 2048);

        let from_str: Wrapper = serde_json::from_str(r#"{"size": "10MB"}"#).unwrap();
        assert_eq!(from_str.size.as_u64(), 10 * 1024 * 1024);
    }
}
