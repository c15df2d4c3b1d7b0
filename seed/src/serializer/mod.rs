//! Serialization of generated tables.
//!
//! Fixed-point integers routinely exceed 2^53, so every integer leaves the
//! crate as a base-10 string.

pub mod json;

/// Serde adapter for a [`num_bigint::BigUint`] stored as a base-10 string.
pub mod decimal_string {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Writes the integer as a base-10 string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    /// Reads a base-10 string.
    ///
    /// # Errors
    ///
    /// Fails on anything but ASCII digits.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigUint::parse_bytes(text.as_bytes(), 10)
            .ok_or_else(|| de::Error::custom(format!("`{text}` is not a base-10 integer")))
    }
}

/// Serde adapter for an optional [`num_bigint::BigUint`]; `None` is `null`.
pub mod optional_decimal_string {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Writes the integer as a base-10 string, or `null`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<BigUint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.collect_str(value),
            None => serializer.serialize_none(),
        }
    }

    /// Reads a base-10 string or `null`.
    ///
    /// # Errors
    ///
    /// Fails on a string that is not a base-10 integer.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BigUint>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| {
                BigUint::parse_bytes(text.as_bytes(), 10)
                    .ok_or_else(|| de::Error::custom(format!("`{text}` is not a base-10 integer")))
            })
            .transpose()
    }
}
