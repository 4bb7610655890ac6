use num_bigint::BigInt;
use num_traits::{One, Signed};

/// Returns `true` iff `value` is a positive power of two (including `1`).
pub fn is_power_of_two(value: &BigInt) -> bool {
    value.is_positive() && (value & &(value - BigInt::one())).bits() == 0
}

/// Serializes big integers as decimal strings, so that parameter files stay
/// readable (`"8000000000000"` instead of a sign and a digit vector).
pub mod decimal {
    use std::str::FromStr;

    use num_bigint::BigInt;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigInt, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = String::deserialize(deserializer)?;
        BigInt::from_str(repr.trim()).map_err(de::Error::custom)
    }
}
