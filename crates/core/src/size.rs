//! Filesystem size units
//!
//! Sizes are submitted as a base value plus a unit exponent in `0..=5`
//! (bytes through petabytes). The stored byte count is `value * 1024^exponent`.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Binary size unit, identified by its power-of-1024 exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SizeUnit {
    /// 1024^0
    Bytes,
    /// 1024^1
    Kilobytes,
    /// 1024^2
    Megabytes,
    /// 1024^3
    Gigabytes,
    /// 1024^4
    Terabytes,
    /// 1024^5
    Petabytes,
}

impl SizeUnit {
    /// All units in exponent order
    pub const ALL: [SizeUnit; 6] = [
        SizeUnit::Bytes,
        SizeUnit::Kilobytes,
        SizeUnit::Megabytes,
        SizeUnit::Gigabytes,
        SizeUnit::Terabytes,
        SizeUnit::Petabytes,
    ];

    /// Look up a unit by exponent
    pub fn from_exponent(exponent: u32) -> ConfigResult<Self> {
        Self::ALL
            .get(exponent as usize)
            .copied()
            .ok_or_else(|| ConfigError::InvalidSize(format!("unit exponent {} not in 0..=5", exponent)))
    }

    /// Power-of-1024 exponent for this unit
    pub fn exponent(&self) -> u32 {
        *self as u32
    }

    /// Number of bytes in one of this unit
    pub fn multiplier(&self) -> u64 {
        1024u64.pow(self.exponent())
    }

    /// Short label used by the web form
    pub fn label(&self) -> &'static str {
        match self {
            SizeUnit::Bytes => "B",
            SizeUnit::Kilobytes => "KiB",
            SizeUnit::Megabytes => "MiB",
            SizeUnit::Gigabytes => "GiB",
            SizeUnit::Terabytes => "TiB",
            SizeUnit::Petabytes => "PiB",
        }
    }

    /// Convert `value` of this unit to bytes, failing on overflow
    pub fn to_bytes(&self, value: u64) -> ConfigResult<u64> {
        value.checked_mul(self.multiplier()).ok_or_else(|| {
            ConfigError::InvalidSize(format!("{} {} overflows a byte count", value, self.label()))
        })
    }
}

impl std::fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Convert a `(value, exponent)` pair as submitted by a user into bytes.
pub fn size_in_bytes(value: u64, exponent: u32) -> ConfigResult<u64> {
    SizeUnit::from_exponent(exponent)?.to_bytes(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_conversions() {
        assert_eq!(size_in_bytes(512, 0).unwrap(), 512);
        assert_eq!(size_in_bytes(1, 1).unwrap(), 1024);
        assert_eq!(size_in_bytes(1, 2).unwrap(), 1024 * 1024);
        assert_eq!(size_in_bytes(2, 2).unwrap(), 2 * 1024 * 1024);
        assert_eq!(size_in_bytes(3, 3).unwrap(), 3 * 1024 * 1024 * 1024);
        assert_eq!(size_in_bytes(1, 5).unwrap(), 1u64 << 50);
    }

    #[test]
    fn test_exponent_out_of_range() {
        assert!(matches!(
            size_in_bytes(1, 6),
            Err(ConfigError::InvalidSize(_))
        ));
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(size_in_bytes(u64::MAX, 1).is_err());
        assert!(size_in_bytes(1 << 20, 5).is_err());
    }

    #[test]
    fn test_exponent_roundtrip() {
        for unit in SizeUnit::ALL {
            assert_eq!(SizeUnit::from_exponent(unit.exponent()).unwrap(), unit);
        }
    }

    proptest! {
        #[test]
        fn prop_size_is_value_times_power(value in 0u64..(1 << 13), exponent in 0u32..=5) {
            let bytes = size_in_bytes(value, exponent).unwrap();
            prop_assert_eq!(bytes, value * 1024u64.pow(exponent));
        }
    }
}
