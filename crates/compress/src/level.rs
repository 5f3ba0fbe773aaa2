use std::num::NonZeroU8;

use flate2::Compression;
use thiserror::Error;

/// Compression levels recognised by the gzip encoder.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressionLevel {
    /// Favour speed over compression ratio.
    Fast,
    /// Use zlib's default balance between speed and ratio.
    Default,
    /// Favour the best possible compression ratio.
    #[default]
    Best,
    /// Use an explicit zlib compression level in the range `1..=9`.
    Precise(NonZeroU8),
}

impl CompressionLevel {
    /// Creates a [`CompressionLevel::Precise`] value from an explicit numeric level.
    ///
    /// The supplied `level` must fall within the inclusive range `1..=9`.
    pub fn from_numeric(level: u32) -> Result<Self, CompressionLevelError> {
        u8::try_from(level)
            .ok()
            .filter(|value| (1..=9).contains(value))
            .and_then(NonZeroU8::new)
            .map(Self::Precise)
            .ok_or(CompressionLevelError { level })
    }

    /// Returns the numeric zlib level this variant resolves to.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        Compression::from(self).level()
    }
}

impl From<CompressionLevel> for Compression {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::Fast => Self::fast(),
            CompressionLevel::Default => Self::default(),
            CompressionLevel::Best => Self::best(),
            CompressionLevel::Precise(value) => Self::new(u32::from(value.get())),
        }
    }
}

/// Error returned when a requested compression level falls outside the
/// permissible zlib range.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("compression level {level} is outside the supported range 1-9")]
pub struct CompressionLevelError {
    level: u32,
}

impl CompressionLevelError {
    /// Returns the invalid compression level that triggered the error.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_best_ratio() {
        assert_eq!(CompressionLevel::default(), CompressionLevel::Best);
        assert_eq!(CompressionLevel::default().as_u32(), 9);
    }

    #[test]
    fn numeric_level_constructor_accepts_valid_range() {
        for level in 1..=9 {
            let precise = CompressionLevel::from_numeric(level).expect("valid level");
            assert_eq!(precise.as_u32(), level);
        }
    }

    #[test]
    fn numeric_level_constructor_rejects_out_of_range() {
        let err = CompressionLevel::from_numeric(10).expect_err("level above 9 rejected");
        assert_eq!(err.level(), 10);
        let err = CompressionLevel::from_numeric(0).expect_err("zero rejected");
        assert_eq!(err.level(), 0);
        assert!(CompressionLevel::from_numeric(u32::MAX).is_err());
    }

    #[test]
    fn error_message_names_the_range() {
        let err = CompressionLevel::from_numeric(12).unwrap_err();
        assert_eq!(
            err.to_string(),
            "compression level 12 is outside the supported range 1-9"
        );
    }
}
