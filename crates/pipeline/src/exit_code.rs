//! Process exit codes.
//!
//! The numbering follows the rsync convention so scripts that already
//! distinguish "bad arguments" from "file selection" from "I/O failure" keep
//! working: `0` success, `1` usage, `3` input/output selection, `11` file I/O.
//! A user abort exits with `0`; only a failure to remove the partial output
//! turns it into a non-zero status.

use std::fmt;

/// Exit codes returned by the compressor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    /// The job completed, or the user aborted it and cleanup succeeded.
    Ok = 0,

    /// Syntax or usage error.
    ///
    /// Returned when command-line arguments are invalid.
    Syntax = 1,

    /// Errors selecting input/output files or directories.
    ///
    /// Returned when the input is unreadable or the output directory is
    /// unwritable, before any pipeline exists.
    FileSelect = 3,

    /// Error in file I/O.
    ///
    /// Returned when a stage failed while streaming.
    FileIo = 11,

    /// The partial output artifact could not be removed.
    Cleanup = 12,
}

impl ExitCode {
    /// Returns the numeric process status.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns `true` for the zero status.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Short human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "success",
            Self::Syntax => "syntax or usage error",
            Self::FileSelect => "errors selecting input/output files, dirs",
            Self::FileIo => "error in file IO",
            Self::Cleanup => "partial output could not be removed",
        }
    }

    /// Converts a raw status back into a known code.
    #[must_use]
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Syntax),
            3 => Some(Self::FileSelect),
            11 => Some(Self::FileIo),
            12 => Some(Self::Cleanup),
            _ => None,
        }
    }

    /// Returns the more severe of two codes.
    ///
    /// A cleanup failure outranks a stage failure because it leaves an
    /// artifact behind.
    #[must_use]
    pub const fn escalate(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    const fn severity(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Syntax => 1,
            Self::FileSelect => 2,
            Self::FileIo => 3,
            Self::Cleanup => 4,
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code.as_i32() as u8)
    }
}
