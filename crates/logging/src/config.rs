//! Verbosity configuration derived from the `-v` count.

use super::levels::{FlagLevels, LogFlag};

/// Per-flag verbosity for one process.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct VerbosityConfig {
    /// Flag levels.
    pub flags: FlagLevels,
}

impl VerbosityConfig {
    /// Create a configuration from a verbose level (`-v` count).
    ///
    /// Level 0 keeps only warnings and errors. Level 1 enables info events,
    /// level 2 adds debug events for everything but per-sample progress,
    /// and level 3 and above enables trace output.
    #[must_use]
    pub const fn from_verbose_level(level: u8) -> Self {
        let mut config = Self {
            flags: FlagLevels {
                pipeline: 0,
                control: 0,
                cleanup: 0,
                progress: 0,
                codec: 0,
            },
        };
        match level {
            0 => {}
            1 => config.flags.set_all(1),
            2 => {
                config.flags.set_all(2);
                config.flags.progress = 1;
            }
            _ => config.flags.set_all(3),
        }
        config
    }

    /// Returns `true` when events of `flag` at `level` should be written.
    #[must_use]
    pub const fn enabled(&self, flag: LogFlag, level: u8) -> bool {
        self.flags.get(flag) >= level
    }

    /// Overrides the level of a single flag, leaving the others as they are.
    #[must_use]
    pub const fn with_flag(mut self, flag: LogFlag, level: u8) -> Self {
        self.flags.set(flag, level);
        self
    }
}
