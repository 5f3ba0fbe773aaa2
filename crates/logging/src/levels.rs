//! Diagnostic categories and their verbosity levels.

use std::fmt;

/// Diagnostic categories, one per `compressor::*` tracing target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LogFlag {
    /// Job lifecycle and chunk flow.
    Pipeline,
    /// Pause, resume and abort handling.
    Control,
    /// Removal of partial output.
    Cleanup,
    /// Progress sampling and reporting.
    Progress,
    /// Compression internals.
    Codec,
}

impl LogFlag {
    /// Every flag, in display order.
    pub const ALL: [Self; 5] = [
        Self::Pipeline,
        Self::Control,
        Self::Cleanup,
        Self::Progress,
        Self::Codec,
    ];

    /// Lowercase flag name, matching the last segment of its target.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pipeline => "pipeline",
            Self::Control => "control",
            Self::Cleanup => "cleanup",
            Self::Progress => "progress",
            Self::Codec => "codec",
        }
    }

    /// Maps a tracing target such as `compressor::cleanup` to its flag.
    #[must_use]
    pub fn from_target(target: &str) -> Option<Self> {
        let (prefix, leaf) = target.rsplit_once("::")?;
        if prefix != "compressor" {
            return None;
        }
        Self::ALL.into_iter().find(|flag| flag.name() == leaf)
    }
}

impl fmt::Display for LogFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Verbosity level for each flag. `0` silences the flag below warnings.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct FlagLevels {
    /// Job lifecycle level.
    pub pipeline: u8,
    /// Command handling level.
    pub control: u8,
    /// Cleanup level.
    pub cleanup: u8,
    /// Progress level.
    pub progress: u8,
    /// Codec level.
    pub codec: u8,
}

impl FlagLevels {
    /// Get the level for a specific flag.
    #[must_use]
    pub const fn get(&self, flag: LogFlag) -> u8 {
        match flag {
            LogFlag::Pipeline => self.pipeline,
            LogFlag::Control => self.control,
            LogFlag::Cleanup => self.cleanup,
            LogFlag::Progress => self.progress,
            LogFlag::Codec => self.codec,
        }
    }

    /// Set the level for a specific flag.
    pub const fn set(&mut self, flag: LogFlag, level: u8) {
        match flag {
            LogFlag::Pipeline => self.pipeline = level,
            LogFlag::Control => self.control = level,
            LogFlag::Cleanup => self.cleanup = level,
            LogFlag::Progress => self.progress = level,
            LogFlag::Codec => self.codec = level,
        }
    }

    /// Set all flags to the specified level.
    pub const fn set_all(&mut self, level: u8) {
        self.pipeline = level;
        self.control = level;
        self.cleanup = level;
        self.progress = level;
        self.codec = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_map_to_flags() {
        assert_eq!(LogFlag::from_target("compressor::pipeline"), Some(LogFlag::Pipeline));
        assert_eq!(LogFlag::from_target("compressor::cleanup"), Some(LogFlag::Cleanup));
        assert_eq!(LogFlag::from_target("compressor::codec"), Some(LogFlag::Codec));
        assert_eq!(LogFlag::from_target("compressor::unknown"), None);
        assert_eq!(LogFlag::from_target("other::pipeline"), None);
        assert_eq!(LogFlag::from_target("pipeline"), None);
    }

    #[test]
    fn get_reflects_set() {
        let mut levels = FlagLevels::default();
        for flag in LogFlag::ALL {
            assert_eq!(levels.get(flag), 0);
        }
        levels.set(LogFlag::Control, 2);
        assert_eq!(levels.get(LogFlag::Control), 2);
        assert_eq!(levels.get(LogFlag::Pipeline), 0);
        levels.set_all(3);
        assert!(LogFlag::ALL.iter().all(|flag| levels.get(*flag) == 3));
    }
}
