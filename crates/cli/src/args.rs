//! Command-line parsing into a [`CompressorConfig`].

use std::ffi::OsString;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, builder::OsStringValueParser, value_parser};
use compress::CompressionLevel;
use pipeline::{JobConfig, KeyMap};

/// Name used in diagnostics and the help banner.
pub const PROGRAM_NAME: &str = "compressor";

/// Output directory used when `--output-dir` is absent.
pub const DEFAULT_OUTPUT_DIR: &str = "out";

/// Deterministic help text describing the supported options.
pub(crate) const HELP_TEXT: &str = concat!(
    "compressor ",
    env!("CARGO_PKG_VERSION"),
    "\n",
    "Compress one file to <OUTPUT-DIR>/<name>.gz, with pause, resume and abort.\n",
    "\n",
    "Usage: compressor [OPTIONS] INPUT\n",
    "\n",
    "While running, press the pause key to pause, the resume key to resume,\n",
    "and Ctrl+C to abort. An aborted or failed run leaves no output behind.\n",
    "\n",
    "Options:\n",
    "  -o, --output-dir=DIR   Write the compressed file into DIR (default: out).\n",
    "      --chunk-size=BYTES Read the input BYTES at a time (default: 65536).\n",
    "      --level=N          Compression level 1-9 (default: 9).\n",
    "      --pause-key=CHAR   Key that pauses compression (default: p).\n",
    "      --resume-key=CHAR  Key that resumes compression (default: r).\n",
    "      --no-progress      Do not draw the progress bar.\n",
    "  -v, --verbose          Increase diagnostic output (repeatable).\n",
    "  -h, --help             Show this help message and exit.\n",
    "  -V, --version          Output version information and exit.\n",
    "\n",
    "Set COMPRESSOR_LOG to a tracing filter (e.g. compressor::cleanup=debug)\n",
    "to narrow diagnostics further.\n",
);

fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("help")
                .long("help")
                .short('h')
                .help("Show this help message and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .short('V')
                .help("Output version information and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .short('o')
                .value_name("DIR")
                .help("Write the compressed file into DIR.")
                .num_args(1)
                .action(ArgAction::Set)
                .value_parser(OsStringValueParser::new()),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .value_name("BYTES")
                .help("Read the input BYTES at a time.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("level")
                .long("level")
                .value_name("N")
                .help("Compression level 1-9.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(u32).range(1..=9)),
        )
        .arg(
            Arg::new("pause-key")
                .long("pause-key")
                .value_name("CHAR")
                .help("Key that pauses compression.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(char)),
        )
        .arg(
            Arg::new("resume-key")
                .long("resume-key")
                .value_name("CHAR")
                .help("Key that resumes compression.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(char)),
        )
        .arg(
            Arg::new("no-progress")
                .long("no-progress")
                .help("Do not draw the progress bar.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase diagnostic output.")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .num_args(0..=1)
                .value_parser(OsStringValueParser::new()),
        )
}

/// Raw result of parsing the command line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedArgs {
    /// `--help` was given.
    pub show_help: bool,
    /// `--version` was given.
    pub show_version: bool,
    /// The INPUT operand.
    pub input: Option<OsString>,
    /// `--output-dir`.
    pub output_dir: Option<OsString>,
    /// `--chunk-size`.
    pub chunk_size: Option<u64>,
    /// `--level`.
    pub level: Option<u32>,
    /// `--pause-key`.
    pub pause_key: Option<char>,
    /// `--resume-key`.
    pub resume_key: Option<char>,
    /// `--no-progress`.
    pub no_progress: bool,
    /// Number of `-v` options.
    pub verbose: u8,
}

/// Parses command-line arguments into a [`ParsedArgs`] structure.
pub fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }

    let mut matches = clap_command().try_get_matches_from(args)?;

    Ok(ParsedArgs {
        show_help: matches.get_flag("help"),
        show_version: matches.get_flag("version"),
        input: matches.remove_one::<OsString>("input"),
        output_dir: matches.remove_one::<OsString>("output-dir"),
        chunk_size: matches.remove_one::<u64>("chunk-size"),
        level: matches.remove_one::<u32>("level"),
        pause_key: matches.remove_one::<char>("pause-key"),
        resume_key: matches.remove_one::<char>("resume-key"),
        no_progress: matches.get_flag("no-progress"),
        verbose: matches.get_count("verbose"),
    })
}

/// Resolved configuration for one run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompressorConfig {
    /// File to compress.
    pub input: PathBuf,
    /// Directory receiving `<input name>.gz`.
    pub output_dir: PathBuf,
    /// What the pipeline receives.
    pub job: JobConfig,
    /// Pause and resume keys.
    pub keys: KeyMap,
    /// Whether to draw a progress bar when stderr is a terminal.
    pub progress: bool,
    /// Number of `-v` options.
    pub verbosity: u8,
}

/// Why parsed arguments do not form a usable configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// No INPUT operand was given.
    MissingInput,
    /// The pause and resume keys are the same.
    SameKeys(char),
    /// The chunk size does not fit in memory on this platform.
    ChunkTooLarge(u64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput => f.write_str("missing INPUT operand (see --help)"),
            Self::SameKeys(key) => {
                write!(f, "--pause-key and --resume-key must differ (both are '{key}')")
            }
            Self::ChunkTooLarge(size) => write!(f, "--chunk-size {size} is too large"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ParsedArgs {
    /// Applies defaults and cross-option checks.
    pub fn into_config(self) -> Result<CompressorConfig, ConfigError> {
        let input = self.input.map(PathBuf::from).ok_or(ConfigError::MissingInput)?;
        let defaults = KeyMap::default();
        let keys = KeyMap::new(
            self.pause_key.unwrap_or(defaults.pause_key()),
            self.resume_key.unwrap_or(defaults.resume_key()),
        );
        if keys.pause_key() == keys.resume_key() {
            return Err(ConfigError::SameKeys(keys.pause_key()));
        }

        let mut job = JobConfig::default();
        if let Some(size) = self.chunk_size {
            job.chunk_size = usize::try_from(size)
                .ok()
                .and_then(NonZeroUsize::new)
                .ok_or(ConfigError::ChunkTooLarge(size))?;
        }
        if let Some(level) = self.level {
            // clap already restricted the range to 1..=9.
            job.level = CompressionLevel::from_numeric(level).unwrap_or_default();
        }

        Ok(CompressorConfig {
            input,
            output_dir: self
                .output_dir
                .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR), PathBuf::from),
            job,
            keys,
            progress: !self.no_progress,
            verbosity: self.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ParsedArgs {
        parse_args(std::iter::once(PROGRAM_NAME).chain(args.iter().copied())).expect("parse")
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = parse(&["movie.avi"]).into_config().unwrap();
        assert_eq!(config.input, PathBuf::from("movie.avi"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.job.chunk_size.get(), 65_536);
        assert_eq!(config.job.level, CompressionLevel::Best);
        assert_eq!(config.keys, KeyMap::default());
        assert!(config.progress);
        assert_eq!(config.verbosity, 0);
    }

    #[test]
    fn options_are_applied() {
        let config = parse(&[
            "-o",
            "dest",
            "--chunk-size=4096",
            "--level",
            "1",
            "--pause-key=s",
            "--resume-key=g",
            "--no-progress",
            "-vv",
            "in.bin",
        ])
        .into_config()
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("dest"));
        assert_eq!(config.job.chunk_size.get(), 4096);
        assert_eq!(config.job.level.as_u32(), 1);
        assert_eq!(config.keys, KeyMap::new('s', 'g'));
        assert!(!config.progress);
        assert_eq!(config.verbosity, 2);
    }

    #[test]
    fn help_and_version_flags() {
        let parsed = parse(&["-h"]);
        assert!(parsed.show_help);
        let parsed = parse(&["--version"]);
        assert!(parsed.show_version);
        assert_eq!(parsed.input, None);
    }

    #[test]
    fn missing_input_is_a_config_error() {
        assert_eq!(parse(&[]).into_config(), Err(ConfigError::MissingInput));
    }

    #[test]
    fn identical_keys_are_rejected() {
        let err = parse(&["--pause-key=x", "--resume-key=x", "f"])
            .into_config()
            .unwrap_err();
        assert_eq!(err, ConfigError::SameKeys('x'));
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn out_of_range_values_fail_to_parse() {
        fn args(extra: &str) -> [&str; 3] {
            [PROGRAM_NAME, extra, "f"]
        }
        assert!(parse_args(args("--level=0")).is_err());
        assert!(parse_args(args("--level=10")).is_err());
        assert!(parse_args(args("--chunk-size=0")).is_err());
        assert!(parse_args(args("--pause-key=ab")).is_err());
        assert!(parse_args(args("--unknown")).is_err());
    }

    #[test]
    fn empty_argument_list_is_tolerated() {
        let parsed = parse_args(Vec::<OsString>::new()).unwrap();
        assert_eq!(parsed, ParsedArgs::default());
    }

    #[test]
    fn help_text_lists_every_option() {
        for option in [
            "--output-dir",
            "--chunk-size",
            "--level",
            "--pause-key",
            "--resume-key",
            "--no-progress",
            "--verbose",
            "--help",
            "--version",
        ] {
            assert!(HELP_TEXT.contains(option), "{option}");
        }
    }
}
