#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` is the command-line front-end of the compressor. It parses the
//! command line, checks the input and output locations, and then drives one
//! [`pipeline::PipelineController`] job: the input file is gzip-compressed
//! into `<output-dir>/<name>.gz` while the user may pause, resume or abort
//! from the keyboard.
//!
//! # Design
//!
//! [`run`] accepts an iterator of arguments together with handles for
//! standard output and error, so tests can drive the whole front-end
//! in-process. During a job three kinds of threads cooperate:
//!
//! - the calling thread runs the controller loop;
//! - listener threads ([`listener`]) translate key presses and signals into
//!   commands;
//! - a reporter thread renders [`pipeline::ReportEvent`]s through a
//!   [`progress::TerminalReporter`].
//!
//! # Invariants
//!
//! - `run` never panics; failures surface as non-zero exit codes.
//! - The terminal is back in cooked mode before the final status line is
//!   written.
//! - A user abort exits `0`; only a failed cleanup makes it non-zero.
//!
//! # Errors
//!
//! Argument errors exit `1`, unusable input or output locations exit `3`,
//! stage failures exit `11` and a partial output that could not be removed
//! exits `12`. Each is reported on standard error prefixed with the program
//! name.
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let exit_code = cli::run(["compressor", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(exit_code, 0);
//! assert!(String::from_utf8(stdout).unwrap().starts_with("compressor "));
//! assert!(stderr.is_empty());
//! ```

use std::ffi::OsString;
use std::fmt::Display;
use std::io::{self, Write};
use std::thread;

use is_terminal::IsTerminal;
use logging::{VerbosityConfig, init_tracing, init_tracing_with_filter};
use pipeline::{
    CommandSender, ExitCode, JobReport, KeyMap, PipelineController, PipelineJob, PipelineState,
    control_channel, drive_reporter, progress_channel, validate,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod args;
pub mod listener;
pub mod progress;

pub use crate::args::{
    CompressorConfig, ConfigError, DEFAULT_OUTPUT_DIR, PROGRAM_NAME, ParsedArgs, parse_args,
};

use crate::args::HELP_TEXT;
use crate::progress::TerminalReporter;

/// Maximum exit code representable by a Unix process.
const MAX_EXIT_CODE: i32 = u8::MAX as i32;

/// Environment variable holding an optional tracing filter.
pub const LOG_ENV: &str = "COMPRESSOR_LOG";

/// Runs the compressor with the supplied arguments and returns the process
/// exit status.
///
/// `stdout` receives the banner, pause notices and the final status line;
/// it is shared with the reporter thread, hence the `Send` bound.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write + Send,
    Err: Write,
{
    match parse_args(arguments) {
        Ok(parsed) => execute(parsed, stdout, stderr).as_i32(),
        Err(error) => {
            let rendered = error.to_string();
            diagnose(stderr, rendered.trim_end());
            ExitCode::Syntax.as_i32()
        }
    }
}

/// Converts a numeric exit status into a [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(clamped as u8)
}

fn execute<Out, Err>(parsed: ParsedArgs, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    Out: Write + Send,
    Err: Write,
{
    if parsed.show_help {
        return write_or_fail(stdout, HELP_TEXT);
    }
    if parsed.show_version {
        let banner = format!("{PROGRAM_NAME} {}\n", env!("CARGO_PKG_VERSION"));
        return write_or_fail(stdout, &banner);
    }

    let config = match parsed.into_config() {
        Ok(config) => config,
        Err(err) => {
            diagnose(stderr, &err);
            return ExitCode::Syntax;
        }
    };

    install_tracing(config.verbosity);

    if let Err(err) = validate::assert_file_readable(&config.input)
        .and_then(|()| validate::assert_directory_writable(&config.output_dir))
    {
        diagnose(stderr, &err);
        return err.exit_code();
    }

    compress_file(&config, stdout, stderr)
}

fn compress_file<Out, Err>(config: &CompressorConfig, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    Out: Write + Send,
    Err: Write,
{
    let job = match PipelineJob::for_input(&config.input, &config.output_dir) {
        Ok(job) => job,
        Err(err) => {
            diagnose(stderr, &err);
            return err.exit_code();
        }
    };

    let interactive = io::stdin().is_terminal();
    let show_bar = config.progress && io::stderr().is_terminal();

    let (commands, command_rx) = control_channel();
    let (events, event_rx) = progress_channel();
    let controller = PipelineController::new(command_rx, config.job).with_reporter(events);

    let outcome = thread::scope(|scope| {
        let mut reporter = TerminalReporter::new(&mut *stdout, config.keys, show_bar, interactive);
        let reporter_thread = scope.spawn(move || drive_reporter(&mut reporter, &event_rx));

        let mut controller = controller;
        let outcome = drive(&mut controller, job, commands, config.keys, interactive);
        // Closes the progress queue so the reporter thread returns.
        drop(controller);
        if reporter_thread.join().is_err() {
            warn!(target: "compressor::progress", "progress reporter panicked");
        }
        outcome
    });

    match outcome {
        Ok(Some(report)) => conclude(&report, stdout, stderr),
        Ok(None) => ExitCode::Ok,
        Err(err) => {
            diagnose(stderr, &err);
            err.exit_code()
        }
    }
}

/// Starts `job`, attaches the listeners and runs it to a terminal state.
fn drive(
    controller: &mut PipelineController,
    job: PipelineJob,
    commands: CommandSender,
    keys: KeyMap,
    interactive: bool,
) -> pipeline::Result<Option<JobReport>> {
    controller.start(job)?;

    let listeners = match listener::spawn(&commands, &controller.state_watch(), keys, interactive) {
        Ok(listeners) => Some(listeners),
        Err(err) => {
            warn!(target: "compressor::control", %err, "listeners unavailable, keys and signals are ignored");
            None
        }
    };
    drop(commands);

    let report = controller.run();
    if let Some(listeners) = listeners {
        listeners.detach();
    }
    Ok(report)
}

fn conclude<Out: Write, Err: Write>(report: &JobReport, stdout: &mut Out, stderr: &mut Err) -> ExitCode {
    if report.state == PipelineState::Failed {
        diagnose(stderr, report.message());
    } else {
        let _ = writeln!(stdout, "{}", report.message());
        let _ = stdout.flush();
    }
    if let Some(err) = report.cleanup.error() {
        diagnose(stderr, err);
    }
    report.exit_code()
}

fn install_tracing(verbosity: u8) {
    let config = VerbosityConfig::from_verbose_level(verbosity);
    // In-process callers may run more than once; the first subscriber stays.
    let _ = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => init_tracing_with_filter(config, filter),
        Err(_) => init_tracing(config),
    };
}

fn write_or_fail<W: Write>(out: &mut W, text: &str) -> ExitCode {
    if out.write_all(text.as_bytes()).and_then(|()| out.flush()).is_err() {
        return ExitCode::Syntax;
    }
    ExitCode::Ok
}

fn diagnose<W: Write>(stderr: &mut W, message: impl Display) {
    let _ = writeln!(stderr, "{PROGRAM_NAME}: {message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_captured(args: &[&str]) -> (i32, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let status = run(
            std::iter::once(PROGRAM_NAME).chain(args.iter().copied()),
            &mut stdout,
            &mut stderr,
        );
        (
            status,
            String::from_utf8(stdout).unwrap(),
            String::from_utf8(stderr).unwrap(),
        )
    }

    #[test]
    fn help_is_written_to_stdout() {
        let (status, stdout, stderr) = run_captured(&["--help"]);
        assert_eq!(status, 0);
        assert_eq!(stdout, HELP_TEXT);
        assert!(stderr.is_empty());
    }

    #[test]
    fn unknown_option_is_a_usage_error() {
        let (status, stdout, stderr) = run_captured(&["--frobnicate", "x"]);
        assert_eq!(status, 1);
        assert!(stdout.is_empty());
        assert!(stderr.starts_with("compressor: "));
    }

    #[test]
    fn missing_input_is_a_usage_error() {
        let (status, _, stderr) = run_captured(&[]);
        assert_eq!(status, 1);
        assert!(stderr.contains("missing INPUT"));
    }

    #[test]
    fn unreadable_input_is_a_selection_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.bin");
        let (status, _, stderr) = run_captured(&[
            missing.to_str().unwrap(),
            "-o",
            dir.path().to_str().unwrap(),
        ]);
        assert_eq!(status, ExitCode::FileSelect.as_i32());
        assert!(stderr.contains("absent.bin"), "{stderr}");
    }

    #[test]
    fn missing_output_directory_is_a_selection_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, b"data").unwrap();
        let (status, _, _) = run_captured(&[
            input.to_str().unwrap(),
            "-o",
            dir.path().join("nowhere").to_str().unwrap(),
        ]);
        assert_eq!(status, 3);
    }

    #[test]
    fn exit_code_from_clamps() {
        assert_eq!(exit_code_from(0), std::process::ExitCode::SUCCESS);
        assert_eq!(exit_code_from(-1), std::process::ExitCode::from(0));
        assert_eq!(exit_code_from(300), std::process::ExitCode::from(255));
    }
}
