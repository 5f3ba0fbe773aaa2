//! Terminal rendering of pipeline progress.
//!
//! Status lines (the banner, pause and resume notices) go to the output
//! writer. The progress bar, when enabled, is drawn on stderr by indicatif
//! and suspended while a status line is printed.

use std::io::Write;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use pipeline::{KeyMap, PipelineState, ProgressReporter};

const BAR_TEMPLATE: &str =
    "Progress [{bar:40}] {percent}% | ETA: {eta_secs}s | Duration: {elapsed_secs}s | {mb} MB";

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Formats a byte count as megabytes with two decimals.
#[must_use]
pub fn to_fixed_mb(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / BYTES_PER_MB)
}

fn write_mb(state: &ProgressState, w: &mut dyn std::fmt::Write) {
    let _ = w.write_str(&to_fixed_mb(state.pos()));
}

fn write_eta_secs(state: &ProgressState, w: &mut dyn std::fmt::Write) {
    let _ = write!(w, "{}", state.eta().as_secs());
}

fn write_elapsed_secs(state: &ProgressState, w: &mut dyn std::fmt::Write) {
    let _ = write!(w, "{}", state.elapsed().as_secs());
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("mb", write_mb)
        .with_key("eta_secs", write_eta_secs)
        .with_key("elapsed_secs", write_elapsed_secs)
        .progress_chars("\u{2588}\u{2591}")
}

/// Prints status lines and, optionally, an indicatif progress bar.
#[derive(Debug)]
pub struct TerminalReporter<W> {
    out: W,
    keys: KeyMap,
    show_bar: bool,
    line_end: &'static str,
    paused: bool,
}

impl<W: Write> TerminalReporter<W> {
    /// Creates a reporter writing status lines to `out`.
    ///
    /// `raw_mode` selects `\r\n` line endings, which a raw terminal needs to
    /// return the cursor to the first column.
    pub const fn new(out: W, keys: KeyMap, show_bar: bool, raw_mode: bool) -> Self {
        Self {
            out,
            keys,
            show_bar,
            line_end: if raw_mode { "\r\n" } else { "\n" },
            paused: false,
        }
    }

    /// Returns the writer, e.g. to inspect captured output.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, bar: Option<&ProgressBar>, text: &str) {
        let out = &mut self.out;
        let end = self.line_end;
        let mut print = || {
            // Status output must never fail the job.
            let _ = write!(out, "{text}{end}");
            let _ = out.flush();
        };
        match bar {
            Some(bar) => bar.suspend(print),
            None => print(),
        }
    }
}

impl<W: Write> ProgressReporter for TerminalReporter<W> {
    type Handle = Option<ProgressBar>;

    fn init(&mut self, total_bytes: u64) -> Self::Handle {
        self.paused = false;
        let banner = format!(
            "Compressor, press \"{}\" to pause or \"{}\" to resume...",
            self.keys.pause_key(),
            self.keys.resume_key()
        );
        self.line(None, &banner);
        self.show_bar.then(|| {
            let bar = ProgressBar::with_draw_target(Some(total_bytes), ProgressDrawTarget::stderr());
            bar.set_style(bar_style());
            bar
        })
    }

    fn update(&mut self, handle: &Self::Handle, bytes_processed: u64) {
        if let Some(bar) = handle {
            bar.set_position(bytes_processed);
        }
    }

    fn state_changed(&mut self, handle: &Self::Handle, state: PipelineState) {
        match state {
            PipelineState::Paused => {
                self.paused = true;
                let text = format!(
                    "Compression paused, press \"{}\" to resume",
                    self.keys.resume_key()
                );
                self.line(handle.as_ref(), &text);
            }
            PipelineState::Running if self.paused => {
                self.paused = false;
                let text = format!(
                    "Compression in progress, press \"{}\" to pause",
                    self.keys.pause_key()
                );
                self.line(handle.as_ref(), &text);
            }
            _ => {}
        }
    }

    fn finish(&mut self, handle: Self::Handle, state: PipelineState) {
        if let Some(bar) = handle {
            if state == PipelineState::Completed {
                bar.finish();
            } else {
                bar.abandon();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::InMemoryTerm;
    use pipeline::{ReportEvent, drive_reporter, progress_channel};

    fn render(events: &[ReportEvent], keys: KeyMap, raw_mode: bool) -> String {
        let (tx, rx) = progress_channel();
        for event in events {
            tx.send(*event);
        }
        drop(tx);
        let mut reporter = TerminalReporter::new(Vec::new(), keys, false, raw_mode);
        drive_reporter(&mut reporter, &rx);
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn mb_has_two_decimals() {
        assert_eq!(to_fixed_mb(0), "0.00");
        assert_eq!(to_fixed_mb(1_048_576), "1.00");
        assert_eq!(to_fixed_mb(104_857_600), "100.00");
        assert_eq!(to_fixed_mb(1_572_864), "1.50");
    }

    #[test]
    fn banner_pause_and_resume_lines() {
        let out = render(
            &[
                ReportEvent::Started { total_bytes: 10 },
                ReportEvent::StateChanged(PipelineState::Running),
                ReportEvent::StateChanged(PipelineState::Paused),
                ReportEvent::StateChanged(PipelineState::Running),
                ReportEvent::StateChanged(PipelineState::Completed),
            ],
            KeyMap::default(),
            false,
        );
        assert_eq!(
            out,
            "Compressor, press \"p\" to pause or \"r\" to resume...\n\
             Compression paused, press \"r\" to resume\n\
             Compression in progress, press \"p\" to pause\n"
        );
    }

    #[test]
    fn custom_keys_appear_in_messages() {
        let out = render(
            &[
                ReportEvent::Started { total_bytes: 0 },
                ReportEvent::StateChanged(PipelineState::Paused),
            ],
            KeyMap::new('s', 'g'),
            false,
        );
        assert!(out.contains("press \"s\" to pause or \"g\" to resume"));
        assert!(out.contains("Compression paused, press \"g\" to resume"));
    }

    #[test]
    fn raw_mode_uses_carriage_returns() {
        let out = render(&[ReportEvent::Started { total_bytes: 1 }], KeyMap::default(), true);
        assert!(out.ends_with("resume...\r\n"));
    }

    #[test]
    fn initial_running_state_prints_nothing_extra() {
        let out = render(
            &[
                ReportEvent::Started { total_bytes: 1 },
                ReportEvent::StateChanged(PipelineState::Running),
            ],
            KeyMap::default(),
            false,
        );
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn hidden_bar_tracks_position() {
        let mut reporter = TerminalReporter::new(Vec::new(), KeyMap::default(), false, false);
        let bar = Some(ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden()));
        reporter.update(&bar, 40);
        assert_eq!(bar.as_ref().map(ProgressBar::position), Some(40));
        reporter.finish(bar, PipelineState::Aborted);
    }

    #[test]
    fn bar_style_renders_with_custom_keys() {
        let term = InMemoryTerm::new(2, 120);
        let bar = ProgressBar::with_draw_target(
            Some(2 * 1_048_576),
            ProgressDrawTarget::term_like(Box::new(term.clone())),
        );
        bar.set_style(bar_style());
        bar.set_position(1_048_576);
        // Abandoning redraws unconditionally and keeps the position.
        bar.abandon();

        let screen = term.contents();
        assert!(screen.starts_with("Progress ["), "{screen}");
        assert!(screen.contains("] 50% | ETA: "), "{screen}");
        assert!(screen.contains("s | Duration: "), "{screen}");
        assert!(screen.trim_end().ends_with("s | 1.00 MB"), "{screen}");
        assert_eq!(bar.position(), 1_048_576);
    }
}
