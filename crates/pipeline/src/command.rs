//! Control commands and the channel that carries them to the controller.
//!
//! Listeners never touch pipeline state. They translate input into
//! [`Command`] values and push them into a single-consumer queue that only the
//! controller's loop reads, which makes the controller the one place where
//! commands are applied.

use std::fmt;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

use crate::state::PipelineState;

/// Discrete request from the user.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Command {
    /// Stop pulling chunks from the source.
    Pause,
    /// Continue pulling from where consumption stopped.
    Resume,
    /// Tear the job down and delete the partial output. Irrevocable.
    Abort,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Abort => "abort",
        })
    }
}

/// Creates the command queue between listeners and a controller.
#[must_use]
pub fn control_channel() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = unbounded();
    (CommandSender { tx }, CommandReceiver { rx })
}

/// Producer half of the command queue; clone one per listener.
#[derive(Clone, Debug)]
pub struct CommandSender {
    tx: Sender<Command>,
}

impl CommandSender {
    /// Queues `command`. Returns `false` once the controller is gone.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// Outcome of polling the command queue.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Poll {
    /// A command was waiting.
    Ready(Command),
    /// Nothing is queued right now.
    Empty,
    /// Every sender is gone; no command will ever arrive.
    Closed,
}

/// Consumer half of the command queue, owned by the controller.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: Receiver<Command>,
}

impl CommandReceiver {
    /// Returns the next queued command without blocking.
    pub fn poll(&self) -> Poll {
        match self.rx.try_recv() {
            Ok(command) => Poll::Ready(command),
            Err(TryRecvError::Empty) => Poll::Empty,
            Err(TryRecvError::Disconnected) => Poll::Closed,
        }
    }

    /// Blocks for the next command; `None` once every sender is gone.
    pub fn recv(&self) -> Option<Command> {
        self.rx.recv().ok()
    }
}

/// A decoded keystroke, independent of any terminal library.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// The interrupt signal (Ctrl+C, SIGINT, SIGTERM).
    Interrupt,
}

/// Maps keys to commands given the state the job is in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyMap {
    pause: char,
    resume: char,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            pause: 'p',
            resume: 'r',
        }
    }
}

impl KeyMap {
    /// Creates a map with custom pause and resume keys.
    #[must_use]
    pub const fn new(pause: char, resume: char) -> Self {
        Self { pause, resume }
    }

    /// Key that pauses a running job.
    #[must_use]
    pub const fn pause_key(&self) -> char {
        self.pause
    }

    /// Key that resumes a paused job.
    #[must_use]
    pub const fn resume_key(&self) -> char {
        self.resume
    }

    /// Translates `key` observed while the job is in `state`.
    ///
    /// The pause key only means something while running and the resume key
    /// only while paused. The interrupt always yields [`Command::Abort`].
    /// Anything else is ignored.
    #[must_use]
    pub fn translate(&self, key: Key, state: PipelineState) -> Option<Command> {
        match key {
            Key::Interrupt => Some(Command::Abort),
            Key::Char(c) if c == self.pause && state == PipelineState::Running => {
                Some(Command::Pause)
            }
            Key::Char(c) if c == self.resume && state == PipelineState::Paused => {
                Some(Command::Resume)
            }
            Key::Char(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_key_only_while_running() {
        let map = KeyMap::default();
        assert_eq!(
            map.translate(Key::Char('p'), PipelineState::Running),
            Some(Command::Pause)
        );
        assert_eq!(map.translate(Key::Char('p'), PipelineState::Paused), None);
        assert_eq!(map.translate(Key::Char('p'), PipelineState::Idle), None);
    }

    #[test]
    fn resume_key_only_while_paused() {
        let map = KeyMap::default();
        assert_eq!(
            map.translate(Key::Char('r'), PipelineState::Paused),
            Some(Command::Resume)
        );
        assert_eq!(map.translate(Key::Char('r'), PipelineState::Running), None);
    }

    #[test]
    fn interrupt_aborts_in_every_state() {
        let map = KeyMap::default();
        for state in [
            PipelineState::Idle,
            PipelineState::Running,
            PipelineState::Paused,
            PipelineState::Aborted,
            PipelineState::Completed,
            PipelineState::Failed,
        ] {
            assert_eq!(map.translate(Key::Interrupt, state), Some(Command::Abort));
        }
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let map = KeyMap::default();
        for c in ['x', 'P', 'R', ' ', 'q'] {
            assert_eq!(map.translate(Key::Char(c), PipelineState::Running), None);
            assert_eq!(map.translate(Key::Char(c), PipelineState::Paused), None);
        }
    }

    #[test]
    fn custom_keys() {
        let map = KeyMap::new('s', 'g');
        assert_eq!(map.pause_key(), 's');
        assert_eq!(map.resume_key(), 'g');
        assert_eq!(
            map.translate(Key::Char('s'), PipelineState::Running),
            Some(Command::Pause)
        );
        assert_eq!(map.translate(Key::Char('p'), PipelineState::Running), None);
    }

    #[test]
    fn channel_reports_closed_after_senders_drop() {
        let (tx, rx) = control_channel();
        assert_eq!(rx.poll(), Poll::Empty);
        assert!(tx.send(Command::Pause));
        assert_eq!(rx.poll(), Poll::Ready(Command::Pause));
        drop(tx);
        assert_eq!(rx.poll(), Poll::Closed);
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = control_channel();
        drop(rx);
        assert!(!tx.send(Command::Abort));
    }
}
