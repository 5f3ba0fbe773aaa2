//! Keyboard and signal listeners feeding the command queue.
//!
//! Listeners never touch the controller. Each one decodes its input into a
//! [`Key`], asks the [`KeyMap`] what that key means in the current state and
//! queues the resulting [`Command`](pipeline::Command). The keyboard listener
//! puts the terminal into raw mode for as long as it runs so single key
//! presses arrive without Enter and Ctrl+C arrives as a key, not a signal.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use pipeline::{CommandSender, Key, KeyMap, StateWatch};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Keeps the terminal in raw mode until dropped.
#[derive(Debug)]
pub struct RawModeGuard(());

impl RawModeGuard {
    /// Switches the terminal to raw mode.
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            warn!(target: "compressor::control", %err, "could not restore the terminal");
        }
    }
}

/// Decodes a terminal key event. Only presses count.
#[must_use]
pub fn decode_key(event: &KeyEvent) -> Option<Key> {
    if event.kind != KeyEventKind::Press {
        return None;
    }
    match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Key::Interrupt)
        }
        KeyCode::Char(c) if !event.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            Some(Key::Char(c))
        }
        _ => None,
    }
}

/// Translates `key` against the current state and queues the result.
/// Returns `false` once the controller is gone.
fn dispatch(key: Key, commands: &CommandSender, watch: &StateWatch, keys: KeyMap) -> bool {
    let state = watch.get();
    match keys.translate(key, state) {
        Some(command) => {
            debug!(target: "compressor::control", ?key, %command, %state, "key translated");
            commands.send(command)
        }
        None => true,
    }
}

/// Running listener threads. Stops and joins them on [`detach`](Self::detach)
/// or drop.
#[derive(Debug)]
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    #[cfg(unix)]
    signals: Option<signal_hook::iterator::Handle>,
}

impl ListenerHandle {
    /// Stops every listener and waits for them to exit. Raw mode, if it was
    /// enabled, is restored once this returns.
    pub fn detach(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        #[cfg(unix)]
        if let Some(signals) = self.signals.take() {
            signals.close();
        }
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                warn!(target: "compressor::control", "listener thread panicked");
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Starts the listeners for one job.
///
/// The signal listener turns SIGINT and SIGTERM into aborts on Unix. When
/// `keyboard` is set the terminal is switched to raw mode and key presses
/// are translated as well; the keyboard listener exits on its own once
/// the watched state becomes terminal.
pub fn spawn(
    commands: &CommandSender,
    watch: &StateWatch,
    keys: KeyMap,
    keyboard: bool,
) -> io::Result<ListenerHandle> {
    let mut handle = ListenerHandle {
        stop: Arc::new(AtomicBool::new(false)),
        threads: Vec::with_capacity(2),
        #[cfg(unix)]
        signals: None,
    };

    #[cfg(unix)]
    {
        let (signals, thread) = spawn_signals(commands.clone(), watch.clone(), keys)?;
        handle.signals = Some(signals);
        handle.threads.push(thread);
    }

    if keyboard {
        let thread = spawn_keyboard(
            commands.clone(),
            watch.clone(),
            keys,
            Arc::clone(&handle.stop),
        )?;
        handle.threads.push(thread);
    }

    Ok(handle)
}

fn spawn_keyboard(
    commands: CommandSender,
    watch: StateWatch,
    keys: KeyMap,
    stop: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    let guard = RawModeGuard::enable()?;
    thread::Builder::new()
        .name("compressor-keys".to_owned())
        .spawn(move || {
            let _guard = guard;
            while !stop.load(Ordering::Acquire) && !watch.is_terminal() {
                match event::poll(POLL_INTERVAL) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(err) => {
                        warn!(target: "compressor::control", %err, "keyboard unavailable");
                        break;
                    }
                }
                let event = match event::read() {
                    Ok(Event::Key(event)) => event,
                    Ok(_) => continue,
                    Err(err) => {
                        warn!(target: "compressor::control", %err, "keyboard unavailable");
                        break;
                    }
                };
                if let Some(key) = decode_key(&event)
                    && !dispatch(key, &commands, &watch, keys)
                {
                    break;
                }
            }
        })
}

#[cfg(unix)]
fn spawn_signals(
    commands: CommandSender,
    watch: StateWatch,
    keys: KeyMap,
) -> io::Result<(signal_hook::iterator::Handle, JoinHandle<()>)> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();
    let thread = thread::Builder::new()
        .name("compressor-signals".to_owned())
        .spawn(move || {
            for signal in signals.forever() {
                debug!(target: "compressor::control", signal, "signal received");
                if !dispatch(Key::Interrupt, &commands, &watch, keys) {
                    break;
                }
            }
        })?;
    Ok((handle, thread))
}
