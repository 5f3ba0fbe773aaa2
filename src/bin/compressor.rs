#![deny(unsafe_code)]

use mimalloc::MiMalloc;

/// High-performance memory allocator for improved allocation throughput.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::{env, io, process::ExitCode};

fn main() -> ExitCode {
    // Unlocked handles: stdout is shared with the progress reporter thread.
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    cli::exit_code_from(cli::run(env::args_os(), &mut stdout, &mut stderr))
}
