#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` turns the compressor's `tracing` events into terse stderr lines.
//! Every event the workspace emits uses a `compressor::<flag>` target, and
//! each [`LogFlag`] carries its own verbosity level in a
//! [`VerbosityConfig`], derived from the number of `-v` options.
//!
//! # Design
//!
//! [`CompressorLayer`] is a `tracing-subscriber` layer. It maps the event
//! target to a flag, maps the event level to a verbosity level (info 1,
//! debug 2, trace 3) and writes the event only when the flag's level reaches
//! it. Warnings and errors bypass the flags, so failures such as a partial
//! output that could not be removed are never silent.
//!
//! # Examples
//!
//! ```
//! use logging::{LogFlag, VerbosityConfig};
//!
//! let config = VerbosityConfig::from_verbose_level(2);
//! assert!(config.enabled(LogFlag::Control, 2));
//! assert!(!config.enabled(LogFlag::Control, 3));
//! assert_eq!(LogFlag::from_target("compressor::cleanup"), Some(LogFlag::Cleanup));
//! ```

mod config;
mod levels;
mod tracing_bridge;

pub use config::VerbosityConfig;
pub use levels::{FlagLevels, LogFlag};
pub use tracing_bridge::{CompressorLayer, init_tracing, init_tracing_with_filter};
