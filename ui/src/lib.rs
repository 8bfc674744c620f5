//! This crate collects elements that are shared between the programs that
//! drive the engine: command-line arguments, logging and progress reporting.

#[cfg(feature = "simulation")]
mod args;

#[cfg(feature = "simulation")]
pub use args::{parse_mask, parse_range, SharedArgs};

#[cfg(feature = "tui")]
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
#[cfg(feature = "tui")]
use log::LevelFilter;
#[cfg(feature = "tui")]
use std::time::Duration;

/// Send logs to syslog, or to stderr if `stderr` is set
///
/// Progress bars take over the terminal, so syslog is the default. The stderr
/// logger honors the usual `RUST_LOG` environment variable.
#[cfg(feature = "tui")]
pub fn init_logging(stderr: bool) {
    if stderr {
        env_logger::init();
        return;
    }
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = syslog::init(syslog::Facility::default(), level, None) {
        env_logger::init();
        log::warn!("Failed to initialize syslog ({e}), logging to stderr instead");
    }
}

/// Set up a progress bar over `len` iterations of some work
#[cfg(feature = "tui")]
pub fn init_progress_reporting(message: &'static str, len: usize) -> ProgressBar {
    let progress = ProgressBar::new(len as u64)
        .with_message(message)
        .with_style(
            ProgressStyle::with_template("{msg} {pos}/{len} {wide_bar} {elapsed}/~{duration}")
                .expect("Failed to parse style"),
        )
        .with_finish(ProgressFinish::AndClear);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
