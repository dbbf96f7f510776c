// src/utils/log.rs

//! Numeric verbosity handling.
//!
//! Verbosity uses the conventional numeric levels: 10 debug, 20 info,
//! 30 warn, 40 error. Anything below 10 enables trace output.

use log::LevelFilter;

/// Map a numeric verbosity to a log level filter.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0..=9 => LevelFilter::Trace,
        10..=19 => LevelFilter::Debug,
        20..=29 => LevelFilter::Info,
        30..=39 => LevelFilter::Warn,
        _ => LevelFilter::Error,
    }
}
