//! Human-readable renderings of compiled and live graphs.

pub mod dot;
pub mod trace;
