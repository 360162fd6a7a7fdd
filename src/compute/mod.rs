//! Compilation and incremental evaluation.

pub mod cache;
pub mod compiler;
pub mod engine;
pub mod kernel;
pub mod ledger;
