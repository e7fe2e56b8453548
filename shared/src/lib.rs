//! Shared types and utilities for nvroof
//!
//! This crate contains the per-kernel metric table, roofline point types and
//! the numeric helpers used by the profiler core and the command-line front end.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{roofline::*, table::*};
