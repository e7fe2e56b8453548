//! Data model shared across crates

pub mod roofline;
pub mod table;
