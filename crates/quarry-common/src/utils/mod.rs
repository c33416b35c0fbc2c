//! Utility modules shared across Quarry crates.

pub mod error;
