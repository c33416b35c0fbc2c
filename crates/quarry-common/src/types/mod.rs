//! Core type definitions for Quarry.
//!
//! - Bound argument and literal values ([`Value`])

mod value;

pub use value::Value;
