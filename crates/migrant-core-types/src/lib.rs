//! Core types shared across migrant crates
//!
//! This crate provides foundational types used by the error, logging and
//! configuration layers:
//!
//! - **Correlation types**: RunId tags every event and report of one run
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::RunId;
pub use sensitive::Sensitive;
