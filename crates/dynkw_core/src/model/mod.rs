//! Keyword specification model and runtime values.
//!
//! # Responsibility
//! - Define the static description of discovered keywords.
//! - Define values and type constraints shared by compile and run time.
//!
//! # Invariants
//! - Specs are immutable after discovery; only runtime info is attached later.

pub mod spec;
pub mod value;
