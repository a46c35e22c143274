//! Store-backed data access.
//!
//! # Responsibility
//! - Keep SQL details behind repository contracts.
//!
//! # Invariants
//! - Repository reads return semantic errors (`NotFound`, `InvalidData`) in
//!   addition to store transport errors.

pub mod metadata_repo;
