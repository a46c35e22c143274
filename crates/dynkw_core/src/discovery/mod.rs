//! Side-effect-free keyword discovery from module metadata.
//!
//! # Responsibility
//! - Turn a module's type metadata into a validated keyword spec forest.
//!
//! # Invariants
//! - Discovery never loads or executes module code.
//! - Discovery is atomic per module: any invariant violation yields an error
//!   and no specs at all.

mod error;
pub mod scanner;

pub use error::{DiscoveryError, DiscoveryResult};
pub use scanner::discover_keywords;
