//! Module type metadata as read from a self-describing metadata store.
//!
//! # Responsibility
//! - Model the type, member, attribute and enum-field records a module
//!   publishes at build time.
//! - Provide the marker vocabulary discovery looks for.
//!
//! # Invariants
//! - Records are plain data; nothing here executes module code.
//! - Nested types are stored under their enclosing type, mirroring lexical
//!   nesting.

pub mod markers;
pub mod records;
pub mod signature;

pub use records::{
    AttributeRecord, AttributeValue, MemberKind, MemberRecord, ModuleMetadata, TypeKind,
    TypeRecord,
};
pub use signature::decode_type_name;
