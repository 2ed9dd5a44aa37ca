//! Whole-store analysis: dependency ordering and schema signatures.

pub mod dependencies;
pub mod signatures;

#[cfg(test)]
mod signatures_tests;

pub use dependencies::{DependencyOrder, sort_types};
pub use signatures::{implicit_header, resolve_signatures, tlb_type};
