//! Tessera compiler back end.
//!
//! This crate turns a frozen [`TypeStore`] into deterministic cell layouts and
//! the code that round-trips them:
//! - `comptime` - evaluation of defaults, headers and constants (the one in-place step)
//! - `analyze` - dependency ordering and schema signatures
//! - `storage` - cell allocation and layout descriptors
//! - `generator` - serializer/parser generation and output assembly
//! - `abi` - the ABI description and its content link
//! - `session` - the high-level pipeline facade

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod abi;
pub mod analyze;
pub mod comptime;
pub mod config;
pub mod context;
pub mod generator;
pub mod session;
pub mod storage;

#[cfg(test)]
pub mod test_utils;

pub use config::CompileOptions;
pub use context::CompilerContext;
pub use generator::{ProgramArtifact, SectionTag};
pub use session::Session;
pub use storage::{Allocation, AllocationCache, AllocationId};

use tessera_core::ComptimeEvalError;

/// Errors that abort a compilation run.
///
/// All of them are fatal: no partial artifact is produced.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Inline containment forms a cycle; lists every participant in cycle order.
    #[error("cyclic inline containment: {}", format_cycle(.cycle))]
    CyclicDependency { cycle: Vec<String> },

    #[error("field `{type_name}.{field}` needs {bits} bits and cannot fit in any cell")]
    FieldTooLarge {
        type_name: String,
        field: String,
        bits: u16,
    },

    #[error("field `{type_name}.{field}` needs more reference slots than a cell provides")]
    AllocationLimitExceeded { type_name: String, field: String },

    #[error(transparent)]
    ComptimeEval(#[from] ComptimeEvalError),

    #[error("entry type `{0}` not found")]
    UnknownEntryType(String),

    #[error("field `{type_name}.{field}` refers to unknown struct `{referenced}`")]
    UnresolvedType {
        type_name: String,
        field: String,
        referenced: String,
    },

    #[error("messages `{first}` and `{second}` share header 0x{header:08x}")]
    DuplicateHeader {
        header: u32,
        first: String,
        second: String,
    },

    #[error("failed to render ABI: {0}")]
    Abi(#[from] serde_json::Error),
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, CompileError>;

/// `A -> B -> A`
fn format_cycle(cycle: &[String]) -> String {
    let mut out = cycle.join(" -> ");
    if let Some(first) = cycle.first() {
        out.push_str(" -> ");
        out.push_str(first);
    }
    out
}
