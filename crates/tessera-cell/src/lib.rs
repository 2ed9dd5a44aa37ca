#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Cell format and serialization IR for Tessera.
//!
//! This crate contains:
//! - Platform capacity limits and the [`CellSize`] budget type
//! - The cell data model ([`Cell`], [`CellBuilder`], [`CellSlice`])
//! - The structured instruction stream shared by the code generator and the VM

pub mod cell;
pub mod limits;
pub mod names;
pub mod program;


pub use cell::{Cell, CellBuilder, CellSlice};
pub use limits::{
    ADDRESS_BITS, CHAIN_RESERVED_REFS, CellSize, HEADER_BITS, MAX_CELL_BITS, MAX_CELL_REFS,
    OPCODE_MISMATCH_EXIT_CODE, STRING_CHUNK_BYTES, USABLE_CELL_REFS,
};
pub use program::{
    CellIndex, DefaultValue, FieldOp, Instr, Program, ProgramKind, ProgramSet, RefKind,
};

/// Errors raised while building or reading cells.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CellError {
    #[error("cell overflow: {requested} bits requested, {available} available")]
    BitOverflow { requested: u16, available: u16 },

    #[error("cell overflow: no reference slot left")]
    RefOverflow,

    #[error("cell underflow: {requested} bits requested, {available} left")]
    Underflow { requested: u16, available: u16 },

    #[error("cell underflow: no reference left to load")]
    RefUnderflow,

    #[error("value does not fit in {bits} bits")]
    ValueOutOfRange { bits: u16 },

    #[error("malformed address")]
    InvalidAddress,

    #[error("string data is not valid UTF-8")]
    InvalidUtf8,
}

pub type Result<T> = std::result::Result<T, CellError>;
