#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for Tessera type descriptors.
//!
//! Two layers:
//! - **Deserialization layer**: the raw JSON shape produced by the resolver
//! - **Store layer**: a frozen, name-indexed [`TypeStore`] consumed by the compiler
//!
//! Also hosts the constant-expression model ([`Expr`], [`ConstValue`]) and the
//! [`ConstEvaluator`] seam used by the comptime step.

mod address;
mod expr;
mod store;
mod types;

#[cfg(test)]
mod types_tests;

pub use address::{Address, AddressParseError};
pub use expr::{
    BinaryOp, ComptimeEvalError, ConstEnv, ConstEvaluator, ConstValue, Expr, LiteralEvaluator,
};
pub use store::{StoreError, TypeStore};
pub use types::{
    ConstantDescriptor, Field, FieldType, IntFormat, IntFormatError, Origin, TypeDescriptor,
    TypeKind, VarWidth,
};
