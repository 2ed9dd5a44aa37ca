//! Execution engine for serializer and parser programs.

mod error;
mod value;
mod vm;

#[cfg(test)]
mod engine_tests;

pub use error::RuntimeError;
pub use value::Value;
pub use vm::{ContractData, FuelLimits, VM};
