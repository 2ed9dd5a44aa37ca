#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Reference interpreter for compiled Tessera storage programs.
//!
//! The VM executes the serializer and parser instruction streams shipped with
//! a compiled artifact against in-memory cells. It mirrors what the emitted
//! procedures do on chain and is what the round-trip tests run against.

pub mod engine;

pub use engine::{ContractData, FuelLimits, RuntimeError, VM, Value};
