//! Serializer/parser generation and output assembly.
//!
//! Every serializer and parser is lowered to a structured
//! [`tessera_cell::Program`] first; text is rendered from that program and the
//! program itself ships with the artifact.

mod accessors;
mod assemble;
mod constants;
mod contract;
pub mod emitter;
mod render;
pub mod serialization;
mod stdlib;
pub mod writer;

#[cfg(test)]
mod assemble_tests;
#[cfg(test)]
mod emitter_tests;

pub use assemble::{OutputFile, ProgramArtifact, write_program};
pub use constants::{ConstantOutput, binding_literal};
pub use emitter::{EmitInput, Emitter, FuncEmitter};
pub use serialization::{ParserMode, parser_program, serializer_program};
pub use writer::{FunctionCode, Modifier, SectionTag, WriterContext, WrittenFunction};

pub(crate) use assemble::write_procedures;
