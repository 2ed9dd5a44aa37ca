use tessera_cell::{CellError, ProgramKind};

/// Errors raised while running a program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// The discriminator read from the input does not match the message header.
    /// On chain this aborts with exit code 129.
    #[error("opcode mismatch: expected 0x{expected:08x}, found 0x{found:08x}")]
    OpcodeMismatch { expected: u32, found: u32 },

    #[error(transparent)]
    Cell(#[from] CellError),

    #[error("no program named `{0}`")]
    UnknownProgram(String),

    #[error("`{name}` is a {found:?} program, expected {expected:?}")]
    WrongProgramKind {
        name: String,
        expected: ProgramKind,
        found: ProgramKind,
    },

    #[error("field `{field}` expects a {expected} value")]
    ShapeMismatch { field: String, expected: String },

    #[error("value for `{type_name}` has no field `{field}`")]
    MissingField { type_name: String, field: String },

    #[error("`{program}` cannot execute `{instr}`")]
    InvalidInstruction { program: String, instr: String },

    #[error("fuel exhausted after {0} steps")]
    ExecFuelExhausted(u32),

    #[error("nesting deeper than {0} programs")]
    RecursionLimitExceeded(u32),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
