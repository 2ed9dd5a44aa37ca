//! Structured serializer/parser programs.
//!
//! The generator lowers every layout into a flat instruction stream. The text
//! emitter renders procedures from it and the VM executes it directly, so both
//! agree on every cell boundary by construction.

use std::fmt;

use indexmap::IndexMap;
use tessera_core::IntFormat;

/// Index of a builder/slice inside one procedure (`build_N` / `sc_N`).
pub type CellIndex = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefKind {
    Cell,
    Slice,
    Builder,
    /// Snake-encoded string in a referenced cell chain.
    String,
}

/// How a single field is written and read.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldOp {
    Int(IntFormat),
    Bool,
    Address,
    Bits(u16),
    Ref(RefKind),
    /// Dictionary root: presence bit plus an optional reference.
    Dict,
    /// Nested struct, written in place or into its own referenced cell.
    Struct { name: String, boxed: bool },
    /// Presence bit, then the inner value in place or in a referenced cell.
    Optional { inner: Box<FieldOp>, boxed: bool },
}

impl FieldOp {
    pub fn optional(inner: FieldOp, boxed: bool) -> Self {
        Self::Optional {
            inner: Box::new(inner),
            boxed,
        }
    }
}

impl fmt::Display for FieldOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(format) => write!(f, "{format}"),
            Self::Bool => f.write_str("bool"),
            Self::Address => f.write_str("address"),
            Self::Bits(n) => write!(f, "bits{n}"),
            Self::Ref(RefKind::Cell) => f.write_str("^cell"),
            Self::Ref(RefKind::Slice) => f.write_str("^slice"),
            Self::Ref(RefKind::Builder) => f.write_str("^builder"),
            Self::Ref(RefKind::String) => f.write_str("^string"),
            Self::Dict => f.write_str("dict"),
            Self::Struct { name, boxed: false } => f.write_str(name),
            Self::Struct { name, boxed: true } => write!(f, "^{name}"),
            Self::Optional { inner, boxed: false } => write!(f, "maybe {inner}"),
            Self::Optional { inner, boxed: true } => write!(f, "maybe ^{inner}"),
        }
    }
}

/// Value a bounced parser assigns to a field it cannot read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefaultValue {
    Zero,
    False,
    Null,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Instr {
    /// Serializer: open builder `cell`. Builder 0 is the procedure argument.
    BeginCell { cell: CellIndex },
    StoreHeader { cell: CellIndex, value: u32 },
    Store {
        cell: CellIndex,
        field: String,
        op: FieldOp,
    },
    /// Serializer: finish `child` and store it as a reference in `parent`.
    EndCell { parent: CellIndex, child: CellIndex },
    /// Parser: read the discriminator and fail on mismatch.
    CheckHeader { cell: CellIndex, value: u32 },
    /// Parser: follow the next reference of `parent` into slice `child`.
    OpenCell { parent: CellIndex, child: CellIndex },
    Load {
        cell: CellIndex,
        field: String,
        op: FieldOp,
    },
    Default { field: String, value: DefaultValue },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Serializer,
    Parser,
    BouncedParser,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub type_name: String,
    pub kind: ProgramKind,
    /// Field names in declaration order: the shape of the value tensor.
    pub fields: Vec<String>,
    pub instrs: Vec<Instr>,
}

impl Program {
    /// Number of builders or slices the procedure touches.
    pub fn cell_count(&self) -> usize {
        self.instrs
            .iter()
            .filter_map(|i| match i {
                Instr::BeginCell { cell } => Some(*cell),
                Instr::OpenCell { child, .. } => Some(*child),
                _ => None,
            })
            .map(|c| usize::from(c) + 1)
            .max()
            .unwrap_or(1)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginCell { cell } => write!(f, "begin      b{cell}"),
            Self::StoreHeader { cell, value } => write!(f, "header     b{cell} 0x{value:08x}"),
            Self::Store { cell, field, op } => write!(f, "store      b{cell} {field} {op}"),
            Self::EndCell { parent, child } => write!(f, "end        b{child} -> b{parent}"),
            Self::CheckHeader { cell, value } => write!(f, "check      s{cell} 0x{value:08x}"),
            Self::OpenCell { parent, child } => write!(f, "open       s{parent} -> s{child}"),
            Self::Load { cell, field, op } => write!(f, "load       s{cell} {field} {op}"),
            Self::Default { field, value } => write!(f, "default    {field} {value:?}"),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.name, self.kind)?;
        for instr in &self.instrs {
            write!(f, "\n  {instr}")?;
        }
        Ok(())
    }
}

/// Programs by procedure name, in generation order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramSet {
    programs: IndexMap<String, Program>,
}

impl ProgramSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first program registered under a name.
    pub fn insert(&mut self, program: Program) {
        self.programs
            .entry(program.name.clone())
            .or_insert(program);
    }

    pub fn get(&self, name: &str) -> Option<&Program> {
        self.programs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Program> {
        self.programs.values()
    }
}
