//! Registry of generated procedures.
//!
//! Every procedure carries a [`SectionTag`] deciding which output section it
//! lands in. Registration is first-wins: a second procedure with an existing
//! name is dropped, so each procedure is written exactly once.

use indexmap::IndexMap;
use tessera_cell::{Program, ProgramSet};

/// Section a procedure belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SectionTag {
    Stdlib,
    Constants,
    Type(String),
    TypeInit(String),
    Untagged,
}

/// Calling-convention modifier appended to the signature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Modifier {
    #[default]
    None,
    Inline,
    InlineRef,
    MethodId,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    pub impure: bool,
    pub modifier: Modifier,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunctionCode {
    /// Hand-assembled body.
    Generic(Vec<String>),
    /// Body rendered from a structured program.
    Serde { program: Program, body: Vec<String> },
}

impl FunctionCode {
    pub fn body(&self) -> &[String] {
        match self {
            Self::Generic(body) | Self::Serde { body, .. } => body,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenFunction {
    pub name: String,
    /// `ret name(args)`, without modifiers.
    pub signature: String,
    pub flags: Flags,
    pub context: SectionTag,
    pub code: FunctionCode,
    pub comment: Option<String>,
}

impl WrittenFunction {
    pub fn new(name: impl Into<String>, signature: impl Into<String>, context: SectionTag) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            flags: Flags::default(),
            context,
            code: FunctionCode::Generic(Vec::new()),
            comment: None,
        }
    }

    pub fn impure(mut self) -> Self {
        self.flags.impure = true;
        self
    }

    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.flags.modifier = modifier;
        self
    }

    pub fn inline(self) -> Self {
        self.modifier(Modifier::Inline)
    }

    pub fn inline_ref(self) -> Self {
        self.modifier(Modifier::InlineRef)
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }

    pub fn body(mut self, lines: Vec<String>) -> Self {
        self.code = FunctionCode::Generic(lines);
        self
    }

    pub fn serde(mut self, program: Program, lines: Vec<String>) -> Self {
        self.code = FunctionCode::Serde {
            program,
            body: lines,
        };
        self
    }
}

#[derive(Debug, Default)]
pub struct WriterContext {
    functions: IndexMap<String, WrittenFunction>,
    globals: Vec<String>,
}

impl WriterContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a procedure; returns `false` if the name was already taken.
    pub fn add(&mut self, function: WrittenFunction) -> bool {
        if self.functions.contains_key(&function.name) {
            tracing::trace!(name = %function.name, "procedure already written");
            return false;
        }
        self.functions.insert(function.name.clone(), function);
        true
    }

    pub fn get(&self, name: &str) -> Option<&WrittenFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn global(&mut self, declaration: impl Into<String>) {
        let declaration = declaration.into();
        if !self.globals.contains(&declaration) {
            self.globals.push(declaration);
        }
    }

    pub fn globals(&self) -> &[String] {
        &self.globals
    }

    /// All procedures in insertion order; comments survive only in debug mode.
    pub fn extract(&self, debug: bool) -> Vec<WrittenFunction> {
        self.functions
            .values()
            .map(|f| {
                let mut f = f.clone();
                if !debug {
                    f.comment = None;
                }
                f
            })
            .collect()
    }

    /// Structured programs behind the generated serializers and parsers.
    pub fn programs(&self) -> ProgramSet {
        let mut set = ProgramSet::new();
        for f in self.functions.values() {
            if let FunctionCode::Serde { program, .. } = &f.code {
                set.insert(program.clone());
            }
        }
        set
    }
}
