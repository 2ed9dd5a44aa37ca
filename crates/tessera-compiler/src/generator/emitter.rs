//! Text emission of procedure groups.
//!
//! The assembler decides grouping and order; an [`Emitter`] only turns a group
//! into text. The default [`FuncEmitter`] writes FunC-style source.

use std::fmt::Write as _;

use super::writer::{Modifier, WrittenFunction};

/// One output file's worth of procedures.
pub struct EmitInput<'a> {
    /// Leading lines (pragmas, includes, section comments).
    pub header: Vec<String>,
    pub functions: &'a [WrittenFunction],
}

/// Pluggable text backend.
pub trait Emitter {
    /// Full definitions.
    fn emit(&self, input: &EmitInput<'_>) -> String;

    /// Forward declarations only.
    fn declare(&self, input: &EmitInput<'_>) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FuncEmitter;

impl FuncEmitter {
    fn modifiers(function: &WrittenFunction, declaration: bool) -> String {
        let mut out = String::new();
        if function.flags.impure {
            out.push_str(" impure");
        }
        match function.flags.modifier {
            Modifier::None => {}
            Modifier::Inline => out.push_str(" inline"),
            Modifier::InlineRef => out.push_str(" inline_ref"),
            // Getter ids are assigned at definition only.
            Modifier::MethodId if declaration => {}
            Modifier::MethodId => out.push_str(" method_id"),
        }
        out
    }

    fn write_header(out: &mut String, header: &[String]) {
        for line in header {
            out.push_str(line);
            out.push('\n');
        }
        if !header.is_empty() {
            out.push('\n');
        }
    }
}

impl Emitter for FuncEmitter {
    fn emit(&self, input: &EmitInput<'_>) -> String {
        let mut out = String::new();
        Self::write_header(&mut out, &input.header);

        for (i, function) in input.functions.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            if let Some(comment) = &function.comment {
                let _ = writeln!(out, ";; {comment}");
            }
            let _ = writeln!(
                out,
                "{}{} {{",
                function.signature,
                Self::modifiers(function, false)
            );
            for line in function.code.body() {
                let _ = writeln!(out, "    {line}");
            }
            out.push_str("}\n");
        }
        out
    }

    fn declare(&self, input: &EmitInput<'_>) -> String {
        let mut out = String::new();
        Self::write_header(&mut out, &input.header);

        for function in input.functions {
            if function.flags.modifier == Modifier::MethodId {
                continue;
            }
            let _ = writeln!(
                out,
                "{}{};",
                function.signature,
                Self::modifiers(function, true)
            );
        }
        out
    }
}
