//! Serializer and parser generation.
//!
//! Each allocation is lowered into structured programs (see
//! [`tessera_cell::program`]); the text bodies are rendered from those same
//! programs, so writer and reader agree on every cell boundary.

use tessera_cell::{CellIndex, Instr, Program, ProgramKind, names};
use tessera_core::Field;

use super::render::{self, TypeRenderer};
use super::writer::{Modifier, SectionTag, WriterContext, WrittenFunction};
use crate::storage::Allocation;

/// Which parser to generate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserMode {
    /// Validate and consume the header first.
    WithOpcode,
    /// Header already consumed by a dispatcher.
    NoOpcode,
    /// First-cell subset with defaults for the rest.
    Bounced,
}

impl ParserMode {
    fn procedure(self, ty: &str) -> String {
        match self {
            Self::WithOpcode => names::load(ty),
            Self::NoOpcode => names::load_no_opcode(ty),
            Self::Bounced => names::load_bounced(ty),
        }
    }
}

/// Lower an allocation into its serializer program.
pub fn serializer_program(allocation: &Allocation) -> Program {
    let ty = allocation.id().procedure_type();
    let mut instrs = Vec::new();
    if let Some(value) = allocation.header() {
        instrs.push(Instr::StoreHeader { cell: 0, value });
    }
    store_cell(allocation, 0, &mut instrs);

    Program {
        name: names::store(&ty),
        type_name: ty,
        kind: ProgramKind::Serializer,
        fields: allocation.fields().to_vec(),
        instrs,
    }
}

fn store_cell(allocation: &Allocation, cell: CellIndex, instrs: &mut Vec<Instr>) {
    for p in &allocation.cells()[cell].placements {
        instrs.push(Instr::Store {
            cell,
            field: p.field.clone(),
            op: p.op.clone(),
        });
    }
    if let Some(child) = allocation.next(cell) {
        instrs.push(Instr::BeginCell { cell: child });
        store_cell(allocation, child, instrs);
        instrs.push(Instr::EndCell {
            parent: cell,
            child,
        });
    }
}

/// Lower an allocation into a parser program.
pub fn parser_program(allocation: &Allocation, mode: ParserMode) -> Program {
    let ty = allocation.id().procedure_type();
    let mut instrs = Vec::new();
    if mode != ParserMode::NoOpcode {
        if let Some(value) = allocation.header() {
            instrs.push(Instr::CheckHeader { cell: 0, value });
        }
    }

    for (ci, cell) in allocation.cells().iter().enumerate() {
        for p in &cell.placements {
            instrs.push(Instr::Load {
                cell: ci,
                field: p.field.clone(),
                op: p.op.clone(),
            });
        }
        if let Some(next) = allocation.next(ci) {
            instrs.push(Instr::OpenCell {
                parent: ci,
                child: next,
            });
        }
    }

    for (field, value) in allocation.omitted() {
        instrs.push(Instr::Default {
            field: field.clone(),
            value: *value,
        });
    }

    Program {
        name: mode.procedure(&ty),
        type_name: ty,
        kind: match mode {
            ParserMode::Bounced => ProgramKind::BouncedParser,
            ParserMode::WithOpcode | ParserMode::NoOpcode => ProgramKind::Parser,
        },
        fields: allocation.fields().to_vec(),
        instrs,
    }
}

/// Multi-cell procedures are kept out of line unless the caller forces inlining.
fn modifier(allocation: &Allocation, force_inline: bool) -> Modifier {
    if force_inline || allocation.cell_count() == 1 {
        Modifier::Inline
    } else {
        Modifier::InlineRef
    }
}

fn layout_comment(allocation: &Allocation) -> String {
    format!(
        "{}: {} cell(s), {} bits, {} refs",
        allocation.id(),
        allocation.cell_count(),
        allocation.total_bits(),
        allocation.total_refs()
    )
}

pub(crate) fn write_serializer(
    ctx: &mut WriterContext,
    types: &TypeRenderer<'_>,
    allocation: &Allocation,
    fields: &[Field],
    tag: SectionTag,
    force_inline: bool,
) {
    let program = serializer_program(allocation);
    let signature = format!(
        "builder {}(builder {}, {} v)",
        program.name,
        render::builder(0),
        types.tensor(fields)
    );
    let body = render::serializer_body(&program);
    ctx.add(
        WrittenFunction::new(program.name.clone(), signature, tag)
            .modifier(modifier(allocation, force_inline))
            .comment(layout_comment(allocation))
            .serde(program, body),
    );
}

pub(crate) fn write_parser(
    ctx: &mut WriterContext,
    types: &TypeRenderer<'_>,
    allocation: &Allocation,
    fields: &[Field],
    tag: SectionTag,
    mode: ParserMode,
    force_inline: bool,
) {
    let program = parser_program(allocation, mode);
    let signature = format!(
        "(slice, {}) {}(slice {})",
        types.tensor(fields),
        program.name,
        render::slice(0)
    );
    let body = render::parser_body(&program);
    ctx.add(
        WrittenFunction::new(program.name.clone(), signature, tag)
            .modifier(modifier(allocation, force_inline))
            .comment(layout_comment(allocation))
            .serde(program, body),
    );
}

/// `_store_cell`, `_store_opt`, `_load_cell` and `_load_opt` around the base procedures.
pub(crate) fn write_wrappers(
    ctx: &mut WriterContext,
    types: &TypeRenderer<'_>,
    ty: &str,
    fields: &[Field],
    tag: &SectionTag,
) {
    let tensor = types.tensor(fields);

    ctx.add(
        WrittenFunction::new(
            names::store_cell(ty),
            format!("cell {}({tensor} v)", names::store_cell(ty)),
            tag.clone(),
        )
        .inline()
        .body(vec![format!(
            "return {}(begin_cell(), v).end_cell();",
            names::store(ty)
        )]),
    );

    ctx.add(
        WrittenFunction::new(
            names::store_opt(ty),
            format!("builder {}(builder b, tuple v)", names::store_opt(ty)),
            tag.clone(),
        )
        .inline()
        .body(vec![
            "if (null?(v)) {".to_owned(),
            "    return b.store_int(false, 1);".to_owned(),
            "}".to_owned(),
            format!(
                "return b.store_int(true, 1).store_ref({}(${ty}$_not_null(v)));",
                names::store_cell(ty)
            ),
        ]),
    );

    ctx.add(
        WrittenFunction::new(
            names::load_cell(ty),
            format!("{tensor} {}(cell c)", names::load_cell(ty)),
            tag.clone(),
        )
        .inline()
        .body(vec![
            format!("var (sc, v) = {}(c.begin_parse());", names::load(ty)),
            "return v;".to_owned(),
        ]),
    );

    ctx.add(
        WrittenFunction::new(
            names::load_opt(ty),
            format!("(slice, tuple) {}(slice sc)", names::load_opt(ty)),
            tag.clone(),
        )
        .inline()
        .body(vec![
            "if (sc~load_int(1)) {".to_owned(),
            format!(
                "    return (sc, ${ty}$_as_optional({}(sc~load_ref())));",
                names::load_cell(ty)
            ),
            "}".to_owned(),
            "return (sc, null());".to_owned(),
        ]),
    );
}
