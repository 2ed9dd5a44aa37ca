//! FunC-style text rendering of serializer and parser programs.
//!
//! Builders are named `build_N` and slices `sc_N` after the program's cell
//! index; field values are `v'<field>`.

use tessera_cell::{
    CellIndex, DefaultValue, FieldOp, Instr, OPCODE_MISMATCH_EXIT_CODE, Program, RefKind, names,
};
use tessera_core::{Field, FieldType, IntFormat, TypeStore, VarWidth};

pub(crate) fn builder(cell: CellIndex) -> String {
    format!("build_{cell}")
}

pub(crate) fn slice(cell: CellIndex) -> String {
    format!("sc_{cell}")
}

pub(crate) fn value(field: &str) -> String {
    format!("v'{field}")
}

/// Resolves value types for signatures.
pub(crate) struct TypeRenderer<'a> {
    store: &'a TypeStore,
}

impl<'a> TypeRenderer<'a> {
    pub(crate) fn new(store: &'a TypeStore) -> Self {
        Self { store }
    }

    pub(crate) fn func_type(&self, ty: &FieldType) -> String {
        match ty {
            FieldType::Int { .. } | FieldType::Bool => "int".to_owned(),
            FieldType::Address | FieldType::Bits { .. } | FieldType::Slice | FieldType::String => {
                "slice".to_owned()
            }
            FieldType::Cell | FieldType::Map { .. } => "cell".to_owned(),
            FieldType::Builder => "builder".to_owned(),
            FieldType::Optional { inner } => match inner.as_ref() {
                FieldType::Struct { .. } => "tuple".to_owned(),
                other => self.func_type(other),
            },
            FieldType::Struct { name } => self.struct_tensor(name),
        }
    }

    pub(crate) fn struct_tensor(&self, name: &str) -> String {
        match self.store.get(name) {
            Some(ty) => self.tensor(&ty.fields),
            None => "tuple".to_owned(),
        }
    }

    /// `(int, slice)`
    pub(crate) fn tensor(&self, fields: &[Field]) -> String {
        let parts: Vec<String> = fields.iter().map(|f| self.func_type(&f.ty)).collect();
        format!("({})", parts.join(", "))
    }
}

/// `var (v'a, v'b) = v;`, or nothing for an empty field list.
pub(crate) fn destructure(fields: &[String], source: &str) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    Some(format!("var ({}) = {source};", value_list(fields)))
}

/// `v'a, v'b`
pub(crate) fn value_list(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| value(f))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Expression storing `x` into builder expression `b`.
pub(crate) fn store_expr(op: &FieldOp, b: &str, x: &str) -> String {
    match op {
        FieldOp::Int(format) => match format {
            IntFormat::Int(n) => format!("{b}.store_int({x}, {n})"),
            IntFormat::Uint(n) => format!("{b}.store_uint({x}, {n})"),
            IntFormat::VarUint(VarWidth::W16) => format!("{b}.store_coins({x})"),
            IntFormat::VarUint(w) => format!("{b}.store_varuint{}({x})", w.suffix()),
            IntFormat::VarInt(w) => format!("{b}.store_varint{}({x})", w.suffix()),
        },
        FieldOp::Bool => format!("{b}.store_int({x}, 1)"),
        FieldOp::Address => format!("__tessera_store_address({b}, {x})"),
        FieldOp::Bits(_) => format!("{b}.store_slice({x})"),
        FieldOp::Ref(RefKind::Cell) => format!("{b}.store_ref({x})"),
        FieldOp::Ref(RefKind::Slice) => {
            format!("{b}.store_ref(begin_cell().store_slice({x}).end_cell())")
        }
        FieldOp::Ref(RefKind::Builder) => format!("{b}.store_ref({x}.end_cell())"),
        FieldOp::Ref(RefKind::String) => format!("{b}.store_ref(__tessera_string_to_cell({x}))"),
        FieldOp::Dict => format!("{b}.store_dict({x})"),
        FieldOp::Struct { name, boxed: false } => format!("{}({b}, {x})", names::store(name)),
        FieldOp::Struct { name, boxed: true } => {
            format!("{b}.store_ref({}({x}))", names::store_cell(name))
        }
        FieldOp::Optional { inner, boxed } => match (inner.as_ref(), boxed) {
            (FieldOp::Struct { name, boxed: false }, true) => {
                format!("{}({b}, {x})", names::store_opt(name))
            }
            (inner, false) => format!(
                "~ null?({x}) ? {} : {b}.store_int(false, 1)",
                store_expr(inner, &format!("{b}.store_int(true, 1)"), x)
            ),
            (inner, true) => format!(
                "~ null?({x}) ? {b}.store_int(true, 1).store_ref({}.end_cell()) : {b}.store_int(false, 1)",
                store_expr(inner, "begin_cell()", x)
            ),
        },
    }
}

/// Expression loading a value of `op` from slice variable `s`.
pub(crate) fn load_expr(op: &FieldOp, s: &str) -> String {
    match op {
        FieldOp::Int(format) => match format {
            IntFormat::Int(n) => format!("{s}~load_int({n})"),
            IntFormat::Uint(n) => format!("{s}~load_uint({n})"),
            IntFormat::VarUint(VarWidth::W16) => format!("{s}~load_coins()"),
            IntFormat::VarUint(w) => format!("{s}~load_varuint{}()", w.suffix()),
            IntFormat::VarInt(w) => format!("{s}~load_varint{}()", w.suffix()),
        },
        FieldOp::Bool => format!("{s}~load_int(1)"),
        FieldOp::Address => format!("{s}~__tessera_load_address()"),
        FieldOp::Bits(n) => format!("{s}~load_bits({n})"),
        FieldOp::Ref(RefKind::Cell) => format!("{s}~load_ref()"),
        FieldOp::Ref(RefKind::Slice) | FieldOp::Ref(RefKind::String) => {
            format!("{s}~load_ref().begin_parse()")
        }
        FieldOp::Ref(RefKind::Builder) => {
            format!("begin_cell().store_slice({s}~load_ref().begin_parse())")
        }
        FieldOp::Dict => format!("{s}~load_dict()"),
        FieldOp::Struct { name, boxed: false } => format!("{s}~{}()", names::load(name)),
        FieldOp::Struct { name, boxed: true } => {
            format!("{}({s}~load_ref())", names::load_cell(name))
        }
        FieldOp::Optional { inner, boxed } => match (inner.as_ref(), boxed) {
            (FieldOp::Struct { name, boxed: false }, true) => {
                format!("{s}~{}()", names::load_opt(name))
            }
            (inner, _) => format!("{s}~load_int(1) ? {} : null()", load_expr(inner, s)),
        },
    }
}

/// Lines declaring `v'<field>` from slice `s`.
fn load_lines(op: &FieldOp, s: &str, field: &str) -> Vec<String> {
    let var = value(field);
    match op {
        FieldOp::Optional { inner, boxed: true }
            if !matches!(inner.as_ref(), FieldOp::Struct { boxed: false, .. }) =>
        {
            let boxed_slice = format!("sc'{field}");
            vec![
                format!("var {var} = null();"),
                format!("if ({s}~load_int(1)) {{"),
                format!("    slice {boxed_slice} = {s}~load_ref().begin_parse();"),
                format!("    {var} = {};", load_expr(inner, &boxed_slice)),
                "}".to_owned(),
            ]
        }
        _ => vec![format!("var {var} = {};", load_expr(op, s))],
    }
}

fn default_literal(value: DefaultValue) -> &'static str {
    match value {
        DefaultValue::Zero => "0",
        DefaultValue::False => "false",
        DefaultValue::Null => "null()",
    }
}

/// Serializer body: destructure, store fields, chain cells, return the builder.
pub(crate) fn serializer_body(program: &Program) -> Vec<String> {
    let mut lines: Vec<String> = destructure(&program.fields, "v").into_iter().collect();
    for instr in &program.instrs {
        match instr {
            Instr::BeginCell { cell } => {
                lines.push(format!("var {} = begin_cell();", builder(*cell)));
            }
            Instr::StoreHeader { cell, value } => {
                let b = builder(*cell);
                lines.push(format!("{b} = {b}.store_uint({value:#010x}, 32);"));
            }
            Instr::Store { cell, field, op } => {
                let b = builder(*cell);
                lines.push(format!("{b} = {};", store_expr(op, &b, &value(field))));
            }
            Instr::EndCell { parent, child } => {
                let p = builder(*parent);
                lines.push(format!(
                    "{p} = {p}.store_ref({}.end_cell());",
                    builder(*child)
                ));
            }
            Instr::CheckHeader { .. }
            | Instr::OpenCell { .. }
            | Instr::Load { .. }
            | Instr::Default { .. } => {}
        }
    }
    lines.push(format!("return {};", builder(0)));
    lines
}

/// Parser body: check the header, load fields, follow the chain, return the tensor.
pub(crate) fn parser_body(program: &Program) -> Vec<String> {
    let mut lines = Vec::new();
    for instr in &program.instrs {
        match instr {
            Instr::CheckHeader { cell, value } => lines.push(format!(
                "throw_unless({OPCODE_MISMATCH_EXIT_CODE}, {}~load_uint(32) == {value:#010x});",
                slice(*cell)
            )),
            Instr::OpenCell { parent, child } => lines.push(format!(
                "slice {} = {}~load_ref().begin_parse();",
                slice(*child),
                slice(*parent)
            )),
            Instr::Load { cell, field, op } => lines.extend(load_lines(op, &slice(*cell), field)),
            Instr::Default { field, value: v } => {
                lines.push(format!("var {} = {};", value(field), default_literal(*v)));
            }
            Instr::BeginCell { .. }
            | Instr::StoreHeader { .. }
            | Instr::Store { .. }
            | Instr::EndCell { .. } => {}
        }
    }
    lines.push(format!(
        "return ({}, ({}));",
        slice(0),
        value_list(&program.fields)
    ));
    lines
}
