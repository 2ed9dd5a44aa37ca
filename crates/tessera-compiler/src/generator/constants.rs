//! Evaluated constants: procedures returning them and their artifact listing.

use serde::Serialize;
use tessera_core::{Address, ConstValue, ConstantDescriptor, Origin, TypeStore};

use super::render::TypeRenderer;
use super::writer::{SectionTag, WriterContext, WrittenFunction};

/// A constant as exposed to client bindings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConstantOutput {
    pub name: String,
    /// Literal in client-binding syntax (`123n`, `true`, `"text"`, `null`).
    pub value: String,
    pub from_contract: bool,
}

fn hash_hex(address: &Address) -> String {
    address.hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Plain printable ASCII as-is; anything else as a hex slice literal (`"..."s`).
fn string_literal(s: &str) -> String {
    let plain = s
        .bytes()
        .all(|b| (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\');
    if plain {
        format!("\"{s}\"")
    } else {
        let hex: String = s.bytes().map(|b| format!("{b:02x}")).collect();
        format!("\"{hex}\"s")
    }
}

/// Source literal for a constant value.
pub(crate) fn func_literal(value: &ConstValue) -> String {
    match value {
        ConstValue::Int(v) => v.to_string(),
        ConstValue::Bool(true) => "true".to_owned(),
        ConstValue::Bool(false) => "false".to_owned(),
        ConstValue::String(s) => string_literal(s),
        ConstValue::Null => "null()".to_owned(),
        ConstValue::Address(a) => {
            format!("__tessera_address({}, 0x{})", a.workchain, hash_hex(a))
        }
    }
}

/// Client-binding literal for a constant value.
pub fn binding_literal(value: &ConstValue) -> String {
    match value {
        ConstValue::Int(v) => format!("{v}n"),
        ConstValue::Bool(b) => b.to_string(),
        ConstValue::String(s) => serde_json::Value::String(s.clone()).to_string(),
        ConstValue::Null => "null".to_owned(),
        ConstValue::Address(a) => format!("address(\"{a}\")"),
    }
}

fn write_constant(
    ctx: &mut WriterContext,
    types: &TypeRenderer<'_>,
    name: String,
    constant: &ConstantDescriptor,
    tag: SectionTag,
) {
    let Some(value) = &constant.resolved else {
        tracing::debug!(name = %constant.name, "constant was never evaluated");
        return;
    };
    ctx.add(
        WrittenFunction::new(
            name.clone(),
            format!("{} {name}()", types.func_type(&constant.ty)),
            tag,
        )
        .inline()
        .body(vec![format!("return {};", func_literal(value))]),
    );
}

/// Free-standing constants go to the constants section; contract constants
/// live with their contract.
pub(crate) fn write_constants(ctx: &mut WriterContext, types: &TypeRenderer<'_>, store: &TypeStore) {
    for constant in store.constants() {
        let name = format!("$const_{}", constant.name);
        write_constant(ctx, types, name, constant, SectionTag::Constants);
    }
    for ty in store.iter().filter(|t| t.is_contract()) {
        for constant in &ty.constants {
            let name = format!("${}$_const_{}", ty.name, constant.name);
            write_constant(ctx, types, name, constant, SectionTag::Type(ty.name.clone()));
        }
    }
}

/// Constants visible to client bindings of `entry`: user-defined globals
/// followed by the entry contract's own.
pub(crate) fn constant_outputs(store: &TypeStore, entry: &str) -> Vec<ConstantOutput> {
    let globals = store
        .constants()
        .iter()
        .filter(|c| c.origin == Origin::User)
        .map(|c| (c, false));
    let own = store
        .get(entry)
        .into_iter()
        .flat_map(|t| t.constants.iter())
        .map(|c| (c, true));

    globals
        .chain(own)
        .filter_map(|(c, from_contract)| {
            c.resolved.as_ref().map(|value| ConstantOutput {
                name: c.name.clone(),
                value: binding_literal(value),
                from_contract,
            })
        })
        .collect()
}
