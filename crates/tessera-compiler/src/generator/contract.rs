//! Persistent storage operations of contracts.
//!
//! Contract data starts with a one-bit initialized flag. While it is clear the
//! data holds the init arguments, which are turned into the initial field
//! tensor on first load.

use tessera_cell::names;
use tessera_core::{Field, TypeDescriptor};

use super::constants::func_literal;
use super::render::{self, TypeRenderer};
use super::writer::{SectionTag, WriterContext, WrittenFunction};

fn params(types: &TypeRenderer<'_>, init: &[Field]) -> String {
    init.iter()
        .map(|p| format!("{} {}", types.func_type(&p.ty), render::value(&p.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn init_names(init: &[Field]) -> Vec<String> {
    init.iter().map(|p| p.name.clone()).collect()
}

/// Initial value of a field: its default, an init argument of the same name,
/// or null.
fn initial_value(field: &Field, init: &[Field]) -> String {
    if let Some(value) = &field.default_value {
        return func_literal(value);
    }
    if init.iter().any(|p| p.name == field.name) {
        return render::value(&field.name);
    }
    "null()".to_owned()
}

pub(crate) fn write_contract_ops(
    ctx: &mut WriterContext,
    types: &TypeRenderer<'_>,
    contract: &TypeDescriptor,
) {
    let c = &contract.name;
    let tag = SectionTag::Type(c.clone());
    let tensor = types.tensor(&contract.fields);
    let init = contract.init.as_deref().unwrap_or(&[]);
    let init_id = names::init_id(c);

    let init_name = format!("${c}$_contract_init");
    let values: Vec<String> = contract
        .fields
        .iter()
        .map(|f| initial_value(f, init))
        .collect();
    ctx.add(
        WrittenFunction::new(
            init_name.clone(),
            format!("{tensor} {init_name}({})", params(types, init)),
            tag.clone(),
        )
        .impure()
        .inline()
        .body(vec![format!("return ({});", values.join(", "))]),
    );

    let load_name = format!("${c}$_contract_load");
    let mut body = vec![
        "slice $sc = get_data().begin_parse();".to_owned(),
        "int $loaded = $sc~load_int(1);".to_owned(),
        "if ($loaded) {".to_owned(),
        format!("    return $sc~{}();", names::load_no_opcode(c)),
        "}".to_owned(),
    ];
    let args = render::value_list(&init_names(init));
    if contract.init.is_some() {
        match render::destructure(&init_names(init), &format!("$sc~{}()", names::load(&init_id))) {
            Some(line) => body.push(line),
            None => body.push(format!("$sc~{}();", names::load(&init_id))),
        }
    }
    body.push("$sc.end_parse();".to_owned());
    body.push(format!("return {init_name}({args});"));
    ctx.add(
        WrittenFunction::new(load_name.clone(), format!("{tensor} {load_name}()"), tag.clone())
            .impure()
            .inline()
            .body(body),
    );

    let store_name = format!("${c}$_contract_store");
    ctx.add(
        WrittenFunction::new(
            store_name.clone(),
            format!("() {store_name}({tensor} v)"),
            tag,
        )
        .impure()
        .inline()
        .body(vec![
            "builder b = begin_cell();".to_owned(),
            "b = b.store_int(true, 1);".to_owned(),
            format!("b = {}(b, v);", names::store(c)),
            "set_data(b.end_cell());".to_owned(),
        ]),
    );
}

/// Initial data cell for deployment: a clear flag followed by the init arguments.
pub(crate) fn write_init_data(
    ctx: &mut WriterContext,
    types: &TypeRenderer<'_>,
    contract: &TypeDescriptor,
) {
    let c = &contract.name;
    let name = format!("${c}$_init_data");
    let mut body = vec![
        "builder b = begin_cell();".to_owned(),
        "b = b.store_int(false, 1);".to_owned(),
    ];
    if let Some(init) = &contract.init {
        body.push(format!(
            "b = {}(b, ({}));",
            names::store(&names::init_id(c)),
            render::value_list(&init_names(init))
        ));
    }
    body.push("return b.end_cell();".to_owned());

    let init = contract.init.as_deref().unwrap_or(&[]);
    ctx.add(
        WrittenFunction::new(
            name.clone(),
            format!("cell {name}({})", params(types, init)),
            SectionTag::TypeInit(c.clone()),
        )
        .inline()
        .body(body),
    );
}
