//! Field accessors and tensor/tuple conversions for structs and messages.

use tessera_core::Field;

use super::render::{self, TypeRenderer};
use super::writer::{SectionTag, WriterContext, WrittenFunction};

/// Exit code raised when a non-null struct was expected.
const NULL_STRUCT_EXIT_CODE: u32 = 128;

pub(crate) fn write_accessors(
    ctx: &mut WriterContext,
    types: &TypeRenderer<'_>,
    ty: &str,
    fields: &[Field],
    tag: &SectionTag,
) {
    let tensor = types.tensor(fields);
    let names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
    let values = render::value_list(&names);

    for field in fields {
        let name = format!("${ty}$_get_{}", field.name);
        let mut body: Vec<String> = render::destructure(&names, "v").into_iter().collect();
        body.push(format!("return {};", render::value(&field.name)));
        ctx.add(
            WrittenFunction::new(
                name.clone(),
                format!("{} {name}({tensor} v)", types.func_type(&field.ty)),
                tag.clone(),
            )
            .inline()
            .body(body),
        );
    }

    for suffix in ["to_tuple", "as_optional"] {
        let name = format!("${ty}$_{suffix}");
        let mut body: Vec<String> = render::destructure(&names, "v").into_iter().collect();
        body.push(format!("return [{values}];"));
        ctx.add(
            WrittenFunction::new(
                name.clone(),
                format!("tuple {name}({tensor} v)"),
                tag.clone(),
            )
            .inline()
            .body(body),
        );
    }

    let name = format!("${ty}$_not_null");
    let mut body = vec![format!("throw_if({NULL_STRUCT_EXIT_CODE}, null?(v));")];
    if !fields.is_empty() {
        body.push(format!("var [{values}] = v;"));
    }
    body.push(format!("return ({values});"));
    ctx.add(
        WrittenFunction::new(name.clone(), format!("{tensor} {name}(tuple v)"), tag.clone())
            .inline()
            .body(body),
    );
}
