//! Runtime helpers every artifact carries.

use tessera_cell::STRING_CHUNK_BYTES;

use super::writer::{SectionTag, WriterContext, WrittenFunction};

fn lines(body: &[&str]) -> Vec<String> {
    body.iter().map(|l| (*l).to_owned()).collect()
}

pub(crate) fn write_stdlib(ctx: &mut WriterContext) {
    ctx.global("global (int, slice, int, slice) __tessera_context;");

    ctx.add(
        WrittenFunction::new(
            "__tessera_not_null",
            "forall X -> X __tessera_not_null(X x)",
            SectionTag::Stdlib,
        )
        .inline()
        .body(lines(&["throw_if(128, null?(x));", "return x;"])),
    );

    ctx.add(
        WrittenFunction::new(
            "__tessera_store_address",
            "builder __tessera_store_address(builder b, slice address)",
            SectionTag::Stdlib,
        )
        .inline()
        .body(lines(&["return b.store_slice(address);"])),
    );

    ctx.add(
        WrittenFunction::new(
            "__tessera_load_address",
            "(slice, slice) __tessera_load_address(slice s)",
            SectionTag::Stdlib,
        )
        .inline()
        .body(lines(&["var address = s~load_msg_addr();", "return (s, address);"])),
    );

    ctx.add(
        WrittenFunction::new(
            "__tessera_address",
            "slice __tessera_address(int chain, int hash)",
            SectionTag::Stdlib,
        )
        .inline()
        .body(lines(&[
            "var b = begin_cell();",
            "b = b.store_uint(2, 2);",
            "b = b.store_uint(0, 1);",
            "b = b.store_int(chain, 8);",
            "b = b.store_uint(hash, 256);",
            "return b.end_cell().begin_parse();",
        ])),
    );

    // Snake layout: each cell carries one chunk and links the rest.
    let chunk_bits = STRING_CHUNK_BYTES * 8;
    ctx.add(
        WrittenFunction::new(
            "__tessera_string_to_cell",
            "cell __tessera_string_to_cell(slice s)",
            SectionTag::Stdlib,
        )
        .inline_ref()
        .body(vec![
            format!("if (s.slice_bits() <= {chunk_bits}) {{"),
            "    return begin_cell().store_slice(s).end_cell();".to_owned(),
            "}".to_owned(),
            format!("var head = s~load_bits({chunk_bits});"),
            "return begin_cell().store_slice(head).store_ref(__tessera_string_to_cell(s)).end_cell();"
                .to_owned(),
        ]),
    );
}
