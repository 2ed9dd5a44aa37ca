//! Shared fixtures for compiler tests.

use tessera_core::{
    ConstantDescriptor, Expr, Field, FieldType, LiteralEvaluator, TypeDescriptor, TypeStore,
};

use crate::CompilerContext;

/// `Point{x,y}`, `Point2{p: Point, z}`, `Point3{a: Point, b: Point}`.
pub fn geometry() -> TypeStore {
    TypeStore::new()
        .with(
            TypeDescriptor::structure("Point")
                .with_field("x", FieldType::int(257))
                .with_field("y", FieldType::int(257)),
        )
        .with(
            TypeDescriptor::structure("Point2")
                .with_field("p", FieldType::struct_ref("Point"))
                .with_field("z", FieldType::int(257)),
        )
        .with(
            TypeDescriptor::structure("Point3")
                .with_field("a", FieldType::struct_ref("Point"))
                .with_field("b", FieldType::struct_ref("Point")),
        )
}

/// `Deep` with eleven `int257` fields `f0..f10`.
pub fn deep() -> TypeDescriptor {
    TypeDescriptor::structure("Deep")
        .with_fields((0..11).map(|i| Field::new(format!("f{i}"), FieldType::int(257))))
}

/// `Deep` and `Deep2{a,b,c: Deep}`.
pub fn deep_store() -> TypeStore {
    TypeStore::new().with(deep()).with(
        TypeDescriptor::structure("Deep2")
            .with_field("a", FieldType::struct_ref("Deep"))
            .with_field("b", FieldType::struct_ref("Deep"))
            .with_field("c", FieldType::struct_ref("Deep")),
    )
}

/// Message whose last field `g` lands in the second cell.
pub fn bouncy() -> TypeDescriptor {
    TypeDescriptor::message("Bouncy")
        .with_header(Expr::int(0x0bad_cafe))
        .with_field("a", FieldType::int(257))
        .with_field("b", FieldType::int(257))
        .with_field("c", FieldType::int(257))
        .with_field("g", FieldType::int(257))
}

/// A small contract with a message, init arguments and constants.
pub fn wallet() -> TypeStore {
    TypeStore::new()
        .with_constant(ConstantDescriptor::new(
            "MAX_SUPPLY",
            FieldType::int(257),
            Expr::int(1_000_000),
        ))
        .with(
            TypeDescriptor::structure("Point")
                .with_field("x", FieldType::int(257))
                .with_field("y", FieldType::int(257)),
        )
        .with(
            TypeDescriptor::message("Transfer")
                .with_field("amount", FieldType::coins())
                .with_field("to", FieldType::Address)
                .with_field("memo", FieldType::optional(FieldType::String)),
        )
        .with(
            TypeDescriptor::contract("Wallet")
                .with_field("owner", FieldType::Address)
                .with_fields([
                    Field::new("seqno", FieldType::uint(32)).with_default(Expr::int(0)),
                ])
                .with_field("origin", FieldType::optional(FieldType::struct_ref("Point")))
                .with_init([Field::new("owner", FieldType::Address)])
                .with_constant(ConstantDescriptor::new(
                    "FEE",
                    FieldType::coins(),
                    Expr::binary(
                        tessera_core::BinaryOp::Div,
                        Expr::constant("MAX_SUPPLY"),
                        Expr::int(1000),
                    ),
                )),
        )
}

pub fn analyze(store: TypeStore) -> CompilerContext {
    CompilerContext::analyze(store, &LiteralEvaluator).expect("fixture should analyze")
}
