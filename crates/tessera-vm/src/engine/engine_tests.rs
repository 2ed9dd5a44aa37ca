use num_bigint::BigInt;
use tessera_cell::{Cell, CellBuilder, CellError, ProgramKind, ProgramSet};
use tessera_compiler::{CompileOptions, Session};
use tessera_core::{Address, Expr, Field, FieldType, TypeDescriptor, TypeStore};

use super::{ContractData, FuelLimits, RuntimeError, VM, Value};

fn fixture() -> TypeStore {
    TypeStore::new()
        .with(
            TypeDescriptor::structure("Point")
                .with_field("x", FieldType::int(257))
                .with_field("y", FieldType::int(257)),
        )
        .with(
            TypeDescriptor::structure("Point3")
                .with_field("a", FieldType::struct_ref("Point"))
                .with_field("b", FieldType::struct_ref("Point")),
        )
        .with(
            TypeDescriptor::structure("Deep")
                .with_fields((0..11).map(|i| Field::new(format!("f{i}"), FieldType::int(257)))),
        )
        .with(
            TypeDescriptor::structure("Flags")
                .with_field("ok", FieldType::Bool)
                .with_field("tag", FieldType::uint(8))
                .with_field("blob", FieldType::Bits { bits: 12 })
                .with_field("payload", FieldType::Cell)
                .with_field("extra", FieldType::map(FieldType::int(32), FieldType::int(32))),
        )
        .with(
            TypeDescriptor::message("Bouncy")
                .with_header(Expr::int(0x0bad_cafe))
                .with_field("a", FieldType::int(257))
                .with_field("b", FieldType::int(257))
                .with_field("c", FieldType::int(257))
                .with_field("g", FieldType::int(257)),
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
                .with_init([Field::new("owner", FieldType::Address)]),
        )
}

fn programs() -> ProgramSet {
    programs_with(fixture())
}

fn programs_with(store: TypeStore) -> ProgramSet {
    Session::new(store)
        .compile(&CompileOptions::new("Wallet"))
        .unwrap()
        .programs
}

fn point(x: i64, y: i64) -> Value {
    Value::structure([("x", Value::int(x)), ("y", Value::int(y))])
}

fn owner() -> Address {
    Address::new(0, [0xab; 32])
}

fn wallet(seqno: i64, origin: Option<Value>) -> Value {
    Value::structure([
        ("owner", Value::Address(owner())),
        ("seqno", Value::int(seqno)),
        ("origin", origin.unwrap_or(Value::Null)),
    ])
}

fn bouncy() -> Value {
    Value::structure([
        ("a", Value::int(1)),
        ("b", Value::int(-2)),
        ("c", Value::int(3)),
        ("g", Value::int(4)),
    ])
}

#[test]
fn single_cell_round_trip() {
    let programs = programs();
    let vm = VM::new(&programs);
    let value = point(7, -7);

    let cell = vm.serialize("Point", &value).unwrap();
    assert_eq!(cell.bit_len(), 514);
    assert!(cell.refs().is_empty());
    assert_eq!(vm.parse("Point", &cell).unwrap(), value);
}

#[test]
fn chained_cells_round_trip() {
    let programs = programs();
    let vm = VM::new(&programs);
    let value = Value::structure((0..11).map(|i| (format!("f{i}"), Value::int(i * 1000 - 5000))));

    let cell = vm.serialize("Deep", &value).unwrap();
    assert_eq!(cell.tree_size(), 4);
    assert_eq!(cell.bit_len(), 771);
    assert_eq!(vm.parse("Deep", &cell).unwrap(), value);
}

#[test]
fn chain_past_256_cells_round_trip() {
    let store = fixture().with(TypeDescriptor::structure("Long").with_fields(
        (0..260).map(|i| Field::new(format!("f{i}"), FieldType::Bits { bits: 1000 })),
    ));
    let programs = programs_with(store);
    let vm = VM::new(&programs);
    let value = Value::structure((0..260u32).map(|i| {
        let mut bits = i.to_be_bytes().repeat(32);
        bits.truncate(125);
        (format!("f{i}"), Value::Bits(bits))
    }));

    let cell = vm.serialize("Long", &value).unwrap();
    assert_eq!(cell.tree_size(), 260);
    let mut last = &cell;
    for _ in 0..259 {
        assert_eq!(last.bit_len(), 1000);
        last = &last.refs()[0];
    }
    assert_eq!(last.parse().load_bits(32).unwrap(), 259u32.to_be_bytes());
    assert_eq!(vm.parse("Long", &cell).unwrap(), value);
}

#[test]
fn full_width_integers_round_trip() {
    let store = fixture().with(
        TypeDescriptor::structure("Wide")
            .with_field("x", FieldType::int(257))
            .with_field("y", FieldType::uint(256))
            .with_field("z", FieldType::coins())
            .with_field("w", FieldType::int(200)),
    );
    let programs = programs_with(store);
    let vm = VM::new(&programs);
    let one = || BigInt::from(1);
    let wide = |x: BigInt, y: BigInt, z: BigInt, w: BigInt| {
        Value::structure([
            ("x", Value::Int(x)),
            ("y", Value::Int(y)),
            ("z", Value::Int(z)),
            ("w", Value::Int(w)),
        ])
    };

    for value in [
        wide(one() << 200, (one() << 256) - 1, (one() << 120) - 1, -(one() << 199usize)),
        wide(-(one() << 256usize), BigInt::from(0), BigInt::from(0), (one() << 199) - 1),
        wide((one() << 256) - 1, one() << 255, one() << 64, BigInt::from(-1)),
    ] {
        let cell = vm.serialize("Wide", &value).unwrap();
        assert_eq!(vm.parse("Wide", &cell).unwrap(), value);
    }

    let too_wide = wide(one() << 256, BigInt::from(0), BigInt::from(0), BigInt::from(0));
    assert_eq!(
        vm.serialize("Wide", &too_wide).unwrap_err(),
        RuntimeError::Cell(CellError::ValueOutOfRange { bits: 257 })
    );
    let negative = wide(BigInt::from(0), BigInt::from(-1), BigInt::from(0), BigInt::from(0));
    assert_eq!(
        vm.serialize("Wide", &negative).unwrap_err(),
        RuntimeError::Cell(CellError::ValueOutOfRange { bits: 256 })
    );
}

#[test]
fn boxed_struct_lives_in_reference() {
    let programs = programs();
    let vm = VM::new(&programs);
    let value = Value::structure([("a", point(1, 2)), ("b", point(3, 4))]);

    let cell = vm.serialize("Point3", &value).unwrap();
    assert_eq!(cell.bit_len(), 514);
    assert_eq!(cell.refs().len(), 1);
    assert_eq!(cell.refs()[0].bit_len(), 514);
    assert_eq!(vm.parse("Point3", &cell).unwrap(), value);
}

#[test]
fn scalar_kinds_round_trip() {
    let programs = programs();
    let vm = VM::new(&programs);
    let mut payload = CellBuilder::new();
    payload.store_uint(0xfeed, 16).unwrap();
    let payload = payload.end_cell();

    for extra in [Value::Null, Value::Cell(Cell::empty())] {
        let value = Value::structure([
            ("ok", Value::Bool(true)),
            ("tag", Value::int(200)),
            ("blob", Value::Bits(vec![0xab, 0xc0])),
            ("payload", Value::Cell(payload.clone())),
            ("extra", extra),
        ]);
        let cell = vm.serialize("Flags", &value).unwrap();
        assert_eq!(vm.parse("Flags", &cell).unwrap(), value);
    }
}

#[test]
fn message_starts_with_header() {
    let programs = programs();
    let vm = VM::new(&programs);

    let cell = vm.serialize("Bouncy", &bouncy()).unwrap();
    assert_eq!(cell.parse().load_uint(32).unwrap(), 0x0bad_cafe);
    assert_eq!(cell.bit_len(), 32 + 3 * 257);
    assert_eq!(cell.refs().len(), 1);
    assert_eq!(vm.parse("Bouncy", &cell).unwrap(), bouncy());
}

#[test]
fn opcode_mismatch_aborts() {
    let programs = programs();
    let vm = VM::new(&programs);
    let mut b = CellBuilder::new();
    b.store_uint(0xdead_beef, 32).unwrap();
    let cell = b.end_cell();

    let err = vm.parse("Bouncy", &cell).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::OpcodeMismatch {
            expected: 0x0bad_cafe,
            found: 0xdead_beef,
        }
    );
}

#[test]
fn bounced_body_defaults_missing_fields() {
    let programs = programs();
    let vm = VM::new(&programs);

    // Only the first cell comes back in a bounce.
    let mut b = CellBuilder::new();
    b.store_uint(0x0bad_cafe, 32).unwrap();
    for v in [1, -2, 3] {
        b.store_int(v, 257).unwrap();
    }
    let truncated = b.end_cell();

    let value = vm.parse_bounced("Bouncy", &truncated).unwrap();
    assert_eq!(value.get("a"), Some(&Value::int(1)));
    assert_eq!(value.get("c"), Some(&Value::int(3)));
    assert_eq!(value.get("g"), Some(&Value::int(0)));

    let err = vm.parse("Bouncy", &truncated).unwrap_err();
    assert_eq!(err, RuntimeError::Cell(CellError::RefUnderflow));
}

#[test]
fn cleared_optional_matches_never_set() {
    let programs = programs();
    let vm = VM::new(&programs);

    let never_set = vm.serialize("Wallet", &wallet(0, None)).unwrap();
    let set = vm.serialize("Wallet", &wallet(0, Some(point(5, 6)))).unwrap();
    let cleared = vm.serialize("Wallet", &wallet(0, None)).unwrap();

    assert_ne!(set, never_set);
    assert_eq!(set.refs().len(), 1);
    assert_eq!(cleared, never_set);
    assert!(never_set.refs().is_empty());
    assert_eq!(
        vm.parse("Wallet", &set).unwrap().get("origin"),
        Some(&point(5, 6))
    );
}

#[test]
fn strings_span_chunks() {
    let programs = programs();
    let vm = VM::new(&programs);
    let memo = "x".repeat(300);

    for memo in [Value::Null, Value::from("hi"), Value::String(memo)] {
        let value = Value::structure([
            ("amount", Value::int(1_500_000_000)),
            ("to", Value::Address(owner())),
            ("memo", memo),
        ]);
        let cell = vm.serialize("Transfer", &value).unwrap();
        assert_eq!(vm.parse("Transfer", &cell).unwrap(), value);
    }
}

#[test]
fn optional_wrapper_round_trip() {
    let programs = programs();
    let vm = VM::new(&programs);

    let none = vm.serialize_opt("Point", &Value::Null).unwrap();
    assert_eq!((none.bit_len(), none.refs().len()), (1, 0));
    assert_eq!(vm.parse_opt("Point", &none).unwrap(), Value::Null);

    let some = vm.serialize_opt("Point", &point(9, 9)).unwrap();
    assert_eq!(vm.parse_opt("Point", &some).unwrap(), point(9, 9));
}

#[test]
fn contract_storage_lifecycle() {
    let programs = programs();
    let vm = VM::new(&programs);
    let params = Value::structure([("owner", Value::Address(owner()))]);

    let data = vm.init_data("Wallet", &params).unwrap();
    assert_eq!(data.bit_len(), 1 + 267);
    assert_eq!(
        vm.load_contract("Wallet", &data).unwrap(),
        ContractData::Pending(params)
    );

    let state = wallet(3, Some(point(0, 0)));
    let data = vm.contract_data("Wallet", &state).unwrap();
    assert_eq!(
        vm.load_contract("Wallet", &data).unwrap(),
        ContractData::Initialized(state)
    );
}

#[test]
fn shape_errors() {
    let programs = programs();
    let vm = VM::new(&programs);

    let wrong = Value::structure([("x", Value::Bool(true)), ("y", Value::int(0))]);
    assert_eq!(
        vm.serialize("Point", &wrong).unwrap_err(),
        RuntimeError::ShapeMismatch {
            field: "x".to_owned(),
            expected: "int257".to_owned(),
        }
    );

    let partial = Value::structure([("x", Value::int(0))]);
    assert_eq!(
        vm.serialize("Point", &partial).unwrap_err(),
        RuntimeError::MissingField {
            type_name: "Point".to_owned(),
            field: "y".to_owned(),
        }
    );

    assert_eq!(
        vm.serialize("Wallet", &wallet(-1, None)).unwrap_err(),
        RuntimeError::Cell(CellError::ValueOutOfRange { bits: 32 })
    );
}

#[test]
fn program_lookup_errors() {
    let programs = programs();
    let vm = VM::new(&programs);
    let cell = Cell::empty();

    assert_eq!(
        vm.parse("Ghost", &cell).unwrap_err(),
        RuntimeError::UnknownProgram("$Ghost$_load".to_owned())
    );
    assert_eq!(
        vm.load("$Point$_store", &mut cell.parse()).unwrap_err(),
        RuntimeError::WrongProgramKind {
            name: "$Point$_store".to_owned(),
            expected: ProgramKind::Parser,
            found: ProgramKind::Serializer,
        }
    );
}

#[test]
fn fuel_limits() {
    let programs = programs();

    let starved = VM::new(&programs).limits(FuelLimits::new().exec_fuel(1));
    assert_eq!(
        starved.serialize("Point", &point(1, 1)).unwrap_err(),
        RuntimeError::ExecFuelExhausted(1)
    );

    let shallow = VM::new(&programs).limits(FuelLimits::new().recursion_limit(1));
    let nested = Value::structure([("a", point(1, 2)), ("b", point(3, 4))]);
    assert_eq!(
        shallow.serialize("Point3", &nested).unwrap_err(),
        RuntimeError::RecursionLimitExceeded(1)
    );
    assert!(shallow.serialize("Point", &point(1, 2)).is_ok());
}

#[test]
fn value_json() {
    let value = Value::structure([
        ("amount", Value::int(-12)),
        ("wide", Value::Int(BigInt::from(1) << 200)),
        ("ok", Value::Bool(true)),
        ("memo", Value::Null),
        ("blob", Value::Bits(vec![0xab, 0xc0])),
        ("origin", point(1, 2)),
    ]);
    let json = serde_json::to_string_pretty(&value).unwrap();

    insta::assert_snapshot!(json, @r#"
    {
      "amount": "-12",
      "wide": "1606938044258990275541962092341162602522202993782792835301376",
      "ok": true,
      "memo": null,
      "blob": "abc0",
      "origin": {
        "x": "1",
        "y": "2"
      }
    }
    "#);
}
