use num_bigint::BigInt;

use crate::{Address, FieldType, IntFormat, TypeKind, VarWidth};

#[test]
fn int_format_parse_and_display() {
    assert_eq!("int257".parse::<IntFormat>().unwrap(), IntFormat::Int(257));
    assert_eq!("uint8".parse::<IntFormat>().unwrap(), IntFormat::Uint(8));
    assert_eq!("coins".parse::<IntFormat>().unwrap(), IntFormat::coins());
    assert_eq!(
        "varuint16".parse::<IntFormat>().unwrap(),
        IntFormat::VarUint(VarWidth::W16)
    );
    assert_eq!(
        "varint32".parse::<IntFormat>().unwrap(),
        IntFormat::VarInt(VarWidth::W32)
    );

    assert_eq!(IntFormat::coins().to_string(), "coins");
    assert_eq!(IntFormat::VarUint(VarWidth::W32).to_string(), "varuint32");
    assert_eq!(IntFormat::Int(64).to_string(), "int64");
}

#[test]
fn int_format_rejects_bad_widths() {
    assert!("int0".parse::<IntFormat>().is_err());
    assert!("int258".parse::<IntFormat>().is_err());
    assert!("uint257".parse::<IntFormat>().is_err());
    assert!("varint8".parse::<IntFormat>().is_err());
    assert!("float".parse::<IntFormat>().is_err());
}

#[test]
fn int_format_widths() {
    assert_eq!(IntFormat::Int(257).max_bits(), 257);
    assert_eq!(IntFormat::coins().max_bits(), 124);
    assert_eq!(IntFormat::VarInt(VarWidth::W32).max_bits(), 253);
}

#[test]
fn int_format_ranges() {
    let int = |v: i64| BigInt::from(v);
    assert!(IntFormat::Int(8).fits(&int(-128)));
    assert!(!IntFormat::Int(8).fits(&int(-129)));
    assert!(!IntFormat::Int(8).fits(&int(128)));
    assert!(IntFormat::Uint(8).fits(&int(255)));
    assert!(!IntFormat::Uint(8).fits(&int(-1)));
    assert!(IntFormat::coins().fits(&int(1_000_000_000)));
}

#[test]
fn int_format_ranges_beyond_128_bits() {
    let two = BigInt::from(2);
    let half = two.pow(256);

    assert!(IntFormat::Int(257).fits(&-half.clone()));
    assert!(IntFormat::Int(257).fits(&(half.clone() - 1)));
    assert!(!IntFormat::Int(257).fits(&half));
    assert!(!IntFormat::Int(257).fits(&(-half.clone() - 1)));
    assert!(IntFormat::Int(257).fits(&two.pow(200)));

    assert!(IntFormat::Uint(256).fits(&(half.clone() - 1)));
    assert!(!IntFormat::Uint(256).fits(&half));
    assert!(!IntFormat::coins().fits(&two.pow(120)));
    assert!(IntFormat::coins().fits(&(two.pow(120) - 1)));
}

#[test]
fn field_type_json_shape() {
    let ty: FieldType = serde_json::from_str(
        r#"{"kind": "optional", "inner": {"kind": "int", "format": "uint32"}}"#,
    )
    .unwrap();
    assert_eq!(ty, FieldType::optional(FieldType::uint(32)));

    let ty: FieldType = serde_json::from_str(r#"{"kind": "int"}"#).unwrap();
    assert_eq!(ty, FieldType::int(257));
}

#[test]
fn referenced_structs_see_through_indirections() {
    let ty = FieldType::map(
        FieldType::int(257),
        FieldType::optional(FieldType::struct_ref("B")),
    );
    assert_eq!(ty.referenced_structs(), vec!["B"]);
    assert_eq!(ty.inline_struct(), None);
    assert_eq!(FieldType::struct_ref("A").inline_struct(), Some("A"));
}

#[test]
fn field_type_display() {
    let ty = FieldType::map(FieldType::int(257), FieldType::struct_ref("Point"));
    assert_eq!(ty.to_string(), "map<int257, Point>");
    assert_eq!(FieldType::optional(FieldType::Bool).to_string(), "bool?");
}

#[test]
fn traits_are_not_allocated() {
    assert!(!TypeKind::Trait.is_allocated());
    assert!(TypeKind::Contract.is_allocated());
}

#[test]
fn address_text_form() {
    let text = format!("0:{}", "ab".repeat(32));
    let addr: Address = text.parse().unwrap();
    assert_eq!(addr.workchain, 0);
    assert_eq!(addr.hash, [0xab; 32]);
    assert_eq!(addr.to_string(), text);

    let masterchain: Address = format!("-1:{}", "00".repeat(32)).parse().unwrap();
    assert_eq!(masterchain.workchain, -1);

    assert!("0:abcd".parse::<Address>().is_err());
    assert!("nocolon".parse::<Address>().is_err());
}
