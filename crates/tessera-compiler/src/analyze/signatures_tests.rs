use tessera_core::{FieldType, TypeDescriptor, TypeStore};

use super::signatures::snake_case;
use super::{implicit_header, resolve_signatures, tlb_type};
use crate::CompileError;
use crate::test_utils::geometry;

fn schema(store: &TypeStore, name: &str) -> String {
    store
        .get(name)
        .and_then(|t| t.schema.clone())
        .expect("schema resolved")
}

#[test]
fn struct_schemas() {
    let resolved = resolve_signatures(&geometry()).unwrap();

    assert_eq!(schema(&resolved, "Point"), "_ x:int257 y:int257 = Point");
    assert_eq!(
        schema(&resolved, "Point2"),
        "_ p:Point{x:int257,y:int257} z:int257 = Point2"
    );
    assert_eq!(resolved.get("Point").unwrap().header_value, None);
}

#[test]
fn implicit_message_header() {
    let store = TypeStore::new().with(
        TypeDescriptor::message("TransferNotification")
            .with_field("amount", FieldType::coins())
            .with_field("sender", FieldType::Address),
    );
    let resolved = resolve_signatures(&store).unwrap();
    let ty = resolved.get("TransferNotification").unwrap();

    let body = "transfer_notification amount:coins sender:address = TransferNotification";
    let header = implicit_header(body);
    assert_eq!(ty.header_value, Some(header));
    assert!(header <= 0x7fff_ffff);
    assert_eq!(
        ty.schema.as_deref(),
        Some(format!("transfer_notification#{header:08x} amount:coins sender:address = TransferNotification").as_str())
    );
}

#[test]
fn explicit_header_is_kept() {
    let mut msg = TypeDescriptor::message("Ping").with_field("seq", FieldType::uint(64));
    msg.header_value = Some(0x0000_0042);
    let resolved = resolve_signatures(&TypeStore::new().with(msg)).unwrap();

    assert_eq!(
        schema(&resolved, "Ping"),
        "ping#00000042 seq:uint64 = Ping"
    );
    assert_eq!(resolved.get("Ping").unwrap().header_value, Some(0x42));
}

#[test]
fn duplicate_header_is_rejected() {
    let mut a = TypeDescriptor::message("A");
    a.header_value = Some(7);
    let mut b = TypeDescriptor::message("B");
    b.header_value = Some(7);

    let err = resolve_signatures(&TypeStore::new().with(a).with(b)).unwrap_err();
    assert!(matches!(
        err,
        CompileError::DuplicateHeader { header: 7, ref first, ref second } if first == "A" && second == "B"
    ));
    assert_eq!(err.to_string(), "messages `A` and `B` share header 0x00000007");
}

#[test]
fn input_store_is_untouched() {
    let store = geometry();
    let _ = resolve_signatures(&store).unwrap();
    assert!(store.get("Point").unwrap().schema.is_none());
}

#[test]
fn tlb_names() {
    let store = geometry();
    let cases = [
        (FieldType::coins(), "coins"),
        (FieldType::uint(8), "uint8"),
        (FieldType::Bits { bits: 256 }, "bits256"),
        (FieldType::String, "^string"),
        (FieldType::optional(FieldType::Bool), "Maybe bool"),
        (
            FieldType::optional(FieldType::struct_ref("Point")),
            "Maybe ^Point",
        ),
        (
            FieldType::map(FieldType::Address, FieldType::struct_ref("Point")),
            "dict<address, Point>",
        ),
    ];
    for (ty, expected) in cases {
        assert_eq!(tlb_type(&store, &ty), expected, "{ty}");
    }
}

#[test]
fn snake_case_names() {
    assert_eq!(snake_case("Transfer"), "transfer");
    assert_eq!(snake_case("TransferNotification"), "transfer_notification");
    assert_eq!(snake_case("ping"), "ping");
}
