//! Schema signatures and implicit message headers.
//!
//! Every struct and message gets a TL-B style schema line. A message without
//! an explicit header takes `crc32(schema) & 0x7fff_ffff` as its discriminator.

use indexmap::IndexMap;
use tessera_core::{FieldType, TypeDescriptor, TypeKind, TypeStore};

use crate::{CompileError, Result};

const IMPLICIT_HEADER_MASK: u32 = 0x7fff_ffff;

/// Returns a new store with `schema` and `header_value` filled in.
#[tracing::instrument(level = "debug", skip_all)]
pub fn resolve_signatures(store: &TypeStore) -> Result<TypeStore> {
    let mut resolved = store.clone();
    let mut seen: IndexMap<u32, String> = IndexMap::new();

    for ty in store.iter() {
        let (schema, header) = match ty.kind {
            TypeKind::Struct => (Some(struct_schema(store, ty)), None),
            TypeKind::Message => {
                let body = ty
                    .schema
                    .clone()
                    .unwrap_or_else(|| message_body_schema(store, ty));
                let header = ty
                    .header_value
                    .unwrap_or_else(|| implicit_header(&body));
                (Some(with_header(&body, header)), Some(header))
            }
            TypeKind::Contract | TypeKind::Trait => (None, None),
        };

        if let Some(header) = header {
            if let Some(first) = seen.get(&header) {
                return Err(CompileError::DuplicateHeader {
                    header,
                    first: first.clone(),
                    second: ty.name.clone(),
                });
            }
            seen.insert(header, ty.name.clone());
        }

        if let Some(target) = resolved.get_mut(&ty.name) {
            target.schema = schema;
            target.header_value = header;
        }
    }

    Ok(resolved)
}

pub fn implicit_header(schema: &str) -> u32 {
    crc32fast::hash(schema.as_bytes()) & IMPLICIT_HEADER_MASK
}

/// TL-B name of a field type.
pub fn tlb_type(store: &TypeStore, ty: &FieldType) -> String {
    match ty {
        FieldType::Int { format } => format.to_string(),
        FieldType::Bool => "bool".to_owned(),
        FieldType::Address => "address".to_owned(),
        FieldType::Bits { bits } => format!("bits{bits}"),
        FieldType::Cell => "^cell".to_owned(),
        FieldType::Slice => "^slice".to_owned(),
        FieldType::Builder => "^builder".to_owned(),
        FieldType::String => "^string".to_owned(),
        FieldType::Optional { inner } => match inner.as_ref() {
            FieldType::Struct { name } => format!("Maybe ^{name}"),
            other => format!("Maybe {}", tlb_type(store, other)),
        },
        FieldType::Map { key, value } => {
            format!("dict<{}, {}>", plain_name(key), plain_name(value))
        }
        FieldType::Struct { name } => nested_signature(store, name),
    }
}

/// Dictionary components are named, never expanded.
fn plain_name(ty: &FieldType) -> String {
    match ty {
        FieldType::Struct { name } => name.clone(),
        other => other.to_string(),
    }
}

/// `Point{x:int257,y:int257}`; only inline containment is expanded, which the
/// dependency sort guarantees to be acyclic.
fn nested_signature(store: &TypeStore, name: &str) -> String {
    let Some(ty) = store.get(name) else {
        return name.to_owned();
    };
    let fields: Vec<String> = ty
        .fields
        .iter()
        .map(|f| format!("{}:{}", f.name, tlb_type(store, &f.ty)))
        .collect();
    format!("{name}{{{}}}", fields.join(","))
}

fn fields_schema(store: &TypeStore, ty: &TypeDescriptor) -> String {
    ty.fields
        .iter()
        .map(|f| format!(" {}:{}", f.name, tlb_type(store, &f.ty)))
        .collect()
}

fn struct_schema(store: &TypeStore, ty: &TypeDescriptor) -> String {
    if let Some(schema) = &ty.schema {
        return schema.clone();
    }
    format!("_{} = {}", fields_schema(store, ty), ty.name)
}

fn message_body_schema(store: &TypeStore, ty: &TypeDescriptor) -> String {
    format!(
        "{}{} = {}",
        snake_case(&ty.name),
        fields_schema(store, ty),
        ty.name
    )
}

/// Inserts `#xxxxxxxx` after the constructor name.
fn with_header(body: &str, header: u32) -> String {
    match body.split_once(' ') {
        Some((ctor, rest)) => format!("{ctor}#{header:08x} {rest}"),
        None => format!("{body}#{header:08x}"),
    }
}

/// `TransferNotification` -> `transfer_notification`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
