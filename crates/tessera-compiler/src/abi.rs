//! Contract ABI description and its content link.
//!
//! The ABI lists every user-facing struct and message with its schema and
//! discriminator; the link is a content hash of the rendered JSON, embedded in
//! the generated code so deployed contracts can point back to their ABI.

use serde::Serialize;
use tessera_core::{Origin, TypeKind, TypeStore};

use crate::Result;
use crate::analyze::tlb_type;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AbiField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AbiType {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<u32>,
    pub schema: String,
    pub fields: Vec<AbiField>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContractAbi {
    pub name: String,
    pub types: Vec<AbiType>,
}

impl ContractAbi {
    /// Collect structs and messages in store order.
    pub fn build(store: &TypeStore, contract: &str) -> Self {
        let types = store
            .iter()
            .filter(|t| matches!(t.kind, TypeKind::Struct | TypeKind::Message))
            .filter(|t| t.origin == Origin::User)
            .map(|t| AbiType {
                name: t.name.clone(),
                header: t.header_value,
                schema: t.schema.clone().unwrap_or_default(),
                fields: t
                    .fields
                    .iter()
                    .map(|f| AbiField {
                        name: f.name.clone(),
                        ty: tlb_type(store, &f.ty),
                    })
                    .collect(),
            })
            .collect();

        Self {
            name: contract.to_owned(),
            types,
        }
    }

    pub fn render(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Derives a stable link from rendered ABI content.
pub trait ContentAddresser {
    fn link(&self, content: &str) -> String;
}

/// `crc32:<8 hex digits>`
#[derive(Clone, Copy, Debug, Default)]
pub struct Crc32Addresser;

impl ContentAddresser for Crc32Addresser {
    fn link(&self, content: &str) -> String {
        format!("crc32:{:08x}", crc32fast::hash(content.as_bytes()))
    }
}
