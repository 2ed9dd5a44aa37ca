//! Values consumed by serializers and produced by parsers.

use num_bigint::BigInt;
use serde::{Serialize, Serializer};
use tessera_cell::Cell;
use tessera_core::Address;

/// Runtime value of one field or of a whole struct tensor.
///
/// `Struct` keeps fields in declaration order, the order of the tensor the
/// emitted procedures pass around.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// Absent optional or empty dictionary.
    Null,
    Int(BigInt),
    Bool(bool),
    Address(Address),
    /// Fixed-width bit string, packed most significant first.
    Bits(Vec<u8>),
    /// Referenced cell, slice or builder contents, or a dictionary root.
    Cell(Cell),
    String(String),
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn structure<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Self::Struct(fields) => fields.iter().find(|(k, _)| k == field).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Address(_) => "address",
            Self::Bits(_) => "bits",
            Self::Cell(_) => "cell",
            Self::String(_) => "string",
            Self::Struct(_) => "struct",
        }
    }
}

impl Value {
    pub fn int(value: impl Into<BigInt>) -> Self {
        Self::Int(value.into())
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Address> for Value {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::{SerializeMap, SerializeStruct};

        match self {
            Value::Null => serializer.serialize_none(),
            // Wider than any JSON number consumer handles reliably.
            Value::Int(n) => serializer.collect_str(n),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Address(a) => serializer.collect_str(a),
            Value::Bits(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                serializer.serialize_str(&hex)
            }
            Value::Cell(cell) => {
                let mut s = serializer.serialize_struct("Cell", 2)?;
                s.serialize_field("bits", &cell.bit_len())?;
                s.serialize_field("cells", &cell.tree_size())?;
                s.end()
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Struct(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}
