//! Type descriptors: the frozen output of the front end.
//!
//! Every descriptor is fully resolved: field types name their nested structs,
//! defaults and headers are carried as unevaluated [`Expr`] trees until the
//! comptime step fills in the `*_value` slots.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::expr::{ConstValue, Expr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Struct,
    Contract,
    Trait,
    Message,
}

impl TypeKind {
    /// Traits only contribute declarations; they never get a cell layout.
    pub fn is_allocated(self) -> bool {
        !matches!(self, Self::Trait)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Contract => "contract",
            Self::Trait => "trait",
            Self::Message => "message",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Stdlib,
    #[default]
    User,
}

/// Length-prefix width of a variable-length integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarWidth {
    W16,
    W32,
}

impl VarWidth {
    /// Bits of the byte-length prefix.
    pub fn len_bits(self) -> u16 {
        match self {
            Self::W16 => 4,
            Self::W32 => 5,
        }
    }

    pub fn max_bytes(self) -> u16 {
        (1 << self.len_bits()) - 1
    }

    pub fn suffix(self) -> u16 {
        match self {
            Self::W16 => 16,
            Self::W32 => 32,
        }
    }
}

/// Serialization format of an integer field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntFormat {
    Int(u16),
    Uint(u16),
    VarInt(VarWidth),
    VarUint(VarWidth),
}

impl IntFormat {
    pub const DEFAULT: Self = Self::Int(257);

    pub fn coins() -> Self {
        Self::VarUint(VarWidth::W16)
    }

    pub fn signed(self) -> bool {
        matches!(self, Self::Int(_) | Self::VarInt(_))
    }

    /// Worst-case encoded width; variable formats are budgeted at their maximum.
    pub fn max_bits(self) -> u16 {
        match self {
            Self::Int(n) | Self::Uint(n) => n,
            Self::VarInt(w) | Self::VarUint(w) => w.len_bits() + 8 * w.max_bytes(),
        }
    }

    /// Whether `value` is representable in this format.
    pub fn fits(self, value: &BigInt) -> bool {
        match self {
            Self::Int(n) => fits_signed(value, u64::from(n)),
            Self::Uint(n) => fits_unsigned(value, u64::from(n)),
            Self::VarInt(w) => fits_signed(value, 8 * u64::from(w.max_bytes())),
            Self::VarUint(w) => fits_unsigned(value, 8 * u64::from(w.max_bytes())),
        }
    }
}

fn fits_signed(value: &BigInt, bits: u64) -> bool {
    if bits == 0 {
        return value.is_zero();
    }
    // Negative values are measured by their one's complement.
    let magnitude = if value.is_negative() {
        (-value - 1u8).bits()
    } else {
        value.bits()
    };
    magnitude < bits
}

fn fits_unsigned(value: &BigInt, bits: u64) -> bool {
    !value.is_negative() && value.bits() <= bits
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown integer format `{0}`")]
pub struct IntFormatError(pub String);

impl FromStr for IntFormat {
    type Err = IntFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || IntFormatError(s.to_owned());
        let width = |digits: &str, max: u16| -> Result<u16, IntFormatError> {
            let n: u16 = digits.parse().map_err(|_| bad())?;
            if n == 0 || n > max {
                return Err(bad());
            }
            Ok(n)
        };
        let var = |digits: &str| match digits {
            "16" => Ok(VarWidth::W16),
            "32" => Ok(VarWidth::W32),
            _ => Err(bad()),
        };

        match s {
            "coins" => Ok(Self::coins()),
            _ => {
                if let Some(rest) = s.strip_prefix("varuint") {
                    Ok(Self::VarUint(var(rest)?))
                } else if let Some(rest) = s.strip_prefix("varint") {
                    Ok(Self::VarInt(var(rest)?))
                } else if let Some(rest) = s.strip_prefix("uint") {
                    Ok(Self::Uint(width(rest, 256)?))
                } else if let Some(rest) = s.strip_prefix("int") {
                    Ok(Self::Int(width(rest, 257)?))
                } else {
                    Err(bad())
                }
            }
        }
    }
}

impl fmt::Display for IntFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "int{n}"),
            Self::Uint(n) => write!(f, "uint{n}"),
            Self::VarInt(w) => write!(f, "varint{}", w.suffix()),
            Self::VarUint(VarWidth::W16) => f.write_str("coins"),
            Self::VarUint(w) => write!(f, "varuint{}", w.suffix()),
        }
    }
}

impl Serialize for IntFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IntFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn default_int_format() -> IntFormat {
    IntFormat::DEFAULT
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldType {
    Int {
        #[serde(default = "default_int_format")]
        format: IntFormat,
    },
    Bool,
    Address,
    Bits {
        bits: u16,
    },
    Cell,
    Slice,
    Builder,
    String,
    Optional {
        inner: Box<FieldType>,
    },
    Map {
        key: Box<FieldType>,
        value: Box<FieldType>,
    },
    Struct {
        name: String,
    },
}

impl FieldType {
    pub fn int(bits: u16) -> Self {
        Self::Int {
            format: IntFormat::Int(bits),
        }
    }

    pub fn uint(bits: u16) -> Self {
        Self::Int {
            format: IntFormat::Uint(bits),
        }
    }

    pub fn coins() -> Self {
        Self::Int {
            format: IntFormat::coins(),
        }
    }

    pub fn optional(inner: FieldType) -> Self {
        Self::Optional {
            inner: Box::new(inner),
        }
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn struct_ref(name: impl Into<String>) -> Self {
        Self::Struct { name: name.into() }
    }

    /// Types stored behind exactly one reference slot.
    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Cell | Self::Slice | Self::Builder | Self::String)
    }

    /// Name of the struct this type contains inline (not through an indirection).
    pub fn inline_struct(&self) -> Option<&str> {
        match self {
            Self::Struct { name } => Some(name),
            _ => None,
        }
    }

    /// Every struct name mentioned anywhere in this type, indirections included.
    pub fn referenced_structs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_structs(&mut out);
        out
    }

    fn collect_structs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Struct { name } => out.push(name),
            Self::Optional { inner } => inner.collect_structs(out),
            Self::Map { key, value } => {
                key.collect_structs(out);
                value.collect_structs(out);
            }
            _ => {}
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { format } => write!(f, "{format}"),
            Self::Bool => f.write_str("bool"),
            Self::Address => f.write_str("address"),
            Self::Bits { bits } => write!(f, "bits{bits}"),
            Self::Cell => f.write_str("cell"),
            Self::Slice => f.write_str("slice"),
            Self::Builder => f.write_str("builder"),
            Self::String => f.write_str("string"),
            Self::Optional { inner } => write!(f, "{inner}?"),
            Self::Map { key, value } => write!(f, "map<{key}, {value}>"),
            Self::Struct { name } => f.write_str(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Expr>,
    /// Filled in by the comptime step.
    #[serde(skip)]
    pub default_value: Option<ConstValue>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            default_value: None,
        }
    }

    pub fn with_default(mut self, expr: Expr) -> Self {
        self.default = Some(expr);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    pub value: Expr,
    #[serde(skip)]
    pub resolved: Option<ConstValue>,
    #[serde(default)]
    pub origin: Origin,
}

impl ConstantDescriptor {
    pub fn new(name: impl Into<String>, ty: FieldType, value: Expr) -> Self {
        Self {
            name: name.into(),
            ty,
            value,
            resolved: None,
            origin: Origin::User,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Message discriminator expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Expr>,
    #[serde(skip)]
    pub header_value: Option<u32>,
    /// TL-B style schema line; computed by the signature pass when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub origin: Origin,
    /// Contract init parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Vec<Field>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<ConstantDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: Vec::new(),
            header: None,
            header_value: None,
            schema: None,
            origin: Origin::User,
            init: None,
            constants: Vec::new(),
        }
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    pub fn message(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Message)
    }

    pub fn contract(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Contract)
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field::new(name, ty));
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_header(mut self, header: Expr) -> Self {
        self.header = Some(header);
        self
    }

    pub fn with_init(mut self, params: impl IntoIterator<Item = Field>) -> Self {
        self.init = Some(params.into_iter().collect());
        self
    }

    pub fn with_constant(mut self, constant: ConstantDescriptor) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_message(&self) -> bool {
        self.kind == TypeKind::Message
    }

    pub fn is_contract(&self) -> bool {
        self.kind == TypeKind::Contract
    }
}
