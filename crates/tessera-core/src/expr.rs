//! Constant expressions and their evaluation.
//!
//! Defaults, headers and constants arrive as small expression trees. The
//! compiler never interprets them itself; it calls a [`ConstEvaluator`].
//! [`LiteralEvaluator`] covers literals, named constants and integer
//! arithmetic bounded to the 257-bit machine range.

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::types::{FieldType, IntFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Shl,
    BitOr,
    BitAnd,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// JSON number, or a decimal string for values wider than 64 bits.
    #[serde(with = "int_literal")]
    Int(BigInt),
    Bool(bool),
    String(String),
    Null,
    /// Textual `workchain:hash` form, validated on evaluation.
    Address(String),
    /// Reference to a previously evaluated constant.
    Const(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn int(value: impl Into<BigInt>) -> Self {
        Self::Int(value.into())
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self::Const(name.into())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Int(BigInt),
    Bool(bool),
    String(String),
    Null,
    Address(Address),
}

impl ConstValue {
    pub fn int(value: impl Into<BigInt>) -> Self {
        Self::Int(value.into())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Null => "null",
            Self::Address(_) => "address",
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }
}

/// Constants evaluated so far, in evaluation order.
pub type ConstEnv = IndexMap<String, ConstValue>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComptimeEvalError {
    #[error("unknown constant `{0}`")]
    UnknownConstant(String),
    #[error("expected a value of type `{expected}`, found {found}")]
    TypeMismatch { expected: String, found: &'static str },
    #[error("integer overflow in constant expression")]
    Overflow,
    #[error("division by zero in constant expression")]
    DivisionByZero,
    #[error("value {value} does not fit `{format}`")]
    OutOfRange { value: BigInt, format: IntFormat },
    #[error("invalid address literal `{0}`")]
    InvalidAddress(String),
}

/// Evaluates constant expressions against a target type.
pub trait ConstEvaluator {
    fn evaluate(
        &self,
        expr: &Expr,
        ty: &FieldType,
        env: &ConstEnv,
    ) -> Result<ConstValue, ComptimeEvalError>;
}

/// Literal folding; every intermediate result must stay within `int257`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LiteralEvaluator;

impl ConstEvaluator for LiteralEvaluator {
    fn evaluate(
        &self,
        expr: &Expr,
        ty: &FieldType,
        env: &ConstEnv,
    ) -> Result<ConstValue, ComptimeEvalError> {
        let value = fold(expr, env)?;
        check(value, ty)
    }
}

fn fold(expr: &Expr, env: &ConstEnv) -> Result<ConstValue, ComptimeEvalError> {
    Ok(match expr {
        Expr::Int(v) => ConstValue::Int(bounded(v.clone())?),
        Expr::Bool(b) => ConstValue::Bool(*b),
        Expr::String(s) => ConstValue::String(s.clone()),
        Expr::Null => ConstValue::Null,
        Expr::Address(text) => ConstValue::Address(
            text.parse()
                .map_err(|_| ComptimeEvalError::InvalidAddress(text.clone()))?,
        ),
        Expr::Const(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| ComptimeEvalError::UnknownConstant(name.clone()))?,
        Expr::Neg(operand) => ConstValue::Int(bounded(-fold_int(operand, env)?)?),
        Expr::Binary { op, lhs, rhs } => {
            let a = fold_int(lhs, env)?;
            let b = fold_int(rhs, env)?;
            ConstValue::Int(bounded(apply(*op, a, b)?)?)
        }
    })
}

fn fold_int(expr: &Expr, env: &ConstEnv) -> Result<BigInt, ComptimeEvalError> {
    match fold(expr, env)? {
        ConstValue::Int(v) => Ok(v),
        other => Err(ComptimeEvalError::TypeMismatch {
            expected: "int".to_owned(),
            found: other.kind_name(),
        }),
    }
}

fn bounded(value: BigInt) -> Result<BigInt, ComptimeEvalError> {
    if IntFormat::DEFAULT.fits(&value) {
        Ok(value)
    } else {
        Err(ComptimeEvalError::Overflow)
    }
}

fn apply(op: BinaryOp, a: BigInt, b: BigInt) -> Result<BigInt, ComptimeEvalError> {
    Ok(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b.is_zero() {
                return Err(ComptimeEvalError::DivisionByZero);
            }
            floor_div(&a, &b)
        }
        BinaryOp::Shl => {
            let shift = usize::try_from(&b)
                .ok()
                .filter(|s| *s <= 257)
                .ok_or(ComptimeEvalError::Overflow)?;
            a << shift
        }
        BinaryOp::BitOr => a | b,
        BinaryOp::BitAnd => a & b,
    })
}

/// Division rounding toward negative infinity.
fn floor_div(a: &BigInt, b: &BigInt) -> BigInt {
    let q = a / b;
    if !(a % b).is_zero() && (a.is_negative() != b.is_negative()) {
        q - 1
    } else {
        q
    }
}

fn check(value: ConstValue, ty: &FieldType) -> Result<ConstValue, ComptimeEvalError> {
    let mismatch = |value: &ConstValue| ComptimeEvalError::TypeMismatch {
        expected: ty.to_string(),
        found: value.kind_name(),
    };

    match (ty, &value) {
        (FieldType::Optional { .. }, ConstValue::Null) => Ok(value),
        (FieldType::Optional { inner }, _) => check(value, inner),
        (FieldType::Map { .. }, ConstValue::Null) => Ok(value),
        (FieldType::Int { format }, ConstValue::Int(v)) => {
            if format.fits(v) {
                Ok(value)
            } else {
                Err(ComptimeEvalError::OutOfRange {
                    value: v.clone(),
                    format: *format,
                })
            }
        }
        (FieldType::Bool, ConstValue::Bool(_))
        | (FieldType::String, ConstValue::String(_))
        | (FieldType::Address, ConstValue::Address(_)) => Ok(value),
        _ => Err(mismatch(&value)),
    }
}

mod int_literal {
    use std::fmt;

    use num_bigint::BigInt;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        match i64::try_from(value) {
            Ok(small) => serializer.serialize_i64(small),
            Err(_) => serializer.collect_str(value),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        deserializer.deserialize_any(IntVisitor)
    }

    struct IntVisitor;

    impl Visitor<'_> for IntVisitor {
        type Value = BigInt;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer or a decimal integer string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigInt, E> {
            Ok(BigInt::from(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigInt, E> {
            Ok(BigInt::from(v))
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<BigInt, E> {
            Ok(BigInt::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<BigInt, E> {
            Ok(BigInt::from(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<BigInt, E> {
            v.parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }
}
