//! Compile-time evaluation of constants, field defaults and message headers.
//!
//! This is the only pass that updates the store in place: evaluated values are
//! written into the `resolved`, `default_value` and `header_value` slots of the
//! descriptors. Every later pass reads frozen snapshots.

use tessera_core::{
    ComptimeEvalError, ConstEnv, ConstEvaluator, ConstValue, FieldType, IntFormat, TypeStore,
};

use crate::Result;

/// Evaluate everything evaluable in `store`.
///
/// Free-standing constants are evaluated first, in declaration order, and are
/// visible to everything after them. Contract constants see the global ones
/// plus earlier constants of the same contract.
#[tracing::instrument(level = "debug", skip_all)]
pub fn evaluate_store(store: &mut TypeStore, evaluator: &dyn ConstEvaluator) -> Result<ConstEnv> {
    let mut globals = ConstEnv::new();
    for constant in store.constants_mut() {
        let value = evaluator.evaluate(&constant.value, &constant.ty, &globals)?;
        tracing::trace!(name = %constant.name, ?value, "constant");
        globals.insert(constant.name.clone(), value.clone());
        constant.resolved = Some(value);
    }

    for ty in store.iter_mut() {
        let mut env = globals.clone();
        for constant in &mut ty.constants {
            let value = evaluator.evaluate(&constant.value, &constant.ty, &env)?;
            env.insert(constant.name.clone(), value.clone());
            constant.resolved = Some(value);
        }

        for field in ty.fields.iter_mut().chain(ty.init.iter_mut().flatten()) {
            if let Some(expr) = &field.default {
                field.default_value = Some(evaluator.evaluate(expr, &field.ty, &env)?);
            }
        }

        if let Some(expr) = &ty.header {
            let value = evaluator.evaluate(expr, &FieldType::uint(32), &env)?;
            ty.header_value = Some(header_value(&value)?);
        }
    }

    Ok(globals)
}

/// Evaluators are external; their result is checked again here.
fn header_value(value: &ConstValue) -> std::result::Result<u32, ComptimeEvalError> {
    match value {
        ConstValue::Int(v) => u32::try_from(v).map_err(|_| ComptimeEvalError::OutOfRange {
            value: v.clone(),
            format: IntFormat::Uint(32),
        }),
        other => Err(ComptimeEvalError::TypeMismatch {
            expected: IntFormat::Uint(32).to_string(),
            found: other.kind_name(),
        }),
    }
}
