//! Per-field value transforms applied after raw extraction.
//!
//! A field either passes its raw value through, multiplies it by a scale, or
//! hands it to an expression evaluator. Evaluators sit behind the narrow
//! [`Evaluate`] trait so the concrete expression language stays swappable
//! without touching the decoder; the built-in language lives in [`expr`].

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::Value;

mod expr;

pub use expr::{ExprParseError, ExprProgram};

/// Evaluation failure for an expression transform.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("expression produced a non-finite value")]
    NonFinite,
    #[error("evaluation failed: {0}")]
    Failed(String),
}

/// Narrow evaluation capability: one raw numeric input, one output value.
///
/// Implementations must be pure with respect to the input; the decoder may
/// call them concurrently from multiple threads.
pub trait Evaluate: Send + Sync {
    /// Evaluate with the raw decoded value bound as the sole input.
    fn evaluate(&self, value: f64) -> Result<Value, EvalError>;
}

/// Post-extraction transform attached to a field spec.
#[derive(Clone)]
pub enum Transform {
    /// Raw value passes through unchanged.
    Identity,
    /// Raw value is multiplied by a constant.
    Scale(f64),
    /// Raw value is remapped by an expression evaluator.
    Expr(Arc<dyn Evaluate>),
}

impl Transform {
    /// Apply the transform to a raw numeric value.
    pub fn apply(&self, raw: f64) -> Result<Value, EvalError> {
        match self {
            Transform::Identity => Ok(Value::Float(raw)),
            Transform::Scale(factor) => Ok(Value::Float(raw * factor)),
            Transform::Expr(program) => program.evaluate(raw),
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Identity => f.write_str("Identity"),
            Transform::Scale(factor) => f.debug_tuple("Scale").field(factor).finish(),
            Transform::Expr(_) => f.write_str("Expr(..)"),
        }
    }
}
