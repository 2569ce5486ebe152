//! Expression evaluation for derived fields.
//!
//! The connector hands each script expression, together with the merge context of the current
//! record, to an [`ExpressionEvaluator`]. The default implementation is [`RhaiEvaluator`].

mod rhai_engine;

pub use rhai_engine::RhaiEvaluator;

use crate::error::EvaluationError;
use crate::types::{Record, Value};

/// Evaluates one expression against a record's merge context.
///
/// Returning [`Value::Null`] means "no value": the output field is left untouched.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, script_type: &str, expression: &str, context: &Record) -> Result<Value, EvaluationError>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str, &str, &Record) -> Result<Value, EvaluationError> + Send + Sync,
{
    fn evaluate(&self, script_type: &str, expression: &str, context: &Record) -> Result<Value, EvaluationError> {
        self(script_type, expression, context)
    }
}
