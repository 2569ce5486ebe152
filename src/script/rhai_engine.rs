use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rhai::{Dynamic, Engine, Scope, AST};

use crate::config::DEFAULT_SCRIPT_TYPE;
use crate::error::EvaluationError;
use crate::types::{Record, Value};

use super::ExpressionEvaluator;

/// Name under which the whole merge context is exposed to scripts.
///
/// Fields whose names are valid identifiers are also pushed as plain variables, so
/// `title + " (" + id + ")"` and `ctx["content-type"]` both work.
const CONTEXT_VAR: &str = "ctx";

/// [`ExpressionEvaluator`] backed by an embedded Rhai engine.
///
/// Compiled expressions are cached by source text; a run evaluates the same handful of
/// expressions for every line.
pub struct RhaiEvaluator {
    engine: Engine,
    compiled: Mutex<HashMap<String, Arc<AST>>>,
}

impl RhaiEvaluator {
    /// Create an evaluator over a fresh engine.
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_optimization_level(rhai::OptimizationLevel::Simple);
        Self::with_engine(engine)
    }

    /// Use a preconfigured engine (custom functions, operation limits, ...).
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine,
            compiled: Mutex::new(HashMap::new()),
        }
    }

    fn compile(&self, expression: &str) -> Result<Arc<AST>, EvaluationError> {
        let mut cache = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ast) = cache.get(expression) {
            return Ok(Arc::clone(ast));
        }
        let ast = self.engine.compile(expression).map_err(|e| EvaluationError::Script {
            expression: expression.to_string(),
            message: e.to_string(),
        })?;
        let ast = Arc::new(ast);
        cache.insert(expression.to_string(), Arc::clone(&ast));
        Ok(ast)
    }

    fn scope_for(context: &Record) -> Scope<'static> {
        let mut scope = Scope::new();
        let mut ctx = rhai::Map::new();
        for (key, value) in context {
            ctx.insert(key.as_str().into(), to_dynamic(value));
        }
        scope.push_dynamic(CONTEXT_VAR, Dynamic::from_map(ctx));
        for (key, value) in context {
            if is_valid_identifier(key) {
                scope.push_dynamic(key.clone(), to_dynamic(value));
            }
        }
        scope
    }
}

impl Default for RhaiEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEvaluator for RhaiEvaluator {
    fn evaluate(&self, script_type: &str, expression: &str, context: &Record) -> Result<Value, EvaluationError> {
        if !script_type.eq_ignore_ascii_case(DEFAULT_SCRIPT_TYPE) {
            return Err(EvaluationError::UnsupportedScriptType(script_type.to_string()));
        }

        let ast = self.compile(expression)?;
        let mut scope = Self::scope_for(context);
        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
            .map_err(|e| EvaluationError::Script {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;
        Ok(from_dynamic(result))
    }
}

fn is_valid_identifier(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Int(i) => Dynamic::from(*i),
        Value::Float(f) => Dynamic::from(*f),
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(items) => Dynamic::from_array(items.iter().map(to_dynamic).collect()),
        Value::Object(record) => {
            let mut map = rhai::Map::new();
            for (k, v) in record {
                map.insert(k.as_str().into(), to_dynamic(v));
            }
            Dynamic::from_map(map)
        }
    }
}

fn from_dynamic(value: Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::Int(i);
    }
    if let Ok(f) = value.as_float() {
        return Value::Float(f);
    }
    if let Ok(c) = value.as_char() {
        return Value::String(c.to_string());
    }
    if value.is_string() {
        return value.into_string().map(Value::String).unwrap_or(Value::Null);
    }
    if value.is_array() {
        return value
            .into_array()
            .map(|items| Value::Array(items.into_iter().map(from_dynamic).collect()))
            .unwrap_or(Value::Null);
    }
    if value.is_map() {
        if let Some(map) = value.clone().try_cast::<rhai::Map>() {
            return Value::Object(map.into_iter().map(|(k, v)| (k.to_string(), from_dynamic(v))).collect());
        }
    }
    Value::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::from("123"));
        record.insert("title".to_string(), Value::from("Test"));
        record.insert("count".to_string(), Value::Int(4));
        record.insert("content-type".to_string(), Value::from("text/plain"));
        record
    }

    #[test]
    fn evaluates_string_concatenation_over_fields() {
        let eval = RhaiEvaluator::new();
        let v = eval.evaluate("rhai", r#"title + " (" + id + ")""#, &context()).unwrap();
        assert_eq!(v, Value::from("Test (123)"));
    }

    #[test]
    fn exposes_non_identifier_fields_through_ctx() {
        let eval = RhaiEvaluator::new();
        let v = eval.evaluate("rhai", r#"ctx["content-type"]"#, &context()).unwrap();
        assert_eq!(v, Value::from("text/plain"));
    }

    #[test]
    fn converts_results_back_to_values() {
        let eval = RhaiEvaluator::new();
        assert_eq!(eval.evaluate("rhai", "count * 2", &context()).unwrap(), Value::Int(8));
        assert_eq!(eval.evaluate("rhai", "count > 3", &context()).unwrap(), Value::Bool(true));
        assert_eq!(eval.evaluate("rhai", "()", &context()).unwrap(), Value::Null);
        assert_eq!(
            eval.evaluate("rhai", "[1, \"a\"]", &context()).unwrap(),
            Value::Array(vec![Value::Int(1), Value::from("a")])
        );
    }

    #[test]
    fn script_errors_become_evaluation_errors() {
        let eval = RhaiEvaluator::new();
        let err = eval.evaluate("rhai", "missing_var + 1", &context()).unwrap_err();
        assert!(matches!(err, EvaluationError::Script { .. }));
        let err = eval.evaluate("rhai", "let = ;", &context()).unwrap_err();
        assert!(err.to_string().starts_with("failed to evaluate 'let = ;'"));
    }

    #[test]
    fn rejects_unknown_script_type() {
        let eval = RhaiEvaluator::new();
        let err = eval.evaluate("groovy", "1", &context()).unwrap_err();
        assert!(matches!(err, EvaluationError::UnsupportedScriptType(t) if t == "groovy"));
    }
}
