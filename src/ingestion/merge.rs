//! Field merging.
//!
//! Precedence of an emitted record, lowest to highest:
//!
//! 1. default fields (copied fresh for every record)
//! 2. pass-through parameters (everything except the connector's own keys)
//! 3. decoded fields
//! 4. script results (non-null only)
//!
//! Scripts are evaluated against the merge context: all parameters overlaid with the decoded
//! fields, so a decoded field shadows a parameter of the same name.

use indexmap::IndexMap;

use crate::config::DataStoreParams;
use crate::error::EvaluationError;
use crate::script::ExpressionEvaluator;
use crate::types::{Record, Value};

/// Output field name to expression, evaluated in order.
pub type ScriptMap = IndexMap<String, String>;

/// Build the merge context for one record: parameters overlaid with decoded fields.
pub fn build_context(params: &DataStoreParams, decoded: &Record) -> Record {
    let mut context = params.as_record();
    context.extend(decoded.iter().map(|(k, v)| (k.clone(), v.clone())));
    context
}

/// Layer pass-through parameters and then the decoded fields onto `data`.
pub fn overlay_fields(data: &mut Record, params: &DataStoreParams, decoded: Record) {
    data.extend(params.pass_through());
    data.extend(decoded);
}

/// Applies the script mapping on top of a record's base fields.
pub struct FieldMerger<'a> {
    evaluator: &'a dyn ExpressionEvaluator,
    script_type: &'a str,
    scripts: &'a ScriptMap,
    defaults: &'a Record,
}

impl<'a> FieldMerger<'a> {
    /// Create a merger for one run.
    pub fn new(
        evaluator: &'a dyn ExpressionEvaluator,
        script_type: &'a str,
        scripts: &'a ScriptMap,
        defaults: &'a Record,
    ) -> Self {
        Self {
            evaluator,
            script_type,
            scripts,
            defaults,
        }
    }

    /// A fresh copy of the default fields.
    pub fn base_record(&self) -> Record {
        self.defaults.clone()
    }

    /// Evaluate every script against `context`, writing non-null results into `data`.
    ///
    /// On failure `data` keeps whatever was written before the failing expression.
    pub fn apply_scripts(&self, context: &Record, data: &mut Record) -> Result<(), EvaluationError> {
        for (field, expression) in self.scripts {
            let value = self.convert_value(expression, context)?;
            if !value.is_null() {
                data.insert(field.clone(), value);
            }
        }
        Ok(())
    }

    // An empty expression yields an empty string and a bare context key is a direct lookup;
    // only the remaining expressions reach the evaluator.
    fn convert_value(&self, expression: &str, context: &Record) -> Result<Value, EvaluationError> {
        if expression.is_empty() {
            return Ok(Value::String(String::new()));
        }
        if let Some(value) = context.get(expression) {
            return Ok(value.clone());
        }
        self.evaluator.evaluate(self.script_type, expression, context)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::FILES_PARAM;
    use crate::script::RhaiEvaluator;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn scripts(pairs: &[(&str, &str)]) -> ScriptMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    // Same steps, in the same order, as the ingestion loop.
    fn merged(merger: &FieldMerger<'_>, params: &DataStoreParams, decoded: Record) -> Result<Record, EvaluationError> {
        let context = build_context(params, &decoded);
        let mut data = merger.base_record();
        overlay_fields(&mut data, params, decoded);
        merger.apply_scripts(&context, &mut data)?;
        Ok(data)
    }

    #[test]
    fn decoded_fields_shadow_parameters_in_context() {
        let params = DataStoreParams::new().with("title", "from-param").with("site", "docs");
        let ctx = build_context(&params, &record(&[("title", Value::from("from-json"))]));
        assert_eq!(ctx["title"], Value::from("from-json"));
        assert_eq!(ctx["site"], Value::from("docs"));
    }

    #[test]
    fn without_scripts_the_record_is_decoded_plus_pass_through() {
        let eval = RhaiEvaluator::new();
        let defaults = record(&[("lang", Value::from("en")), ("site", Value::from("default"))]);
        let scripts = ScriptMap::new();
        let merger = FieldMerger::new(&eval, "rhai", &scripts, &defaults);
        let params = DataStoreParams::new().with(FILES_PARAM, "/a.json").with("site", "docs");

        let out = merged(&merger, &params, record(&[("id", Value::from("123")), ("lang", Value::from("de"))])).unwrap();
        assert_eq!(
            out,
            record(&[
                ("lang", Value::from("de")),
                ("site", Value::from("docs")),
                ("id", Value::from("123")),
            ])
        );
    }

    #[test]
    fn script_results_override_and_nulls_are_skipped() {
        let eval = RhaiEvaluator::new();
        let defaults = record(&[("lang", Value::from("en")), ("boost", Value::Float(1.0))]);
        let scripts = scripts(&[("lang", r#""de""#), ("boost", "()"), ("doc_id", "id")]);
        let merger = FieldMerger::new(&eval, "rhai", &scripts, &defaults);

        let out = merged(&merger, &DataStoreParams::new(), record(&[("id", Value::from("7"))])).unwrap();
        assert_eq!(out["lang"], Value::from("de"));
        assert_eq!(out["boost"], Value::Float(1.0));
        assert_eq!(out["doc_id"], Value::from("7"));
        assert_eq!(defaults["lang"], Value::from("en"));
    }

    #[test]
    fn failed_script_keeps_earlier_results() {
        let eval = RhaiEvaluator::new();
        let defaults = Record::new();
        let scripts = scripts(&[("a", r#""kept""#), ("b", "nope()"), ("c", r#""never""#)]);
        let merger = FieldMerger::new(&eval, "rhai", &scripts, &defaults);
        let mut data = merger.base_record();
        assert!(merger.apply_scripts(&Record::new(), &mut data).is_err());
        assert_eq!(data, record(&[("a", Value::from("kept"))]));
    }

    #[test]
    fn empty_expression_yields_empty_string() {
        let eval = RhaiEvaluator::new();
        let defaults = Record::new();
        let scripts = scripts(&[("note", "")]);
        let merger = FieldMerger::new(&eval, "rhai", &scripts, &defaults);
        let out = merged(&merger, &DataStoreParams::new(), Record::new()).unwrap();
        assert_eq!(out["note"], Value::from(""));
    }

    #[test]
    fn context_keys_bypass_the_evaluator() {
        let calls = AtomicUsize::new(0);
        let eval = |_: &str, _: &str, _: &Record| -> Result<Value, EvaluationError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from("evaluated"))
        };
        let defaults = Record::new();
        let scripts = scripts(&[("a", "title"), ("b", "title + 1")]);
        let merger = FieldMerger::new(&eval, "rhai", &scripts, &defaults);
        let out = merged(&merger, &DataStoreParams::new(), record(&[("title", Value::from("T"))])).unwrap();
        assert_eq!(out["a"], Value::from("T"));
        assert_eq!(out["b"], Value::from("evaluated"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn evaluation_failure_is_reported() {
        let eval = RhaiEvaluator::new();
        let defaults = Record::new();
        let scripts = scripts(&[("x", "nope()")]);
        let merger = FieldMerger::new(&eval, "rhai", &scripts, &defaults);
        let mut data = merger.base_record();
        let result = merger.apply_scripts(&Record::new(), &mut data);
        assert!(matches!(result, Err(EvaluationError::Script { .. })));
    }
}
