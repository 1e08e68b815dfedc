//! Sandboxed expression evaluation.
//!
//! Expressions are interpreted directly over the parsed AST against a
//! closed scope: `data`, `env`, and the loop-local `item`/`index`. The only
//! callable functions are the entries of a fixed helper table. Nothing an
//! expression does can reach host state, and nothing it does can abort a
//! render: `evaluate_raw` degrades every failure to null with a log entry.

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use log::warn;
use regex::{Captures, Regex};
use serde_json::{json, Map, Value};

use crate::document::DslDocument;
use crate::error::EvaluationError;
use crate::expression::{parse_expression, parse_inner_expression, ExpressionNode};

lazy_static! {
    static ref INTERPOLATION_RE: Regex = Regex::new(r"\{\{(.*?)\}\}").unwrap();
}

/// The closed evaluation scope. Roots resolvable from an expression are
/// `data`, `env`, `item` and `index`; nothing else exists.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub data: Map<String, Value>,
    pub env: Map<String, Value>,
    pub item: Option<Value>,
    pub index: Option<usize>,
}

impl Scope {
    pub fn from_document(document: &DslDocument) -> Self {
        Self {
            data: document.data.clone(),
            env: document
                .env
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
            item: None,
            index: None,
        }
    }

    /// Derive a loop-body scope with `item`/`index` bound. The variable
    /// names declared on the loop are also exposed as data keys so that
    /// `{{ row.name }}` resolves for `itemVar: row`.
    pub fn with_loop_binding(
        &self,
        item_var: &str,
        index_var: Option<&str>,
        item: Value,
        index: usize,
    ) -> Self {
        let mut data = self.data.clone();
        data.insert(item_var.to_string(), item.clone());
        if let Some(index_var) = index_var {
            data.insert(index_var.to_string(), json!(index));
        }
        Self {
            data,
            env: self.env.clone(),
            item: Some(item),
            index: Some(index),
        }
    }
}

/// Evaluate a parsed expression against a scope.
pub fn evaluate(node: &ExpressionNode, scope: &Scope) -> Result<Value, EvaluationError> {
    match node {
        ExpressionNode::Literal { value } => Ok(value.clone()),
        ExpressionNode::Identifier { name } => resolve_root(name, scope),
        ExpressionNode::MemberExpression { object, property } => {
            let base = evaluate(object, scope)?;
            let ExpressionNode::Identifier { name } = property.as_ref() else {
                return Err(EvaluationError::new("Member property must be an identifier"));
            };
            // Missing members resolve to null rather than failing; absent
            // data is a normal authoring state.
            Ok(base.get(name.as_str()).cloned().unwrap_or(Value::Null))
        }
        ExpressionNode::CallExpression { callee, args } => {
            let ExpressionNode::Identifier { name } = callee.as_ref() else {
                return Err(EvaluationError::new("Only named helper calls are allowed"));
            };
            let values = args
                .iter()
                .map(|arg| evaluate(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            call_helper(name, &values)
        }
    }
}

/// Evaluate raw binding text. Text without delimiters passes through as a
/// string literal. Lex, parse and evaluation failures all degrade to null.
pub fn evaluate_raw(text: &str, scope: &Scope) -> Value {
    match parse_expression(text) {
        Ok(None) => Value::String(text.to_string()),
        Ok(Some(node)) => match evaluate(&node, scope) {
            Ok(value) => value,
            Err(err) => {
                warn!("expression '{}' failed to evaluate: {}", text.trim(), err);
                Value::Null
            }
        },
        Err(err) => {
            warn!("expression '{}' failed to parse: {}", text.trim(), err);
            Value::Null
        }
    }
}

/// Evaluate binding text the way the renderer needs it: text that is a
/// single whole-string expression keeps its evaluated type, text mixing
/// literals and expression spans interpolates to a string, text without
/// delimiters passes through unchanged.
pub fn evaluate_binding(text: &str, scope: &Scope) -> Value {
    let trimmed = text.trim();
    match INTERPOLATION_RE.find(trimmed) {
        Some(m) if m.start() == 0 && m.end() == trimmed.len() => evaluate_raw(trimmed, scope),
        Some(_) => Value::String(interpolate(text, scope)),
        None => Value::String(text.to_string()),
    }
}

/// Replace every `{{ ... }}` span with its evaluated display text. Failed
/// spans render empty.
pub fn interpolate(text: &str, scope: &Scope) -> String {
    INTERPOLATION_RE
        .replace_all(text, |caps: &Captures| {
            match parse_inner_expression(&caps[1]) {
                Ok(node) => match evaluate(&node, scope) {
                    Ok(value) => value_to_display(&value),
                    Err(err) => {
                        warn!("expression '{}' failed to evaluate: {}", &caps[0], err);
                        String::new()
                    }
                },
                Err(err) => {
                    warn!("expression '{}' failed to parse: {}", &caps[0], err);
                    String::new()
                }
            }
        })
        .into_owned()
}

/// Evaluate directive text (a condition or loop items expression). Unlike
/// binding text, a directive is always an expression; the delimiters are
/// optional. Failures degrade to null.
pub fn evaluate_directive(text: &str, scope: &Scope) -> Value {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
        .unwrap_or(trimmed);
    match crate::expression::parse_inner_expression(inner) {
        Ok(node) => match evaluate(&node, scope) {
            Ok(value) => value,
            Err(err) => {
                warn!("directive '{}' failed to evaluate: {}", trimmed, err);
                Value::Null
            }
        },
        Err(err) => {
            warn!("directive '{}' failed to parse: {}", trimmed, err);
            Value::Null
        }
    }
}

fn resolve_root(name: &str, scope: &Scope) -> Result<Value, EvaluationError> {
    match name {
        "data" => Ok(Value::Object(scope.data.clone())),
        "env" => Ok(Value::Object(scope.env.clone())),
        "item" => Ok(scope.item.clone().unwrap_or(Value::Null)),
        "index" => Ok(scope.index.map(|i| json!(i)).unwrap_or(Value::Null)),
        other => match scope.data.get(other) {
            // Loop variables land in data under their declared names.
            Some(value) => Ok(value.clone()),
            None => Err(EvaluationError::new(format!("Unknown identifier: {}", other))),
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTION TABLE
// ═══════════════════════════════════════════════════════════════════════════════

fn call_helper(name: &str, args: &[Value]) -> Result<Value, EvaluationError> {
    match name {
        "formatDate" => format_date(args),
        "formatNumber" => format_number(args),
        other => Err(EvaluationError::new(format!("Unknown function: {}", other))),
    }
}

/// `formatDate(value, pattern?)`. The pattern uses `yyyy`/`MM`/`dd` style
/// tokens; the default is `yyyy-MM-dd`. Accepts RFC 3339 strings, plain
/// dates and unix-epoch seconds.
fn format_date(args: &[Value]) -> Result<Value, EvaluationError> {
    let value = args
        .first()
        .ok_or_else(|| EvaluationError::new("formatDate requires a value"))?;
    let pattern = match args.get(1) {
        Some(Value::String(p)) => p.as_str(),
        _ => "yyyy-MM-dd",
    };

    let datetime: DateTime<Utc> = match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
            })
            .map_err(|_| EvaluationError::new(format!("formatDate: unparseable date: {}", s)))?,
        Value::Number(n) => {
            let secs = n
                .as_i64()
                .ok_or_else(|| EvaluationError::new("formatDate: invalid timestamp"))?;
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| EvaluationError::new("formatDate: timestamp out of range"))?
        }
        _ => return Err(EvaluationError::new("formatDate: unsupported value kind")),
    };

    Ok(Value::String(
        datetime.format(&strftime_pattern(pattern)).to_string(),
    ))
}

/// Translate the DSL date tokens into a strftime pattern.
fn strftime_pattern(pattern: &str) -> String {
    pattern
        .replace("yyyy", "%Y")
        .replace("MM", "%m")
        .replace("dd", "%d")
        .replace("HH", "%H")
        .replace("mm", "%M")
        .replace("ss", "%S")
}

/// `formatNumber(value, decimals?)`, default two decimal places.
fn format_number(args: &[Value]) -> Result<Value, EvaluationError> {
    let value = args
        .first()
        .and_then(Value::as_f64)
        .ok_or_else(|| EvaluationError::new("formatNumber requires a numeric value"))?;
    let decimals = args
        .get(1)
        .and_then(Value::as_u64)
        .unwrap_or(2)
        .min(12) as usize;
    Ok(Value::String(format!("{:.*}", decimals, value)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALUE COERCION
// ═══════════════════════════════════════════════════════════════════════════════

/// Truthiness for conditions: null, false, zero, the empty string and
/// missing values are falsy; everything else, including empty collections,
/// is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form for interpolation: null renders empty, strings render bare,
/// everything else renders as JSON.
pub fn value_to_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
