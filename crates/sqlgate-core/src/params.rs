//! Parameter merge and validation.
//!
//! Collects parameters from the three request origins into one namespace,
//! then validates the combined map against the route's declarations.
//! Validation errors are collected exhaustively — the caller always sees the
//! complete list, never just the first failing field.

use serde_json::{Map, Value as JsonValue};
use sqlgate_commons::{FieldError, ParamDecl, ParamType};

/// Runtime parameter map for one invocation. Built fresh per request, never
/// shared across requests, discarded after the task returns.
pub type ParamMap = Map<String, JsonValue>;

/// Combine the three request origins into one namespace.
///
/// Precedence on key collision is fixed and documented — config authors rely
/// on it: **path overrides body, body overrides query**.
pub fn merge(query: ParamMap, body: ParamMap, path: ParamMap) -> ParamMap {
    let mut merged = query;
    for (k, v) in body {
        merged.insert(k, v);
    }
    for (k, v) in path {
        merged.insert(k, v);
    }
    merged
}

/// Validate `raw` against the declarations.
///
/// For each declaration: required-and-absent is an error; present values are
/// coerced to the declared type (numeric strings to numbers, and so on) with
/// a type error when coercion fails; absent optionals take their default, or
/// are simply omitted when no default exists. Undeclared keys in `raw` are
/// dropped — only declared parameters reach the binder.
pub fn validate(decls: &[ParamDecl], raw: &ParamMap) -> Result<ParamMap, Vec<FieldError>> {
    let mut validated = ParamMap::new();
    let mut errors = Vec::new();

    for decl in decls {
        match raw.get(&decl.name) {
            Some(value) if !value.is_null() => match coerce(value, decl.param_type) {
                Ok(coerced) => {
                    validated.insert(decl.name.clone(), coerced);
                }
                Err(msg) => errors.push(FieldError::new(&decl.name, msg)),
            },
            _ => {
                if let Some(default) = &decl.default {
                    validated.insert(decl.name.clone(), default.clone());
                } else if decl.required {
                    errors.push(FieldError::new(&decl.name, "required parameter missing"));
                }
                // optional, no default: omitted
            }
        }
    }

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}

fn coerce(value: &JsonValue, ty: ParamType) -> Result<JsonValue, String> {
    match ty {
        ParamType::String => match value {
            JsonValue::String(_) => Ok(value.clone()),
            JsonValue::Number(n) => Ok(JsonValue::String(n.to_string())),
            JsonValue::Bool(b) => Ok(JsonValue::String(b.to_string())),
            _ => Err("expected string".to_string()),
        },
        ParamType::Number => match value {
            JsonValue::Number(_) => Ok(value.clone()),
            JsonValue::String(s) => parse_number(s.trim())
                .ok_or_else(|| format!("expected number, got '{s}'")),
            _ => Err("expected number".to_string()),
        },
        ParamType::Boolean => match value {
            JsonValue::Bool(_) => Ok(value.clone()),
            JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(JsonValue::Bool(true)),
                "false" | "0" => Ok(JsonValue::Bool(false)),
                _ => Err(format!("expected boolean, got '{s}'")),
            },
            JsonValue::Number(n) => match n.as_i64() {
                Some(0) => Ok(JsonValue::Bool(false)),
                Some(1) => Ok(JsonValue::Bool(true)),
                _ => Err("expected boolean".to_string()),
            },
            _ => Err("expected boolean".to_string()),
        },
        ParamType::Array => match value {
            JsonValue::Array(_) => Ok(value.clone()),
            // Query-string origin delivers arrays as JSON text
            JsonValue::String(s) => match serde_json::from_str::<JsonValue>(s) {
                Ok(JsonValue::Array(items)) => Ok(JsonValue::Array(items)),
                _ => Err(format!("expected array, got '{s}'")),
            },
            _ => Err("expected array".to_string()),
        },
    }
}

fn parse_number(s: &str) -> Option<JsonValue> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(JsonValue::from(i));
    }
    s.parse::<f64>().ok().and_then(|f| serde_json::Number::from_f64(f).map(JsonValue::Number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, JsonValue)]) -> ParamMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn decl(name: &str, required: bool, ty: ParamType, default: Option<JsonValue>) -> ParamDecl {
        ParamDecl { name: name.to_string(), required, param_type: ty, default }
    }

    #[test]
    fn test_merge_precedence_path_over_body_over_query() {
        let query = map(&[("k", json!("from-query")), ("q_only", json!(1))]);
        let body = map(&[("k", json!("from-body")), ("b_only", json!(2))]);
        let path = map(&[("k", json!("from-path"))]);
        let merged = merge(query, body, path);
        assert_eq!(merged.get("k"), Some(&json!("from-path")));
        assert_eq!(merged.get("q_only"), Some(&json!(1)));
        assert_eq!(merged.get("b_only"), Some(&json!(2)));
    }

    #[test]
    fn test_merge_body_overrides_query() {
        let query = map(&[("k", json!("from-query"))]);
        let body = map(&[("k", json!("from-body"))]);
        let merged = merge(query, body, ParamMap::new());
        assert_eq!(merged.get("k"), Some(&json!("from-body")));
    }

    #[test]
    fn test_required_missing_is_error() {
        let decls = vec![decl("id", true, ParamType::Number, None)];
        let errs = validate(&decls, &ParamMap::new()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "id");
    }

    #[test]
    fn test_errors_collected_exhaustively() {
        let decls = vec![
            decl("id", true, ParamType::Number, None),
            decl("name", true, ParamType::String, None),
            decl("age", false, ParamType::Number, None),
        ];
        let raw = map(&[("age", json!("not-a-number"))]);
        let errs = validate(&decls, &raw).unwrap_err();
        // Two missing-required plus one coercion failure — all reported
        assert_eq!(errs.len(), 3);
        let fields: Vec<_> = errs.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"id"));
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"age"));
    }

    #[test]
    fn test_numeric_string_coerces_to_number() {
        let decls = vec![decl("id", true, ParamType::Number, None)];
        let raw = map(&[("id", json!("42"))]);
        let validated = validate(&decls, &raw).unwrap();
        assert_eq!(validated.get("id"), Some(&json!(42)));
    }

    #[test]
    fn test_float_string_coerces_to_number() {
        let decls = vec![decl("price", true, ParamType::Number, None)];
        let raw = map(&[("price", json!("19.99"))]);
        let validated = validate(&decls, &raw).unwrap();
        assert_eq!(validated.get("price"), Some(&json!(19.99)));
    }

    #[test]
    fn test_boolean_coercions() {
        let decls = vec![decl("flag", true, ParamType::Boolean, None)];
        for (input, expected) in [
            (json!("true"), true),
            (json!("1"), true),
            (json!("false"), false),
            (json!("0"), false),
            (json!(1), true),
            (json!(0), false),
        ] {
            let raw = map(&[("flag", input)]);
            let validated = validate(&decls, &raw).unwrap();
            assert_eq!(validated.get("flag"), Some(&json!(expected)));
        }
    }

    #[test]
    fn test_default_substituted_for_absent_optional() {
        let decls = vec![decl("limit", false, ParamType::Number, Some(json!(50)))];
        let validated = validate(&decls, &ParamMap::new()).unwrap();
        assert_eq!(validated.get("limit"), Some(&json!(50)));
    }

    #[test]
    fn test_absent_optional_without_default_omitted() {
        let decls = vec![decl("filter", false, ParamType::String, None)];
        let validated = validate(&decls, &ParamMap::new()).unwrap();
        assert!(!validated.contains_key("filter"));
    }

    #[test]
    fn test_null_treated_as_absent() {
        let decls = vec![decl("id", true, ParamType::Number, None)];
        let raw = map(&[("id", JsonValue::Null)]);
        assert!(validate(&decls, &raw).is_err());
    }

    #[test]
    fn test_undeclared_keys_dropped() {
        let decls = vec![decl("id", true, ParamType::Number, None)];
        let raw = map(&[("id", json!(1)), ("sneaky", json!("DROP TABLE"))]);
        let validated = validate(&decls, &raw).unwrap();
        assert!(!validated.contains_key("sneaky"));
    }

    #[test]
    fn test_array_from_json_string() {
        let decls = vec![decl("ids", true, ParamType::Array, None)];
        let raw = map(&[("ids", json!("[1,2,3]"))]);
        let validated = validate(&decls, &raw).unwrap();
        assert_eq!(validated.get("ids"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn test_array_rejects_scalar() {
        let decls = vec![decl("ids", true, ParamType::Array, None)];
        let raw = map(&[("ids", json!(7))]);
        assert!(validate(&decls, &raw).is_err());
    }
}
