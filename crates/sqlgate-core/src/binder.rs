//! SQL template binder.
//!
//! Rewrites `:name` placeholders into MySQL positional `?` markers while
//! collecting the bound values in occurrence order. Binding by value is what
//! rules out SQL injection: request input never lands in the SQL text, only
//! in the driver's argument list.
//!
//! Scanning is quote-aware: nothing inside `'...'`, `"..."`, or backtick
//! identifiers is rewritten, so string literals containing colons and
//! `@session_variables` survive untouched. A repeated placeholder name
//! contributes one argument per occurrence — positional drivers cannot
//! reuse a single bound value for several markers.

use crate::params::ParamMap;
use serde_json::Value as JsonValue;
use sqlgate_commons::{GatewayError, GatewayResult};

/// A template rewritten for execution: positional SQL plus the ordered
/// argument list. `names` keeps the placeholder name for each argument
/// position (diagnostics and tests).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub args: Vec<JsonValue>,
    pub names: Vec<String>,
}

/// Rewrite `template` against `params`.
///
/// Fails with [`GatewayError::MissingParameter`] when a placeholder names a
/// key absent from the map. Defaults for optional parameters are substituted
/// during validation, so by the time a map reaches the binder every
/// resolvable name is present.
pub fn bind(template: &str, params: &ParamMap) -> GatewayResult<BoundStatement> {
    let bytes = template.as_bytes();
    let mut sql = Vec::with_capacity(template.len());
    let mut args = Vec::new();
    let mut names = Vec::new();

    let mut i = 0;
    // Current quote delimiter, if inside a literal or quoted identifier
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let c = bytes[i];

        if let Some(q) = quote {
            sql.push(c);
            if c == b'\\' && q != b'`' && i + 1 < bytes.len() {
                // Backslash escape inside a string literal
                sql.push(bytes[i + 1]);
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            b'\'' | b'"' | b'`' => {
                quote = Some(c);
                sql.push(c);
                i += 1;
            }
            b':' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident_byte(bytes[end], end > start) {
                    end += 1;
                }
                if end == start {
                    // Not a placeholder, keep the literal colon
                    sql.push(b':');
                    i += 1;
                } else {
                    let name = &template[start..end];
                    match params.get(name) {
                        Some(value) => {
                            sql.push(b'?');
                            args.push(value.clone());
                            names.push(name.to_string());
                        }
                        None => {
                            return Err(GatewayError::MissingParameter(name.to_string()));
                        }
                    }
                    i = end;
                }
            }
            _ => {
                sql.push(c);
                i += 1;
            }
        }
    }

    // Only ASCII bytes were inserted or removed, so the buffer is still
    // valid UTF-8.
    let sql = String::from_utf8_lossy(&sql).into_owned();

    Ok(BoundStatement { sql, args, names })
}

fn is_ident_byte(b: u8, not_first: bool) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || (not_first && b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, JsonValue)]) -> ParamMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_single_placeholder() {
        let p = params(&[("id", json!(42))]);
        let bound = bind("SELECT * FROM users WHERE id = :id", &p).unwrap();
        assert_eq!(bound.sql, "SELECT * FROM users WHERE id = ?");
        assert_eq!(bound.args, vec![json!(42)]);
        assert_eq!(bound.names, vec!["id"]);
    }

    #[test]
    fn test_non_ascii_template_survives() {
        let p = params(&[("name", json!("café"))]);
        let bound = bind("SELECT 'héllo' AS greeting WHERE name = :name", &p).unwrap();
        assert_eq!(bound.sql, "SELECT 'héllo' AS greeting WHERE name = ?");
        assert_eq!(bound.args, vec![json!("café")]);
    }

    #[test]
    fn test_binding_order_follows_template_order() {
        let p = params(&[("a", json!(1)), ("b", json!(2)), ("c", json!(3))]);
        let bound = bind("SELECT :c, :a, :b", &p).unwrap();
        assert_eq!(bound.sql, "SELECT ?, ?, ?");
        assert_eq!(bound.args, vec![json!(3), json!(1), json!(2)]);
        assert_eq!(bound.names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_repeated_name_binds_once_per_occurrence() {
        let p = params(&[("q", json!("foo"))]);
        let bound =
            bind("SELECT * FROM t WHERE name = :q OR alias = :q OR tag = :q", &p).unwrap();
        assert_eq!(bound.args.len(), 3);
        assert!(bound.args.iter().all(|v| v == &json!("foo")));
        assert_eq!(bound.sql.matches('?').count(), 3);
    }

    #[test]
    fn test_missing_parameter_is_a_bind_error() {
        let p = params(&[("present", json!(1))]);
        let err = bind("SELECT :present, :absent", &p).unwrap_err();
        match err {
            GatewayError::MissingParameter(name) => assert_eq!(name, "absent"),
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_colon_left_untouched() {
        let p = params(&[]);
        let bound = bind("SELECT '12:30' AS t, 1 / 2 AS r FROM dual WHERE 1 = 1", &p).unwrap();
        assert_eq!(bound.sql, "SELECT '12:30' AS t, 1 / 2 AS r FROM dual WHERE 1 = 1");
        assert!(bound.args.is_empty());
    }

    #[test]
    fn test_colon_before_non_identifier_left_untouched() {
        let p = params(&[]);
        let bound = bind("SELECT a : : 1", &p).unwrap();
        assert_eq!(bound.sql, "SELECT a : : 1");
    }

    #[test]
    fn test_placeholder_inside_string_literal_ignored() {
        let p = params(&[("name", json!("x"))]);
        let bound = bind("SELECT ':name', :name", &p).unwrap();
        assert_eq!(bound.sql, "SELECT ':name', ?");
        assert_eq!(bound.args, vec![json!("x")]);
    }

    #[test]
    fn test_placeholder_inside_backtick_identifier_ignored() {
        let p = params(&[]);
        let bound = bind("SELECT `weird:col` FROM t", &p).unwrap();
        assert_eq!(bound.sql, "SELECT `weird:col` FROM t");
    }

    #[test]
    fn test_session_variable_sigil_untouched() {
        let p = params(&[("uid", json!(7))]);
        let bound = bind("SELECT balance INTO @bal FROM accounts WHERE id = :uid", &p).unwrap();
        assert_eq!(bound.sql, "SELECT balance INTO @bal FROM accounts WHERE id = ?");
    }

    #[test]
    fn test_escaped_quote_inside_literal() {
        let p = params(&[("v", json!(1))]);
        let bound = bind(r#"SELECT 'it\'s :not_a_param', :v"#, &p).unwrap();
        assert_eq!(bound.sql, r#"SELECT 'it\'s :not_a_param', ?"#);
        assert_eq!(bound.args.len(), 1);
    }

    #[test]
    fn test_placeholder_names_with_digits_and_underscores() {
        let p = params(&[("user_id2", json!(5))]);
        let bound = bind("SELECT :user_id2", &p).unwrap();
        assert_eq!(bound.sql, "SELECT ?");
        assert_eq!(bound.names, vec!["user_id2"]);
    }

    #[test]
    fn test_template_without_placeholders_passes_through() {
        let p = params(&[]);
        let bound = bind("SELECT NOW()", &p).unwrap();
        assert_eq!(bound.sql, "SELECT NOW()");
        assert!(bound.args.is_empty());
    }
}
