//! Statement classification.
//!
//! The executor needs to know whether a statement produces a row set (fetch
//! it) or mutation metadata (execute it). Classification is by leading
//! keyword after stripping comments; anything unrecognized is treated as a
//! mutation, which is the safe default because executing a row-producing
//! statement still succeeds — it just discards rows — while fetching a
//! mutation would lose its metadata.

/// How a statement's raw result should be read from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Produces a row set (SELECT, SHOW, EXPLAIN, ...)
    Query,
    /// Produces mutation metadata (INSERT, UPDATE, DELETE, DDL, SET, ...)
    Mutation,
}

const QUERY_KEYWORDS: &[&str] =
    &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH", "TABLE", "VALUES"];

/// Classify a SQL statement by its first keyword.
pub fn classify(sql: &str) -> StatementKind {
    let rest = skip_leading_trivia(sql);
    let word: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();

    if QUERY_KEYWORDS.contains(&word.as_str()) {
        StatementKind::Query
    } else {
        StatementKind::Mutation
    }
}

/// Skip whitespace, `-- ...` and `# ...` line comments, `/* ... */` block
/// comments, and opening parentheses (`(SELECT ...)` is a query).
fn skip_leading_trivia(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        let trimmed = rest.trim_start();
        if let Some(after) = trimmed.strip_prefix("--") {
            rest = after.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(after) = trimmed.strip_prefix('#') {
            rest = after.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(after) = trimmed.strip_prefix("/*") {
            rest = after.split_once("*/").map_or("", |(_, tail)| tail);
        } else if let Some(after) = trimmed.strip_prefix('(') {
            rest = after;
        } else {
            return trimmed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_is_query() {
        assert_eq!(classify("SELECT * FROM t"), StatementKind::Query);
        assert_eq!(classify("  select 1"), StatementKind::Query);
    }

    #[test]
    fn test_mutations() {
        assert_eq!(classify("INSERT INTO t VALUES (1)"), StatementKind::Mutation);
        assert_eq!(classify("UPDATE t SET a = 1"), StatementKind::Mutation);
        assert_eq!(classify("DELETE FROM t"), StatementKind::Mutation);
        assert_eq!(classify("SET @x = 1"), StatementKind::Mutation);
        assert_eq!(classify("CREATE TABLE t (id INT)"), StatementKind::Mutation);
    }

    #[test]
    fn test_show_and_explain_are_queries() {
        assert_eq!(classify("SHOW WARNINGS"), StatementKind::Query);
        assert_eq!(classify("EXPLAIN SELECT 1"), StatementKind::Query);
        assert_eq!(classify("DESCRIBE t"), StatementKind::Query);
        assert_eq!(classify("WITH cte AS (SELECT 1) SELECT * FROM cte"), StatementKind::Query);
    }

    #[test]
    fn test_leading_comments_skipped() {
        assert_eq!(classify("-- comment\nSELECT 1"), StatementKind::Query);
        assert_eq!(classify("/* hint */ SELECT 1"), StatementKind::Query);
        assert_eq!(classify("# mysql comment\nUPDATE t SET a = 1"), StatementKind::Mutation);
    }

    #[test]
    fn test_parenthesized_select_is_query() {
        assert_eq!(classify("(SELECT 1) UNION (SELECT 2)"), StatementKind::Query);
    }

    #[test]
    fn test_unknown_defaults_to_mutation() {
        assert_eq!(classify(""), StatementKind::Mutation);
        assert_eq!(classify("FROB the database"), StatementKind::Mutation);
    }
}
