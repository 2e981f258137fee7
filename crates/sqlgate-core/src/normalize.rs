//! Result normalizer.
//!
//! Converts raw driver results into one of two canonical shapes: a mutation
//! summary, or a query result (no-result marker, single object, or array of
//! objects). The no-result marker serializes as JSON `null` — deliberately
//! distinct from an empty object.
//!
//! Binary correction: MySQL classifies values derived from session
//! variables (and some expressions) as binary even when they are text, so
//! any column value arriving as a raw byte sequence is decoded as UTF-8
//! before entering the result. The correction is a typed post-processing
//! step over column values only — never a deep walk of arbitrary nested
//! structures.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use log::debug;
use rust_decimal::prelude::{Decimal, FromPrimitive, ToPrimitive};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo};

/// Raw result of the last statement of a task, as read from the driver.
#[derive(Debug)]
pub enum RawOutcome {
    Rows(Vec<MySqlRow>),
    Mutation { affected_rows: u64, insert_id: u64, warning_count: u64 },
}

/// Canonical shape of an INSERT/UPDATE/DELETE result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSummary {
    pub affected_rows: u64,
    pub insert_id: u64,
    pub warning_count: u64,
}

/// Canonical result of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedResult {
    /// INSERT/UPDATE/DELETE summary
    Mutation(MutationSummary),
    /// Query returned no rows; serializes as `null`
    None,
    /// Query returned exactly one row
    Row(Map<String, JsonValue>),
    /// Query returned two or more rows, in order
    Rows(Vec<Map<String, JsonValue>>),
}

/// Shape a raw driver result into its canonical form.
pub fn normalize(raw: RawOutcome) -> NormalizedResult {
    match raw {
        RawOutcome::Mutation { affected_rows, insert_id, warning_count } => {
            NormalizedResult::Mutation(MutationSummary { affected_rows, insert_id, warning_count })
        }
        RawOutcome::Rows(rows) => shape(rows.iter().map(row_to_map).collect()),
    }
}

/// Shape converted rows: zero → no-result marker, one → flat mapping,
/// two-plus → ordered sequence.
pub fn shape(mut maps: Vec<Map<String, JsonValue>>) -> NormalizedResult {
    match maps.len() {
        0 => NormalizedResult::None,
        1 => NormalizedResult::Row(maps.remove(0)),
        _ => NormalizedResult::Rows(maps),
    }
}

/// Convert one driver row into a flat column→value mapping.
pub fn row_to_map(row: &MySqlRow) -> Map<String, JsonValue> {
    let mut map = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), column_to_json(row, idx));
    }
    map
}

/// Decode one column value by its driver-reported type, falling back to the
/// byte-sequence path (UTF-8 correction) when the typed decode fails.
fn column_to_json(row: &MySqlRow, idx: usize) -> JsonValue {
    let type_name = row.columns()[idx].type_info().name();

    match type_name {
        "BOOLEAN" | "TINYINT(1)" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::from)
            .unwrap_or(JsonValue::Null),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::from)
            .unwrap_or(JsonValue::Null),
        "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .and_then(|f| serde_json::Number::from_f64(f).map(JsonValue::Number))
            .unwrap_or(JsonValue::Null),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map(|d| JsonValue::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(JsonValue::Null),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(idx)
            .ok()
            .flatten()
            .map(|t| JsonValue::String(t.format("%H:%M:%S").to_string()))
            .unwrap_or(JsonValue::Null),
        "DATETIME" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .ok()
            .flatten()
            .map(|dt| JsonValue::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(JsonValue::Null),
        "TIMESTAMP" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|dt| JsonValue::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(JsonValue::Null),
        "JSON" => row
            .try_get::<Option<JsonValue>, _>(idx)
            .ok()
            .flatten()
            .map(decode_buffer_repr)
            .unwrap_or(JsonValue::Null),
        // DECIMAL has no native driver mapping without the decimal
        // feature; neither the string nor the byte fallback is
        // type-compatible with it, so it gets its own arm (aggregates like
        // SUM() arrive as DECIMAL even over integer columns).
        "DECIMAL" => row
            .try_get::<Option<Decimal>, _>(idx)
            .ok()
            .flatten()
            .map(decimal_to_json)
            .unwrap_or(JsonValue::Null),
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null),
        // Binary family, including session-variable-derived values the
        // server reports as VARBINARY/BLOB: decode as UTF-8 text.
        _ => match row.try_get::<Option<String>, _>(idx) {
            Ok(Some(s)) => JsonValue::String(s),
            Ok(None) => JsonValue::Null,
            Err(_) => match row.try_get::<Option<Vec<u8>>, _>(idx) {
                Ok(bytes) => bytes.map(bytes_to_text).unwrap_or(JsonValue::Null),
                Err(e) => {
                    debug!("column {} ({}) defied both decode fallbacks: {}", idx, type_name, e);
                    JsonValue::Null
                }
            },
        },
    }
}

/// A DECIMAL as a JSON number when f64 round-trips it exactly, otherwise
/// as its exact string form — precision is never silently mangled.
fn decimal_to_json(d: Decimal) -> JsonValue {
    if let Some(f) = d.to_f64() {
        let round_trips = Decimal::from_f64(f)
            .map(|r| r.normalize() == d.normalize())
            .unwrap_or(false);
        if round_trips {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return JsonValue::Number(n);
            }
        }
    }
    JsonValue::String(d.to_string())
}

/// UTF-8 correction for a raw byte sequence.
fn bytes_to_text(bytes: Vec<u8>) -> JsonValue {
    match String::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s),
        Err(e) => JsonValue::String(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

/// Correct an already-serialized byte-array representation inside a JSON
/// column value: `{"type": "Buffer", "data": [104, 105]}` becomes `"hi"`.
/// Applied to the column value itself, not recursively.
pub fn decode_buffer_repr(value: JsonValue) -> JsonValue {
    let Some(obj) = value.as_object() else { return value };
    let is_buffer = obj.get("type").and_then(JsonValue::as_str) == Some("Buffer");
    if !is_buffer {
        return value;
    }
    let Some(data) = obj.get("data").and_then(JsonValue::as_array) else { return value };

    let mut bytes = Vec::with_capacity(data.len());
    for item in data {
        match item.as_u64() {
            Some(b) if b <= 255 => bytes.push(b as u8),
            _ => return value,
        }
    }
    bytes_to_text(bytes)
}
