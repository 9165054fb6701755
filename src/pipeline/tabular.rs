//! Tabular coercion and flattening.
//!
//! Turns an arbitrary JSON payload into rows with a stable column set:
//!
//! 1. a top-level array is used as-is
//! 2. an object holding an array under a common container key uses that array
//! 3. an object holding an array under any other key uses that array
//! 4. any other object becomes a single record
//!
//! Scalars have no tabular shape.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use serde_json::{Map, Value};

/// Property names checked first when looking for the record array.
const CONTAINER_KEYS: [&str; 7] = ["data", "results", "items", "records", "list", "array", "values"];

/// Outcome of coercing a payload into records.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    AsSequence(Vec<Value>),
    AsSingleRecord(Map<String, Value>),
    Unsupported,
}

impl Coercion {
    /// Records to write, or `None` for payloads without a tabular shape.
    pub fn into_records(self) -> Option<Vec<Value>> {
        match self {
            Coercion::AsSequence(records) => Some(records),
            Coercion::AsSingleRecord(record) => Some(vec![Value::Object(record)]),
            Coercion::Unsupported => None,
        }
    }
}

type Strategy = fn(&Value) -> Option<Coercion>;

/// Coercion strategies, tried in order.
const STRATEGIES: [(&str, Strategy); 4] = [
    ("sequence", as_sequence),
    ("container key", from_container_key),
    ("any array property", from_any_array_property),
    ("single record", as_single_record),
];

/// Coerce a payload into a sequence of records.
pub fn coerce(payload: &Value) -> Coercion {
    for (name, strategy) in STRATEGIES {
        if let Some(coercion) = strategy(payload) {
            log::debug!("Tabular coercion matched strategy: {name}");
            return coercion;
        }
    }
    Coercion::Unsupported
}

fn as_sequence(payload: &Value) -> Option<Coercion> {
    payload.as_array().map(|items| Coercion::AsSequence(items.clone()))
}

fn from_container_key(payload: &Value) -> Option<Coercion> {
    let object = payload.as_object()?;
    CONTAINER_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
        .map(|items| Coercion::AsSequence(items.clone()))
}

fn from_any_array_property(payload: &Value) -> Option<Coercion> {
    payload
        .as_object()?
        .values()
        .find_map(Value::as_array)
        .map(|items| Coercion::AsSequence(items.clone()))
}

fn as_single_record(payload: &Value) -> Option<Coercion> {
    payload
        .as_object()
        .map(|object| Coercion::AsSingleRecord(object.clone()))
}

/// Flatten one record into dotted-path columns.
///
/// Nested objects become `a.b.c` keys; arrays stay whole as JSON text so a
/// record remains one row. A non-object record is stored under `value`.
pub fn flatten_record(record: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    match record {
        Value::Object(object) => flatten_into(object, "", &mut out),
        other => {
            out.insert("value".to_string(), render_cell(other));
        }
    }
    out
}

fn flatten_into(object: &Map<String, Value>, prefix: &str, out: &mut BTreeMap<String, String>) {
    for (key, value) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => flatten_into(nested, &path, out),
            other => {
                out.insert(path, render_cell(other));
            }
        }
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Flattened records with a shared column set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Sorted union of every record's keys
    pub header: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

impl Table {
    /// Flatten `records` and compute the column union.
    pub fn from_records(records: &[Value]) -> Self {
        let rows: Vec<BTreeMap<String, String>> = records.iter().map(flatten_record).collect();
        let header: BTreeSet<&String> = rows.iter().flat_map(|row| row.keys()).collect();
        Self {
            header: header.into_iter().cloned().collect(),
            rows,
        }
    }

    /// Render as CSV. An empty table renders as an empty string.
    pub fn to_csv(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        let mut buf: Vec<u8> = Vec::new();
        let _ = write_row(&mut buf, &self.header);
        for row in &self.rows {
            let cells: Vec<String> = self
                .header
                .iter()
                .map(|column| row.get(column).cloned().unwrap_or_default())
                .collect();
            let _ = write_row(&mut buf, &cells);
        }

        match String::from_utf8(buf) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
        }
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}
