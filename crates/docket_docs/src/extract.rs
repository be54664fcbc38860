//! Field discovery for arbitrary serializable models.
//!
//! A model is serialized into a [`DocumentValue`] (record, list, or scalar)
//! and described as an ordered [`FieldSet`] plus one [`Row`] per record. The
//! header and every row share the same field order.

use docket_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Field name used for scalar values.
pub const VALUE_FIELD: &str = "Value";

/// One row of field values aligned to a [`FieldSet`]; `None` marks a field
/// that could not be resolved.
pub type Row = Vec<Option<String>>;

// ---------------------------------------------------------------------------
// DocumentValue
// ---------------------------------------------------------------------------

/// The shape of a caller-supplied value.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentValue {
    /// Named attributes in declaration order.
    Record(Map<String, Value>),
    /// A sequence of values; the first element defines the fields.
    List(Vec<Value>),
    /// Anything else, including strings and empty records.
    Scalar(Value),
}

impl DocumentValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items),
            Value::Object(map) if !map.is_empty() => Self::Record(map),
            other => Self::Scalar(other),
        }
    }
}

/// A [`DocumentValue`] together with the name of the type it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    shape_name: String,
    value: DocumentValue,
}

impl Document {
    /// Serialize `model` and tag it with its short type name.
    pub fn from_model<T: Serialize + ?Sized>(model: &T) -> Result<Self> {
        let value = serde_json::to_value(model)?;
        Ok(Self::from_json(short_type_name::<T>(), value))
    }

    pub fn from_json(shape_name: impl Into<String>, value: Value) -> Self {
        Self {
            shape_name: shape_name.into(),
            value: DocumentValue::from_json(value),
        }
    }

    pub fn shape_name(&self) -> &str {
        &self.shape_name
    }

    pub fn value(&self) -> &DocumentValue {
        &self.value
    }
}

// ---------------------------------------------------------------------------
// FieldSet / Extraction
// ---------------------------------------------------------------------------

/// Ordered field names shared by the header and all rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSet(Vec<String>);

impl FieldSet {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// The single `Value` field used for scalars.
    pub fn scalar() -> Self {
        Self(vec![VALUE_FIELD.to_string()])
    }

    /// Field names of `T`, taken from its default value.
    pub fn of_shape<T: Serialize + Default>() -> Self {
        match serde_json::to_value(T::default()) {
            Ok(Value::Object(map)) if !map.is_empty() => Self(map.keys().cloned().collect()),
            _ => Self::scalar(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of describing one [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub shape_name: String,
    pub fields: FieldSet,
    pub rows: Vec<Row>,
}

impl Extraction {
    /// True when there is no data to show. Both the HTML and the workbook
    /// paths use this to decide on their empty-state output.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row of a single-record document.
    pub fn single_row(&self) -> Option<&Row> {
        match self.rows.as_slice() {
            [row] => Some(row),
            _ => None,
        }
    }

    /// Rows with unresolved fields replaced by `placeholder`.
    pub fn display_rows(&self, placeholder: &str) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.clone().unwrap_or_else(|| placeholder.to_string()))
                    .collect()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Placeholder record whose fields head an empty list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    pub id: u64,
    pub sender: String,
    pub text: String,
    pub sent_at: String,
}

/// Something that can describe itself as fields and rows.
pub trait Describe {
    fn describe(&self) -> Extraction;
}

impl Describe for Document {
    fn describe(&self) -> Extraction {
        Extractor::default().extract(self)
    }
}

/// Turns documents into [`Extraction`]s.
#[derive(Debug, Clone)]
pub struct Extractor {
    fallback: FieldSet,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_fallback_shape::<Message>()
    }
}

impl Extractor {
    /// Use the fields of `T` as the header of empty lists.
    pub fn with_fallback_shape<T: Serialize + Default>() -> Self {
        Self {
            fallback: FieldSet::of_shape::<T>(),
        }
    }

    pub fn with_fallback(fallback: FieldSet) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> &FieldSet {
        &self.fallback
    }

    pub fn extract(&self, document: &Document) -> Extraction {
        let (fields, rows) = match document.value() {
            DocumentValue::List(items) => match items.first() {
                Some(first) => {
                    let fields = fields_of(first);
                    let rows: Vec<Row> =
                        items.iter().map(|item| resolve_row(item, &fields)).collect();
                    (fields, rows)
                }
                None => (self.fallback.clone(), Vec::new()),
            },
            DocumentValue::Record(map) => {
                let fields = FieldSet(map.keys().cloned().collect());
                let row: Row = fields
                    .iter()
                    .map(|name| record_field(map, name))
                    .collect();
                (fields, vec![row])
            }
            DocumentValue::Scalar(value) => (FieldSet::scalar(), vec![vec![stringify(value)]]),
        };

        debug!(
            shape = document.shape_name(),
            fields = fields.len(),
            rows = rows.len(),
            "extracted fields"
        );

        Extraction {
            shape_name: document.shape_name().to_string(),
            fields,
            rows,
        }
    }
}

fn fields_of(value: &Value) -> FieldSet {
    match value {
        Value::Object(map) if !map.is_empty() => FieldSet(map.keys().cloned().collect()),
        _ => FieldSet::scalar(),
    }
}

fn resolve_row(item: &Value, fields: &FieldSet) -> Row {
    fields.iter().map(|name| resolve_field(item, name)).collect()
}

/// Look up `name` on `row`. Misses are logged and become `None`.
pub fn resolve_field(row: &Value, name: &str) -> Option<String> {
    match row {
        Value::Object(map) if !map.is_empty() => record_field(map, name),
        _ if name == VALUE_FIELD => stringify(row),
        _ => {
            debug!(field = name, "field not available on non-record row");
            None
        }
    }
}

fn record_field(map: &Map<String, Value>, name: &str) -> Option<String> {
    match map.get(name) {
        Some(value) => {
            let text = stringify(value);
            if text.is_none() {
                debug!(field = name, "field is null");
            }
            text
        }
        None => {
            debug!(field = name, "field missing on row");
            None
        }
    }
}

/// Text form of a value: strings verbatim, nested values as compact JSON.
pub fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Last path segment of the innermost named type, e.g. `Vec<app::Person>`
/// becomes `Person`.
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    full.split(|c: char| matches!(c, '<' | '>' | '[' | ']' | '(' | ')' | '&' | ',' | ';' | ' '))
        .filter(|token| {
            !token.is_empty() && token != &"mut" && !token.chars().all(|c| c.is_ascii_digit())
        })
        .next_back()
        .and_then(|token| token.rsplit("::").next())
        .unwrap_or(full)
        .to_string()
}
