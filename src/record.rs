//! Error projection.
//!
//! An [`ErrorRecord`] is what the view layer sees of a failure. Reads never
//! fail: [`ErrorRecord::get`] returns a [`Field`], and a missing key is
//! [`Field::Absent`], which is falsy, renders as `""`, iterates as empty and
//! stays absent under further [`Field::get`] calls.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{EncodeError, Failure, FailureKind};
use crate::serialize::{htmlize, Format};

/// Message shown to users for defect-level failures.
pub const GENERIC_MESSAGE: &str = "internal error";

/// Template-safe projection of a failure.
///
/// # Examples
///
/// ```
/// use invoke_core::{ErrorRecord, Failure};
///
/// let record = ErrorRecord::from_failure(&Failure::invalid_input("bad email"));
///
/// assert_eq!(record.get("message").to_string(), "bad email");
/// assert!(!record.get("nonexistent_field").is_truthy());
/// assert_eq!(record.get("nonexistent_field").get("another").to_string(), "");
/// assert_eq!(record.get("nonexistent_field").into_iter().count(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    kind: FailureKind,
    message: Option<String>,
    details: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<String>,
}

impl ErrorRecord {
    /// Creates a record with a kind and optional message and no details.
    pub fn new(kind: FailureKind, message: Option<String>) -> Self {
        Self {
            kind,
            message,
            details: Map::new(),
            trace: None,
        }
    }

    /// Projects a classified failure.
    ///
    /// Defects get the generic message; their description is kept only as the
    /// trace, which callers attach with [`with_trace`](Self::with_trace) when
    /// the deployment shows traces.
    pub fn from_failure(failure: &Failure) -> Self {
        match failure {
            Failure::InvalidInput { message, details } => Self {
                kind: FailureKind::InvalidInput,
                message: message.clone(),
                details: details.clone(),
                trace: None,
            },
            Failure::Unhandled { .. } => Self::new(
                FailureKind::UnhandledFailure,
                Some(GENERIC_MESSAGE.to_string()),
            ),
            other => Self::new(other.kind(), Some(other.to_string())),
        }
    }

    /// Projects a serializer error.
    pub fn from_encode_error(err: &EncodeError) -> Self {
        match err {
            EncodeError::Unencodable { .. } => {
                Self::new(FailureKind::Unencodable, Some(GENERIC_MESSAGE.to_string()))
            }
            EncodeError::UnsupportedFormat(_) => {
                Self::new(FailureKind::NoViewMethod, Some(err.to_string()))
            }
        }
    }

    /// Attaches a technical trace.
    pub fn with_trace(mut self, trace: Option<String>) -> Self {
        self.trace = trace;
        self
    }

    /// Returns the failure kind.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the detail mapping (empty when the failure had none).
    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Returns the technical trace, if attached.
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    /// Permissive read of a named field.
    ///
    /// Details win: a detail named `message`, `kind` or `trace` shadows the
    /// record's own field of that name, which stays reachable through the
    /// accessors. Missing keys yield [`Field::Absent`].
    pub fn get(&self, key: &str) -> Field<'_> {
        if let Some(value) = self.details.get(key) {
            return Field::Value(value);
        }
        match key {
            "message" => self.message.as_deref().map_or(Field::Absent, Field::Text),
            "kind" => Field::Text(self.kind.name()),
            "trace" => self.trace.as_deref().map_or(Field::Absent, Field::Text),
            _ => Field::Absent,
        }
    }

    /// The JSON error body handed to API clients.
    pub fn json_body(&self, code: u16) -> Value {
        json!({
            "code": code,
            "exception": self.kind.name(),
            "message": self.message.as_deref().unwrap_or(""),
        })
    }

    /// Renders a complete error page in `format`.
    ///
    /// JSON formats get [`json_body`](Self::json_body); every other format
    /// gets `"<code> <message>\n<trace>"`, escaped for HTML.
    pub fn render_page(&self, code: u16, format: Format) -> String {
        if format.is_json() {
            return self.json_body(code).to_string();
        }
        let page = format!(
            "{} {}\n{}",
            code,
            self.message.as_deref().unwrap_or(""),
            self.trace.as_deref().unwrap_or("")
        );
        match format {
            Format::Html => htmlize(page),
            _ => page,
        }
    }
}

/// Result of a permissive read from an [`ErrorRecord`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    /// Nothing stored under this key
    Absent,
    /// A text field of the record itself
    Text(&'a str),
    /// A detail value
    Value(&'a Value),
}

impl<'a> Field<'a> {
    /// Chained read. Objects are indexed by key, arrays by decimal index;
    /// everything else, including `Absent`, yields `Absent`.
    pub fn get(self, key: &str) -> Field<'a> {
        match self {
            Field::Value(Value::Object(map)) => map.get(key).map_or(Field::Absent, Field::Value),
            Field::Value(Value::Array(items)) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .map_or(Field::Absent, Field::Value),
            _ => Field::Absent,
        }
    }

    /// Whether nothing was stored here.
    pub fn is_absent(self) -> bool {
        matches!(self, Field::Absent)
    }

    /// Truthiness as a template sees it: absent, null, false, zero and empty
    /// values are falsy.
    pub fn is_truthy(self) -> bool {
        match self {
            Field::Absent => false,
            Field::Text(s) => !s.is_empty(),
            Field::Value(v) => match v {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
            },
        }
    }

    /// The text of this field, if it is text.
    pub fn as_str(self) -> Option<&'a str> {
        match self {
            Field::Text(s) => Some(s),
            Field::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// The detail value, if this field is one.
    pub fn as_value(self) -> Option<&'a Value> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Iterates arrays element-wise and objects by key; everything else is empty.
    pub fn iter(self) -> FieldIter<'a> {
        match self {
            Field::Value(Value::Array(items)) => FieldIter::Items(items.iter()),
            Field::Value(Value::Object(map)) => FieldIter::Keys(map.keys()),
            _ => FieldIter::Empty,
        }
    }
}

impl fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Absent | Field::Value(Value::Null) => Ok(()),
            Field::Text(s) => f.write_str(s),
            Field::Value(Value::String(s)) => f.write_str(s),
            Field::Value(other) => write!(f, "{}", other),
        }
    }
}

impl<'a> IntoIterator for Field<'a> {
    type Item = Field<'a>;
    type IntoIter = FieldIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`Field`].
#[derive(Debug)]
pub enum FieldIter<'a> {
    /// Iterates nothing
    Empty,
    /// Array elements
    Items(std::slice::Iter<'a, Value>),
    /// Object keys
    Keys(serde_json::map::Keys<'a>),
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = Field<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FieldIter::Empty => None,
            FieldIter::Items(it) => it.next().map(Field::Value),
            FieldIter::Keys(it) => it.next().map(|k| Field::Text(k.as_str())),
        }
    }
}
