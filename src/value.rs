//! Handler return values.
//!
//! Handlers return heterogeneous values that the pipeline does not know
//! statically. `HandlerValue` is the open tree they are expressed in: plain
//! data, calendar values, objects with a dict-export capability ([`Export`]),
//! and opaque objects ([`Reflect`]) that the normalizer and serializer probe
//! step by step.

use std::any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use serde::Serialize;
use serde_json::Value;

/// Dict-export capability: the object can hand out a plain mapping of itself.
pub trait Export: fmt::Debug {
    /// Exports this object as a string-keyed mapping.
    fn export(&self) -> BTreeMap<String, HandlerValue>;
}

/// Last-resort probing for objects without a dict-export capability.
///
/// The normalizer tries, in order: [`to_json`](Reflect::to_json),
/// [`fields`](Reflect::fields), then [`repr`](Reflect::repr).
pub trait Reflect: fmt::Debug {
    /// Direct serializable form, if the object has one.
    fn to_json(&self) -> Option<Value> {
        None
    }

    /// The object's own field mapping, if it exposes one.
    fn fields(&self) -> Option<BTreeMap<String, HandlerValue>> {
        None
    }

    /// Type name reported when the object cannot be encoded.
    fn type_name(&self) -> &'static str {
        any::type_name::<Self>()
    }

    /// Textual representation.
    fn repr(&self) -> String {
        format!("{:?}", self)
    }
}

/// Adapts any `Serialize` type into a [`Reflect`] object.
///
/// Serialization failures (for example maps with non-string keys) leave
/// [`to_json`](Reflect::to_json) empty so the normalizer falls through to the
/// textual representation.
#[derive(Debug, Clone)]
pub struct Serializable<T>(pub T);

impl<T: Serialize + fmt::Debug> Reflect for Serializable<T> {
    fn to_json(&self) -> Option<Value> {
        serde_json::to_value(&self.0).ok()
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn repr(&self) -> String {
        format!("{:?}", self.0)
    }
}

/// A value returned by a handler.
#[derive(Debug)]
pub enum HandlerValue {
    /// Absence of a value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer beyond the signed range
    UInt(u64),
    /// Floating point number; may be non-finite
    Float(f64),
    /// Text
    Text(String),
    /// Calendar timestamp with offset
    Timestamp(DateTime<FixedOffset>),
    /// Calendar date
    Date(NaiveDate),
    /// String-keyed mapping
    Map(BTreeMap<String, HandlerValue>),
    /// Ordered sequence
    Seq(Vec<HandlerValue>),
    /// Object with a dict-export capability
    Export(Box<dyn Export>),
    /// Opaque object
    Object(Box<dyn Reflect>),
}

impl HandlerValue {
    /// Wraps an object with a dict-export capability.
    pub fn export(value: impl Export + 'static) -> Self {
        HandlerValue::Export(Box::new(value))
    }

    /// Wraps an opaque object.
    pub fn object(value: impl Reflect + 'static) -> Self {
        HandlerValue::Object(Box::new(value))
    }

    /// Wraps a `Serialize` type as an opaque object.
    pub fn serializable<T>(value: T) -> Self
    where
        T: Serialize + fmt::Debug + 'static,
    {
        HandlerValue::Object(Box::new(Serializable(value)))
    }

    /// Builds a mapping from key/value pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<HandlerValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        HandlerValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            HandlerValue::Null => "null",
            HandlerValue::Bool(_) => "bool",
            HandlerValue::Int(_) => "i64",
            HandlerValue::UInt(_) => "u64",
            HandlerValue::Float(_) => "f64",
            HandlerValue::Text(_) => "string",
            HandlerValue::Timestamp(_) => "timestamp",
            HandlerValue::Date(_) => "date",
            HandlerValue::Map(_) => "map",
            HandlerValue::Seq(_) => "seq",
            HandlerValue::Export(_) => "export",
            HandlerValue::Object(o) => o.type_name(),
        }
    }
}

impl From<Value> for HandlerValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => HandlerValue::Null,
            Value::Bool(b) => HandlerValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    HandlerValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    HandlerValue::UInt(u)
                } else {
                    HandlerValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => HandlerValue::Text(s),
            Value::Array(items) => {
                HandlerValue::Seq(items.into_iter().map(HandlerValue::from).collect())
            }
            Value::Object(map) => HandlerValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, HandlerValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<()> for HandlerValue {
    fn from(_: ()) -> Self {
        HandlerValue::Null
    }
}

impl From<bool> for HandlerValue {
    fn from(b: bool) -> Self {
        HandlerValue::Bool(b)
    }
}

impl From<i32> for HandlerValue {
    fn from(i: i32) -> Self {
        HandlerValue::Int(i64::from(i))
    }
}

impl From<i64> for HandlerValue {
    fn from(i: i64) -> Self {
        HandlerValue::Int(i)
    }
}

impl From<u32> for HandlerValue {
    fn from(u: u32) -> Self {
        HandlerValue::Int(i64::from(u))
    }
}

impl From<u64> for HandlerValue {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => HandlerValue::Int(i),
            Err(_) => HandlerValue::UInt(u),
        }
    }
}

impl From<usize> for HandlerValue {
    fn from(u: usize) -> Self {
        HandlerValue::from(u as u64)
    }
}

impl From<f64> for HandlerValue {
    fn from(f: f64) -> Self {
        HandlerValue::Float(f)
    }
}

impl From<&str> for HandlerValue {
    fn from(s: &str) -> Self {
        HandlerValue::Text(s.to_string())
    }
}

impl From<String> for HandlerValue {
    fn from(s: String) -> Self {
        HandlerValue::Text(s)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for HandlerValue {
    fn from(dt: DateTime<Tz>) -> Self {
        HandlerValue::Timestamp(dt.fixed_offset())
    }
}

impl From<NaiveDate> for HandlerValue {
    fn from(d: NaiveDate) -> Self {
        HandlerValue::Date(d)
    }
}

impl<T: Into<HandlerValue>> From<Option<T>> for HandlerValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(HandlerValue::Null, Into::into)
    }
}

impl<T: Into<HandlerValue>> From<Vec<T>> for HandlerValue {
    fn from(items: Vec<T>) -> Self {
        HandlerValue::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<HandlerValue>> From<BTreeMap<String, T>> for HandlerValue {
    fn from(map: BTreeMap<String, T>) -> Self {
        HandlerValue::map(map)
    }
}

impl<T: Into<HandlerValue>> From<HashMap<String, T>> for HandlerValue {
    fn from(map: HashMap<String, T>) -> Self {
        HandlerValue::map(map)
    }
}
