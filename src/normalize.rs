//! Result normalization.
//!
//! [`normalize`] rewrites any [`HandlerValue`] into a `serde_json::Value`
//! tree made only of objects, arrays and primitives. It is total: every input
//! has a normalized form, with the textual representation as the last resort.

use serde_json::{Map, Number, Value};

use crate::value::HandlerValue;

/// Normalizes a handler return value into a serialization-safe tree.
///
/// Normalizing an already-normalized value (converted back with
/// `HandlerValue::from`) yields the same tree.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use invoke_core::{normalize, Export, HandlerValue};
/// use serde_json::json;
///
/// #[derive(Debug)]
/// struct Row;
///
/// impl Export for Row {
///     fn export(&self) -> BTreeMap<String, HandlerValue> {
///         BTreeMap::from([("a".to_string(), HandlerValue::Int(1))])
///     }
/// }
///
/// let value = HandlerValue::map([(
///     "items",
///     HandlerValue::Seq(vec![HandlerValue::export(Row), 3.into(), "x".into()]),
/// )]);
/// assert_eq!(normalize(&value), json!({"items": [{"a": 1}, 3, "x"]}));
/// ```
pub fn normalize(value: &HandlerValue) -> Value {
    match value {
        HandlerValue::Null => Value::Null,
        HandlerValue::Bool(b) => Value::Bool(*b),
        HandlerValue::Int(i) => Value::from(*i),
        HandlerValue::UInt(u) => Value::from(*u),
        HandlerValue::Float(f) => match Number::from_f64(*f) {
            Some(n) => Value::Number(n),
            None => Value::String(f.to_string()),
        },
        HandlerValue::Text(s) => Value::String(s.clone()),
        HandlerValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        HandlerValue::Date(d) => Value::String(d.to_string()),
        HandlerValue::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect::<Map<_, _>>(),
        ),
        HandlerValue::Seq(items) => Value::Array(items.iter().map(normalize).collect()),
        HandlerValue::Export(obj) => normalize(&HandlerValue::Map(obj.export())),
        HandlerValue::Object(obj) => {
            if let Some(json) = obj.to_json() {
                return json;
            }
            if let Some(fields) = obj.fields() {
                return normalize(&HandlerValue::Map(fields));
            }
            tracing::debug!(
                type_name = obj.type_name(),
                "falling back to textual representation"
            );
            Value::String(obj.repr())
        }
    }
}

/// Whether a tree is made only of objects, arrays and primitives.
///
/// Always true for `serde_json::Value`; kept as an explicit check for callers
/// that receive trees from outside the normalizer.
pub fn is_normalized(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => true,
        Value::Number(n) => n.as_f64().is_some_and(f64::is_finite),
        Value::Array(items) => items.iter().all(is_normalized),
        Value::Object(map) => map.values().all(is_normalized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Export, Reflect, Serializable};
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug)]
    struct Account {
        id: i64,
    }

    impl Export for Account {
        fn export(&self) -> BTreeMap<String, HandlerValue> {
            BTreeMap::from([
                ("id".to_string(), HandlerValue::Int(self.id)),
                (
                    "opened".to_string(),
                    HandlerValue::from(NaiveDate::from_ymd_opt(2020, 1, 2)),
                ),
            ])
        }
    }

    #[derive(Debug)]
    struct WithFields;

    impl Reflect for WithFields {
        fn fields(&self) -> Option<BTreeMap<String, HandlerValue>> {
            Some(BTreeMap::from([("kind".to_string(), "fields".into())]))
        }
    }

    #[derive(Debug)]
    struct Socket(u16);

    impl Reflect for Socket {}

    #[test]
    fn primitives_pass_through() {
        assert_eq!(normalize(&HandlerValue::Null), Value::Null);
        assert_eq!(normalize(&true.into()), json!(true));
        assert_eq!(normalize(&42.into()), json!(42));
        assert_eq!(normalize(&"x".into()), json!("x"));
        assert_eq!(normalize(&2.5.into()), json!(2.5));
    }

    #[test]
    fn exported_objects_are_normalized_recursively() {
        let value = HandlerValue::Seq(vec![HandlerValue::export(Account { id: 7 })]);
        assert_eq!(
            normalize(&value),
            json!([{"id": 7, "opened": "2020-01-02"}])
        );
    }

    #[test]
    fn serializable_objects_use_their_json() {
        let value = HandlerValue::serializable(vec!["a", "b"]);
        assert_eq!(normalize(&value), json!(["a", "b"]));
    }

    #[test]
    fn unserializable_objects_fall_back_to_fields() {
        assert_eq!(
            normalize(&HandlerValue::object(WithFields)),
            json!({"kind": "fields"})
        );
    }

    #[test]
    fn opaque_objects_fall_back_to_text() {
        assert_eq!(
            normalize(&HandlerValue::object(Socket(8080))),
            json!("Socket(8080)")
        );
    }

    #[test]
    fn serializable_with_tuple_keys_falls_back_to_text() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), 3);
        let value = HandlerValue::object(Serializable(map));
        assert_eq!(normalize(&value), json!("{(1, 2): 3}"));
    }

    #[test]
    fn non_finite_floats_become_text() {
        assert_eq!(normalize(&f64::NAN.into()), json!("NaN"));
        assert_eq!(normalize(&f64::INFINITY.into()), json!("inf"));
    }

    #[test]
    fn timestamps_become_rfc3339_text() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(
            normalize(&HandlerValue::from(ts)),
            json!("2024-05-06T07:08:09+00:00")
        );
    }

    #[test]
    fn normalization_is_idempotent_on_nested_values() {
        let value = HandlerValue::map([
            ("acct", HandlerValue::export(Account { id: 1 })),
            ("sock", HandlerValue::object(Socket(1))),
            ("n", HandlerValue::Float(f64::NAN)),
        ]);
        let once = normalize(&value);
        let twice = normalize(&HandlerValue::from(once.clone()));
        assert_eq!(once, twice);
        assert!(is_normalized(&once));
    }
}
