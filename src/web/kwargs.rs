//! Command-line keyword arguments as a request payload.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Parses `--key=value` arguments into a payload mapping.
///
/// Repeated keys collect their values into an array; single occurrences stay
/// scalar. An argument without `=` is a flag and maps to `true`.
///
/// # Examples
///
/// ```
/// use invoke_core::web::parse_kwargs;
/// use serde_json::json;
///
/// let payload = parse_kwargs(["--var1=1", "--var2=2", "--var1=3"]);
/// assert_eq!(serde_json::Value::Object(payload), json!({"var1": ["1", "3"], "var2": "2"}));
/// ```
pub fn parse_kwargs<I, S>(args: I) -> Map<String, Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for arg in args {
        let arg = arg.as_ref();
        let (key, value) = match arg.split_once('=') {
            Some((k, v)) => (k, Value::String(v.to_string())),
            None => (arg, Value::Bool(true)),
        };
        let key = key.trim_start_matches('-');
        if key.is_empty() {
            continue;
        }
        grouped.entry(key.to_string()).or_default().push(value);
    }

    grouped
        .into_iter()
        .map(|(k, mut values)| {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            (k, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flags_without_values_are_true() {
        let payload = parse_kwargs(["--verbose", "--name=x"]);
        assert_eq!(payload["verbose"], json!(true));
        assert_eq!(payload["name"], json!("x"));
    }

    #[test]
    fn values_may_contain_equals_signs() {
        let payload = parse_kwargs(["--filter=a=b"]);
        assert_eq!(payload["filter"], json!("a=b"));
    }

    #[test]
    fn bare_dashes_are_ignored() {
        assert!(parse_kwargs(["--", "-=1"]).is_empty());
    }

    #[test]
    fn empty_input_is_empty_payload() {
        assert!(parse_kwargs(Vec::<String>::new()).is_empty());
    }
}
