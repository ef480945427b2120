use serde_json::{Map, Value};

use crate::record::ErrorRecord;
use crate::request::Principal;
use crate::sentinel::Sentinel;

/// Per-request bag of ambient values, one slot per [`Sentinel`].
///
/// Populated by collaborators (session, geolocation, form replay) before the
/// pipeline runs, handed to [`invoke`](crate::invoke) by value and dropped once
/// the response exists. It is deliberately not `Clone`: a context belongs to
/// exactly one request.
///
/// # Examples
///
/// ```
/// use invoke_core::{InvocationContext, Principal, Sentinel};
/// use serde_json::json;
///
/// let ctx = InvocationContext::new("req-1")
///     .with_identity(Some(Principal { id: "u1".into(), name: "Alice".into() }))
///     .with_geo_country(Some("NZ".into()));
///
/// assert_eq!(ctx.lookup(Sentinel::GeoCountry), json!("NZ"));
/// assert_eq!(ctx.lookup(Sentinel::PreviousInput), json!(null));
/// ```
#[derive(Debug, Default)]
pub struct InvocationContext {
    request_id: String,
    identity: Option<Principal>,
    raw_payload: Map<String, Value>,
    geo_country: Option<String>,
    previous_input: Option<Value>,
    previous_errors: Option<ErrorRecord>,
}

impl InvocationContext {
    /// Creates an empty context for one request.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Sets the authenticated identity.
    pub fn with_identity(mut self, identity: Option<Principal>) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the raw request payload.
    pub fn with_raw_payload(mut self, payload: Map<String, Value>) -> Self {
        self.raw_payload = payload;
        self
    }

    /// Sets the client's country.
    pub fn with_geo_country(mut self, country: Option<String>) -> Self {
        self.geo_country = country;
        self
    }

    /// Sets the previous invocation's input.
    pub fn with_previous_input(mut self, input: Option<Value>) -> Self {
        self.previous_input = input;
        self
    }

    /// Sets the previous invocation's error record.
    pub fn with_previous_errors(mut self, errors: Option<ErrorRecord>) -> Self {
        self.previous_errors = errors;
        self
    }

    /// Returns the request ID for this context.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the identity if present.
    pub fn identity(&self) -> Option<&Principal> {
        self.identity.as_ref()
    }

    /// Returns the raw payload.
    pub fn raw_payload(&self) -> &Map<String, Value> {
        &self.raw_payload
    }

    /// Returns the client's country if known.
    pub fn geo_country(&self) -> Option<&str> {
        self.geo_country.as_deref()
    }

    /// Returns the previous invocation's input, if any.
    pub fn previous_input(&self) -> Option<&Value> {
        self.previous_input.as_ref()
    }

    /// Returns the previous invocation's errors, if any.
    pub fn previous_errors(&self) -> Option<&ErrorRecord> {
        self.previous_errors.as_ref()
    }

    /// The lookup table from tag to current value.
    ///
    /// Absent slots yield `null`; the raw payload is always an object.
    /// Previous errors keep the record's nesting, with field errors under
    /// `details` (see [`Sentinel::PreviousErrors`]).
    pub fn lookup(&self, sentinel: Sentinel) -> Value {
        match sentinel {
            Sentinel::Identity => to_value_or_null(self.identity.as_ref()),
            Sentinel::RawPayload => Value::Object(self.raw_payload.clone()),
            Sentinel::GeoCountry => self.geo_country.clone().map_or(Value::Null, Value::String),
            Sentinel::PreviousInput => self.previous_input.clone().unwrap_or(Value::Null),
            Sentinel::PreviousErrors => to_value_or_null(self.previous_errors.as_ref()),
        }
    }
}

fn to_value_or_null<T: serde::Serialize>(value: Option<&T>) -> Value {
    value
        .and_then(|v| serde_json::to_value(v).ok())
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Failure;
    use serde_json::json;

    fn alice() -> Principal {
        Principal {
            id: "user-1".to_string(),
            name: "Alice".to_string(),
        }
    }

    #[test]
    fn empty_context_looks_up_nulls() {
        let ctx = InvocationContext::new("req-empty");
        assert_eq!(ctx.request_id(), "req-empty");
        assert_eq!(ctx.lookup(Sentinel::Identity), Value::Null);
        assert_eq!(ctx.lookup(Sentinel::RawPayload), json!({}));
        assert_eq!(ctx.lookup(Sentinel::GeoCountry), Value::Null);
        assert_eq!(ctx.lookup(Sentinel::PreviousInput), Value::Null);
        assert_eq!(ctx.lookup(Sentinel::PreviousErrors), Value::Null);
    }

    #[test]
    fn identity_is_looked_up_as_object() {
        let ctx = InvocationContext::new("req-1").with_identity(Some(alice()));
        assert_eq!(
            ctx.lookup(Sentinel::Identity),
            json!({"id": "user-1", "name": "Alice"})
        );
        assert_eq!(ctx.identity(), Some(&alice()));
    }

    #[test]
    fn raw_payload_is_looked_up_whole() {
        let mut payload = Map::new();
        payload.insert("q".into(), json!("rust"));
        let ctx = InvocationContext::new("req-2").with_raw_payload(payload);
        assert_eq!(ctx.lookup(Sentinel::RawPayload), json!({"q": "rust"}));
    }

    #[test]
    fn previous_errors_are_looked_up_as_record() {
        let record = ErrorRecord::from_failure(&Failure::invalid_input("bad email"));
        let ctx = InvocationContext::new("req-3")
            .with_previous_input(Some(json!({"email": "nope"})))
            .with_previous_errors(Some(record));

        assert_eq!(ctx.lookup(Sentinel::PreviousInput), json!({"email": "nope"}));
        assert_eq!(
            ctx.lookup(Sentinel::PreviousErrors)["message"],
            json!("bad email")
        );
    }

    #[test]
    fn previous_field_errors_nest_under_details() {
        let mut details = Map::new();
        details.insert("email".into(), json!("is required"));
        let record = ErrorRecord::from_failure(&Failure::invalid_fields(details))
            .with_trace(Some("stack".to_string()));
        let ctx = InvocationContext::new("req-5").with_previous_errors(Some(record));

        let prev = ctx.lookup(Sentinel::PreviousErrors);
        assert_eq!(
            prev,
            json!({
                "kind": "InvalidInput",
                "message": null,
                "details": {"email": "is required"},
                "trace": "stack",
            })
        );
        assert_eq!(prev["details"]["email"], json!("is required"));
        assert_eq!(prev["email"], Value::Null);
    }

    #[test]
    fn lookup_does_not_consume_context() {
        let ctx = InvocationContext::new("req-4").with_geo_country(Some("FR".into()));
        let _ = ctx.lookup(Sentinel::GeoCountry);
        assert_eq!(ctx.geo_country(), Some("FR"));
    }
}
