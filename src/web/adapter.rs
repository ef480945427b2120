//! Request adapter for mapping transport requests to invocation inputs.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::context::InvocationContext;
use crate::record::ErrorRecord;
use crate::request::Principal;
use crate::serialize::Format;

use super::kwargs::parse_kwargs;
use super::ExtractContext;

/// Framework-agnostic request description.
///
/// Holds plain owned data so any HTTP framework or CLI front end can fill it.
/// Argument precedence, lowest to highest: query parameters, body fields,
/// path parameters.
///
/// # Examples
///
/// ```
/// use invoke_core::web::{ExtractContext, RequestAdapter};
/// use invoke_core::{Format, Principal, Sentinel};
/// use serde_json::json;
///
/// let mut adapter = RequestAdapter::new("req-12345");
/// adapter.set_principal(Some(Principal { id: "user-1".into(), name: "Alice".into() }));
/// adapter.add_query_param("search", "user input");
/// adapter.set_extension("json");
///
/// let ctx = adapter.extract_context();
/// assert_eq!(ctx.request_id(), "req-12345");
/// assert_eq!(ctx.lookup(Sentinel::RawPayload), json!({"search": "user input"}));
/// assert_eq!(adapter.requested_format(), Some(Format::Json));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestAdapter {
    request_id: String,
    principal: Option<Principal>,
    geo_country: Option<String>,
    query_params: BTreeMap<String, String>,
    path_params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: Map<String, Value>,
    extension: Option<String>,
    previous_input: Option<Value>,
    previous_errors: Option<ErrorRecord>,
}

impl RequestAdapter {
    /// Creates an adapter with the given request ID and nothing else.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Creates an adapter from command-line `--key=value` arguments.
    pub fn from_cli<I, S>(request_id: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut adapter = Self::new(request_id);
        adapter.body = parse_kwargs(args);
        adapter
    }

    /// Sets the identity resolved by the session collaborator.
    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    /// Sets the country resolved by the geolocation collaborator.
    pub fn set_geo_country(&mut self, country: Option<String>) {
        self.geo_country = country;
    }

    /// Adds a query parameter.
    pub fn add_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query_params.insert(key.into(), value.into());
    }

    /// Adds a path parameter from routing.
    pub fn add_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.path_params.insert(key.into(), value.into());
    }

    /// Adds a header. Names are stored lowercase.
    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key: String = key.into();
        self.headers.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Sets a decoded body field.
    pub fn set_body_field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.body.insert(key.into(), value.into());
    }

    /// Sets the extension the client asked for (e.g. from `/users.json`).
    pub fn set_extension(&mut self, extension: impl Into<String>) {
        self.extension = Some(extension.into());
    }

    /// Carries the input and errors of a rejected previous invocation.
    pub fn set_previous(&mut self, input: Option<Value>, errors: Option<ErrorRecord>) {
        self.previous_input = input;
        self.previous_errors = errors;
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl ExtractContext for RequestAdapter {
    fn extract_context(&self) -> InvocationContext {
        InvocationContext::new(self.request_id.clone())
            .with_identity(self.principal.clone())
            .with_geo_country(self.geo_country.clone())
            .with_raw_payload(self.extract_arguments())
            .with_previous_input(self.previous_input.clone())
            .with_previous_errors(self.previous_errors.clone())
    }

    fn extract_arguments(&self) -> Map<String, Value> {
        let mut args = Map::new();
        for (k, v) in &self.query_params {
            args.insert(k.clone(), Value::String(v.clone()));
        }
        for (k, v) in &self.body {
            args.insert(k.clone(), v.clone());
        }
        for (k, v) in &self.path_params {
            args.insert(k.clone(), Value::String(v.clone()));
        }
        args
    }

    /// The extension wins over the `Accept` header.
    fn requested_format(&self) -> Option<Format> {
        self.extension
            .as_deref()
            .and_then(Format::from_extension)
            .or_else(|| self.header("accept").and_then(negotiate))
    }
}

/// Picks the known format with the highest `q` from an `Accept` header.
///
/// Ties keep header order; `q=0` marks a type as unacceptable.
fn negotiate(accept: &str) -> Option<Format> {
    let mut candidates: Vec<(f32, Format)> = accept
        .split(',')
        .filter_map(|entry| Some((quality(entry), Format::from_mimetype(entry)?)))
        .filter(|(q, _)| *q > 0.0)
        .collect();
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    candidates.first().map(|(_, format)| *format)
}

fn quality(entry: &str) -> f32 {
    entry
        .split(';')
        .skip(1)
        .find_map(|param| {
            let (name, value) = param.split_once('=')?;
            if name.trim() == "q" {
                value.trim().parse::<f32>().ok()
            } else {
                None
            }
        })
        .unwrap_or(1.0)
}
