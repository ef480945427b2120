//! The closed registry of ambient-context tags.
//!
//! A `Sentinel` names one piece of request context a handler may ask for.
//! Tags carry no data; the value lives in the
//! [`InvocationContext`](crate::InvocationContext) and is looked up per request.

use std::fmt;

/// Capability tag identifying one category of ambient request context.
///
/// The set is closed: adding a tag means adding a variant here and an arm in
/// [`InvocationContext::lookup`](crate::InvocationContext::lookup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sentinel {
    /// The authenticated principal making the request, if any
    Identity,
    /// The raw request payload as a string-keyed mapping
    RawPayload,
    /// The client's country, from a geolocation lookup
    GeoCountry,
    /// The input of the previous invocation (e.g. a rejected form)
    PreviousInput,
    /// The error record of the previous invocation.
    ///
    /// Injected as the record's serialized tree,
    /// `{"kind", "message", "details": {..}}` plus `"trace"` when attached.
    /// Field errors live under `details`, so a handler reads
    /// `prev["details"]["email"]` where a template would call
    /// [`ErrorRecord::get("email")`](crate::ErrorRecord::get).
    PreviousErrors,
}

impl Sentinel {
    /// Every registered tag, in declaration order.
    pub const ALL: [Sentinel; 5] = [
        Sentinel::Identity,
        Sentinel::RawPayload,
        Sentinel::GeoCountry,
        Sentinel::PreviousInput,
        Sentinel::PreviousErrors,
    ];

    /// Stable name used in logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Sentinel::Identity => "identity",
            Sentinel::RawPayload => "raw_payload",
            Sentinel::GeoCountry => "geo_country",
            Sentinel::PreviousInput => "previous_input",
            Sentinel::PreviousErrors => "previous_errors",
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
