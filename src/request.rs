use serde::{Deserialize, Serialize};

/// An authenticated user or service principal.
///
/// Supplied by the session/authentication collaborator before invocation and
/// injected into handlers that declare [`Sentinel::Identity`](crate::Sentinel::Identity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique identifier for this principal
    pub id: String,
    /// Display name
    pub name: String,
}
