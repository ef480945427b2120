//! Extraction boundary traits for transport integration.
//!
//! This module defines how a transport-specific request becomes the inputs of
//! one invocation: the context, the ordinary arguments and the output format.

use serde_json::{Map, Value};

use crate::context::InvocationContext;
use crate::serialize::Format;

/// Builds the inputs of one invocation from a transport request.
///
/// Implementations only map transport types to core types. They do not
/// authenticate (the session collaborator supplies the identity) and do not
/// validate arguments (handlers do).
///
/// # Examples
///
/// ```
/// use invoke_core::web::ExtractContext;
/// use invoke_core::{Format, InvocationContext};
/// use serde_json::{Map, Value};
///
/// struct MyFrameworkRequest {
///     id: String,
///     path: String,
/// }
///
/// impl ExtractContext for MyFrameworkRequest {
///     fn extract_context(&self) -> InvocationContext {
///         InvocationContext::new(self.id.clone())
///     }
///
///     fn extract_arguments(&self) -> Map<String, Value> {
///         Map::new()
///     }
///
///     fn requested_format(&self) -> Option<Format> {
///         self.path.rsplit_once('.').and_then(|(_, ext)| Format::from_extension(ext))
///     }
/// }
///
/// let req = MyFrameworkRequest { id: "req-1".into(), path: "/users.json".into() };
/// assert_eq!(req.requested_format(), Some(Format::Json));
/// ```
pub trait ExtractContext {
    /// Builds a fresh context for this request.
    fn extract_context(&self) -> InvocationContext;

    /// Ordinary arguments for the handler's argument parameters.
    fn extract_arguments(&self) -> Map<String, Value>;

    /// The format the client asked for, if it asked.
    fn requested_format(&self) -> Option<Format>;
}
