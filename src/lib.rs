//! Handler invocation core for request-handling frameworks.
//!
//! This crate sits between a transport and domain handlers:
//! - **Context injection**: handlers declare [`Sentinel`] parameters and
//!   receive request data (identity, raw payload, geolocation, previous
//!   errors) without naming the transport
//! - **Failure projection**: every failure becomes a classified
//!   [`ErrorRecord`] whose reads never fail
//! - **Control interrupts**: a [`ControlSignal`] carries a pre-rendered
//!   response past every layer to the outermost dispatcher
//! - **Result normalization**: any [`HandlerValue`] becomes a plain JSON tree
//!   that the serializer can encode
//!
//! # Core Types
//!
//! - [`InvocationContext`]: per-request data, consumed by one invocation
//! - [`Signature`]: a handler's declared parameters and identity requirement
//! - [`Invoker`]: resolves, calls once, classifies
//! - [`Outcome`]: the normalized value or the error record
//! - [`web::Dispatcher`]: outermost layer producing transport responses
//!
//! # Examples
//!
//! ```
//! use invoke_core::{
//!     handler_fn, invoke, Export, Format, HandlerValue, InvocationContext, Outcome, Principal,
//!     Sentinel, Signature,
//! };
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! #[derive(Debug)]
//! struct Row;
//!
//! impl Export for Row {
//!     fn export(&self) -> BTreeMap<String, HandlerValue> {
//!         BTreeMap::from([("a".to_string(), HandlerValue::from(1))])
//!     }
//! }
//!
//! let list = handler_fn(
//!     "list",
//!     Signature::new()
//!         .context("user", Sentinel::Identity)
//!         .require_identity("please log in"),
//!     |_| {
//!         Ok(HandlerValue::map([(
//!             "items",
//!             HandlerValue::Seq(vec![HandlerValue::export(Row), 3.into(), "x".into()]),
//!         )]))
//!     },
//! );
//!
//! let anonymous = invoke(&list, InvocationContext::new("req-1"), Format::Json).unwrap();
//! assert_eq!(anonymous.status(), 401);
//! assert_eq!(anonymous.error().unwrap().message(), Some("please log in"));
//!
//! let alice = Principal { id: "u1".into(), name: "Alice".into() };
//! let ctx = InvocationContext::new("req-2").with_identity(Some(alice));
//! let invocation = invoke(&list, ctx, Format::Json).unwrap();
//! assert_eq!(invocation.outcome, Outcome::Value(json!({"items": [{"a": 1}, 3, "x"]})));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod control;
mod error;
mod invoke;
mod logging;
mod normalize;
mod record;
mod request;
mod sentinel;
mod serialize;
mod signature;
mod value;

pub mod web;

pub use config::{Settings, DEFAULT_FORMAT_VAR, SHOW_TRACE_VAR};
pub use context::InvocationContext;
pub use control::{Control, ControlSignal, Redirect, Response};
pub use error::{Abort, EncodeError, Failure, FailureKind};
pub use invoke::{handler_fn, invoke, FnHandler, Handler, HandlerResult, Invocation, Invoker, Outcome};
pub use logging::RequestLog;
pub use normalize::{is_normalized, normalize};
pub use record::{ErrorRecord, Field, FieldIter, GENERIC_MESSAGE};
pub use request::Principal;
pub use sentinel::Sentinel;
pub use serialize::{htmlize, htmlize_list, jsonify, serialize, serialize_value, Format};
pub use signature::{authenticated, BoundArgs, Param, ParamSource, Signature};
pub use value::{Export, HandlerValue, Reflect, Serializable};
