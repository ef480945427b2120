//! Transport integration surface.
//!
//! This module is the boundary between transports (HTTP frameworks, command
//! lines) and the invocation core. It handles:
//! - Mapping transport requests to an [`InvocationContext`](crate::InvocationContext),
//!   ordinary arguments and an output [`Format`](crate::Format)
//! - Parsing command-line keyword arguments into a request payload
//! - Running middleware stages and catching control signals at the outermost layer
//!
//! # Design Principles
//!
//! 1. **No Framework Dependencies**: nothing here names a specific framework.
//!    Framework code fills a [`RequestAdapter`] or implements [`ExtractContext`].
//!
//! 2. **Context Is Supplied, Not Discovered**: identity and geolocation arrive
//!    from their collaborators already resolved. Extraction never performs I/O.
//!
//! 3. **One Escape Hatch**: only [`Dispatcher`] consumes a
//!    [`ControlSignal`](crate::ControlSignal). Middleware raises it, nothing
//!    in between catches it.
//!
//! # Example Flow
//!
//! ```
//! use invoke_core::web::{Dispatcher, RequestAdapter};
//! use invoke_core::{handler_fn, Principal, Sentinel, Signature};
//!
//! let whoami = handler_fn(
//!     "whoami",
//!     Signature::new()
//!         .context("user", Sentinel::Identity)
//!         .require_identity("please log in"),
//!     |args| Ok(args.get("user").cloned().unwrap_or_default().into()),
//! );
//!
//! let mut request = RequestAdapter::new("req-1");
//! request.set_extension("json");
//! let response = Dispatcher::default().dispatch(&whoami, &request);
//! assert_eq!(response.status, 401);
//!
//! request.set_principal(Some(Principal { id: "u1".into(), name: "Alice".into() }));
//! let response = Dispatcher::default().dispatch(&whoami, &request);
//! assert_eq!(response.body, r#"{"id":"u1","name":"Alice"}"#);
//! ```

mod adapter;
mod extract;
mod kwargs;
mod middleware;

pub use adapter::RequestAdapter;
pub use extract::ExtractContext;
pub use kwargs::parse_kwargs;
pub use middleware::{Dispatcher, Middleware};
