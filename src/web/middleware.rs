//! Middleware stages and the outermost dispatcher.
//!
//! The [`Dispatcher`] is the one place that consumes [`ControlSignal`]s.
//! Everything below it (middleware, the invoker, handlers) either returns a
//! value, produces an error record, or lets the signal pass through.
//!
//! # Flow
//!
//! ```text
//! transport request
//!   ↓ ExtractContext
//! InvocationContext + arguments + format
//!   ↓ Middleware::before (may raise ControlSignal)
//! Invoker::invoke_with_arguments (may raise ControlSignal)
//!   ↓ Outcome::Value → serialize_value      Outcome::Error → ErrorRecord::render_page
//! Response
//! ```
//! A raised signal skips straight to the end and its response is emitted as-is.

use std::fmt;

use serde_json::{Map, Value};

use crate::config::Settings;
use crate::context::InvocationContext;
use crate::control::{ControlSignal, Response};
use crate::invoke::{Handler, Invocation, Invoker, Outcome};
use crate::logging::RequestLog;
use crate::record::ErrorRecord;
use crate::serialize::{serialize_value, Format};

use super::ExtractContext;

/// A stage that runs before the handler and may answer the request itself.
pub trait Middleware {
    /// Inspects the context; returning a signal short-circuits the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the [`ControlSignal`] whose response replaces the handler's.
    fn before(&self, ctx: &InvocationContext) -> Result<(), ControlSignal>;
}

impl<F> Middleware for F
where
    F: Fn(&InvocationContext) -> Result<(), ControlSignal>,
{
    fn before(&self, ctx: &InvocationContext) -> Result<(), ControlSignal> {
        self(ctx)
    }
}

/// Outermost response-producing layer.
///
/// # Examples
///
/// ```
/// use invoke_core::web::{Dispatcher, RequestAdapter};
/// use invoke_core::{handler_fn, Signature};
///
/// let ping = handler_fn("ping", Signature::new(), |_| Ok("pong".into()));
/// let mut request = RequestAdapter::new("req-1");
/// request.set_extension("txt");
///
/// let response = Dispatcher::default().dispatch(&ping, &request);
/// assert_eq!(response.status, 200);
/// assert_eq!(response.body, "pong");
/// ```
#[derive(Default)]
pub struct Dispatcher {
    invoker: Invoker,
    middleware: Vec<Box<dyn Middleware>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("invoker", &self.invoker)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with the given settings and no middleware.
    pub fn new(settings: Settings) -> Self {
        Self {
            invoker: Invoker::new(settings),
            middleware: Vec::new(),
        }
    }

    /// Appends a middleware stage; stages run in insertion order.
    pub fn with_middleware(mut self, stage: impl Middleware + 'static) -> Self {
        self.middleware.push(Box::new(stage));
        self
    }

    /// Handles one transport request end to end.
    pub fn dispatch<H, R>(&self, handler: &H, request: &R) -> Response
    where
        H: Handler + ?Sized,
        R: ExtractContext + ?Sized,
    {
        let format = request
            .requested_format()
            .unwrap_or(self.invoker.settings().default_format);
        self.dispatch_context(
            handler,
            request.extract_context(),
            &request.extract_arguments(),
            format,
        )
    }

    /// Runs middleware and the handler against an already built context.
    pub fn dispatch_context<H>(
        &self,
        handler: &H,
        ctx: InvocationContext,
        arguments: &Map<String, Value>,
        format: Format,
    ) -> Response
    where
        H: Handler + ?Sized,
    {
        let request_id = ctx.request_id().to_string();
        let log = RequestLog::new(&request_id);

        let result = self
            .run_middleware(&ctx)
            .and_then(|()| {
                self.invoker
                    .invoke_with_arguments(handler, ctx, arguments, format)
            });

        let response = match result {
            Ok(invocation) => self.render(&log, invocation),
            Err(signal) => {
                log.info(format_args!("emitting {}", signal));
                signal.into_response()
            }
        };

        log.debug(format_args!(
            "'{}' answered {} ({})",
            handler.name(),
            response.status,
            response.content_type
        ));
        response
    }

    fn run_middleware(&self, ctx: &InvocationContext) -> Result<(), ControlSignal> {
        for stage in &self.middleware {
            stage.before(ctx)?;
        }
        Ok(())
    }

    // Error pages for formats without an encoder are rendered as plain text.
    fn render(&self, log: &RequestLog<'_>, invocation: Invocation) -> Response {
        let format = invocation.format;
        match invocation.outcome {
            Outcome::Value(value) => match serialize_value(&value, format) {
                Ok(body) => Response::new(200, format.mimetype(), body),
                Err(err) => {
                    let mut record = ErrorRecord::from_encode_error(&err);
                    if record.kind().is_defect() {
                        log.error(format_args!("encoding failed: {}", err));
                        if self.invoker.settings().show_trace {
                            record = record.with_trace(Some(err.to_string()));
                        }
                    } else {
                        log.warn(format_args!("{}", err));
                    }
                    error_page(&record, format)
                }
            },
            Outcome::Error(record) => error_page(&record, format),
        }
    }
}

fn error_page(record: &ErrorRecord, format: Format) -> Response {
    let format = if format.is_encodable() {
        format
    } else {
        Format::Text
    };
    let status = record.kind().status();
    Response::new(status, format.mimetype(), record.render_page(status, format))
}
