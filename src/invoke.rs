//! The invoker: resolve, call once, classify.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::{Map, Value};

use crate::config::Settings;
use crate::context::InvocationContext;
use crate::control::ControlSignal;
use crate::error::{Abort, Failure};
use crate::logging::RequestLog;
use crate::normalize::normalize;
use crate::record::ErrorRecord;
use crate::serialize::Format;
use crate::signature::{BoundArgs, Signature};
use crate::value::HandlerValue;

/// What a handler returns.
pub type HandlerResult = Result<HandlerValue, Abort>;

/// A domain handler with a declared signature.
pub trait Handler {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// The parameters this handler wants.
    fn signature(&self) -> &Signature;

    /// Runs the handler body with resolved arguments.
    fn call(&self, args: BoundArgs) -> HandlerResult;
}

/// A [`Handler`] backed by a closure.
pub struct FnHandler<F> {
    name: String,
    signature: Signature,
    f: F,
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Builds a handler from a name, a signature and a closure.
///
/// # Examples
///
/// ```
/// use invoke_core::{handler_fn, invoke, Format, InvocationContext, Outcome, Sentinel, Signature};
/// use serde_json::json;
///
/// let greet = handler_fn(
///     "greet",
///     Signature::new().context("country", Sentinel::GeoCountry),
///     |args| {
///         let country = args.get("country").and_then(|v| v.as_str()).unwrap_or("nowhere");
///         Ok(format!("hello from {country}").into())
///     },
/// );
///
/// let ctx = InvocationContext::new("req-1").with_geo_country(Some("IS".into()));
/// let invocation = invoke(&greet, ctx, Format::Json).unwrap();
/// assert_eq!(invocation.outcome, Outcome::Value(json!("hello from IS")));
/// ```
pub fn handler_fn<F>(name: impl Into<String>, signature: Signature, f: F) -> FnHandler<F>
where
    F: Fn(BoundArgs) -> HandlerResult,
{
    FnHandler {
        name: name.into(),
        signature,
        f,
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(BoundArgs) -> HandlerResult,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, args: BoundArgs) -> HandlerResult {
        (self.f)(args)
    }
}

/// Result or error record of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The normalized return value
    Value(Value),
    /// The projected failure
    Error(ErrorRecord),
}

/// Everything an invocation hands to the view layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Result or error record
    pub outcome: Outcome,
    /// Format the response should be rendered in
    pub format: Format,
}

impl Invocation {
    /// Status a transport should use: 200, or the failure kind's status.
    pub fn status(&self) -> u16 {
        match &self.outcome {
            Outcome::Value(_) => 200,
            Outcome::Error(record) => record.kind().status(),
        }
    }

    /// The error record, if the invocation failed.
    pub fn error(&self) -> Option<&ErrorRecord> {
        match &self.outcome {
            Outcome::Error(record) => Some(record),
            Outcome::Value(_) => None,
        }
    }
}

/// Runs handlers and classifies their failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Invoker {
    settings: Settings,
}

impl Invoker {
    /// Creates an invoker with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Returns the settings in effect.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Invokes `handler` with only context parameters and defaults bound.
    ///
    /// # Errors
    ///
    /// Returns the [`ControlSignal`] a handler raised. Every other failure,
    /// panics included, is folded into [`Outcome::Error`].
    pub fn invoke<H>(
        &self,
        handler: &H,
        ctx: InvocationContext,
        format: Format,
    ) -> Result<Invocation, ControlSignal>
    where
        H: Handler + ?Sized,
    {
        self.invoke_with_arguments(handler, ctx, &Map::new(), format)
    }

    /// Invokes `handler`, filling argument parameters from `arguments`.
    ///
    /// The context is consumed: it is dropped once the invocation returns.
    ///
    /// # Errors
    ///
    /// As for [`invoke`](Self::invoke).
    pub fn invoke_with_arguments<H>(
        &self,
        handler: &H,
        ctx: InvocationContext,
        arguments: &Map<String, Value>,
        format: Format,
    ) -> Result<Invocation, ControlSignal>
    where
        H: Handler + ?Sized,
    {
        let log = RequestLog::new(ctx.request_id());
        let _span = log.span().entered();
        log.debug(format_args!("invoking handler '{}'", handler.name()));

        let args = match handler.signature().resolve(&ctx) {
            Ok(args) => args.with_arguments(arguments),
            Err(failure) => return Ok(self.fail(&log, handler.name(), failure, format)),
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.call(args)));

        let outcome = match result {
            Ok(Ok(value)) => Outcome::Value(normalize(&value)),
            Ok(Err(Abort::Fail(failure))) => {
                return Ok(self.fail(&log, handler.name(), failure, format))
            }
            Ok(Err(Abort::Control(signal))) => {
                log.info(format_args!(
                    "handler '{}' raised {}",
                    handler.name(),
                    signal
                ));
                return Err(signal);
            }
            Err(payload) => {
                let failure = Failure::Unhandled {
                    message: panic_message(payload.as_ref()),
                    trace: Some(format!("panicked inside handler '{}'", handler.name())),
                };
                return Ok(self.fail(&log, handler.name(), failure, format));
            }
        };

        log.debug(format_args!("handler '{}' returned a value", handler.name()));
        Ok(Invocation { outcome, format })
    }

    fn fail(&self, log: &RequestLog<'_>, name: &str, failure: Failure, format: Format) -> Invocation {
        let mut record = ErrorRecord::from_failure(&failure);

        if record.kind().is_defect() {
            log.error(format_args!("handler '{}' failed: {}", name, failure));
            if self.settings.show_trace {
                record = record.with_trace(Some(technical_trace(&failure)));
            }
        } else {
            log.warn(format_args!(
                "handler '{}' rejected request ({}): {}",
                name,
                record.kind(),
                failure
            ));
        }

        Invocation {
            outcome: Outcome::Error(record),
            format,
        }
    }
}

/// Invokes `handler` with default settings.
///
/// # Errors
///
/// Returns the [`ControlSignal`] a handler raised; see [`Invoker::invoke`].
pub fn invoke<H>(
    handler: &H,
    ctx: InvocationContext,
    format: Format,
) -> Result<Invocation, ControlSignal>
where
    H: Handler + ?Sized,
{
    Invoker::default().invoke(handler, ctx, format)
}

fn technical_trace(failure: &Failure) -> String {
    match failure {
        Failure::Unhandled {
            message,
            trace: Some(trace),
        } => format!("{}\n{}", message, trace),
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
