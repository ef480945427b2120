//! Control interrupts: pre-rendered responses that bypass the pipeline.
//!
//! A middleware stage or handler that wants to answer the request itself
//! (a redirect, a cached page) builds a [`ControlSignal`]. The signal renders
//! its payload at construction time, travels through [`Abort::Control`](crate::Abort)
//! and [`invoke`](crate::invoke)'s error channel, and is emitted verbatim by
//! the [`Dispatcher`](crate::web::Dispatcher). Nothing in between inspects it.

use std::fmt;

use crate::serialize::Format;

/// A fully rendered response, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Content type of `body`
    pub content_type: String,
    /// Extra headers, in emission order
    pub headers: Vec<(String, String)>,
    /// Encoded body
    pub body: String,
}

impl Response {
    /// Creates a response with no extra headers.
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Something that can render itself into a final response.
pub trait Control: fmt::Debug {
    /// Renders the response for the requested format.
    fn render(&self, format: Format) -> Response;
}

/// Redirects the client to another location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    location: String,
    permanent: bool,
}

impl Redirect {
    /// A temporary (302) redirect.
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            permanent: false,
        }
    }

    /// A permanent (301) redirect.
    pub fn permanent(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            permanent: true,
        }
    }
}

impl Control for Redirect {
    fn render(&self, format: Format) -> Response {
        let status = if self.permanent { 301 } else { 302 };
        Response::new(status, format.mimetype(), "").with_header("Location", &self.location)
    }
}

/// Single-use escape carrying a pre-rendered response.
///
/// Not `Clone`; consumed by [`into_response`](Self::into_response).
///
/// # Examples
///
/// ```
/// use invoke_core::{ControlSignal, Format, Redirect};
///
/// let signal = ControlSignal::new(Some("login first"), &Redirect::to("/login"), Format::Html);
/// assert_eq!(signal.message(), Some("login first"));
///
/// let response = signal.into_response();
/// assert_eq!(response.status, 302);
/// assert_eq!(response.header("location"), Some("/login"));
/// ```
#[derive(Debug)]
pub struct ControlSignal {
    message: Option<String>,
    response: Response,
}

impl ControlSignal {
    /// Renders `control` now and wraps the result.
    ///
    /// Rendering happens here because the context that could render it later
    /// is gone by the time the dispatcher sees the signal.
    pub fn new(message: Option<&str>, control: &dyn Control, format: Format) -> Self {
        Self {
            message: message.map(str::to_string),
            response: control.render(format),
        }
    }

    /// Wraps a response that is already rendered.
    pub fn from_response(message: Option<&str>, response: Response) -> Self {
        Self {
            message: message.map(str::to_string),
            response,
        }
    }

    /// Returns the message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the rendered response.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Consumes the signal, yielding the response to emit verbatim.
    pub fn into_response(self) -> Response {
        self.response
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(m) => write!(f, "control interrupt ({}): {}", self.response.status, m),
            None => write!(f, "control interrupt ({})", self.response.status),
        }
    }
}
