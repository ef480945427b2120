use std::fmt;

/// Request-scoped logging facade.
///
/// Borrowed from the request id of the invocation it reports on; every event
/// carries `request_id` as a structured `tracing` field.
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
}

impl<'a> RequestLog<'a> {
    /// Creates a logger for one request.
    pub fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// A debug-level span carrying the request ID.
    ///
    /// Events emitted while it is entered (including ones from code that has
    /// no `RequestLog` of its own, such as the normalizer) inherit the field.
    pub fn span(&self) -> tracing::Span {
        tracing::debug_span!("request", request_id = %self.request_id)
    }

    /// Logs an info-level message with request ID.
    ///
    /// Use with `format_args!` for efficient formatting:
    /// ```no_run
    /// # use invoke_core::RequestLog;
    /// let log = RequestLog::new("req-1");
    /// log.info(format_args!("handled {} params", 3));
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a warning-level message with request ID.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, "{}", args);
    }

    /// Logs an error-level message with request ID.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, "{}", args);
    }
}
