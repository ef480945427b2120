use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::control::ControlSignal;

/// A classified failure raised while resolving or running a handler.
///
/// Every failure is eventually projected into an
/// [`ErrorRecord`](crate::ErrorRecord); none of them escape [`invoke`](crate::invoke).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    /// User-facing rejection of the request input
    #[error("{}", .message.as_deref().unwrap_or("invalid input"))]
    InvalidInput {
        /// Human-readable message
        message: Option<String>,
        /// Named details, e.g. per-field validation messages
        details: Map<String, Value>,
    },
    /// An identity was required and none was present
    #[error("{message}")]
    Unauthenticated {
        /// Caller-supplied message
        message: String,
    },
    /// The identity is present but not allowed to do this
    #[error("{message}")]
    NotAuthorized {
        /// Human-readable message
        message: String,
    },
    /// Routing could not find a program (passed through from the router)
    #[error("program not found: {0}")]
    ProgramNotFound(String),
    /// The handler's data lookup found nothing
    #[error("data not found: {0}")]
    DataNotFound(String),
    /// No view can render the requested format
    #[error("no view method for {0}")]
    NoViewMethod(String),
    /// Anything else; a defect rather than a user error
    #[error("unhandled failure: {message}")]
    Unhandled {
        /// Description of the defect
        message: String,
        /// Technical trace, shown only when configured
        trace: Option<String>,
    },
}

impl Failure {
    /// Invalid input carrying only a message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Failure::InvalidInput {
            message: Some(message.into()),
            details: Map::new(),
        }
    }

    /// Invalid input carrying named details and no message.
    pub fn invalid_fields(details: Map<String, Value>) -> Self {
        Failure::InvalidInput {
            message: None,
            details,
        }
    }

    /// Missing identity, with the message the caller wants shown.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Failure::Unauthenticated {
            message: message.into(),
        }
    }

    /// Insufficient identity.
    pub fn not_authorized(message: impl Into<String>) -> Self {
        Failure::NotAuthorized {
            message: message.into(),
        }
    }

    /// A defect with no trace attached.
    pub fn unhandled(message: impl Into<String>) -> Self {
        Failure::Unhandled {
            message: message.into(),
            trace: None,
        }
    }

    /// Returns the classification of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::InvalidInput { .. } => FailureKind::InvalidInput,
            Failure::Unauthenticated { .. } => FailureKind::Unauthenticated,
            Failure::NotAuthorized { .. } => FailureKind::NotAuthorized,
            Failure::ProgramNotFound(_) => FailureKind::ProgramNotFound,
            Failure::DataNotFound(_) => FailureKind::DataNotFound,
            Failure::NoViewMethod(_) => FailureKind::NoViewMethod,
            Failure::Unhandled { .. } => FailureKind::UnhandledFailure,
        }
    }
}

/// Classification of failures, as reported to collaborators.
///
/// The variant name doubles as the `exception` field of JSON error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// User-facing, recoverable
    InvalidInput,
    /// Identity required but absent
    Unauthenticated,
    /// Identity insufficient
    NotAuthorized,
    /// Routing-time: no such program
    ProgramNotFound,
    /// Routing-time: no such data
    DataNotFound,
    /// Routing-time: no view for the requested format
    NoViewMethod,
    /// Defect inside the handler
    UnhandledFailure,
    /// Defect while encoding output
    Unencodable,
}

impl FailureKind {
    /// Name used in error bodies and logs.
    pub fn name(self) -> &'static str {
        match self {
            FailureKind::InvalidInput => "InvalidInput",
            FailureKind::Unauthenticated => "Unauthenticated",
            FailureKind::NotAuthorized => "NotAuthorized",
            FailureKind::ProgramNotFound => "ProgramNotFound",
            FailureKind::DataNotFound => "DataNotFound",
            FailureKind::NoViewMethod => "NoViewMethod",
            FailureKind::UnhandledFailure => "UnhandledFailure",
            FailureKind::Unencodable => "Unencodable",
        }
    }

    /// Response status a transport should use for this kind.
    pub fn status(self) -> u16 {
        match self {
            FailureKind::InvalidInput => 400,
            FailureKind::Unauthenticated => 401,
            FailureKind::NotAuthorized => 403,
            FailureKind::ProgramNotFound | FailureKind::DataNotFound => 404,
            FailureKind::NoViewMethod => 415,
            FailureKind::UnhandledFailure | FailureKind::Unencodable => 500,
        }
    }

    /// Defects go to the reporting boundary; everything else is the user's.
    pub fn is_defect(self) -> bool {
        matches!(
            self,
            FailureKind::UnhandledFailure | FailureKind::Unencodable
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a handler stopped without a value.
///
/// Either an ordinary failure, which the invoker classifies, or a control
/// signal, which the invoker forwards untouched to the dispatcher.
#[derive(Debug)]
pub enum Abort {
    /// A failure to classify and project
    Fail(Failure),
    /// A pre-rendered response that must short-circuit the pipeline
    Control(ControlSignal),
}

impl From<Failure> for Abort {
    fn from(f: Failure) -> Self {
        Abort::Fail(f)
    }
}

impl From<ControlSignal> for Abort {
    fn from(signal: ControlSignal) -> Self {
        Abort::Control(signal)
    }
}

/// Errors raised by the serializer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The value has no encodable form
    #[error("object of type {type_name} with value of {repr} is not serializable")]
    Unencodable {
        /// Rust type name of the offending value
        type_name: String,
        /// Debug representation of the offending value
        repr: String,
    },
    /// No encoder exists for the requested format
    #[error("no encoder for {0}")]
    UnsupportedFormat(&'static str),
}

impl EncodeError {
    /// Classification used when this error is projected into a record.
    pub fn kind(&self) -> FailureKind {
        match self {
            EncodeError::Unencodable { .. } => FailureKind::Unencodable,
            EncodeError::UnsupportedFormat(_) => FailureKind::NoViewMethod,
        }
    }
}
