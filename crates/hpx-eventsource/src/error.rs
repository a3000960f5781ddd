//! Error handling for event sources.

use thiserror::Error;

use crate::parse::EventStreamError;

/// Boxed error used at the transport boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main result type used throughout the crate.
pub type EventSourceResult<T> = Result<T, EventSourceError>;

/// Errors surfaced by [`EventSource`](crate::EventSource) and its
/// collaborators.
///
/// Only [`BadResponse`](Self::BadResponse), [`Closed`](Self::Closed) and
/// [`EndOfStream`](Self::EndOfStream) ever come out of
/// [`EventSource::next`](crate::EventSource::next); transport failures are
/// retried internally.
#[derive(Error, Debug)]
pub enum EventSourceError {
    /// The server answered with a status that is neither OK nor retryable.
    /// Holds the response head; the body has been discarded.
    #[error("bad response from event source: {}", .0.status())]
    BadResponse(Box<http::Response<()>>),

    /// The source was closed, either before the call or while it was blocked.
    #[error("read from closed event source")]
    Closed,

    /// The server ended the stream cleanly.
    #[error("event stream ended")]
    EndOfStream,

    /// Request or body failure reported by a transport. Retried and logged by
    /// the event source rather than returned.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl EventSourceError {
    /// Create a bad-response error from a response head.
    pub fn bad_response(response: http::Response<()>) -> Self {
        Self::BadResponse(Box::new(response))
    }

    /// Create a transport error.
    pub fn transport(error: impl Into<BoxError>) -> Self {
        Self::Transport(error.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` for [`Closed`](Self::Closed).
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` for [`EndOfStream`](Self::EndOfStream).
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// Status code of a rejected response, if this is a bad-response error.
    pub fn bad_response_status(&self) -> Option<http::StatusCode> {
        match self {
            Self::BadResponse(response) => Some(response.status()),
            _ => None,
        }
    }
}

impl From<EventStreamError<BoxError>> for EventSourceError {
    fn from(err: EventStreamError<BoxError>) -> Self {
        Self::Transport(err.into_inner())
    }
}
