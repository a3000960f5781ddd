//! Error types used by the SSE parser.

use core::fmt::{Display, Formatter};

/// Errors produced by [`EventStream`](super::event_stream::EventStream).
///
/// Running out of input is not an error: the stream simply yields `None`.
/// Malformed field text is repaired rather than reported, so the only failure
/// is the underlying byte stream's.
#[derive(Debug, PartialEq)]
pub enum EventStreamError<E> {
    /// The underlying byte stream failed.
    Transport(E),
}

impl<E> EventStreamError<E> {
    /// Unwrap the underlying stream error.
    pub fn into_inner(self) -> E {
        match self {
            Self::Transport(e) => e,
        }
    }
}

impl<E> Display for EventStreamError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(e) => e.fmt(f),
        }
    }
}

impl<E> core::error::Error for EventStreamError<E>
where
    E: core::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
        }
    }
}
