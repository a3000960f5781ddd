//! Event stream wire format.
//!
//! [`EventStream`] decodes a byte-chunk stream into [`Event`]s and
//! [`Event::encode`] produces the same format. Lines end with `\n` (an
//! optional `\r` before it is dropped), `:` starts a comment, and a blank line
//! dispatches the accumulated event.

pub(crate) mod constants;
pub(crate) mod errors;
pub mod event;
pub mod event_stream;
pub(crate) mod parser;

pub use errors::EventStreamError;
pub use event::Event;
pub use event_stream::EventStream;
