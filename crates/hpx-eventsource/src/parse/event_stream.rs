//! [`Stream`] that converts a stream of
//! [`Bytes`](bytes::Bytes) chunks into [`Event`]s.

use core::{
    pin::Pin,
    task::{Context, Poll, ready},
    time::Duration,
};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use bytes_utils::Str;
use futures_core::Stream;

use super::{
    constants::{BOM, EMPTY_STR, LF},
    errors::EventStreamError,
    event::Event,
    parser::{ValidatedEventLine, parse_line_from_buffer},
};

// ---------------------------------------------------------------------------
// EventBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct EventBuilder {
    /// `Some` once an `id` line was seen in this block, even an empty one.
    id: Option<Str>,
    name: Option<Str>,
    data_buffer: EventBuilderDataBuffer,
    retry: Option<Duration>,
    is_complete: bool,
}

/// Optimised data buffer.
///
/// The common case is a single `data:` line per event, so we keep the first
/// value as an immutable [`Bytes`] and only upgrade to a mutable buffer when a
/// second `data:` line arrives.
#[derive(Debug, Default, Clone)]
enum EventBuilderDataBuffer {
    #[default]
    Uninit,
    Immutable(Bytes),
    Mutable(BytesMut),
}

impl EventBuilderDataBuffer {
    fn freeze(self) -> Bytes {
        match self {
            Self::Uninit => Bytes::new(),
            Self::Immutable(b) => b,
            Self::Mutable(b) => b.freeze(),
        }
    }

    fn push(&mut self, value: Bytes) {
        match self {
            Self::Uninit => *self = Self::Immutable(value),
            Self::Immutable(first) => {
                let mut buf = BytesMut::with_capacity(first.len() + 1 + value.len());
                buf.put_slice(first);
                buf.put_u8(LF);
                buf.put_slice(&value);
                *self = Self::Mutable(buf);
            }
            Self::Mutable(buf) => {
                buf.put_u8(LF);
                buf.put_slice(&value);
            }
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Uninit)
    }
}

impl EventBuilder {
    fn add(&mut self, line: ValidatedEventLine) {
        match line {
            ValidatedEventLine::Empty => self.is_complete = true,
            ValidatedEventLine::Id(id) => self.id = Some(id),
            ValidatedEventLine::Event(name) => self.name = Some(name),
            ValidatedEventLine::Data(value) => self.data_buffer.push(value),
            ValidatedEventLine::Retry(retry) => self.retry = Some(retry),
            // Comments and unknown fields are silently ignored.
            ValidatedEventLine::Comment | ValidatedEventLine::Ignored => (),
        }
    }

    /// Finish the current block and reset for the next one.
    ///
    /// Blocks without any `data` line are dropped, and their `id` is not
    /// remembered.
    #[must_use]
    fn dispatch(&mut self, last_event_id: &mut Str) -> Option<Event> {
        let EventBuilder {
            id,
            name,
            data_buffer,
            retry,
            ..
        } = core::mem::take(self);

        if data_buffer.is_empty() {
            return None;
        }

        let id = match id {
            Some(id) => {
                *last_event_id = id.clone();
                id
            }
            None => last_event_id.clone(),
        };

        Some(Event {
            id,
            name: name.unwrap_or(EMPTY_STR),
            data: data_buffer.freeze(),
            retry,
        })
    }
}

// ---------------------------------------------------------------------------
// EventStreamState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum EventStreamState {
    NotStarted,
    Started,
    Terminated,
}

impl EventStreamState {
    fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }

    fn is_not_started(self) -> bool {
        matches!(self, Self::NotStarted)
    }
}

// ---------------------------------------------------------------------------
// EventStream
// ---------------------------------------------------------------------------

pin_project_lite::pin_project! {
    /// A [`Stream`] that converts a stream of byte chunks into parsed
    /// [`Event`]s.
    ///
    /// Forward-only and not restartable. Yields `None` once the underlying
    /// stream ends; an event still being accumulated at that point is
    /// discarded.
    #[project = EventStreamProjection]
    #[derive(Debug)]
    pub struct EventStream<S> {
        #[pin]
        stream: S,
        buffer: BytesMut,
        builder: EventBuilder,
        state: EventStreamState,
        last_event_id: Str,
    }
}

impl<S> EventStream<S> {
    /// Create a new [`EventStream`] from an underlying byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::new(),
            builder: EventBuilder::default(),
            state: EventStreamState::NotStarted,
            last_event_id: EMPTY_STR,
        }
    }

    /// Set the ID inherited by events that carry no `id` line.
    pub fn set_last_event_id(&mut self, id: impl Into<Str>) {
        self.last_event_id = id.into();
    }

    /// Reference to the last event ID given out by this stream.
    pub fn last_event_id(&self) -> &Str {
        &self.last_event_id
    }
}

/// Forget the block being accumulated along with any partial line.
fn discard_partial(buffer: &mut BytesMut, builder: &mut EventBuilder) {
    *builder = EventBuilder::default();
    buffer.clear();
}

// ---------------------------------------------------------------------------
// BOM helper
// ---------------------------------------------------------------------------

const fn starts_with_bom(buf: &[u8]) -> Option<bool> {
    match buf.len() {
        0 => None,
        1 => {
            if buf[0] == BOM[0] {
                None
            } else {
                Some(false)
            }
        }
        2 => {
            if buf[0] == BOM[0] && buf[1] == BOM[1] {
                None
            } else {
                Some(false)
            }
        }
        _gte_3 => {
            if buf[0] == BOM[0] && buf[1] == BOM[1] && buf[2] == BOM[2] {
                Some(true)
            } else {
                Some(false)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing helper
// ---------------------------------------------------------------------------

/// Consume complete lines until an event dispatches or the buffer runs out.
fn parse_event(
    buffer: &mut BytesMut,
    builder: &mut EventBuilder,
    last_event_id: &mut Str,
) -> Option<Event> {
    loop {
        let event_line = parse_line_from_buffer(buffer)?.validate();

        builder.add(event_line);

        if builder.is_complete
            && let Some(event) = builder.dispatch(last_event_id)
        {
            return Some(event);
        }
    }
}

macro_rules! try_parse_event_buffer {
    ($this:ident) => {
        if let Some(event) = parse_event($this.buffer, $this.builder, $this.last_event_id) {
            return Poll::Ready(Some(Ok(event)));
        }
    };
}

// ---------------------------------------------------------------------------
// Stream implementation
// ---------------------------------------------------------------------------

impl<S, E, B> Stream for EventStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Event, EventStreamError<E>>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<<Self as Stream>::Item>> {
        let mut this = self.project();

        if this.state.is_terminated() {
            return Poll::Ready(None);
        }

        if !this.state.is_not_started() {
            try_parse_event_buffer!(this);
        }

        loop {
            let new_bytes = match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(o)) => o,
                Some(Err(e)) => {
                    discard_partial(this.buffer, this.builder);
                    return Poll::Ready(Some(Err(EventStreamError::Transport(e))));
                }
                None => {
                    // Whatever is left never saw its blank line.
                    *this.state = EventStreamState::Terminated;
                    discard_partial(this.buffer, this.builder);
                    return Poll::Ready(None);
                }
            };

            let new_bytes = new_bytes.as_ref();

            if new_bytes.is_empty() {
                continue;
            }

            this.buffer.extend_from_slice(new_bytes);

            // BOM detection on the very first chunk(s).
            if this.state.is_not_started() {
                match starts_with_bom(this.buffer) {
                    Some(true) => {
                        *this.state = EventStreamState::Started;
                        this.buffer.advance(BOM.len());
                    }
                    Some(false) => *this.state = EventStreamState::Started,
                    None => continue,
                }
            };

            try_parse_event_buffer!(this);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
