//! Event model and wire encoding.

use core::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use bytes_utils::Str;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::constants::{EMPTY_STR, LF};

/// A single dispatched event.
///
/// Produced by [`EventStream`](super::event_stream::EventStream) and carries no
/// resource of its own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Event {
    /// Event ID. Inherited from the previous event when the block had no `id`
    /// line.
    pub id: Str,
    /// Event name from the `event` field; empty when unset.
    pub name: Str,
    /// Payload: every `data` line joined with `\n`.
    pub data: Bytes,
    /// Reconnection interval advertised by the server in this block.
    pub retry: Option<Duration>,
}

impl Event {
    /// Create an event without a retry directive.
    pub fn new(id: impl Into<Str>, name: impl Into<Str>, data: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data: data.into(),
            retry: None,
        }
    }

    /// Attach a retry directive.
    #[must_use]
    pub fn with_retry(mut self, retry: Duration) -> Self {
        self.retry = Some(retry);
        self
    }

    /// The payload as text, if it is valid UTF-8.
    pub fn data_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.data).ok()
    }

    /// Serialize this event in wire format, terminated by a blank line.
    ///
    /// Each `\n`-separated fragment of the payload gets its own `data` line;
    /// empty fragments are written as a bare `data`.
    pub fn encode(&self) -> Bytes {
        let capacity = self.id.len() + self.name.len() + self.data.len() + 32;
        let mut buf = BytesMut::with_capacity(capacity);

        buf.put_slice(b"id: ");
        buf.put_slice(self.id.as_bytes());
        buf.put_u8(LF);

        buf.put_slice(b"event: ");
        buf.put_slice(self.name.as_bytes());
        buf.put_u8(LF);

        if let Some(retry) = self.retry {
            buf.put_slice(format!("retry: {}", retry.as_millis()).as_bytes());
            buf.put_u8(LF);
        }

        for fragment in self.data.split(|&b| b == LF) {
            if fragment.is_empty() {
                buf.put_slice(b"data");
            } else {
                buf.put_slice(b"data: ");
                buf.put_slice(fragment);
            }
            buf.put_u8(LF);
        }

        buf.put_u8(LF);
        buf.freeze()
    }

    /// Write the encoded event to `destination` and flush it.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the writer.
    pub async fn write_to<W>(&self, destination: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        destination.write_all(&self.encode()).await?;
        destination.flush().await
    }
}

impl Default for Event {
    fn default() -> Self {
        Self {
            id: EMPTY_STR,
            name: EMPTY_STR,
            data: Bytes::new(),
            retry: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_to_a_dispatchable_event() {
        let event = Event::new("some-id", "some-name", "some-data");
        assert_eq!(
            event.encode(),
            Bytes::from_static(b"id: some-id\nevent: some-name\ndata: some-data\n\n")
        );
    }

    #[test]
    fn splits_lines_across_data_segments() {
        let event = Event::new("some-id", "some-name", "some-data\nsome-more-data\n");
        assert_eq!(
            event.encode(),
            Bytes::from_static(
                b"id: some-id\nevent: some-name\ndata: some-data\ndata: some-more-data\ndata\n\n"
            )
        );
    }

    #[test]
    fn empty_payload_is_a_bare_data_line() {
        let event = Event::new("", "", "");
        assert_eq!(event.encode(), Bytes::from_static(b"id: \nevent: \ndata\n\n"));
    }

    #[test]
    fn retry_directive_is_encoded_in_millis() {
        let event = Event::new("3", "", "see you in a bit").with_retry(Duration::from_millis(200));
        assert_eq!(
            event.encode(),
            Bytes::from_static(b"id: 3\nevent: \nretry: 200\ndata: see you in a bit\n\n")
        );
    }

    #[test]
    fn data_str_rejects_invalid_utf8() {
        let event = Event::new("1", "", Bytes::from_static(b"\xff\xfe"));
        assert!(event.data_str().is_none());
        assert_eq!(Event::new("1", "", "ok").data_str(), Some("ok"));
    }

    #[tokio::test]
    async fn write_to_matches_encode() {
        let event = Event::new("some-id", "some-name", "some-data\nsome-more-data\n");
        let mut destination = Vec::new();
        event.write_to(&mut destination).await.expect("write to vec");
        assert_eq!(destination, event.encode().to_vec());
    }
}
