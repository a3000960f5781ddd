//! Line splitting and field classification.

use core::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use bytes_utils::Str;

use super::constants::{COLON, CR, FIELD_DATA, FIELD_EVENT, FIELD_ID, FIELD_RETRY, LF};

/// A full line borrowed from the read buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RawEventLine<'a> {
    /// Comment line (starts with `:`)
    Comment,
    /// A field line. A line without a colon has an empty value.
    Field {
        field_name: &'a [u8],
        field_value: &'a [u8],
    },
    /// An empty line (dispatch trigger).
    Empty,
}

/// Owned version of [`RawEventLine`], sliced out of the read buffer.
#[derive(Debug, Clone)]
pub(crate) enum RawEventLineOwned {
    Comment,
    Empty,
    Field {
        field_name: Bytes,
        field_value: Bytes,
    },
}

/// A line classified by field name, with text fields decoded as UTF-8.
#[derive(Debug, Clone)]
pub(crate) enum ValidatedEventLine {
    Comment,
    Empty,
    Id(Str),
    Event(Str),
    Data(Bytes),
    Retry(Duration),
    /// Unknown field, or a `retry` value that is not a plain integer.
    Ignored,
}

/// Invalid sequences become U+FFFD; a bad byte never fails the stream.
fn decode_text(val: Bytes) -> Str {
    match core::str::from_utf8(val.as_ref()) {
        Ok(_) => {
            // Safety: we just validated the bytes are valid UTF-8.
            unsafe { Str::from_inner_unchecked(val) }
        }
        Err(_) => {
            let lossy = String::from_utf8_lossy(&val).into_owned();
            // Safety: `String` is always valid UTF-8.
            unsafe { Str::from_inner_unchecked(Bytes::from(lossy)) }
        }
    }
}

/// `retry` only accepts ASCII digits, in milliseconds.
fn parse_retry(value: &[u8]) -> Option<Duration> {
    if value.is_empty() || !value.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let millis = core::str::from_utf8(value).ok()?.parse::<u64>().ok()?;
    Some(Duration::from_millis(millis))
}

impl RawEventLineOwned {
    pub(crate) fn validate(self) -> ValidatedEventLine {
        match self {
            Self::Comment => ValidatedEventLine::Comment,
            Self::Empty => ValidatedEventLine::Empty,
            Self::Field {
                field_name,
                field_value,
            } => match field_name.as_ref() {
                FIELD_ID => ValidatedEventLine::Id(decode_text(field_value)),
                FIELD_EVENT => ValidatedEventLine::Event(decode_text(field_value)),
                FIELD_DATA => ValidatedEventLine::Data(field_value),
                FIELD_RETRY => match parse_retry(&field_value) {
                    Some(retry) => ValidatedEventLine::Retry(retry),
                    None => ValidatedEventLine::Ignored,
                },
                _ => ValidatedEventLine::Ignored,
            },
        }
    }
}

/// Finds the next end-of-line in `bytes`.
///
/// Returns `(line_end, remainder_start)`. Only `\n` terminates a line; a `\r`
/// right before it belongs to the terminator. Returns `None` if no `\n` has
/// arrived yet.
fn find_eol(bytes: &[u8]) -> Option<(usize, usize)> {
    let lf = memchr::memchr(LF, bytes)?;
    let line_end = match lf.checked_sub(1) {
        Some(prev) if bytes[prev] == CR => prev,
        _ => lf,
    };
    Some((line_end, lf + 1))
}

fn read_line(bytes: &[u8]) -> RawEventLine<'_> {
    match memchr::memchr(COLON, bytes) {
        Some(0) => RawEventLine::Comment,
        Some(colon_pos) => {
            let value = &bytes[colon_pos + 1..];
            // Strip a single leading space if present.
            let value = match value {
                [b' ', rest @ ..] => rest,
                _ => value,
            };
            RawEventLine::Field {
                field_name: &bytes[..colon_pos],
                field_value: value,
            }
        }
        None if bytes.is_empty() => RawEventLine::Empty,
        None => RawEventLine::Field {
            field_name: bytes,
            field_value: &bytes[bytes.len()..],
        },
    }
}

/// Reads the next [`RawEventLineOwned`] from the buffer, then advances the
/// buffer past the corresponding EOL.
///
/// Returns `None` if the buffer contains no complete line.
pub(crate) fn parse_line_from_buffer(buffer: &mut BytesMut) -> Option<RawEventLineOwned> {
    let (line_end, rem_start) = find_eol(buffer)?;

    let line = buffer.split_to(line_end).freeze();
    buffer.advance(rem_start - line_end);

    match read_line(&line) {
        RawEventLine::Field {
            field_name,
            field_value,
        } => Some(RawEventLineOwned::Field {
            field_name: line.slice_ref(field_name),
            field_value: line.slice_ref(field_value),
        }),
        RawEventLine::Comment => Some(RawEventLineOwned::Comment),
        RawEventLine::Empty => Some(RawEventLineOwned::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_line(input: &'static [u8]) -> (Option<ValidatedEventLine>, BytesMut) {
        let mut buffer = BytesMut::from(input);
        let line = parse_line_from_buffer(&mut buffer).map(RawEventLineOwned::validate);
        (line, buffer)
    }

    #[test]
    fn incomplete_line_waits_for_more_data() {
        let (line, buffer) = next_line(b"data: partial");
        assert!(line.is_none());
        assert_eq!(&buffer[..], b"data: partial");
    }

    #[test]
    fn crlf_is_a_single_terminator() {
        let (line, buffer) = next_line(b"id: 123\r\nrest");
        assert!(matches!(line, Some(ValidatedEventLine::Id(id)) if &*id == "123"));
        assert_eq!(&buffer[..], b"rest");
    }

    #[test]
    fn lone_cr_is_content() {
        let (line, _) = next_line(b"data: a\rb\n");
        assert!(matches!(line, Some(ValidatedEventLine::Data(data)) if &data[..] == b"a\rb"));
    }

    #[test]
    fn only_one_leading_space_is_stripped() {
        let (line, _) = next_line(b"event:   spaced\n");
        assert!(matches!(line, Some(ValidatedEventLine::Event(name)) if &*name == "  spaced"));
    }

    #[test]
    fn field_without_colon_has_empty_value() {
        let (line, _) = next_line(b"id\n");
        assert!(matches!(line, Some(ValidatedEventLine::Id(id)) if id.is_empty()));
    }

    #[test]
    fn comment_and_empty_lines() {
        assert!(matches!(next_line(b":ping\n").0, Some(ValidatedEventLine::Comment)));
        assert!(matches!(next_line(b"\r\n").0, Some(ValidatedEventLine::Empty)));
    }

    #[test]
    fn retry_accepts_digits_only() {
        assert_eq!(parse_retry(b"200"), Some(Duration::from_millis(200)));
        assert_eq!(parse_retry(b"0"), Some(Duration::ZERO));
        assert_eq!(parse_retry(b""), None);
        assert_eq!(parse_retry(b"+5"), None);
        assert_eq!(parse_retry(b"1.5"), None);
        assert_eq!(parse_retry(b"99999999999999999999999"), None);
        assert!(matches!(next_line(b"retry: soon\n").0, Some(ValidatedEventLine::Ignored)));
    }

    #[test]
    fn invalid_utf8_in_text_fields_is_replaced() {
        let (line, _) = next_line(b"id: 4\xff2\n");
        assert!(matches!(line, Some(ValidatedEventLine::Id(id)) if &*id == "4\u{FFFD}2"));

        let (line, buffer) = next_line(b"event: \xfe\xff\ndata: next\n");
        assert!(matches!(
            line,
            Some(ValidatedEventLine::Event(name)) if &*name == "\u{FFFD}\u{FFFD}"
        ));
        assert_eq!(&buffer[..], b"data: next\n");
    }

    #[test]
    fn invalid_utf8_in_data_is_kept() {
        let (line, _) = next_line(b"data: \xff\n");
        assert!(matches!(line, Some(ValidatedEventLine::Data(data)) if &data[..] == b"\xff"));
    }
}
