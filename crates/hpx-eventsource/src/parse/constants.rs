//! Byte constants shared by the parser and the encoder.

use bytes_utils::Str;

/// Line feed, the only line terminator.
pub(crate) const LF: u8 = b'\n';
/// Carriage return, stripped when it directly precedes [`LF`].
pub(crate) const CR: u8 = b'\r';
/// Separates a field name from its value.
pub(crate) const COLON: u8 = b':';

const BOM_CHAR: char = '\u{FEFF}';
const BOM_LEN: usize = BOM_CHAR.len_utf8();
/// UTF-8 encoding of U+FEFF, skipped once at the start of a stream.
pub(crate) const BOM: &[u8; BOM_LEN] = &{
    let mut buf = [0u8; BOM_LEN];
    BOM_CHAR.encode_utf8(&mut buf);
    buf
};

/// Empty instance of [`Str`], from an `&'static ""`
pub(crate) const EMPTY_STR: Str = Str::from_static("");

pub(crate) const FIELD_ID: &[u8] = b"id";
pub(crate) const FIELD_EVENT: &[u8] = b"event";
pub(crate) const FIELD_DATA: &[u8] = b"data";
pub(crate) const FIELD_RETRY: &[u8] = b"retry";
