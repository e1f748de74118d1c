//! Big-endian primitives shared by the control serializer and device reader.
//!
//! Every multi-byte integer on the agent link is big-endian.  Strings are
//! UTF-8 with an explicit length prefix whose width depends on the message;
//! when a string is longer than its field allows it is cut on a character
//! boundary so the agent never receives a split code point.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Returns the longest prefix of `s` that fits in `max` bytes without
/// splitting a UTF-8 sequence.
pub(crate) fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Writes `s` as a u32 length followed by its UTF-8 bytes, capped at `max`.
pub(crate) fn write_string_u32(buf: &mut Vec<u8>, s: &str, max: usize) {
    let text = truncate_utf8(s, max.min(u32::MAX as usize));
    buf.extend_from_slice(&(text.len() as u32).to_be_bytes());
    buf.extend_from_slice(text.as_bytes());
}

/// Writes `s` as a u8 length followed by at most 255 UTF-8 bytes.
pub(crate) fn write_string_u8(buf: &mut Vec<u8>, s: &str) {
    let text = truncate_utf8(s, u8::MAX as usize);
    buf.push(text.len() as u8);
    buf.extend_from_slice(text.as_bytes());
}

/// Writes `data` as a u16 length followed by at most 65 535 bytes.
pub(crate) fn write_bytes_u16(buf: &mut Vec<u8>, data: &[u8]) {
    let len = data.len().min(u16::MAX as usize);
    buf.extend_from_slice(&(len as u16).to_be_bytes());
    buf.extend_from_slice(&data[..len]);
}

/// Maps `value` in `[0, 1]` onto `0..=0xffff`; 1.0 saturates to `0xffff`.
pub(crate) fn unsigned_fixed_u16(value: f64) -> u16 {
    let scaled = (value.clamp(0.0, 1.0) * 65_536.0) as u32;
    scaled.min(u16::MAX as u32) as u16
}

/// Maps `value` in `[-1, 1]` onto `i16`; 1.0 saturates to `0x7fff`.
pub(crate) fn signed_fixed_i16(value: f64) -> i16 {
    let scaled = (value.clamp(-1.0, 1.0) * 32_768.0) as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Reads exactly `len` bytes into a fresh buffer.
pub(crate) async fn read_vec<R>(stream: &mut R, len: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut data = vec![0u8; len];
    stream.read_exact(&mut data).await?;
    Ok(data)
}
