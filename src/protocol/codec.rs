//! nuke-wire codec
//!
//! Stream helpers for the length-prefixed framing. The receive side never
//! reports oversized or truncated frames as protocol errors to the peer:
//! both are treated as "connection terminated" so that port scanners and
//! malformed headers (whose first 8 bytes decode to an enormous length)
//! cannot make the server allocate or reply.

use std::io::{ErrorKind, Read, Write};

use crate::error::Result;

/// Frame header size: 8-byte big-endian unsigned body length
pub const HEADER_SIZE: usize = 8;

/// Read one frame from a stream.
///
/// Returns `Ok(Some(body))` for a complete frame, `Ok(None)` when the
/// connection should be closed silently: clean EOF, a short read anywhere,
/// or a declared length above `max_payload_size`. Only unexpected I/O
/// failures surface as errors; callers treat those as a close as well.
pub fn read_message<R: Read>(reader: &mut R, max_payload_size: u64) -> Result<Option<Vec<u8>>> {
    let mut header = [0u8; HEADER_SIZE];
    if !read_exact_or_eof(reader, &mut header)? {
        return Ok(None);
    }

    let body_len = u64::from_be_bytes(header);
    if body_len > max_payload_size {
        tracing::debug!(
            declared = body_len,
            limit = max_payload_size,
            "oversized frame header, closing connection"
        );
        return Ok(None);
    }

    // Length 0 is a valid frame carrying an empty command.
    let mut body = vec![0u8; body_len as usize];
    if body_len > 0 && !read_exact_or_eof(reader, &mut body)? {
        return Ok(None);
    }

    Ok(Some(body))
}

/// Write one frame to a stream. `write_all` retries partial writes until
/// the frame is fully on the wire or the stream fails.
pub fn write_message<W: Write>(writer: &mut W, body: &[u8]) -> Result<()> {
    let header = (body.len() as u64).to_be_bytes();
    writer.write_all(&header)?;
    writer.write_all(body)?;
    writer.flush()?;
    Ok(())
}

/// `read_exact` that folds EOF-before-complete into `Ok(false)`
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) if e.kind() == ErrorKind::ConnectionReset => Ok(false),
        Err(e) => Err(e.into()),
    }
}
