use bincode::config;
use serde::{Serialize, de::DeserializeOwned};
use std::io::{ErrorKind, Read, Write};

use crate::ProtocolError;

/// Upper bound on a single frame payload. Anything larger is treated as
/// corruption rather than allocated.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

const HEADER_LEN: usize = 8;

/// Read a single checksummed bincode frame from `reader`.
///
/// Wire format:
///   - 4-byte big-endian payload length (u32)
///   - 4-byte big-endian CRC32 of the payload
///   - that many bytes of bincode payload
///
/// Returns `Ok(None)` on a clean end of stream, i.e. when no header byte is
/// available. A header or payload cut short yields `ProtocolError::Truncated`.
pub fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, ProtocolError>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut header = [0u8; HEADER_LEN];
    let got = read_fully(reader, &mut header)?;
    if got == 0 {
        return Ok(None);
    }
    if got < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            expected: HEADER_LEN,
            found: got,
        });
    }

    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let expected_crc = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut buf = vec![0u8; len];
    let got = read_fully(reader, &mut buf)?;
    if got < len {
        return Err(ProtocolError::Truncated {
            expected: len,
            found: got,
        });
    }

    let computed = crc32fast::hash(&buf);
    if computed != expected_crc {
        return Err(ProtocolError::Checksum {
            expected: expected_crc,
            computed,
        });
    }

    let (msg, _bytes_read): (T, usize) =
        bincode::serde::decode_from_slice(&buf, config::standard())?;
    Ok(Some(msg))
}

/// Write a single checksummed bincode frame to `writer`.
///
/// The frame is assembled in memory and handed to the writer with one
/// `write_all`, so an append-mode file sees it as a single write.
pub fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), ProtocolError>
where
    W: Write,
    T: Serialize,
{
    let bytes = bincode::serde::encode_to_vec(msg, config::standard())?;
    if bytes.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: bytes.len(),
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + bytes.len());
    frame.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    frame.extend_from_slice(&crc32fast::hash(&bytes).to_be_bytes());
    frame.extend_from_slice(&bytes);

    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Like `read_exact`, but reports how many bytes were read before EOF
/// instead of failing.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
