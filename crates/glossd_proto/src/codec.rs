//! Byte-level codec: framing, payload primitives and stream helpers.
//!
//! # Responsibility
//! - Read and write `code(1) + len(4, BE) + payload` frames.
//! - Provide length-prefixed primitives for payload encoding.
//! - Enforce the payload size cap before any allocation.
//!
//! # Invariants
//! - A decoded payload is consumed exactly; trailing bytes are an error.
//! - No frame larger than [`MAX_PAYLOAD_SIZE`] is ever read or written.

use crate::message::{Request, Response};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{Read, Write};

/// Frame header size: 1 code byte + 4 length bytes.
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (1 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 1024 * 1024;

pub type ProtoResult<T> = Result<T, ProtoError>;

/// Protocol decode/encode failure.
#[derive(Debug)]
pub enum ProtoError {
    /// The payload ended before a field was complete.
    Truncated { expected: usize, got: usize },
    /// The declared payload length exceeds [`MAX_PAYLOAD_SIZE`].
    PayloadTooLarge { size: usize },
    /// Unknown request method byte.
    UnknownMethod(u8),
    /// Unknown response status byte.
    UnknownStatus(u8),
    /// Unknown response body tag byte.
    UnknownBodyTag(u8),
    /// A string field held invalid UTF-8.
    InvalidUtf8,
    /// The payload was longer than its message.
    TrailingBytes { count: usize },
    /// Transport-level I/O failure.
    Io(std::io::Error),
}

impl Display for ProtoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated { expected, got } => {
                write!(f, "truncated payload: expected {expected} bytes, got {got}")
            }
            Self::PayloadTooLarge { size } => {
                write!(f, "payload of {size} bytes exceeds the {MAX_PAYLOAD_SIZE} byte cap")
            }
            Self::UnknownMethod(code) => write!(f, "unknown method code 0x{code:02x}"),
            Self::UnknownStatus(code) => write!(f, "unknown status code 0x{code:02x}"),
            Self::UnknownBodyTag(tag) => write!(f, "unknown response body tag 0x{tag:02x}"),
            Self::InvalidUtf8 => write!(f, "string field is not valid UTF-8"),
            Self::TrailingBytes { count } => {
                write!(f, "{count} trailing bytes after a complete message")
            }
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProtoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProtoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Sequential reader over a payload slice.
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> ProtoResult<&'a [u8]> {
        let available = self.buf.len() - self.pos;
        if available < len {
            return Err(ProtoError::Truncated {
                expected: len,
                got: available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> ProtoResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> ProtoResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i64(&mut self) -> ProtoResult<i64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn read_string(&mut self) -> ProtoResult<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtoError::InvalidUtf8)
    }

    /// Asserts the payload was consumed exactly.
    pub fn finish(self) -> ProtoResult<()> {
        let remaining = self.buf.len() - self.pos;
        if remaining > 0 {
            return Err(ProtoError::TrailingBytes { count: remaining });
        }
        Ok(())
    }
}

/// Payload builder with length-prefixed primitives.
#[derive(Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_string(&mut self, value: &str) {
        self.put_u32(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Builds a full frame: code byte, BE length, payload.
pub fn encode_frame(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.push(code);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Reads one `code + payload` frame from a blocking stream.
pub fn read_frame<R: Read>(reader: &mut R) -> ProtoResult<(u8, Vec<u8>)> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let code = header[0];
    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(ProtoError::PayloadTooLarge {
            size: payload_len as usize,
        });
    }

    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 {
        reader.read_exact(&mut payload)?;
    }

    Ok((code, payload))
}

/// Writes one `code + payload` frame to a blocking stream.
pub fn write_frame<W: Write>(writer: &mut W, code: u8, payload: &[u8]) -> ProtoResult<()> {
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(ProtoError::PayloadTooLarge {
            size: payload.len(),
        });
    }
    writer.write_all(&encode_frame(code, payload))?;
    writer.flush()?;
    Ok(())
}

/// Reads a complete request from a blocking stream.
pub fn read_request<R: Read>(reader: &mut R) -> ProtoResult<Request> {
    let (method, payload) = read_frame(reader)?;
    Request::decode(method, &payload)
}

/// Writes a request to a blocking stream.
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> ProtoResult<()> {
    writer.write_all(&request.encode())?;
    writer.flush()?;
    Ok(())
}

/// Reads a complete response from a blocking stream.
pub fn read_response<R: Read>(reader: &mut R) -> ProtoResult<Response> {
    let (status, payload) = read_frame(reader)?;
    Response::decode(status, &payload)
}

/// Writes a response to a blocking stream.
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> ProtoResult<()> {
    writer.write_all(&response.encode())?;
    writer.flush()?;
    Ok(())
}
