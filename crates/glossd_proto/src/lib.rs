//! Binary RPC protocol for the glossd term store.
//!
//! This is a pure protocol crate: message types, status codes and the
//! byte-level codec, with no I/O state and no dependency on the core.
//!
//! ## Wire format
//!
//! ```text
//! request  := method(1) payload_len(4, BE) payload
//! response := status(1) payload_len(4, BE) payload
//! string   := len(4, BE) utf8-bytes
//! ```
//!
//! Success payloads carry a tagged body (term, term list or confirmation);
//! failure payloads carry a UTF-8 error message. Payloads are capped at
//! [`codec::MAX_PAYLOAD_SIZE`] bytes.

pub mod codec;
pub mod message;
pub mod status;

pub use codec::{
    read_request, read_response, write_request, write_response, ProtoError, ProtoResult,
    HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use message::{Request, Response, ResponseBody, TermMessage};
pub use status::StatusCode;
