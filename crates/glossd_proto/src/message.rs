//! Typed request and response messages.
//!
//! # Responsibility
//! - Define the five RPC methods and their payload shapes.
//! - Encode/decode messages to and from framed byte payloads.
//!
//! # Invariants
//! - Every payload decodes to exactly one message; partial or oversized
//!   payloads are rejected, never truncated silently.

use crate::codec::{encode_frame, PayloadReader, PayloadWriter, ProtoError, ProtoResult};
use crate::status::StatusCode;

const METHOD_LIST_TERMS: u8 = 0x01;
const METHOD_GET_TERM: u8 = 0x02;
const METHOD_CREATE_TERM: u8 = 0x03;
const METHOD_UPDATE_TERM: u8 = 0x04;
const METHOD_DELETE_TERM: u8 = 0x05;

const BODY_TAG_TERM: u8 = 0x01;
const BODY_TAG_TERM_LIST: u8 = 0x02;
const BODY_TAG_CONFIRMATION: u8 = 0x03;
const BODY_TAG_ERROR: u8 = 0x04;

/// Wire shape of one glossary record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMessage {
    pub id: i64,
    pub term: String,
    pub definition: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl TermMessage {
    fn encode_into(&self, writer: &mut PayloadWriter) {
        writer.put_i64(self.id);
        writer.put_string(&self.term);
        writer.put_string(&self.definition);
        writer.put_i64(self.created_at);
        writer.put_i64(self.updated_at);
    }

    fn decode_from(reader: &mut PayloadReader<'_>) -> ProtoResult<Self> {
        Ok(Self {
            id: reader.read_i64()?,
            term: reader.read_string()?,
            definition: reader.read_string()?,
            created_at: reader.read_i64()?,
            updated_at: reader.read_i64()?,
        })
    }
}

/// An RPC request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Lists all terms. Empty strings select the server-side defaults.
    ListTerms { sort_by: String, order: String },
    /// Fetches one term by key.
    GetTerm { term: String },
    /// Creates one term.
    CreateTerm { term: String, definition: String },
    /// Replaces one term's definition.
    UpdateTerm { term: String, definition: String },
    /// Deletes one term.
    DeleteTerm { term: String },
}

impl Request {
    /// Wire method byte.
    pub fn method_code(&self) -> u8 {
        match self {
            Self::ListTerms { .. } => METHOD_LIST_TERMS,
            Self::GetTerm { .. } => METHOD_GET_TERM,
            Self::CreateTerm { .. } => METHOD_CREATE_TERM,
            Self::UpdateTerm { .. } => METHOD_UPDATE_TERM,
            Self::DeleteTerm { .. } => METHOD_DELETE_TERM,
        }
    }

    /// Method name for request logging.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::ListTerms { .. } => "ListTerms",
            Self::GetTerm { .. } => "GetTerm",
            Self::CreateTerm { .. } => "CreateTerm",
            Self::UpdateTerm { .. } => "UpdateTerm",
            Self::DeleteTerm { .. } => "DeleteTerm",
        }
    }

    /// Encodes the full request frame (header + payload).
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = PayloadWriter::new();
        match self {
            Self::ListTerms { sort_by, order } => {
                writer.put_string(sort_by);
                writer.put_string(order);
            }
            Self::GetTerm { term } | Self::DeleteTerm { term } => {
                writer.put_string(term);
            }
            Self::CreateTerm { term, definition } | Self::UpdateTerm { term, definition } => {
                writer.put_string(term);
                writer.put_string(definition);
            }
        }
        encode_frame(self.method_code(), &writer.into_bytes())
    }

    /// Decodes a request from its method byte and payload.
    pub fn decode(method: u8, payload: &[u8]) -> ProtoResult<Self> {
        let mut reader = PayloadReader::new(payload);
        let request = match method {
            METHOD_LIST_TERMS => Self::ListTerms {
                sort_by: reader.read_string()?,
                order: reader.read_string()?,
            },
            METHOD_GET_TERM => Self::GetTerm {
                term: reader.read_string()?,
            },
            METHOD_CREATE_TERM => Self::CreateTerm {
                term: reader.read_string()?,
                definition: reader.read_string()?,
            },
            METHOD_UPDATE_TERM => Self::UpdateTerm {
                term: reader.read_string()?,
                definition: reader.read_string()?,
            },
            METHOD_DELETE_TERM => Self::DeleteTerm {
                term: reader.read_string()?,
            },
            other => return Err(ProtoError::UnknownMethod(other)),
        };
        reader.finish()?;
        Ok(request)
    }
}

/// Payload of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// A single record.
    Term(TermMessage),
    /// A full listing.
    TermList(Vec<TermMessage>),
    /// A delete confirmation.
    Confirmation { success: bool, message: String },
    /// A failure description.
    Error(String),
}

/// An RPC response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl Response {
    /// A successful single-record response.
    pub fn term(term: TermMessage) -> Self {
        Self {
            status: StatusCode::Ok,
            body: ResponseBody::Term(term),
        }
    }

    /// A successful listing response.
    pub fn term_list(terms: Vec<TermMessage>) -> Self {
        Self {
            status: StatusCode::Ok,
            body: ResponseBody::TermList(terms),
        }
    }

    /// A successful delete confirmation.
    pub fn confirmation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::Ok,
            body: ResponseBody::Confirmation {
                success: true,
                message: message.into(),
            },
        }
    }

    /// A failure response with a non-Ok status.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Error(message.into()),
        }
    }

    /// Encodes the full response frame (header + payload).
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = PayloadWriter::new();
        match &self.body {
            ResponseBody::Term(term) => {
                writer.put_u8(BODY_TAG_TERM);
                term.encode_into(&mut writer);
            }
            ResponseBody::TermList(terms) => {
                writer.put_u8(BODY_TAG_TERM_LIST);
                writer.put_u32(terms.len() as u32);
                for term in terms {
                    term.encode_into(&mut writer);
                }
            }
            ResponseBody::Confirmation { success, message } => {
                writer.put_u8(BODY_TAG_CONFIRMATION);
                writer.put_u8(u8::from(*success));
                writer.put_string(message);
            }
            ResponseBody::Error(message) => {
                writer.put_u8(BODY_TAG_ERROR);
                writer.put_string(message);
            }
        }
        encode_frame(self.status.as_u8(), &writer.into_bytes())
    }

    /// Decodes a response from its status byte and payload.
    pub fn decode(status: u8, payload: &[u8]) -> ProtoResult<Self> {
        let status = StatusCode::from_u8(status).ok_or(ProtoError::UnknownStatus(status))?;

        let mut reader = PayloadReader::new(payload);
        let body = match reader.read_u8()? {
            BODY_TAG_TERM => ResponseBody::Term(TermMessage::decode_from(&mut reader)?),
            BODY_TAG_TERM_LIST => {
                let count = reader.read_u32()?;
                let mut terms = Vec::with_capacity(count.min(1024) as usize);
                for _ in 0..count {
                    terms.push(TermMessage::decode_from(&mut reader)?);
                }
                ResponseBody::TermList(terms)
            }
            BODY_TAG_CONFIRMATION => ResponseBody::Confirmation {
                success: reader.read_u8()? != 0,
                message: reader.read_string()?,
            },
            BODY_TAG_ERROR => ResponseBody::Error(reader.read_string()?),
            other => return Err(ProtoError::UnknownBodyTag(other)),
        };
        reader.finish()?;
        Ok(Response { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::{Request, Response, ResponseBody, TermMessage};
    use crate::codec::{read_frame, ProtoError};
    use crate::status::StatusCode;

    fn sample_term() -> TermMessage {
        TermMessage {
            id: 7,
            term: "WAL".to_string(),
            definition: "write-ahead log".to_string(),
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_123,
        }
    }

    fn round_trip_request(request: Request) -> Request {
        let frame = request.encode();
        let mut cursor = frame.as_slice();
        let (method, payload) = read_frame(&mut cursor).unwrap();
        Request::decode(method, &payload).unwrap()
    }

    #[test]
    fn create_request_round_trips() {
        let request = Request::CreateTerm {
            term: "API".to_string(),
            definition: "application programming interface".to_string(),
        };
        assert_eq!(round_trip_request(request.clone()), request);
    }

    #[test]
    fn list_request_carries_empty_defaults() {
        let request = Request::ListTerms {
            sort_by: String::new(),
            order: String::new(),
        };
        assert_eq!(round_trip_request(request.clone()), request);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = Request::decode(0x7f, &[]).unwrap_err();
        assert!(matches!(err, ProtoError::UnknownMethod(0x7f)));
    }

    #[test]
    fn trailing_request_bytes_are_rejected() {
        let frame = Request::GetTerm {
            term: "API".to_string(),
        }
        .encode();
        let mut cursor = frame.as_slice();
        let (method, mut payload) = read_frame(&mut cursor).unwrap();
        payload.push(0x00);

        let err = Request::decode(method, &payload).unwrap_err();
        assert!(matches!(err, ProtoError::TrailingBytes { count: 1 }));
    }

    #[test]
    fn term_response_round_trips() {
        let response = Response::term(sample_term());
        let frame = response.encode();
        let mut cursor = frame.as_slice();
        let (status, payload) = read_frame(&mut cursor).unwrap();
        assert_eq!(Response::decode(status, &payload).unwrap(), response);
    }

    #[test]
    fn listing_response_preserves_order() {
        let mut second = sample_term();
        second.id = 8;
        second.term = "busy_timeout".to_string();
        let response = Response::term_list(vec![sample_term(), second]);

        let frame = response.encode();
        let mut cursor = frame.as_slice();
        let (status, payload) = read_frame(&mut cursor).unwrap();
        let decoded = Response::decode(status, &payload).unwrap();
        match decoded.body {
            ResponseBody::TermList(terms) => {
                assert_eq!(terms.len(), 2);
                assert_eq!(terms[0].term, "WAL");
                assert_eq!(terms[1].term, "busy_timeout");
            }
            other => panic!("expected a listing, got {other:?}"),
        }
    }

    #[test]
    fn error_response_carries_status_and_message() {
        let response = Response::error(StatusCode::AlreadyExists, "Term 'API' already exists");
        let frame = response.encode();
        let mut cursor = frame.as_slice();
        let (status, payload) = read_frame(&mut cursor).unwrap();
        let decoded = Response::decode(status, &payload).unwrap();
        assert_eq!(decoded.status, StatusCode::AlreadyExists);
        assert_eq!(
            decoded.body,
            ResponseBody::Error("Term 'API' already exists".to_string())
        );
    }

    #[test]
    fn stream_helpers_round_trip_a_session() {
        use crate::codec::{read_request, read_response, write_request, write_response};

        let request = Request::UpdateTerm {
            term: "WAL".to_string(),
            definition: "write-ahead log".to_string(),
        };
        let mut wire = Vec::new();
        write_request(&mut wire, &request).unwrap();
        let mut cursor = wire.as_slice();
        assert_eq!(read_request(&mut cursor).unwrap(), request);

        let response = Response::term(sample_term());
        let mut wire = Vec::new();
        write_response(&mut wire, &response).unwrap();
        let mut cursor = wire.as_slice();
        assert_eq!(read_response(&mut cursor).unwrap(), response);
    }

    #[test]
    fn unknown_status_byte_is_rejected() {
        let err = Response::decode(200, &[]).unwrap_err();
        assert!(matches!(err, ProtoError::UnknownStatus(200)));
    }

    #[test]
    fn empty_response_payload_is_rejected() {
        let err = Response::decode(0, &[]).unwrap_err();
        assert!(matches!(err, ProtoError::Truncated { .. }));
    }
}
