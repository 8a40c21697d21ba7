//! Binary RPC server.
//!
//! # Responsibility
//! - Serve the length-framed binary protocol over TCP.
//! - Translate RPC requests into glossary core calls and core outcomes
//!   into wire status codes.
//!
//! # Invariants
//! - This layer holds no storage state and duplicates no business rules
//!   beyond the protocol's own empty-key rejection.
//! - Both front-ends answer equivalent inputs with equivalent outcome
//!   kinds; the status mapping here mirrors the HTTP mapping one-to-one.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::RpcConfig;
use crate::{call_blocking, SharedService};
use glossd_core::{GlossaryError, Term};
use glossd_proto::{
    ProtoError, Request as RpcRequest, Response as RpcResponse, StatusCode, TermMessage,
    HEADER_SIZE, MAX_PAYLOAD_SIZE,
};

/// Errors that can occur while starting the RPC server.
#[derive(Debug)]
pub enum RpcServerError {
    /// Failed to bind the TCP listener.
    BindFailed(String, std::io::Error),
}

impl Display for RpcServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BindFailed(addr, err) => {
                write!(f, "failed to bind rpc listener on {addr}: {err}")
            }
        }
    }
}

impl Error for RpcServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::BindFailed(_, err) => Some(err),
        }
    }
}

/// Binary RPC server over one shared glossary core.
pub struct RpcServer {
    listener: TcpListener,
    service: SharedService,
}

impl RpcServer {
    /// Binds the listener; the bound address is available before `run`.
    pub async fn bind(config: &RpcConfig, service: SharedService) -> Result<Self, RpcServerError> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|err| RpcServerError::BindFailed(addr.clone(), err))?;

        info!("event=rpc_listen module=rpc status=ok addr={addr}");

        Ok(Self { listener, service })
    }

    /// The locally bound address (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    /// Serves connections until the surrounding task is cancelled.
    pub async fn run(self) {
        loop {
            let (stream, remote_addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!("event=rpc_accept module=rpc status=error error={err}");
                    continue;
                }
            };

            let service = Arc::clone(&self.service);
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, &service).await {
                    warn!(
                        "event=rpc_conn module=rpc status=error remote={remote_addr} error={err}"
                    );
                }
            });
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    service: &SharedService,
) -> Result<(), ProtoError> {
    loop {
        let (method, payload) = match read_frame_async(&mut stream).await {
            Ok(frame) => frame,
            // A clean close between requests is the normal end of a session.
            Err(ProtoError::Io(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(())
            }
            Err(err) => return Err(err),
        };

        let started_at = Instant::now();
        let response = match RpcRequest::decode(method, &payload) {
            Ok(request) => {
                let response = dispatch(service, request.clone()).await;
                info!(
                    "event=rpc_request module=rpc method={} status={} duration_ms={}",
                    request.method_name(),
                    response.status.name(),
                    started_at.elapsed().as_millis()
                );
                response
            }
            Err(err) => {
                // A malformed frame may have desynchronized the stream;
                // answer once and close.
                warn!("event=rpc_request module=rpc status=error error_code=bad_frame error={err}");
                let response =
                    RpcResponse::error(StatusCode::InvalidArgument, format!("bad request: {err}"));
                stream.write_all(&response.encode()).await?;
                return Ok(());
            }
        };

        stream.write_all(&response.encode()).await?;
    }
}

async fn read_frame_async(stream: &mut TcpStream) -> Result<(u8, Vec<u8>), ProtoError> {
    let mut header = [0u8; HEADER_SIZE];
    stream.read_exact(&mut header).await?;

    let code = header[0];
    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(ProtoError::PayloadTooLarge {
            size: payload_len as usize,
        });
    }

    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 {
        stream.read_exact(&mut payload).await?;
    }

    Ok((code, payload))
}

/// Translates one RPC request into a core call and wire response.
///
/// Public so adapter behavior can be driven in tests without a socket.
pub async fn dispatch(service: &SharedService, request: RpcRequest) -> RpcResponse {
    match request {
        RpcRequest::ListTerms { sort_by, order } => {
            let result = call_blocking(service, move |core| {
                core.list(non_empty(&sort_by), non_empty(&order))
            })
            .await;
            match result {
                Ok(terms) => {
                    RpcResponse::term_list(terms.iter().map(term_message).collect())
                }
                Err(err) => error_response(&err),
            }
        }

        RpcRequest::GetTerm { term } => {
            if term.is_empty() {
                return RpcResponse::error(StatusCode::InvalidArgument, "Term name required");
            }
            match call_blocking(service, move |core| core.get(&term)).await {
                Ok(record) => RpcResponse::term(term_message(&record)),
                Err(err) => error_response(&err),
            }
        }

        RpcRequest::CreateTerm { term, definition } => {
            if term.is_empty() || definition.is_empty() {
                return RpcResponse::error(
                    StatusCode::InvalidArgument,
                    "Term and definition required",
                );
            }
            match call_blocking(service, move |core| core.create(&term, &definition)).await {
                Ok(record) => RpcResponse::term(term_message(&record)),
                Err(err) => error_response(&err),
            }
        }

        RpcRequest::UpdateTerm { term, definition } => {
            if term.is_empty() || definition.is_empty() {
                return RpcResponse::error(
                    StatusCode::InvalidArgument,
                    "Term and definition required",
                );
            }
            match call_blocking(service, move |core| core.update(&term, &definition)).await {
                Ok(record) => RpcResponse::term(term_message(&record)),
                Err(err) => error_response(&err),
            }
        }

        RpcRequest::DeleteTerm { term } => {
            if term.is_empty() {
                return RpcResponse::error(StatusCode::InvalidArgument, "Term name required");
            }
            let owned = term.clone();
            match call_blocking(service, move |core| core.delete(&owned)).await {
                Ok(()) => RpcResponse::confirmation(format!("Term '{term}' deleted")),
                Err(err) => error_response(&err),
            }
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn term_message(term: &Term) -> TermMessage {
    TermMessage {
        id: term.id,
        term: term.term.clone(),
        definition: term.definition.clone(),
        created_at: term.created_at,
        updated_at: term.updated_at,
    }
}

fn error_response(err: &GlossaryError) -> RpcResponse {
    let status = match err {
        GlossaryError::Validation(_) => StatusCode::InvalidArgument,
        GlossaryError::NotFound(_) => StatusCode::NotFound,
        GlossaryError::Conflict(_) => StatusCode::AlreadyExists,
        GlossaryError::Contention => StatusCode::Unavailable,
        GlossaryError::Storage(_) => StatusCode::Internal,
    };
    RpcResponse::error(status, err.to_string())
}
