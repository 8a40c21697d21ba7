//! HTTP/JSON gateway.
//!
//! # Responsibility
//! - Translate HTTP verb+path requests into glossary core calls.
//! - Map core outcomes onto HTTP status codes and structured JSON bodies.
//!
//! # Invariants
//! - This layer holds no storage state and duplicates no business rules;
//!   every outcome kind maps onto exactly one status code.
//! - Transient contention surfaces as 503 so clients can distinguish
//!   retry-after-backoff from permanent client errors.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::net::TcpListener;

use crate::config::HttpConfig;
use crate::{call_blocking, SharedService};
use glossd_core::{GlossaryError, Term};

/// Errors that can occur while starting the HTTP gateway.
#[derive(Debug)]
pub enum GatewayError {
    /// Failed to bind the TCP listener.
    BindFailed(String, std::io::Error),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BindFailed(addr, err) => write!(f, "failed to bind http listener on {addr}: {err}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::BindFailed(_, err) => Some(err),
        }
    }
}

/// HTTP gateway server over one shared glossary core.
pub struct HttpGateway {
    config: HttpConfig,
    listener: TcpListener,
    service: SharedService,
}

impl HttpGateway {
    /// Binds the listener; the bound address is available before `run`.
    pub async fn bind(config: HttpConfig, service: SharedService) -> Result<Self, GatewayError> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|err| GatewayError::BindFailed(addr.clone(), err))?;

        info!("event=http_listen module=http status=ok addr={addr}");

        Ok(Self {
            config,
            listener,
            service,
        })
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
                    warn!("event=http_accept module=http status=error error={err}");
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let service = Arc::clone(&self.service);
            let max_body_size = self.config.max_body_size;

            tokio::spawn(async move {
                let handler = service_fn(move |req: Request<Incoming>| {
                    let service = Arc::clone(&service);
                    async move {
                        Ok::<_, std::convert::Infallible>(
                            handle_request(req, &service, max_body_size).await,
                        )
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, handler).await {
                    warn!(
                        "event=http_conn module=http status=error remote={remote_addr} error={err}"
                    );
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    service: &SharedService,
    max_body_size: usize,
) -> Response<Full<Bytes>> {
    let started_at = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or("").to_string();

    let response = match read_body(req, max_body_size).await {
        Ok(body) => dispatch(&method, &path, &query, &body, service).await,
        Err(response) => response,
    };

    info!(
        "event=http_request module=http method={} path={} status={} duration_ms={}",
        method,
        path,
        response.status().as_u16(),
        started_at.elapsed().as_millis()
    );

    response
}

/// Routes one request to the matching handler.
///
/// Split out from connection handling so adapter behavior can be driven
/// in tests without a socket.
pub async fn dispatch(
    method: &Method,
    path: &str,
    query: &str,
    body: &[u8],
    service: &SharedService,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/health") => json_response(
            StatusCode::OK,
            serde_json::json!({ "status": "ok", "version": glossd_core::core_version() }),
        ),

        (&Method::GET, "/terms") => handle_list(query, service).await,
        (&Method::POST, "/terms") => handle_create(body, service).await,

        _ => match path.strip_prefix("/terms/").filter(|rest| !rest.is_empty()) {
            Some(raw_term) => {
                let term = match percent_decode(raw_term) {
                    Some(term) => term,
                    None => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            "validation",
                            "invalid percent-encoding in term path",
                        )
                    }
                };

                match *method {
                    Method::GET => handle_get(&term, service).await,
                    Method::PUT => handle_update(&term, body, service).await,
                    Method::DELETE => handle_delete(&term, service).await,
                    _ => error_response(
                        StatusCode::METHOD_NOT_ALLOWED,
                        "validation",
                        "method not allowed",
                    ),
                }
            }
            None => error_response(StatusCode::NOT_FOUND, "not_found", "no such route"),
        },
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CreateTermBody {
    term: String,
    definition: String,
}

#[derive(Debug, Deserialize)]
struct UpdateTermBody {
    definition: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

async fn handle_list(query: &str, service: &SharedService) -> Response<Full<Bytes>> {
    let params = parse_query_params(query);
    let sort_by = params.get("sort_by").cloned();
    let order = params.get("order").cloned();

    let result =
        call_blocking(service, move |core| core.list(sort_by.as_deref(), order.as_deref())).await;

    match result {
        Ok(terms) => {
            let items: Vec<serde_json::Value> = terms.iter().map(term_json).collect();
            json_response(StatusCode::OK, serde_json::Value::Array(items))
        }
        Err(err) => glossary_error_response(&err),
    }
}

async fn handle_get(term: &str, service: &SharedService) -> Response<Full<Bytes>> {
    let term = term.to_string();
    match call_blocking(service, move |core| core.get(&term)).await {
        Ok(record) => json_response(StatusCode::OK, term_json(&record)),
        Err(err) => glossary_error_response(&err),
    }
}

async fn handle_create(body: &[u8], service: &SharedService) -> Response<Full<Bytes>> {
    let parsed: CreateTermBody = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "validation",
                &format!("invalid JSON body: {err}"),
            )
        }
    };

    let result =
        call_blocking(service, move |core| core.create(&parsed.term, &parsed.definition)).await;

    match result {
        Ok(record) => json_response(StatusCode::CREATED, term_json(&record)),
        Err(err) => glossary_error_response(&err),
    }
}

async fn handle_update(term: &str, body: &[u8], service: &SharedService) -> Response<Full<Bytes>> {
    let parsed: UpdateTermBody = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "validation",
                &format!("invalid JSON body: {err}"),
            )
        }
    };

    let term = term.to_string();
    let result =
        call_blocking(service, move |core| core.update(&term, &parsed.definition)).await;

    match result {
        Ok(record) => json_response(StatusCode::OK, term_json(&record)),
        Err(err) => glossary_error_response(&err),
    }
}

async fn handle_delete(term: &str, service: &SharedService) -> Response<Full<Bytes>> {
    let owned = term.to_string();
    match call_blocking(service, move |core| core.delete(&owned)).await {
        Ok(()) => json_response(
            StatusCode::OK,
            serde_json::json!({ "message": format!("Term '{term}' deleted") }),
        ),
        Err(err) => glossary_error_response(&err),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn term_json(term: &Term) -> serde_json::Value {
    serde_json::json!({
        "id": term.id,
        "term": term.term,
        "definition": term.definition,
        "created_at": term.created_at,
        "updated_at": term.updated_at,
    })
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    let json = serde_json::to_vec(&body).unwrap_or_default();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|_| {
            Response::new(Full::new(Bytes::from(
                r#"{"error":{"kind":"storage","message":"failed to build response"}}"#,
            )))
        })
}

fn error_response(status: StatusCode, kind: &str, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        serde_json::json!({ "error": { "kind": kind, "message": message } }),
    )
}

fn glossary_error_response(err: &GlossaryError) -> Response<Full<Bytes>> {
    let status = match err {
        GlossaryError::Validation(_) => StatusCode::BAD_REQUEST,
        GlossaryError::NotFound(_) => StatusCode::NOT_FOUND,
        GlossaryError::Conflict(_) => StatusCode::CONFLICT,
        GlossaryError::Contention => StatusCode::SERVICE_UNAVAILABLE,
        GlossaryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.kind(), &err.to_string())
}

// ---------------------------------------------------------------------------
// Path & query parsing
// ---------------------------------------------------------------------------

/// Decodes `%XX` escapes in a path segment. Returns `None` for malformed
/// escapes or non-UTF-8 results.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_val(*bytes.get(i + 1)?)?;
            let lo = hex_val(*bytes.get(i + 2)?)?;
            out.push(hi * 16 + lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn hex_val(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Parses URL query parameters into a map.
fn parse_query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Body reading
// ---------------------------------------------------------------------------

async fn read_body(
    req: Request<Incoming>,
    max_size: usize,
) -> Result<Bytes, Response<Full<Bytes>>> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "validation",
                &format!("failed to read request body: {err}"),
            ))
        }
    };

    if body.len() > max_size {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "validation",
            &format!("request body exceeds {max_size} bytes"),
        ));
    }

    Ok(body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
