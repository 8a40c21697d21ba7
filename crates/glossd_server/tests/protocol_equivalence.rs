//! Cross-protocol equivalence: the same operation sequence issued once
//! through each adapter against identically-prepared stores must yield the
//! same outcome kinds and the same record fields.

use glossd_core::{
    ConnectionPool, DbSettings, GlossaryService, PoolConfig, RetryPolicy, SqliteTermRepository,
};
use glossd_server::{http, rpc, SharedService};
use http_body_util::BodyExt;
use hyper::Method;
use glossd_proto::{Request as RpcRequest, ResponseBody, StatusCode as RpcStatus};
use std::sync::Arc;
use std::time::Duration;

fn fresh_service(dir: &tempfile::TempDir, name: &str) -> SharedService {
    let config = PoolConfig::default()
        .with_max_size(2)
        .with_max_overflow(2)
        .with_acquire_timeout(Duration::from_secs(1))
        .with_settings(DbSettings {
            busy_timeout: Duration::from_secs(1),
        });
    let pool = ConnectionPool::open(dir.path().join(name), config).unwrap();
    Arc::new(
        GlossaryService::new(SqliteTermRepository::new(pool))
            .with_retry_policy(RetryPolicy::default().with_base_delay(Duration::from_millis(1))),
    )
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Create(&'static str, &'static str),
    Get(&'static str),
    Update(&'static str, &'static str),
    Delete(&'static str),
    List,
}

/// Protocol-neutral outcome: a kind plus the record fields carried by the
/// response. Timestamps are store-local wall-clock values, so equivalence
/// is asserted over id/term/definition.
#[derive(Debug, PartialEq, Eq)]
struct Outcome {
    kind: &'static str,
    records: Vec<(i64, String, String)>,
}

async fn via_http(service: &SharedService, op: Op) -> Outcome {
    let (method, path, query, body) = match op {
        Op::Create(term, definition) => (
            Method::POST,
            "/terms".to_string(),
            String::new(),
            serde_json::json!({ "term": term, "definition": definition }).to_string(),
        ),
        Op::Get(term) => (Method::GET, format!("/terms/{term}"), String::new(), String::new()),
        Op::Update(term, definition) => (
            Method::PUT,
            format!("/terms/{term}"),
            String::new(),
            serde_json::json!({ "definition": definition }).to_string(),
        ),
        Op::Delete(term) => (
            Method::DELETE,
            format!("/terms/{term}"),
            String::new(),
            String::new(),
        ),
        Op::List => (
            Method::GET,
            "/terms".to_string(),
            "sort_by=term&order=asc".to_string(),
            String::new(),
        ),
    };

    let response = http::dispatch(&method, &path, &query, body.as_bytes(), service).await;
    let kind = match response.status().as_u16() {
        200 | 201 => "ok",
        400 => "invalid_argument",
        404 => "not_found",
        409 => "already_exists",
        503 => "unavailable",
        _ => "internal",
    };

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let mut records = Vec::new();
    if kind == "ok" {
        match &value {
            serde_json::Value::Array(items) => {
                for item in items {
                    records.push(json_record(item));
                }
            }
            serde_json::Value::Object(map) if map.contains_key("term") => {
                records.push(json_record(&value));
            }
            _ => {}
        }
    }

    Outcome { kind, records }
}

fn json_record(value: &serde_json::Value) -> (i64, String, String) {
    (
        value["id"].as_i64().unwrap(),
        value["term"].as_str().unwrap().to_string(),
        value["definition"].as_str().unwrap().to_string(),
    )
}

async fn via_rpc(service: &SharedService, op: Op) -> Outcome {
    let request = match op {
        Op::Create(term, definition) => RpcRequest::CreateTerm {
            term: term.to_string(),
            definition: definition.to_string(),
        },
        Op::Get(term) => RpcRequest::GetTerm {
            term: term.to_string(),
        },
        Op::Update(term, definition) => RpcRequest::UpdateTerm {
            term: term.to_string(),
            definition: definition.to_string(),
        },
        Op::Delete(term) => RpcRequest::DeleteTerm {
            term: term.to_string(),
        },
        Op::List => RpcRequest::ListTerms {
            sort_by: "term".to_string(),
            order: "asc".to_string(),
        },
    };

    let response = rpc::dispatch(service, request).await;
    let kind = match response.status {
        RpcStatus::Ok => "ok",
        RpcStatus::InvalidArgument => "invalid_argument",
        RpcStatus::NotFound => "not_found",
        RpcStatus::AlreadyExists => "already_exists",
        RpcStatus::Unavailable => "unavailable",
        RpcStatus::Internal => "internal",
    };

    let mut records = Vec::new();
    match response.body {
        ResponseBody::Term(term) => {
            records.push((term.id, term.term, term.definition));
        }
        ResponseBody::TermList(terms) => {
            for term in terms {
                records.push((term.id, term.term, term.definition));
            }
        }
        ResponseBody::Confirmation { .. } | ResponseBody::Error(_) => {}
    }

    Outcome { kind, records }
}

#[tokio::test]
async fn both_adapters_report_equivalent_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let http_service = fresh_service(&dir, "http.db");
    let rpc_service = fresh_service(&dir, "rpc.db");

    let sequence = [
        Op::Create("API", "desc1"),
        Op::Create("API", "desc2"),
        Op::Get("API"),
        Op::Update("API", "desc2"),
        Op::Create("WAL", "write-ahead log"),
        Op::List,
        Op::Get("missing"),
        Op::Update("missing", "nothing"),
        Op::Delete("API"),
        Op::Delete("API"),
        Op::Get("API"),
        Op::Create("API", "desc3"),
        Op::List,
    ];

    for op in sequence {
        let http_outcome = via_http(&http_service, op).await;
        let rpc_outcome = via_rpc(&rpc_service, op).await;
        assert_eq!(
            http_outcome, rpc_outcome,
            "adapters diverged on {op:?}"
        );
    }
}

#[tokio::test]
async fn validation_failures_are_equivalent() {
    let dir = tempfile::tempdir().unwrap();
    let http_service = fresh_service(&dir, "http.db");
    let rpc_service = fresh_service(&dir, "rpc.db");

    // Empty keys/definitions: HTTP reaches core validation, RPC rejects at
    // the adapter; both must land on the same outcome kind.
    for op in [Op::Create("", "x"), Op::Create("API", "")] {
        let http_outcome = via_http(&http_service, op).await;
        let rpc_outcome = via_rpc(&rpc_service, op).await;
        assert_eq!(http_outcome.kind, "invalid_argument");
        assert_eq!(http_outcome, rpc_outcome, "adapters diverged on {op:?}");
    }
}
