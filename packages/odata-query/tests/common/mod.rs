//! Shared helpers for odata-query integration tests
//!
//! Provides a scripted transport that replays canned responses and records
//! every request the driver makes, plus page-body builders.

#![allow(dead_code)]

use async_trait::async_trait;
use odata_query::{HttpRequest, HttpResponse, QueryError, Transport};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued responses in order. Running out of responses is a
/// connection failure, so a test that over-fetches fails loudly.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: HttpResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn page(self, records: Vec<Value>, next: Option<&str>) -> Self {
        self.respond(HttpResponse::new(200, page_body(records, next, None)))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, QueryError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(QueryError::TransportFailure {
                status: 0,
                body: "no scripted response left".to_string(),
            })
    }
}

pub fn page_body(records: Vec<Value>, next: Option<&str>, count: Option<u64>) -> Vec<u8> {
    let mut body = json!({ "value": records });
    if let Some(link) = next {
        body["@odata.nextLink"] = json!(link);
    }
    if let Some(total) = count {
        body["@odata.count"] = json!(total);
    }
    body.to_string().into_bytes()
}

/// `{"Id": n, ...extra}` records for the given ids.
pub fn records(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| json!({ "Id": id })).collect()
}

pub fn ids(records: &[Value]) -> Vec<i64> {
    records
        .iter()
        .filter_map(|r| r.get("Id").and_then(Value::as_i64))
        .collect()
}

pub const NEXT_2: &str = "https://host/data/Customers?$skiptoken=2";
pub const NEXT_3: &str = "https://host/data/Customers?$skiptoken=3";
