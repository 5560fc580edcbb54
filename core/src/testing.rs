//! In-process transport used by unit tests.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};

type Responder = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// Records every request and answers through a responder closure.
pub struct StubTransport {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn with(responder: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(body: Value) -> Arc<Self> {
        let body = body.to_string();
        Self::with(move |_| response(200, &body))
    }

    pub fn status(status: u16, body: &str) -> Arc<Self> {
        let body = body.to_string();
        Self::with(move |_| response(status, &body))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl fmt::Debug for StubTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubTransport").field("calls", &self.calls()).finish()
    }
}

impl Transport for StubTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}

pub fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    }
}
