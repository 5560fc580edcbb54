//! Authenticated request construction and execution.
//!
//! # Design
//! `Authentication` is the one piece every resource is composed from. It
//! owns the bearer token, the two base URLs and a shared `Transport`, and it
//! carries no mutable state, so clones can be used from several threads at
//! once. Building a request is pure; `send` is the only place the network is
//! touched.

use std::{fmt, sync::Arc};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::multipart::MultipartForm;

/// Default host for claims, invoices, attachments and visit authorization.
pub const DEFAULT_BASE_URL: &str = "https://provider-gateway.healthcloud.sh";
/// Default host for eligibility, remittances and balance reservations.
pub const DEFAULT_EDI_URL: &str = "https://provider-edi-api.healthcloud.sh";

/// Which remote host a path is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Integration,
    Edi,
}

/// Body of an outgoing request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

impl RequestBody {
    /// Serialize any payload into a JSON body.
    pub fn json<T: Serialize>(payload: &T) -> Result<Self, ApiError> {
        serde_json::to_value(payload)
            .map(RequestBody::Json)
            .map_err(ApiError::Serialization)
    }
}

/// Bearer credentials plus the transport every resource call goes through.
#[derive(Clone)]
pub struct Authentication {
    token: String,
    base_url: String,
    edi_url: String,
    transport: Arc<dyn Transport>,
}

impl Authentication {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            token: auth_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            edi_url: DEFAULT_EDI_URL.to_string(),
            transport: Arc::new(UreqTransport::new()),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_edi_url(mut self, edi_url: &str) -> Self {
        self.edi_url = edi_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn edi_url(&self) -> &str {
        &self.edi_url
    }

    /// Absolute URL of `path` on the given service.
    pub fn url(&self, service: Service, path: &str) -> String {
        let base = match service {
            Service::Integration => &self.base_url,
            Service::Edi => &self.edi_url,
        };
        format!("{base}{path}")
    }

    /// Build an authenticated request without sending it.
    pub fn build_request(
        &self,
        service: Service,
        method: HttpMethod,
        path: &str,
        body: RequestBody,
    ) -> Result<HttpRequest, ApiError> {
        if self.token.trim().is_empty() {
            return Err(ApiError::MissingField("auth_token"));
        }

        let mut headers = vec![
            ("Authorization".to_string(), format!("Bearer {}", self.token)),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        let body = match body {
            RequestBody::Empty => None,
            RequestBody::Json(value) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Some(serde_json::to_vec(&value).map_err(ApiError::Serialization)?)
            }
            RequestBody::Multipart(form) => {
                headers.push(("Content-Type".to_string(), form.content_type()));
                Some(form.finish())
            }
        };

        Ok(HttpRequest {
            method,
            path: self.url(service, path),
            headers,
            body,
        })
    }

    /// Execute a built request and return the parsed JSON response.
    pub fn send(&self, request: HttpRequest) -> Result<Value, ApiError> {
        let method = request.method;
        let url = request.path.clone();
        debug!(method = method.as_str(), %url, "sending request");

        let response = self.transport.execute(request)?;
        if !response.is_success() {
            warn!(method = method.as_str(), %url, status = response.status, "request rejected");
        }
        parse_json(response)
    }

    /// Generic authenticated call: build then send.
    pub fn perform(
        &self,
        service: Service,
        method: HttpMethod,
        path: &str,
        body: RequestBody,
    ) -> Result<Value, ApiError> {
        let request = self.build_request(service, method, path, body)?;
        self.send(request)
    }
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("edi_url", &self.edi_url)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Map non-success statuses to `ApiError::Http`, otherwise parse the body.
pub(crate) fn parse_json(response: HttpResponse) -> Result<Value, ApiError> {
    if !response.is_success() {
        return Err(ApiError::Http {
            status: response.status,
            body: response.body,
        });
    }
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
