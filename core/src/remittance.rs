//! Remittances: payer payments covering one or more claims.

use serde_json::Value;
use url::form_urlencoded;

use crate::auth::{Authentication, RequestBody, Service};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};

const REMITTANCES_PATH: &str = "/v1/remittances";

#[derive(Debug, Clone)]
pub struct Remittance {
    auth: Authentication,
}

impl Remittance {
    pub fn new(auth_token: &str) -> Self {
        Self::from_auth(Authentication::new(auth_token))
    }

    pub fn from_auth(auth: Authentication) -> Self {
        Self { auth }
    }

    pub fn build_list_remittances(&self) -> Result<HttpRequest, ApiError> {
        self.auth
            .build_request(Service::Edi, HttpMethod::Get, REMITTANCES_PATH, RequestBody::Empty)
    }

    /// All remittances visible to the authenticated provider.
    pub fn list_remittances(&self) -> Result<Value, ApiError> {
        let request = self.build_list_remittances()?;
        self.auth.send(request)
    }

    pub fn build_get_remittance(&self, claim_id: u64) -> Result<HttpRequest, ApiError> {
        if claim_id == 0 {
            return Err(ApiError::MissingField("claim_id"));
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("claim_id", &claim_id.to_string())
            .finish();
        self.auth.build_request(
            Service::Edi,
            HttpMethod::Get,
            &format!("{REMITTANCES_PATH}/claim_remittance?{query}"),
            RequestBody::Empty,
        )
    }

    /// The remittance recorded against one claim.
    pub fn get_remittance(&self, claim_id: u64) -> Result<Value, ApiError> {
        let request = self.build_get_remittance(claim_id)?;
        self.auth.send(request)
    }
}
