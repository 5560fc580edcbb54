//! Claim creation and claim attachment upload.

use serde_json::Value;

use crate::attachment::Attachment;
use crate::auth::{Authentication, RequestBody, Service};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::types::{ClaimAttachment, CreateClaim, Validate};

const CLAIMS_PATH: &str = "/v1/claims/";

#[derive(Debug, Clone)]
pub struct Claim {
    auth: Authentication,
}

impl Claim {
    pub fn new(auth_token: &str) -> Self {
        Self::from_auth(Authentication::new(auth_token))
    }

    pub fn from_auth(auth: Authentication) -> Self {
        Self { auth }
    }

    pub fn build_create_claim(&self, input: &CreateClaim) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        self.auth.build_request(
            Service::Integration,
            HttpMethod::Post,
            CLAIMS_PATH,
            RequestBody::json(input)?,
        )
    }

    /// Create a claim and return the remote representation, including its `id`.
    pub fn create_claim(&self, input: &CreateClaim) -> Result<Value, ApiError> {
        let request = self.build_create_claim(input)?;
        self.auth.send(request)
    }

    pub fn submit_claim_attachment(&self, input: &ClaimAttachment) -> Result<Value, ApiError> {
        Attachment::from_auth(self.auth.clone()).submit_claim_attachment(input)
    }
}
