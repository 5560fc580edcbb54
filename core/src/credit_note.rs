//! Credit notes: corrections that reduce a previously billed amount.
//!
//! The remote API takes credit notes on the invoice endpoint, tagged with
//! `invoice_type = CREDIT_NOTE`. Line amounts are not inspected; the sign
//! convention belongs to the server.

use serde::Serialize;
use serde_json::Value;

use crate::auth::{Authentication, RequestBody, Service};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::invoice::INVOICES_PATH;
use crate::types::{SubmitCreditNote, Validate};

const CREDIT_NOTE_TYPE: &str = "CREDIT_NOTE";

#[derive(Serialize)]
struct TaggedCreditNote<'a> {
    invoice_type: &'static str,
    #[serde(flatten)]
    note: &'a SubmitCreditNote,
}

#[derive(Debug, Clone)]
pub struct CreditNote {
    auth: Authentication,
}

impl CreditNote {
    pub fn new(auth_token: &str) -> Self {
        Self::from_auth(Authentication::new(auth_token))
    }

    pub fn from_auth(auth: Authentication) -> Self {
        Self { auth }
    }

    pub fn build_submit_credit_note(
        &self,
        input: &SubmitCreditNote,
    ) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        let body = TaggedCreditNote {
            invoice_type: CREDIT_NOTE_TYPE,
            note: input,
        };
        self.auth.build_request(
            Service::Integration,
            HttpMethod::Post,
            INVOICES_PATH,
            RequestBody::json(&body)?,
        )
    }

    pub fn submit_credit_note(&self, input: &SubmitCreditNote) -> Result<Value, ApiError> {
        let request = self.build_submit_credit_note(input)?;
        self.auth.send(request)
    }
}
