//! Invoice submission and invoice attachment upload.

use serde_json::Value;

use crate::attachment::Attachment;
use crate::auth::{Authentication, RequestBody, Service};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::types::{InvoiceAttachment, SubmitInvoice, Validate};

pub(crate) const INVOICES_PATH: &str = "/v1/invoices";

#[derive(Debug, Clone)]
pub struct Invoice {
    auth: Authentication,
}

impl Invoice {
    pub fn new(auth_token: &str) -> Self {
        Self::from_auth(Authentication::new(auth_token))
    }

    pub fn from_auth(auth: Authentication) -> Self {
        Self { auth }
    }

    pub fn build_submit_invoices(&self, input: &SubmitInvoice) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        self.auth.build_request(
            Service::Integration,
            HttpMethod::Post,
            INVOICES_PATH,
            RequestBody::json(input)?,
        )
    }

    pub fn submit_invoices(&self, input: &SubmitInvoice) -> Result<Value, ApiError> {
        let request = self.build_submit_invoices(input)?;
        self.auth.send(request)
    }

    pub fn submit_invoice_attachment(&self, input: &InvoiceAttachment) -> Result<Value, ApiError> {
        Attachment::from_auth(self.auth.clone()).submit_invoice_attachment(input)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::StubTransport;

    fn input() -> SubmitInvoice {
        SubmitInvoice {
            claim: "c-1".to_string(),
            invoice_number: "INV-001".to_string(),
            invoice_date: "2024-05-01".to_string(),
            lines: vec![json!({"item_code": "CONSULT", "quantity": 1, "unit_price": 2500})],
            copays: Vec::new(),
        }
    }

    fn invoices(stub: &Arc<StubTransport>) -> Invoice {
        Invoice::from_auth(
            Authentication::new("t")
                .with_base_url("http://gateway.test")
                .with_transport(stub.clone()),
        )
    }

    #[test]
    fn submit_posts_json_with_empty_copays() {
        let stub = StubTransport::ok(json!({"id": "inv-1"}));
        let response = invoices(&stub).submit_invoices(&input()).unwrap();
        assert_eq!(response["id"], "inv-1");

        let req = stub.last();
        assert_eq!(req.path, "http://gateway.test/v1/invoices");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body = req.json_body().unwrap();
        assert_eq!(body["claim"], "c-1");
        assert_eq!(body["invoice_number"], "INV-001");
        assert_eq!(body["lines"][0]["unit_price"], 2500);
        assert_eq!(body["copays"], json!([]));
        assert!(body.get("invoice_type").is_none());
    }

    #[test]
    fn each_missing_required_field_is_named_without_a_request() {
        let stub = StubTransport::ok(json!({}));
        let client = invoices(&stub);
        let blanks: [(&str, fn(&mut SubmitInvoice)); 4] = [
            ("claim", |i| i.claim.clear()),
            ("invoice_number", |i| i.invoice_number.clear()),
            ("invoice_date", |i| i.invoice_date = " ".to_string()),
            ("lines", |i| i.lines.clear()),
        ];
        for (field, blank) in blanks {
            let mut invoice = input();
            blank(&mut invoice);
            match client.submit_invoices(&invoice) {
                Err(ApiError::MissingField(name)) => assert_eq!(name, field),
                other => panic!("{field}: expected MissingField, got {other:?}"),
            }
        }
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn server_error_is_surfaced() {
        let stub = StubTransport::status(500, "boom");
        let err = invoices(&stub).submit_invoices(&input()).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, ref body } if body == "boom"));
    }
}
