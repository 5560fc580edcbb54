//! Multipart uploads of supporting documents for claims and invoices.

use std::{fs, path::Path};

use serde_json::Value;

use crate::auth::{Authentication, RequestBody, Service};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::multipart::MultipartForm;
use crate::types::{ClaimAttachment, InvoiceAttachment, Validate};

const CLAIM_ATTACHMENT_PATH: &str = "/v1/claim_attachments/upload_attachment/";
const INVOICE_ATTACHMENT_PATH: &str = "/v1/invoice_attachments/upload_attachment/";

/// Uploads attachment files.
///
/// Uploads are buffered, not streamed: the whole file is read into the
/// multipart body inside the call, and both are dropped once the request
/// completes.
#[derive(Debug, Clone)]
pub struct Attachment {
    auth: Authentication,
}

impl Attachment {
    pub fn new(auth_token: &str) -> Self {
        Self::from_auth(Authentication::new(auth_token))
    }

    pub fn from_auth(auth: Authentication) -> Self {
        Self { auth }
    }

    pub fn build_claim_attachment(&self, input: &ClaimAttachment) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        let (filename, contents) = read_attachment(&input.path_to_attachment)?;
        let attachment_type = input
            .attachment_type
            .ok_or(ApiError::MissingField("attachment_type"))?;

        let form = MultipartForm::new()
            .text("claim", &input.claim)
            .text("attachment_type", attachment_type.as_str())
            .optional_text("description", input.description.as_deref())
            .file("attachment", &filename, &contents);

        self.auth.build_request(
            Service::Integration,
            HttpMethod::Post,
            CLAIM_ATTACHMENT_PATH,
            RequestBody::Multipart(form),
        )
    }

    pub fn submit_claim_attachment(&self, input: &ClaimAttachment) -> Result<Value, ApiError> {
        let request = self.build_claim_attachment(input)?;
        self.auth.send(request)
    }

    pub fn build_invoice_attachment(
        &self,
        input: &InvoiceAttachment,
    ) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        let (filename, contents) = read_attachment(&input.path_to_attachment)?;

        let form = MultipartForm::new()
            .text("invoice", &input.invoice)
            .optional_text("description", input.description.as_deref())
            .file("attachment", &filename, &contents);

        self.auth.build_request(
            Service::Integration,
            HttpMethod::Post,
            INVOICE_ATTACHMENT_PATH,
            RequestBody::Multipart(form),
        )
    }

    pub fn submit_invoice_attachment(&self, input: &InvoiceAttachment) -> Result<Value, ApiError> {
        let request = self.build_invoice_attachment(input)?;
        self.auth.send(request)
    }
}

fn read_attachment(path: &Path) -> Result<(String, Vec<u8>), ApiError> {
    let contents = fs::read(path).map_err(|source| ApiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    Ok((filename, contents))
}

#[cfg(test)]
mod tests {
    use std::{io::Write, path::PathBuf, sync::Arc};

    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::testing::StubTransport;
    use crate::types::AttachmentType;

    fn attachments(stub: &Arc<StubTransport>) -> Attachment {
        Attachment::from_auth(
            Authentication::new("t")
                .with_base_url("http://gateway.test")
                .with_transport(stub.clone()),
        )
    }

    fn scan() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"scanned-form-bytes").unwrap();
        file
    }

    #[test]
    fn claim_attachment_is_multipart_with_all_parts() {
        let stub = StubTransport::ok(json!({"id": "att-1"}));
        let file = scan();
        let input = ClaimAttachment {
            claim: "c-1".to_string(),
            path_to_attachment: file.path().to_path_buf(),
            attachment_type: Some(AttachmentType::Prescription),
            description: Some("signed".to_string()),
        };

        let response = attachments(&stub).submit_claim_attachment(&input).unwrap();
        assert_eq!(response["id"], "att-1");

        let req = stub.last();
        assert_eq!(req.path, "http://gateway.test/v1/claim_attachments/upload_attachment/");
        assert_eq!(req.header("authorization"), Some("Bearer t"));
        assert!(req
            .header("content-type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8(req.body.unwrap()).unwrap();
        assert!(body.contains("name=\"claim\"\r\n\r\nc-1\r\n"));
        assert!(body.contains("name=\"attachment_type\"\r\n\r\nPRESCRIPTION\r\n"));
        assert!(body.contains("name=\"description\"\r\n\r\nsigned\r\n"));
        assert!(body.contains("scanned-form-bytes"));
    }

    #[test]
    fn missing_file_fails_before_any_request() {
        let stub = StubTransport::ok(json!({}));
        let input = ClaimAttachment {
            claim: "c-1".to_string(),
            path_to_attachment: PathBuf::from("/definitely/not/here.pdf"),
            attachment_type: Some(AttachmentType::ClaimForm),
            description: None,
        };
        let err = attachments(&stub).submit_claim_attachment(&input).unwrap_err();
        assert!(matches!(err, ApiError::Io { .. }));
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn claim_attachment_names_each_missing_field_without_a_request() {
        let stub = StubTransport::ok(json!({}));
        let file = scan();
        let client = attachments(&stub);
        let blanks: [(&str, fn(&mut ClaimAttachment)); 3] = [
            ("claim", |a| a.claim.clear()),
            ("path_to_attachment", |a| a.path_to_attachment = PathBuf::new()),
            ("attachment_type", |a| a.attachment_type = None),
        ];
        for (field, blank) in blanks {
            let mut input = ClaimAttachment {
                claim: "c-1".to_string(),
                path_to_attachment: file.path().to_path_buf(),
                attachment_type: Some(AttachmentType::LabOrder),
                description: None,
            };
            blank(&mut input);
            match client.submit_claim_attachment(&input) {
                Err(ApiError::MissingField(name)) => assert_eq!(name, field),
                other => panic!("{field}: expected MissingField, got {other:?}"),
            }
        }
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn invoice_attachment_names_each_missing_field_without_a_request() {
        let stub = StubTransport::ok(json!({}));
        let file = scan();
        let client = attachments(&stub);
        let blanks: [(&str, fn(&mut InvoiceAttachment)); 2] = [
            ("invoice", |a| a.invoice.clear()),
            ("path_to_attachment", |a| a.path_to_attachment = PathBuf::new()),
        ];
        for (field, blank) in blanks {
            let mut input = InvoiceAttachment {
                invoice: "inv-1".to_string(),
                path_to_attachment: file.path().to_path_buf(),
                description: Some("receipt".to_string()),
            };
            blank(&mut input);
            match client.submit_invoice_attachment(&input) {
                Err(ApiError::MissingField(name)) => assert_eq!(name, field),
                other => panic!("{field}: expected MissingField, got {other:?}"),
            }
        }
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn missing_fields_are_checked_before_the_file() {
        let stub = StubTransport::ok(json!({}));
        let input = InvoiceAttachment {
            invoice: String::new(),
            path_to_attachment: PathBuf::from("/definitely/not/here.pdf"),
            description: None,
        };
        let err = attachments(&stub).submit_invoice_attachment(&input).unwrap_err();
        assert!(matches!(err, ApiError::MissingField("invoice")));
        assert_eq!(stub.calls(), 0);
    }

    #[test]
    fn invoice_attachment_omits_absent_description() {
        let stub = StubTransport::ok(json!({"id": "att-2"}));
        let file = scan();
        let input = InvoiceAttachment {
            invoice: "inv-1".to_string(),
            path_to_attachment: file.path().to_path_buf(),
            description: None,
        };
        attachments(&stub).submit_invoice_attachment(&input).unwrap();

        let req = stub.last();
        assert_eq!(req.path, "http://gateway.test/v1/invoice_attachments/upload_attachment/");
        let body = String::from_utf8(req.body.unwrap()).unwrap();
        assert!(body.contains("name=\"invoice\"\r\n\r\ninv-1\r\n"));
        assert!(!body.contains("name=\"description\""));
    }

    #[test]
    fn remote_rejection_is_surfaced() {
        let stub = StubTransport::status(413, "file too large");
        let file = scan();
        let input = InvoiceAttachment {
            invoice: "inv-1".to_string(),
            path_to_attachment: file.path().to_path_buf(),
            description: None,
        };
        let err = attachments(&stub).submit_invoice_attachment(&input).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 413, ref body } if body == "file too large"));
    }
}
