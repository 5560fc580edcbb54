//! Billing lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every resource over
//! real HTTP through the default `UreqTransport`. Both the integration and
//! the EDI base URLs point at the same mock, which serves every route.

use std::io::Write;

use healthcloud_core::{
    fetch_token, ApiError, Attachment, AttachmentType, Authentication, BalanceReservation, Claim,
    ClaimAttachment, ClaimBundle, CreateClaim, CreditNote, HealthCloud, Invoice,
    InvoiceAttachment, MemberEligibility, PasswordGrant, Remittance, StartVisit, SubmitCreditNote,
    SubmitInvoice, UreqTransport, ValidateAuthorization, Visit,
};
use healthcloud_core::{BundledAttachment, BundledCreditNote, BundledInvoice};
use serde_json::json;
use tempfile::NamedTempFile;

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn auth(base: &str, token: &str) -> Authentication {
    Authentication::new(token)
        .with_base_url(base)
        .with_edi_url(base)
}

fn claim_input() -> CreateClaim {
    CreateClaim {
        payer_code: 1,
        payer_name: "Acme Insurance".to_string(),
        patient_name: "John".to_string(),
        member_number: "M-001".to_string(),
        scheme_name: "Gold".to_string(),
        visit_number: "V-9".to_string(),
        visit_start: "2024-05-01T08:00:00Z".to_string(),
        visit_end: "2024-05-01T09:00:00Z".to_string(),
        icd10_codes: vec![json!({"code": "A00"})],
        location_code: "LOC-1".to_string(),
        ..CreateClaim::default()
    }
}

fn invoice_input(claim: &str, number: &str) -> SubmitInvoice {
    SubmitInvoice {
        claim: claim.to_string(),
        invoice_number: number.to_string(),
        invoice_date: "2024-05-01".to_string(),
        lines: vec![json!({"description": "Consultation", "amount": 2500})],
        copays: Vec::new(),
    }
}

fn scan() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"%PDF-1.4 scanned form").unwrap();
    file
}

fn assert_status(err: ApiError, expected: u16) {
    match err {
        ApiError::Http { status, body } => {
            assert_eq!(status, expected);
            assert!(!body.is_empty(), "error body should be surfaced");
        }
        other => panic!("expected HTTP {expected}, got {other:?}"),
    }
}

#[test]
fn billing_lifecycle() {
    let base = start_server();

    // Step 1: exchange credentials for a token.
    let grant = PasswordGrant::new("client", "secret", "nurse@clinic.test", "pass");
    let token = fetch_token(&UreqTransport::new(), &base, &grant).unwrap();
    assert!(token.access_token.starts_with("mock-"));
    let auth = auth(&base, &token.access_token);

    // Step 2: create a claim.
    let claim = Claim::from_auth(auth.clone())
        .create_claim(&claim_input())
        .unwrap();
    let claim_id = claim["id"].as_str().unwrap().to_string();
    assert_eq!(claim["status"], "DRAFT");
    assert_eq!(claim["location_code"], "LOC-1");

    // Step 3: attach a scanned claim form.
    let file = scan();
    let uploaded = Attachment::from_auth(auth.clone())
        .submit_claim_attachment(&ClaimAttachment {
            claim: claim_id.clone(),
            path_to_attachment: file.path().to_path_buf(),
            attachment_type: Some(AttachmentType::ClaimForm),
            description: Some("signed form".to_string()),
        })
        .unwrap();
    assert_eq!(uploaded["claim"], claim_id.as_str());
    assert_eq!(uploaded["attachment_type"], "CLAIM_FORM");
    assert_eq!(uploaded["size"], 21);

    // Step 4: invoice the claim and attach a receipt.
    let invoices = Invoice::from_auth(auth.clone());
    let invoice = invoices
        .submit_invoices(&invoice_input(&claim_id, "INV-1"))
        .unwrap();
    assert_eq!(invoice["invoice_type"], "INVOICE");
    let invoice_id = invoice["id"].as_str().unwrap().to_string();
    let receipt = invoices
        .submit_invoice_attachment(&InvoiceAttachment {
            invoice: invoice_id.clone(),
            path_to_attachment: file.path().to_path_buf(),
            description: None,
        })
        .unwrap();
    assert_eq!(receipt["invoice"], invoice_id.as_str());
    assert!(receipt.get("description").is_none());

    // Step 5: issue a credit note against the claim.
    let note = CreditNote::from_auth(auth.clone())
        .submit_credit_note(&SubmitCreditNote {
            claim: claim_id.clone(),
            invoice_number: "CRN-1".to_string(),
            invoice_date: "2024-05-02".to_string(),
            lines: vec![json!({"description": "Refund", "amount": -500})],
        })
        .unwrap();
    assert_eq!(note["invoice_type"], "CREDIT_NOTE");
    assert_eq!(note["lines"][0]["amount"], -500);

    // Step 6: an invoice for a claim the server never saw is rejected.
    let err = invoices
        .submit_invoices(&invoice_input("no-such-claim", "INV-2"))
        .unwrap_err();
    assert_status(err, 400);
}

#[test]
fn visit_authorization_flow() {
    let base = start_server();
    let visits = Visit::from_auth(auth(&base, "t"));

    let eligibility = visits
        .get_member_eligibility(&MemberEligibility {
            member_number: "M-001".to_string(),
            payer_slade_code: 457,
        })
        .unwrap();
    let contact_id = eligibility["contacts"][0]["id"].as_u64().unwrap();
    let beneficiary_id = eligibility["beneficiary_id"].as_u64().unwrap();

    let sent = visits.request_otp(contact_id).unwrap();
    assert_eq!(sent["contact"], contact_id);

    let mut start = StartVisit {
        beneficiary_id,
        factors: vec!["OTP".to_string()],
        benefit_type: "OUTPATIENT".to_string(),
        benefit_code: "OP-1".to_string(),
        policy_number: "P-1".to_string(),
        policy_effective_date: "2024-01-01".to_string(),
        otp: "0000".to_string(),
        beneficiary_contact: "+254700000000".to_string(),
        ..StartVisit::default()
    };
    assert_status(visits.start_visit_via_otp(&start).unwrap_err(), 400);

    start.otp = mock_server::VALID_OTP.to_string();
    let visit = visits.start_visit_via_otp(&start).unwrap();
    let guid = visit["edi_auth_guid"].as_str().unwrap().to_string();
    let auth_token = visit["auth_token"].as_str().unwrap().to_string();

    let validated = visits
        .validate_authorization_token(&ValidateAuthorization {
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            member_number: "M-001".to_string(),
            auth_token,
            ..ValidateAuthorization::default()
        })
        .unwrap();
    assert_eq!(validated["valid"], true);

    let reservation = visits
        .create_balance_reservation(&BalanceReservation {
            authorization: guid.clone(),
            invoice_number: "INV-1".to_string(),
            amount: 2500.0,
        })
        .unwrap();
    assert_eq!(reservation["status"], "RESERVED");
    assert_eq!(reservation["authorization"], guid.as_str());

    let err = visits
        .get_member_eligibility(&MemberEligibility {
            member_number: mock_server::UNKNOWN_MEMBER.to_string(),
            payer_slade_code: 457,
        })
        .unwrap_err();
    assert_status(err, 404);
}

#[test]
fn remittances_are_read_from_the_edi_host() {
    let base = start_server();
    let remittances = Remittance::from_auth(auth(&base, "t"));

    let listed = remittances.list_remittances().unwrap();
    assert_eq!(listed["count"], 0);

    assert_status(remittances.get_remittance(12).unwrap_err(), 404);
}

#[test]
fn rejected_credentials_surface_status_and_body() {
    let base = start_server();

    let grant = PasswordGrant::new("client", "secret", "nurse", mock_server::REJECTED_PASSWORD);
    assert_status(fetch_token(&UreqTransport::new(), &base, &grant).unwrap_err(), 401);

    let revoked = auth(&base, mock_server::REVOKED_TOKEN);
    let file = scan();

    assert_status(
        Claim::from_auth(revoked.clone())
            .create_claim(&claim_input())
            .unwrap_err(),
        401,
    );
    assert_status(
        Invoice::from_auth(revoked.clone())
            .submit_invoices(&invoice_input("c-1", "INV-1"))
            .unwrap_err(),
        401,
    );
    assert_status(
        CreditNote::from_auth(revoked.clone())
            .submit_credit_note(&SubmitCreditNote {
                claim: "c-1".to_string(),
                invoice_number: "CRN-1".to_string(),
                invoice_date: "2024-05-02".to_string(),
                lines: vec![json!({"amount": -1})],
            })
            .unwrap_err(),
        401,
    );
    assert_status(
        Attachment::from_auth(revoked)
            .submit_claim_attachment(&ClaimAttachment {
                claim: "c-1".to_string(),
                path_to_attachment: file.path().to_path_buf(),
                attachment_type: Some(AttachmentType::Other),
                description: None,
            })
            .unwrap_err(),
        401,
    );
}

#[test]
fn bundles_are_submitted_end_to_end() {
    let base = start_server();
    let client = HealthCloud::from_auth(auth(&base, "t"));
    let file = scan();
    let attachment = |attachment_type| BundledAttachment {
        path_to_attachment: file.path().to_path_buf(),
        attachment_type,
        description: None,
    };

    let bundle = ClaimBundle {
        claim: claim_input(),
        claim_attachments: vec![attachment(Some(AttachmentType::ClaimForm))],
        invoices: vec![BundledInvoice {
            invoice: invoice_input("", "INV-1"),
            invoice_attachments: vec![attachment(None)],
        }],
        credit_notes: vec![BundledCreditNote {
            credit_note: SubmitCreditNote {
                invoice_number: "CRN-1".to_string(),
                invoice_date: "2024-05-02".to_string(),
                lines: vec![json!({"amount": -500})],
                ..SubmitCreditNote::default()
            },
            crn_attachments: vec![attachment(None)],
        }],
    };

    let outcome = client.submit_bundle(&bundle).unwrap();
    assert!(outcome.is_complete(), "failures: {:?}", outcome.failures);
    // invoice and credit note first, then the three attachments
    assert_eq!(outcome.submitted.len(), 5);
    assert_eq!(outcome.submitted[0]["claim"], outcome.claim_id.as_str());
    assert_eq!(outcome.submitted[1]["invoice_type"], "CREDIT_NOTE");

    let results = client.submit_bundles(&[bundle.clone(), bundle], 2);
    assert_eq!(results.len(), 2);
    let ids: Vec<String> = results
        .into_iter()
        .map(|result| result.unwrap().claim_id)
        .collect();
    assert_ne!(ids[0], ids[1]);
}
