//! Blocking client for the HealthCloud billing API.
//!
//! # Overview
//! Each resource (`Claim`, `Invoice`, `CreditNote`, `Attachment`, `Visit`,
//! `Remittance`) is constructed with a bearer token and maps one domain
//! action to one HTTP call: check required fields, build the body, send it,
//! return the JSON the server answered with. `HealthCloud` bundles all of
//! them behind one set of credentials and adds bundled and bulk claim
//! submission.
//!
//! # Design
//! - `Authentication` is the only component with state (token, base URLs,
//!   transport), and that state is immutable.
//! - Every action is split into `build_*` (produces an `HttpRequest`, no
//!   I/O) and a sending method, so the request shape can be checked
//!   without a network.
//! - `Transport` is the I/O seam. `UreqTransport` is the default; tests plug
//!   in their own.
//! - Responses are passed through as `serde_json::Value`.
//!
//! ```no_run
//! use healthcloud_core::{Claim, CreateClaim};
//! use serde_json::json;
//!
//! let claims = Claim::new("t");
//! let created = claims.create_claim(&CreateClaim {
//!     payer_code: 1,
//!     payer_name: "Acme Insurance".into(),
//!     patient_name: "John".into(),
//!     member_number: "M-001".into(),
//!     scheme_name: "Gold".into(),
//!     visit_number: "V-9".into(),
//!     visit_start: "2024-05-01T08:00:00Z".into(),
//!     visit_end: "2024-05-01T09:00:00Z".into(),
//!     icd10_codes: vec![json!({"code": "A00"})],
//!     location_code: "LOC-1".into(),
//!     ..CreateClaim::default()
//! })?;
//! println!("created claim {}", created["id"]);
//! # Ok::<(), healthcloud_core::ApiError>(())
//! ```

pub mod attachment;
pub mod auth;
pub mod bundle;
pub mod claim;
pub mod config;
pub mod credit_note;
pub mod error;
pub mod http;
pub mod invoice;
pub mod multipart;
pub mod oauth;
pub mod remittance;
pub mod types;
pub mod visit;

#[cfg(test)]
mod testing;

pub use attachment::Attachment;
pub use auth::{Authentication, RequestBody, Service, DEFAULT_BASE_URL, DEFAULT_EDI_URL};
pub use bundle::{
    default_workers, BundleOutcome, BundledAttachment, BundledCreditNote, BundledInvoice,
    ClaimBundle, HealthCloud,
};
pub use claim::Claim;
pub use config::Settings;
pub use credit_note::CreditNote;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use invoice::Invoice;
pub use multipart::MultipartForm;
pub use oauth::{fetch_token, AccessToken, PasswordGrant};
pub use remittance::Remittance;
pub use types::{
    AttachmentType, BalanceReservation, ClaimAttachment, CreateClaim, InvoiceAttachment,
    MemberEligibility, StartVisit, SubmitCreditNote, SubmitInvoice, ValidateAuthorization,
    Validate, VisitType,
};
pub use visit::Visit;
