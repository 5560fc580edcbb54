//! Request payloads for every remote action.
//!
//! # Design
//! Each struct carries the fields of one API call. All of them default
//! field-by-field on deserialization, so a payload read from JSON with a key
//! missing still parses and `validate` can report the key by name. Fields
//! the remote service owns the shape of (diagnoses, invoice lines, copays)
//! stay as `serde_json::Value` and are forwarded untouched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Shallow presence check run before a request is built.
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

fn require_text(field: &'static str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::MissingField(field));
    }
    Ok(())
}

fn require_items<T>(field: &'static str, items: &[T]) -> Result<(), ApiError> {
    if items.is_empty() {
        return Err(ApiError::MissingField(field));
    }
    Ok(())
}

fn require_id(field: &'static str, id: u64) -> Result<(), ApiError> {
    if id == 0 {
        return Err(ApiError::MissingField(field));
    }
    Ok(())
}

fn require_path(field: &'static str, path: &Path) -> Result<(), ApiError> {
    if path.as_os_str().is_empty() {
        return Err(ApiError::MissingField(field));
    }
    Ok(())
}

/// Kind of supporting document attached to a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentType {
    ClaimForm,
    PreauthForm,
    Prescription,
    LabOrder,
    ImagingOrder,
    Other,
}

impl AttachmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentType::ClaimForm => "CLAIM_FORM",
            AttachmentType::PreauthForm => "PREAUTH_FORM",
            AttachmentType::Prescription => "PRESCRIPTION",
            AttachmentType::LabOrder => "LAB_ORDER",
            AttachmentType::ImagingOrder => "IMAGING_ORDER",
            AttachmentType::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitType {
    Outpatient,
    Inpatient,
}

/// Payload for creating a claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateClaim {
    pub payer_code: u64,
    pub payer_name: String,
    pub patient_name: String,
    /// Member number, or the auth token returned when the visit was started.
    pub member_number: String,
    pub scheme_name: String,
    pub visit_number: String,
    /// ISO 8601 timestamp.
    pub visit_start: String,
    /// ISO 8601 timestamp.
    pub visit_end: String,
    pub icd10_codes: Vec<Value>,
    pub location_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme_code: Option<String>,
}

impl Validate for CreateClaim {
    fn validate(&self) -> Result<(), ApiError> {
        require_id("payer_code", self.payer_code)?;
        require_text("payer_name", &self.payer_name)?;
        require_text("patient_name", &self.patient_name)?;
        require_text("member_number", &self.member_number)?;
        require_text("scheme_name", &self.scheme_name)?;
        require_text("visit_number", &self.visit_number)?;
        require_text("visit_start", &self.visit_start)?;
        require_text("visit_end", &self.visit_end)?;
        require_items("icd10_codes", &self.icd10_codes)?;
        require_text("location_code", &self.location_code)
    }
}

/// A file to upload against a claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimAttachment {
    pub claim: String,
    pub path_to_attachment: PathBuf,
    pub attachment_type: Option<AttachmentType>,
    pub description: Option<String>,
}

impl Validate for ClaimAttachment {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("claim", &self.claim)?;
        require_path("path_to_attachment", &self.path_to_attachment)?;
        if self.attachment_type.is_none() {
            return Err(ApiError::MissingField("attachment_type"));
        }
        Ok(())
    }
}

/// Payload for submitting an invoice against a claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitInvoice {
    pub claim: String,
    pub invoice_number: String,
    /// ISO 8601 date.
    pub invoice_date: String,
    pub lines: Vec<Value>,
    pub copays: Vec<Value>,
}

impl Validate for SubmitInvoice {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("claim", &self.claim)?;
        require_text("invoice_number", &self.invoice_number)?;
        require_text("invoice_date", &self.invoice_date)?;
        require_items("lines", &self.lines)
    }
}

/// A file to upload against an invoice or credit note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceAttachment {
    pub invoice: String,
    pub path_to_attachment: PathBuf,
    pub description: Option<String>,
}

impl Validate for InvoiceAttachment {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("invoice", &self.invoice)?;
        require_path("path_to_attachment", &self.path_to_attachment)
    }
}

/// Payload for a credit note. Line amounts are sent as given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitCreditNote {
    pub claim: String,
    /// The provider's credit note reference.
    pub invoice_number: String,
    pub invoice_date: String,
    pub lines: Vec<Value>,
}

impl Validate for SubmitCreditNote {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("claim", &self.claim)?;
        require_text("invoice_number", &self.invoice_number)?;
        require_text("invoice_date", &self.invoice_date)?;
        require_items("lines", &self.lines)
    }
}

/// Lookup of a member's cover under a payer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberEligibility {
    pub member_number: String,
    pub payer_slade_code: u64,
}

impl Validate for MemberEligibility {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("member_number", &self.member_number)?;
        require_id("payer_slade_code", self.payer_slade_code)
    }
}

/// Starts a visit for a member who confirmed an OTP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartVisit {
    pub beneficiary_id: u64,
    pub factors: Vec<String>,
    pub benefit_type: String,
    pub benefit_code: String,
    pub policy_number: String,
    pub policy_effective_date: String,
    pub otp: String,
    pub beneficiary_contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme_code: Option<String>,
}

impl Validate for StartVisit {
    fn validate(&self) -> Result<(), ApiError> {
        require_id("beneficiary_id", self.beneficiary_id)?;
        require_items("factors", &self.factors)?;
        require_text("benefit_type", &self.benefit_type)?;
        require_text("benefit_code", &self.benefit_code)?;
        require_text("policy_number", &self.policy_number)?;
        require_text("policy_effective_date", &self.policy_effective_date)?;
        require_text("otp", &self.otp)?;
        require_text("beneficiary_contact", &self.beneficiary_contact)
    }
}

/// Checks an authorization token issued when a visit started.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateAuthorization {
    pub first_name: String,
    pub last_name: String,
    pub other_names: String,
    pub member_number: String,
    pub auth_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_type: Option<VisitType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_code: Option<String>,
}

impl Validate for ValidateAuthorization {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_text("member_number", &self.member_number)?;
        require_text("auth_token", &self.auth_token)
    }
}

/// Reserves part of a member's benefit balance for an expected bill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceReservation {
    /// The `edi_auth_guid` from the start-visit response.
    pub authorization: String,
    pub invoice_number: String,
    pub amount: f64,
}

impl Validate for BalanceReservation {
    fn validate(&self) -> Result<(), ApiError> {
        require_text("authorization", &self.authorization)?;
        require_text("invoice_number", &self.invoice_number)
    }
}
