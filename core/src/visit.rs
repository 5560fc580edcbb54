//! Member eligibility, OTP verification, visit authorization and balance
//! reservations.

use serde_json::Value;
use url::form_urlencoded;

use crate::auth::{Authentication, RequestBody, Service};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::types::{BalanceReservation, MemberEligibility, StartVisit, ValidateAuthorization, Validate};

const ELIGIBILITY_PATH: &str = "/v1/beneficiaries/member_eligibility";
const START_VISIT_PATH: &str = "/v1/authorizations/start_visit/";
const VALIDATE_TOKEN_PATH: &str = "/v1/authorizations/validate_authorization_token/";
const RESERVATION_PATH: &str = "/v1/balances/reservations/reserve_from_authorization/";

#[derive(Debug, Clone)]
pub struct Visit {
    auth: Authentication,
}

impl Visit {
    pub fn new(auth_token: &str) -> Self {
        Self::from_auth(Authentication::new(auth_token))
    }

    pub fn from_auth(auth: Authentication) -> Self {
        Self { auth }
    }

    pub fn build_member_eligibility(
        &self,
        input: &MemberEligibility,
    ) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("member_number", &input.member_number)
            .append_pair("payer_slade_code", &input.payer_slade_code.to_string())
            .finish();
        self.auth.build_request(
            Service::Edi,
            HttpMethod::Get,
            &format!("{ELIGIBILITY_PATH}?{query}"),
            RequestBody::Empty,
        )
    }

    /// Cover details for a member under a payer, including the verified
    /// contacts an OTP can be sent to.
    pub fn get_member_eligibility(&self, input: &MemberEligibility) -> Result<Value, ApiError> {
        let request = self.build_member_eligibility(input)?;
        self.auth.send(request)
    }

    pub fn build_request_otp(&self, contact_id: u64) -> Result<HttpRequest, ApiError> {
        if contact_id == 0 {
            return Err(ApiError::MissingField("contact_id"));
        }
        self.auth.build_request(
            Service::Edi,
            HttpMethod::Post,
            &format!("/v1/beneficiaries/beneficiary_contacts/{contact_id}/send_otp/"),
            RequestBody::Empty,
        )
    }

    /// Ask the server to text an OTP to one of the member's verified contacts.
    pub fn request_otp(&self, contact_id: u64) -> Result<Value, ApiError> {
        let request = self.build_request_otp(contact_id)?;
        self.auth.send(request)
    }

    pub fn build_start_visit_via_otp(&self, input: &StartVisit) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        self.auth.build_request(
            Service::Integration,
            HttpMethod::Post,
            START_VISIT_PATH,
            RequestBody::json(input)?,
        )
    }

    pub fn start_visit_via_otp(&self, input: &StartVisit) -> Result<Value, ApiError> {
        let request = self.build_start_visit_via_otp(input)?;
        self.auth.send(request)
    }

    pub fn build_validate_authorization_token(
        &self,
        input: &ValidateAuthorization,
    ) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        self.auth.build_request(
            Service::Integration,
            HttpMethod::Post,
            VALIDATE_TOKEN_PATH,
            RequestBody::json(input)?,
        )
    }

    pub fn validate_authorization_token(
        &self,
        input: &ValidateAuthorization,
    ) -> Result<Value, ApiError> {
        let request = self.build_validate_authorization_token(input)?;
        self.auth.send(request)
    }

    pub fn build_balance_reservation(
        &self,
        input: &BalanceReservation,
    ) -> Result<HttpRequest, ApiError> {
        input.validate()?;
        self.auth.build_request(
            Service::Edi,
            HttpMethod::Post,
            RESERVATION_PATH,
            RequestBody::json(input)?,
        )
    }

    pub fn create_balance_reservation(&self, input: &BalanceReservation) -> Result<Value, ApiError> {
        let request = self.build_balance_reservation(input)?;
        self.auth.send(request)
    }
}
