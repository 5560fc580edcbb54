//! Password-grant token acquisition.
//!
//! The token returned here is what every resource is constructed with. An
//! `Authentication` never refreshes its token; when `expires_in` runs out,
//! fetch a new one and build new resources from it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

const TOKEN_PATH: &str = "/oauth2/token/";
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Credentials for the OAuth 2.0 password grant.
#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordGrant {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_grant_type")]
    pub grant_type: String,
}

fn default_grant_type() -> String {
    "password".to_string()
}

impl PasswordGrant {
    pub fn new(client_id: &str, client_secret: &str, username: &str, password: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            grant_type: default_grant_type(),
        }
    }
}

impl std::fmt::Debug for PasswordGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGrant")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("grant_type", &self.grant_type)
            .finish_non_exhaustive()
    }
}

/// A bearer token issued by the authorization server.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN
}

impl AccessToken {
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

pub fn build_token_request(auth_url: &str, grant: &PasswordGrant) -> HttpRequest {
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", &grant.grant_type)
        .append_pair("client_id", &grant.client_id)
        .append_pair("client_secret", &grant.client_secret)
        .append_pair("username", &grant.username)
        .append_pair("password", &grant.password)
        .finish();
    HttpRequest {
        method: HttpMethod::Post,
        path: format!("{}{TOKEN_PATH}", auth_url.trim_end_matches('/')),
        headers: vec![(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        )],
        body: Some(body.into_bytes()),
    }
}

pub fn parse_token_response(response: HttpResponse) -> Result<AccessToken, ApiError> {
    if !response.is_success() {
        return Err(ApiError::Http {
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Request a token and parse the answer.
pub fn fetch_token(
    transport: &dyn Transport,
    auth_url: &str,
    grant: &PasswordGrant,
) -> Result<AccessToken, ApiError> {
    let request = build_token_request(auth_url, grant);
    tracing::debug!(url = %request.path, client_id = %grant.client_id, "requesting access token");
    parse_token_response(transport.execute(request)?)
}
