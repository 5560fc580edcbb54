//! Environment-based configuration.
//!
//! - `HEALTHCLOUD_TOKEN` (required): bearer token.
//! - `HEALTHCLOUD_BASE_URL`: integration services host.
//! - `HEALTHCLOUD_EDI_URL`: EDI host.

use std::env;

use crate::auth::{Authentication, DEFAULT_BASE_URL, DEFAULT_EDI_URL};
use crate::error::ApiError;

pub const TOKEN_VAR: &str = "HEALTHCLOUD_TOKEN";
pub const BASE_URL_VAR: &str = "HEALTHCLOUD_BASE_URL";
pub const EDI_URL_VAR: &str = "HEALTHCLOUD_EDI_URL";

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub token: String,
    pub base_url: String,
    pub edi_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        // Blank values count as unset.
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let token = lookup(TOKEN_VAR)
            .ok_or_else(|| ApiError::MissingConfig(format!("{TOKEN_VAR} must be set")))?;
        Ok(Self {
            token,
            base_url: lookup(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            edi_url: lookup(EDI_URL_VAR).unwrap_or_else(|| DEFAULT_EDI_URL.to_string()),
        })
    }

    pub fn authentication(&self) -> Authentication {
        Authentication::new(self.token.clone())
            .with_base_url(&self.base_url)
            .with_edi_url(&self.edi_url)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("edi_url", &self.edi_url)
            .finish()
    }
}
