use chrono::{DateTime, Utc};
use serde::Deserialize;

/// hash api response, both provider families answer with the same shape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub code: String,
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub hash: String,
    #[serde(default, deserialize_with = "super::deserialize_lenient_string")]
    pub error: String,
}

impl AuthResponse {
    pub fn is_success(&self) -> bool {
        self.code.trim() == "1" && !self.hash.is_empty()
    }
}

/// the signature the provider wants on every stream request (wmsAuthSign)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
