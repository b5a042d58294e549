//! Currency code newtype.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::AppError;

/// An uppercase currency identifier such as `USD` or `EUR`.
///
/// There is no static whitelist: a code is "supported" when it appears in the
/// rate snapshot currently held by the service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(from = "String", into = "String")]
#[schema(value_type = String, example = "USD")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Normalizes arbitrary input (trim + uppercase) without validating its shape.
    pub fn normalize(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Parses a request-supplied code, requiring exactly three ASCII letters.
    pub fn parse(code: &str) -> Result<Self, AppError> {
        let normalized = Self::normalize(code);
        let valid = normalized.0.len() == 3 && normalized.0.bytes().all(|b| b.is_ascii_uppercase());
        if !valid {
            return Err(AppError::BadRequest(format!(
                "Currency code must be 3 letters, got '{}'",
                code
            )));
        }
        Ok(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CurrencyCode {
    fn from(code: String) -> Self {
        Self::normalize(code)
    }
}

impl From<&str> for CurrencyCode {
    fn from(code: &str) -> Self {
        Self::normalize(code)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
