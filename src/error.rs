//! Error types for every layer of the license server.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::models::ValidateErrorResponse;
use crate::security::hmac::AuthFailure;

/// Cryptographic failures (key loading, signing, AEAD).
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("license record cannot be signed: {0}")]
    InvalidRecord(String),

    #[error("license signature invalid")]
    InvalidSignature,

    #[error("malformed license token: {0}")]
    MalformedToken(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// License store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or query failed.
    #[error("license store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded.
    #[error("license store data corrupt: {0}")]
    Corrupt(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

/// Outcome of a failed license validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("request timestamp invalid or expired")]
    TimestampOutOfWindow,

    #[error("invalid authentication signature")]
    SignatureMismatch,

    #[error("license not found")]
    LicenseNotFound,

    #[error("license deactivated")]
    LicenseInactive,

    #[error("license expired")]
    LicenseExpired,

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    #[error(transparent)]
    InternalCryptoError(#[from] CryptoError),
}

impl ValidationError {
    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::TimestampOutOfWindow => "TIMESTAMP_OUT_OF_WINDOW",
            Self::SignatureMismatch => "SIGNATURE_MISMATCH",
            Self::LicenseNotFound => "LICENSE_NOT_FOUND",
            Self::LicenseInactive => "LICENSE_INACTIVE",
            Self::LicenseExpired => "LICENSE_EXPIRED",
            Self::StoreUnavailable(_) | Self::InternalCryptoError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::InternalCryptoError(_))
    }
}

impl From<AuthFailure> for ValidationError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::MissingField(field) => Self::MissingField(field),
            AuthFailure::TimestampOutOfWindow => Self::TimestampOutOfWindow,
            AuthFailure::SignatureMismatch => Self::SignatureMismatch,
        }
    }
}

impl ResponseError for ValidationError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField(_) => StatusCode::BAD_REQUEST,
            Self::TimestampOutOfWindow | Self::SignatureMismatch => StatusCode::UNAUTHORIZED,
            Self::LicenseNotFound | Self::LicenseInactive | Self::LicenseExpired => {
                StatusCode::FORBIDDEN
            }
            Self::StoreUnavailable(_) | Self::InternalCryptoError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = if self.is_internal() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(self.status_code()).json(ValidateErrorResponse {
            valid: false,
            error,
            code: self.code(),
            expired: matches!(self, Self::LicenseExpired).then_some(true),
        })
    }
}

/// Failures of the administrative endpoints.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid API key")]
    Unauthorized,

    #[error("license not found")]
    NotFound,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for AdminError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            Self::Store(e) => {
                log::error!("Admin store operation failed: {}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": error }))
    }
}

/// Fatal startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("cannot read {name} from {path}: {source}")]
    Unreadable {
        name: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
