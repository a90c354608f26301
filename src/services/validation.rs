/// License validation: authenticate the device, check its license, issue a
/// signed token and an encrypted copy of the company profile.
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::{CryptoError, ValidationError};
use crate::models::{LicenseRecord, ValidateRequest};
use crate::security::{
    AuthVerifier, EncryptedProfile, LicenseSigner, PayloadEncryptor, PayloadScheme,
    SignedLicenseToken,
};
use crate::services::license_store::LicenseStore;

/// Everything a device receives on successful validation
#[derive(Debug, Clone)]
pub struct IssuedLicense {
    pub token: SignedLicenseToken,
    pub encrypted_profile: EncryptedProfile,
    pub expires_at: Option<String>,
    pub features: Vec<String>,
    pub scheme: PayloadScheme,
}

pub struct LicenseValidator {
    store: Arc<dyn LicenseStore>,
    verifier: AuthVerifier,
    signer: Arc<LicenseSigner>,
    encryptor: PayloadEncryptor,
}

impl LicenseValidator {
    pub fn new(
        store: Arc<dyn LicenseStore>,
        verifier: AuthVerifier,
        signer: Arc<LicenseSigner>,
        encryptor: PayloadEncryptor,
    ) -> Self {
        Self {
            store,
            verifier,
            signer,
            encryptor,
        }
    }

    pub async fn validate(&self, request: &ValidateRequest) -> Result<IssuedLicense, ValidationError> {
        self.validate_at(request, Utc::now()).await
    }

    /// Run every check in order, stopping at the first failure
    pub async fn validate_at(
        &self,
        request: &ValidateRequest,
        now: DateTime<Utc>,
    ) -> Result<IssuedLicense, ValidationError> {
        let device_id = non_empty(request.device_id.as_deref()).ok_or(ValidationError::MissingField("device_id"))?;
        let timestamp = request.timestamp.ok_or(ValidationError::MissingField("timestamp"))?;
        let signature = non_empty(request.signature.as_deref()).ok_or(ValidationError::MissingField("signature"))?;

        self.verifier
            .verify_at(device_id, timestamp, signature, now.timestamp())
            .map_err(|failure| {
                log::warn!("⚠️ Authentication failed for device {}: {}", device_id, failure);
                ValidationError::from(failure)
            })?;

        let record = self
            .store
            .lookup(device_id)
            .await?
            .ok_or_else(|| {
                log::warn!("❌ License not found for device: {}", device_id);
                ValidationError::LicenseNotFound
            })?;

        if !record.active {
            log::warn!("❌ License deactivated for device: {}", device_id);
            return Err(ValidationError::LicenseInactive);
        }

        if record.is_expired_at(now) {
            log::warn!("❌ License expired for device: {}", device_id);
            return Err(ValidationError::LicenseExpired);
        }

        self.issue(&record)
    }

    fn issue(&self, record: &LicenseRecord) -> Result<IssuedLicense, ValidationError> {
        let token = self.signer.sign(record)?;

        let profile_json = serde_json::to_vec(&record.company_profile)
            .map_err(|e| CryptoError::Encryption(format!("profile serialization failed: {}", e)))?;
        let encrypted_profile = self.encryptor.encrypt(&profile_json)?;

        Ok(IssuedLicense {
            expires_at: token.expiration.clone(),
            features: record.features.clone(),
            token,
            encrypted_profile,
            scheme: self.encryptor.scheme(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
