/// Process-wide state shared by all request handlers.
///
/// Built once at startup; everything inside is read-only afterwards.
use std::sync::Arc;

use crate::config::Config;
use crate::error::CryptoError;
use crate::security::{AuthVerifier, LicenseSigner, PayloadEncryptor};
use crate::services::{LicenseAdmin, LicenseValidator};

pub struct AppState {
    pub validator: LicenseValidator,
    pub admin: Arc<dyn LicenseAdmin>,
    pub signer: Arc<LicenseSigner>,
    pub admin_api_key: Option<String>,
}

impl AppState {
    /// Load key material from `config` and wire the store into validation
    pub fn build<S>(config: &Config, store: Arc<S>) -> Result<Self, CryptoError>
    where
        S: LicenseAdmin + 'static,
    {
        let signer = Arc::new(LicenseSigner::from_pem(
            &config.private_key_pem,
            config.public_key_pem.as_deref(),
        )?);
        let encryptor = PayloadEncryptor::new(&config.hmac_secret, config.payload_scheme)?;

        let validator = LicenseValidator::new(
            store.clone(),
            AuthVerifier::new(&config.hmac_secret)?,
            signer.clone(),
            encryptor,
        );

        Ok(Self {
            validator,
            admin: store,
            signer,
            admin_api_key: config.admin_api_key.clone(),
        })
    }
}
