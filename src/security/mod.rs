/// Security module for device authentication and license cryptography
pub mod hmac;
pub mod encryption;
pub mod signing;

pub use hmac::{
    AuthFailure, AuthVerifier, create_signature, construct_signature_data,
    generate_shared_secret, validate_timestamp, TIMESTAMP_TOLERANCE,
};
pub use encryption::{EncryptedProfile, PayloadEncryptor, PayloadScheme};
pub use signing::{canonical_string, format_expiration, LicenseSigner, SignedLicenseToken};
