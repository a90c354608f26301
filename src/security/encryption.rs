/// Business-profile encryption using AES-256-GCM
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

use crate::error::CryptoError;

/// AES-GCM nonce length in bytes (96 bits)
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// HKDF info string binding derived keys to payload encryption
const HKDF_INFO: &[u8] = b"license-payload-v1";

/// How the payload key is derived and which nonce is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadScheme {
    /// HKDF-SHA256 key, fresh random nonce sent as `nonce || ciphertext || tag`
    V2,
    /// Secret padded with '0' to 32 bytes, all-zero nonce, `ciphertext || tag`.
    /// Only for clients deployed before V2.
    Legacy,
}

impl PayloadScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2 => "v2",
            Self::Legacy => "legacy",
        }
    }
}

impl Default for PayloadScheme {
    fn default() -> Self {
        Self::V2
    }
}

impl fmt::Display for PayloadScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v2" => Ok(Self::V2),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown payload encryption scheme '{}'", other)),
        }
    }
}

/// Base64 authenticated ciphertext of a company profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedProfile(String);

impl EncryptedProfile {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Encrypts profile JSON with a key derived once from the shared secret
pub struct PayloadEncryptor {
    cipher: Aes256Gcm,
    scheme: PayloadScheme,
}

impl PayloadEncryptor {
    pub fn new(shared_secret: &str, scheme: PayloadScheme) -> Result<Self, CryptoError> {
        let key = match scheme {
            PayloadScheme::V2 => derive_key_hkdf(shared_secret)?,
            PayloadScheme::Legacy => derive_key_legacy(shared_secret),
        };

        Ok(Self {
            cipher: Aes256Gcm::new((&key).into()),
            scheme,
        })
    }

    pub fn scheme(&self) -> PayloadScheme {
        self.scheme
    }

    /// Encrypt plaintext bytes (no associated data)
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedProfile, CryptoError> {
        let nonce_bytes = match self.scheme {
            PayloadScheme::V2 => {
                let mut bytes = [0u8; NONCE_LEN];
                OsRng.fill_bytes(&mut bytes);
                bytes
            }
            PayloadScheme::Legacy => [0u8; NONCE_LEN],
        };

        // aes-gcm appends the 16-byte tag to the ciphertext
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let combined = match self.scheme {
            PayloadScheme::V2 => {
                let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
                combined.extend_from_slice(&nonce_bytes);
                combined.extend_from_slice(&ciphertext);
                combined
            }
            PayloadScheme::Legacy => ciphertext,
        };

        Ok(EncryptedProfile(general_purpose::STANDARD.encode(&combined)))
    }

    /// Decrypt a base64 payload produced by `encrypt` under the same scheme
    pub fn decrypt(&self, encrypted: &str) -> Result<Vec<u8>, CryptoError> {
        let combined = general_purpose::STANDARD
            .decode(encrypted)
            .map_err(|e| CryptoError::Decryption(format!("base64 decode failed: {}", e)))?;

        let (nonce_bytes, ciphertext) = match self.scheme {
            PayloadScheme::V2 => {
                if combined.len() < NONCE_LEN + TAG_LEN {
                    return Err(CryptoError::Decryption("payload too short".to_string()));
                }
                let (nonce, rest) = combined.split_at(NONCE_LEN);
                (nonce.to_vec(), rest)
            }
            PayloadScheme::Legacy => {
                if combined.len() < TAG_LEN {
                    return Err(CryptoError::Decryption("payload too short".to_string()));
                }
                (vec![0u8; NONCE_LEN], combined.as_slice())
            }
        };

        self.cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext)
            .map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}

/// HKDF-SHA256 over the shared secret
pub fn derive_key_hkdf(shared_secret: &str) -> Result<[u8; 32], CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret.as_bytes());
    let mut key = [0u8; 32];
    hk.expand(HKDF_INFO, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Right-pad the secret bytes with b'0' to 32 bytes, then truncate to 32
pub fn derive_key_legacy(shared_secret: &str) -> [u8; 32] {
    let mut key = [b'0'; 32];
    let bytes = shared_secret.as_bytes();
    let len = bytes.len().min(32);
    key[..len].copy_from_slice(&bytes[..len]);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "s3cr3t-shared-secret-for-tests-0123456789";
    const PROFILE: &str = r#"{"razonSocial":"ACME, S.A.","nit":"123456-7"}"#;

    #[test]
    fn test_legacy_matches_reference_ciphertext() {
        // Output of the deployed Node.js server for the same secret and JSON
        let encryptor = PayloadEncryptor::new(SECRET, PayloadScheme::Legacy).unwrap();
        let encrypted = encryptor.encrypt(PROFILE.as_bytes()).unwrap();

        assert_eq!(
            encrypted.as_str(),
            "9mmDiIx6/Tu6VB2yjBtQ1+bLhWRjjVytneIvKz4nlLfVYNCkm83duydrWNucqM4d+Y9PtGdCSAQhm3gSqw=="
        );
    }

    #[test]
    fn test_legacy_layout_is_ciphertext_plus_tag() {
        let encryptor = PayloadEncryptor::new(SECRET, PayloadScheme::Legacy).unwrap();
        let encrypted = encryptor.encrypt(PROFILE.as_bytes()).unwrap();
        let raw = general_purpose::STANDARD.decode(encrypted.as_str()).unwrap();

        assert_eq!(raw.len(), PROFILE.len() + TAG_LEN);
    }

    #[test]
    fn test_legacy_key_padding_and_truncation() {
        assert_eq!(
            hex::encode(derive_key_legacy("abc")),
            "6162633030303030303030303030303030303030303030303030303030303030"
        );

        let long = "x".repeat(64);
        assert_eq!(derive_key_legacy(&long), [b'x'; 32]);
        assert_eq!(derive_key_legacy(""), [b'0'; 32]);
    }

    #[test]
    fn test_v2_uses_fresh_nonce() {
        let encryptor = PayloadEncryptor::new(SECRET, PayloadScheme::V2).unwrap();
        let first = encryptor.encrypt(PROFILE.as_bytes()).unwrap();
        let second = encryptor.encrypt(PROFILE.as_bytes()).unwrap();

        assert_ne!(first, second);

        let raw = general_purpose::STANDARD.decode(first.as_str()).unwrap();
        assert_eq!(raw.len(), NONCE_LEN + PROFILE.len() + TAG_LEN);
    }

    #[test]
    fn test_v2_roundtrip() {
        let encryptor = PayloadEncryptor::new(SECRET, PayloadScheme::V2).unwrap();
        let encrypted = encryptor.encrypt(PROFILE.as_bytes()).unwrap();

        assert_eq!(encryptor.decrypt(encrypted.as_str()).unwrap(), PROFILE.as_bytes());
    }

    #[test]
    fn test_unicode_json_roundtrip() {
        let profile = r#"{"nombreRepresentante":"Juan Pérez","razonSocial":"Café Ñandú"}"#;
        for scheme in [PayloadScheme::V2, PayloadScheme::Legacy] {
            let encryptor = PayloadEncryptor::new(SECRET, scheme).unwrap();
            let encrypted = encryptor.encrypt(profile.as_bytes()).unwrap();
            assert_eq!(encryptor.decrypt(encrypted.as_str()).unwrap(), profile.as_bytes());
        }
    }

    #[test]
    fn test_v2_key_differs_from_legacy_key() {
        assert_ne!(derive_key_hkdf(SECRET).unwrap(), derive_key_legacy(SECRET));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let encrypted = PayloadEncryptor::new(SECRET, PayloadScheme::V2)
            .unwrap()
            .encrypt(PROFILE.as_bytes())
            .unwrap();
        let other = PayloadEncryptor::new("a-completely-different-secret!!!", PayloadScheme::V2).unwrap();

        assert!(other.decrypt(encrypted.as_str()).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let encryptor = PayloadEncryptor::new(SECRET, PayloadScheme::Legacy).unwrap();
        let encrypted = encryptor.encrypt(PROFILE.as_bytes()).unwrap();
        let mut raw = general_purpose::STANDARD.decode(encrypted.as_str()).unwrap();
        raw[0] ^= 0x01;

        let tampered = general_purpose::STANDARD.encode(&raw);
        assert!(encryptor.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_short_payload_rejected() {
        let encryptor = PayloadEncryptor::new(SECRET, PayloadScheme::V2).unwrap();
        let short = general_purpose::STANDARD.encode([0u8; 8]);
        assert!(matches!(encryptor.decrypt(&short), Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_scheme_parsing() {
        assert_eq!("legacy".parse::<PayloadScheme>(), Ok(PayloadScheme::Legacy));
        assert_eq!(" V2 ".parse::<PayloadScheme>(), Ok(PayloadScheme::V2));
        assert!("zero".parse::<PayloadScheme>().is_err());
    }
}
