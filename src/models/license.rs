/// License records and the request/response shapes of the license API
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::security::encryption::PayloadScheme;
use crate::security::signing::{FEATURE_SEPARATOR, FIELD_SEPARATOR};

/// Features granted when a registration does not list any
pub const DEFAULT_FEATURES: [&str; 3] = ["export", "import", "reports"];

/// Business identity of the licensee. Never sent to clients in plaintext.
///
/// Field order is the JSON order clients decrypt, keep it stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(rename = "codigoEmpresa", default, skip_serializing_if = "Option::is_none")]
    pub company_code: Option<String>,

    /// Legal (registered) name
    #[serde(rename = "razonSocial", default, skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,

    #[serde(rename = "nit", default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,

    #[serde(rename = "nombreComercial", default, skip_serializing_if = "Option::is_none")]
    pub trade_name: Option<String>,

    #[serde(rename = "direccionFiscal", default, skip_serializing_if = "Option::is_none")]
    pub fiscal_address: Option<String>,

    #[serde(rename = "direccionComercial", default, skip_serializing_if = "Option::is_none")]
    pub commercial_address: Option<String>,

    #[serde(rename = "nombreRepresentante", default, skip_serializing_if = "Option::is_none")]
    pub representative_name: Option<String>,
}

/// License entity, one per device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Device hardware identifier (primary key, immutable)
    pub hardware_id: String,

    pub company_profile: CompanyProfile,

    /// None = perpetual
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,

    /// Capability tags in declared order (the order they are signed in)
    #[serde(default)]
    pub features: Vec<String>,

    /// false = suspended regardless of expiration
    pub active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl LicenseRecord {
    /// Create an active license
    pub fn new(
        hardware_id: String,
        company_profile: CompanyProfile,
        expiration_date: Option<DateTime<Utc>>,
        features: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            hardware_id,
            company_profile,
            expiration_date,
            features,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Expired when the expiration instant is strictly before `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiration_date, Some(expiration) if expiration < now)
    }

    /// Reject records whose license string would not split into four fields
    pub fn check_token_fields(&self) -> Result<(), String> {
        check_hardware_id(&self.hardware_id)?;
        self.features.iter().try_for_each(|feature| check_feature(feature))
    }
}

fn check_hardware_id(hardware_id: &str) -> Result<(), String> {
    if hardware_id.is_empty() {
        return Err("hardware id must not be empty".to_string());
    }
    if hardware_id.contains(FIELD_SEPARATOR) {
        return Err(format!(
            "hardware id '{}' must not contain '{}'",
            hardware_id, FIELD_SEPARATOR
        ));
    }
    Ok(())
}

fn check_feature(feature: &str) -> Result<(), String> {
    if feature.is_empty() {
        return Err("features must not be empty strings".to_string());
    }
    if feature.contains(FIELD_SEPARATOR) || feature.contains(FEATURE_SEPARATOR) {
        return Err(format!(
            "feature '{}' must not contain '{}' or '{}'",
            feature, FIELD_SEPARATOR, FEATURE_SEPARATOR
        ));
    }
    Ok(())
}

/// Device validation request
///
/// Every field is optional at the JSON level so a missing one is reported
/// as a missing field rather than a malformed body.
#[derive(Debug, Default, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub device_id: Option<String>,

    /// Unix seconds; accepts a JSON integer or a decimal string
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<i64>,

    /// Lowercase hex HMAC-SHA256 of `device_id:timestamp`
    #[serde(default)]
    pub signature: Option<String>,

    #[serde(default)]
    pub app_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Int(i64),
    Text(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<TimestampRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(TimestampRepr::Int(value)) => Ok(Some(value)),
        Some(TimestampRepr::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(TimestampRepr::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("timestamp must be an integer")),
    }
}

/// Successful validation response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    pub license_string: String,
    pub encrypted_data: String,
    /// Same rendering as in the signed license string; null for perpetual
    pub expires_at: Option<String>,
    pub features: Vec<String>,
    pub encryption_scheme: PayloadScheme,
}

/// Failed validation response
#[derive(Debug, Serialize)]
pub struct ValidateErrorResponse {
    pub valid: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
}

/// Request to register (or re-register) a device license
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterLicenseRequest {
    #[validate(length(min = 1, max = 256))]
    pub device_id: String,

    pub empresa: CompanyProfile,

    #[serde(rename = "expirationDate", default)]
    pub expiration_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub features: Option<Vec<String>>,
}

impl RegisterLicenseRequest {
    /// Check separators and normalize features (defaulted, trimmed, de-duplicated)
    pub fn normalized_features(&self) -> Result<Vec<String>, String> {
        check_hardware_id(&self.device_id)?;

        let requested: Vec<String> = match &self.features {
            Some(features) => features.iter().map(|f| f.trim().to_string()).collect(),
            None => DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect(),
        };

        let mut features: Vec<String> = Vec::with_capacity(requested.len());
        for feature in requested {
            check_feature(&feature)?;
            if !features.contains(&feature) {
                features.push(feature);
            }
        }

        Ok(features)
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterLicenseResponse {
    pub success: bool,
    pub message: String,
    pub device_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RevokeLicenseRequest {
    #[validate(length(min = 1))]
    pub device_id: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeLicenseResponse {
    pub success: bool,
    pub message: String,
}

/// License row for the admin listing
#[derive(Debug, Serialize, Deserialize)]
pub struct LicenseListItem {
    #[serde(rename = "hardwareID")]
    pub hardware_id: String,
    /// Legal name of the licensee
    pub empresa: Option<String>,
    pub activa: bool,
    #[serde(rename = "expirationDate")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<&LicenseRecord> for LicenseListItem {
    fn from(record: &LicenseRecord) -> Self {
        Self {
            hardware_id: record.hardware_id.clone(),
            empresa: record.company_profile.legal_name.clone(),
            activa: record.active,
            expiration_date: record.expiration_date,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LicenseListResponse {
    pub licenses: Vec<LicenseListItem>,
}

/// Aggregate counts over all license records
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    /// Active but past expiration
    pub expired: u64,
    /// No expiration date
    pub perpetual: u64,
}

impl LicenseStats {
    pub fn from_records(records: &[LicenseRecord], now: DateTime<Utc>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.total += 1;
            if !record.active {
                stats.inactive += 1;
            } else if record.is_expired_at(now) {
                stats.expired += 1;
            } else {
                stats.active += 1;
            }
            if record.expiration_date.is_none() {
                stats.perpetual += 1;
            }
        }
        stats
    }
}
