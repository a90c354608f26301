/// License persistence seam: read-only lookup for validation, writes for admin
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::models::{CompanyProfile, LicenseRecord, LicenseStats};

/// Lookup consumed by license validation
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Most recent committed record for a device, if any
    async fn lookup(&self, hardware_id: &str) -> Result<Option<LicenseRecord>, StoreError>;
}

/// Fields an administrator sets when registering a device
#[derive(Debug, Clone)]
pub struct LicenseRegistration {
    pub hardware_id: String,
    pub company_profile: CompanyProfile,
    pub expiration_date: Option<DateTime<Utc>>,
    pub features: Vec<String>,
}

/// Administrative operations; records are deactivated, never deleted
#[async_trait]
pub trait LicenseAdmin: LicenseStore {
    /// Create or replace a device license. An existing record keeps its
    /// `created_at` and is reactivated.
    async fn register(&self, registration: LicenseRegistration) -> Result<LicenseRecord, StoreError>;

    /// Mark a license inactive. Returns false when the device is unknown.
    async fn deactivate(&self, hardware_id: &str) -> Result<bool, StoreError>;

    /// All records, newest first
    async fn list(&self) -> Result<Vec<LicenseRecord>, StoreError>;

    async fn stats(&self, now: DateTime<Utc>) -> Result<LicenseStats, StoreError> {
        let records = self.list().await?;
        Ok(LicenseStats::from_records(&records, now))
    }
}

/// Process-local store guarded by a read/write lock
#[derive(Default)]
pub struct MemoryLicenseStore {
    records: RwLock<HashMap<String, LicenseRecord>>,
}

impl MemoryLicenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = LicenseRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.hardware_id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Load a JSON array of license records
    ///
    /// The whole file is rejected if any record cannot be signed or a
    /// hardware id appears twice.
    pub fn from_seed_file(path: &Path) -> Result<Self, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt(format!("{}: {}", path.display(), reason));

        let contents = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let records: Vec<LicenseRecord> =
            serde_json::from_str(&contents).map_err(|e| corrupt(e.to_string()))?;

        let mut seeded: HashMap<String, LicenseRecord> = HashMap::with_capacity(records.len());
        for record in records {
            record.check_token_fields().map_err(&corrupt)?;
            if seeded.contains_key(&record.hardware_id) {
                return Err(corrupt(format!("duplicate hardware id '{}'", record.hardware_id)));
            }
            seeded.insert(record.hardware_id.clone(), record);
        }

        log::info!("Loaded {} license records from {}", seeded.len(), path.display());
        Ok(Self {
            records: RwLock::new(seeded),
        })
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("license map lock poisoned".to_string())
}

#[async_trait]
impl LicenseStore for MemoryLicenseStore {
    async fn lookup(&self, hardware_id: &str) -> Result<Option<LicenseRecord>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(hardware_id).cloned())
    }
}

#[async_trait]
impl LicenseAdmin for MemoryLicenseStore {
    async fn register(&self, registration: LicenseRegistration) -> Result<LicenseRecord, StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        let now = Utc::now();

        let created_at = records
            .get(&registration.hardware_id)
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        let record = LicenseRecord {
            hardware_id: registration.hardware_id,
            company_profile: registration.company_profile,
            expiration_date: registration.expiration_date,
            features: registration.features,
            active: true,
            created_at,
            updated_at: now,
        };

        records.insert(record.hardware_id.clone(), record.clone());
        Ok(record)
    }

    async fn deactivate(&self, hardware_id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.get_mut(hardware_id) {
            Some(record) => {
                record.active = false;
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        let mut list: Vec<LicenseRecord> = records.values().cloned().collect();
        list.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.hardware_id.cmp(&b.hardware_id))
        });
        Ok(list)
    }
}
