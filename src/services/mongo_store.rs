/// MongoDB-backed license store
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, DateTime};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{CompanyProfile, LicenseRecord};
use crate::services::license_store::{LicenseAdmin, LicenseRegistration, LicenseStore};

pub const LICENSES_COLLECTION: &str = "licenses";

/// Stored shape of a license; dates are BSON datetimes so they sort by instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseDocument {
    pub hardware_id: String,
    #[serde(default)]
    pub company_profile: CompanyProfile,
    #[serde(default)]
    pub expiration_date: Option<DateTime>,
    #[serde(default)]
    pub features: Vec<String>,
    pub active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

fn to_bson_datetime(value: &chrono::DateTime<Utc>) -> DateTime {
    DateTime::from_millis(value.timestamp_millis())
}

fn to_chrono(value: DateTime) -> Result<chrono::DateTime<Utc>, StoreError> {
    chrono::DateTime::<Utc>::from_timestamp_millis(value.timestamp_millis())
        .ok_or_else(|| StoreError::Corrupt(format!("date out of range: {}", value)))
}

impl From<&LicenseRecord> for LicenseDocument {
    fn from(record: &LicenseRecord) -> Self {
        Self {
            hardware_id: record.hardware_id.clone(),
            company_profile: record.company_profile.clone(),
            expiration_date: record.expiration_date.as_ref().map(to_bson_datetime),
            features: record.features.clone(),
            active: record.active,
            created_at: to_bson_datetime(&record.created_at),
            updated_at: to_bson_datetime(&record.updated_at),
        }
    }
}

impl TryFrom<LicenseDocument> for LicenseRecord {
    type Error = StoreError;

    fn try_from(document: LicenseDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            hardware_id: document.hardware_id,
            company_profile: document.company_profile,
            expiration_date: document.expiration_date.map(to_chrono).transpose()?,
            features: document.features,
            active: document.active,
            created_at: to_chrono(document.created_at)?,
            updated_at: to_chrono(document.updated_at)?,
        })
    }
}

#[derive(Clone)]
pub struct MongoLicenseStore {
    collection: Collection<LicenseDocument>,
}

impl MongoLicenseStore {
    /// Bind to the licenses collection and ensure `hardware_id` is unique
    pub async fn new(db: &Database) -> Result<Self, StoreError> {
        let collection = db.collection::<LicenseDocument>(LICENSES_COLLECTION);

        let index = IndexModel::builder()
            .keys(doc! { "hardware_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        collection.create_index(index).await?;

        Ok(Self { collection })
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<mongodb::bson::Bson, StoreError> {
    to_bson(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

#[async_trait]
impl LicenseStore for MongoLicenseStore {
    async fn lookup(&self, hardware_id: &str) -> Result<Option<LicenseRecord>, StoreError> {
        self.collection
            .find_one(doc! { "hardware_id": hardware_id })
            .await?
            .map(LicenseRecord::try_from)
            .transpose()
    }
}

#[async_trait]
impl LicenseAdmin for MongoLicenseStore {
    async fn register(&self, registration: LicenseRegistration) -> Result<LicenseRecord, StoreError> {
        let now = to_bson_datetime(&Utc::now());
        let expiration = registration.expiration_date.as_ref().map(to_bson_datetime);

        self.collection
            .update_one(
                doc! { "hardware_id": &registration.hardware_id },
                doc! {
                    "$set": {
                        "company_profile": encode(&registration.company_profile)?,
                        "expiration_date": expiration,
                        "features": encode(&registration.features)?,
                        "active": true,
                        "updated_at": now,
                    },
                    "$setOnInsert": {
                        "created_at": now,
                    },
                },
            )
            .upsert(true)
            .await?;

        self.lookup(&registration.hardware_id)
            .await?
            .ok_or_else(|| StoreError::Unavailable("upserted license not readable".to_string()))
    }

    async fn deactivate(&self, hardware_id: &str) -> Result<bool, StoreError> {
        let result = self
            .collection
            .update_one(
                doc! { "hardware_id": hardware_id },
                doc! {
                    "$set": {
                        "active": false,
                        "updated_at": to_bson_datetime(&Utc::now()),
                    }
                },
            )
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn list(&self) -> Result<Vec<LicenseRecord>, StoreError> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "created_at": -1, "hardware_id": 1 })
            .await?;

        let documents: Vec<LicenseDocument> = cursor.try_collect().await?;
        documents.into_iter().map(LicenseRecord::try_from).collect()
    }
}
