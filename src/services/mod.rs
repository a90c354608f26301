pub mod license_store;
pub mod mongo_store;
pub mod validation;

pub use license_store::{LicenseAdmin, LicenseRegistration, LicenseStore, MemoryLicenseStore};
pub use mongo_store::{LicenseDocument, MongoLicenseStore};
pub use validation::{IssuedLicense, LicenseValidator};
