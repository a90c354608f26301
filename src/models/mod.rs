pub mod license;

pub use license::{
    CompanyProfile, LicenseListItem, LicenseListResponse, LicenseRecord, LicenseStats,
    RegisterLicenseRequest, RegisterLicenseResponse, RevokeLicenseRequest,
    RevokeLicenseResponse, ValidateErrorResponse, ValidateRequest, ValidateResponse,
    DEFAULT_FEATURES,
};
