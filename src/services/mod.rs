pub mod catalog_service;
pub mod directory_service;
pub mod quota;
pub mod registration_service;
pub mod verification;

pub use catalog_service::{CatalogService, CategoryMap};
pub use directory_service::{DirectoryService, RecordsResponse};
pub use quota::{QuotaGate, UnlimitedQuota, WindowedQuota};
pub use registration_service::{RegistrationGate, RegistrationOutcome, RejectionReason};
pub use verification::{SimulatedVerifier, VerificationProvider, VerificationTicket};
