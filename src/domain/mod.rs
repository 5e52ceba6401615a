pub mod compliance;
pub mod platform;
pub mod product;
pub mod settings;
pub mod stats;

pub use compliance::{ComplianceReport, Issue, IssueDetail, ListingVerdict, COMPLIANCE_THRESHOLD};
pub use platform::Platform;
pub use product::{ListingProduct, ScrapedProduct};
pub use settings::ExtensionSettings;
pub use stats::{ProductStats, StoredScanRecord};
