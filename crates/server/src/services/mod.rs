//! Business logic services.
//!
//! # Services
//!
//! - `places` - Geoapify places search and geocoding client
//! - `ingestion` - Paged places ingestion with `place_id` de-duplication
//! - `outreach` - Email delivery via SMTP or Brevo, with history logging
//! - `storage` - Attachment uploads to S3 (`SigV4`) or the upload API
//! - `export` - `.xlsx` export of the client list

pub mod export;
pub mod ingestion;
pub mod outreach;
pub mod places;
pub mod storage;

pub use export::{ExportError, XLSX_CONTENT_TYPE, clients_workbook, export_filename};
pub use ingestion::{
    CategoryStats, IngestionOptions, IngestionReport, IngestionSummary, PlaceSource, PlaceStore,
    SeedLocation,
};
pub use outreach::{OutgoingEmail, OutreachError, OutreachService, SendOutcome};
pub use places::{GeoapifyClient, GeocodeResult, PlacesError};
pub use storage::{S3Uploader, StorageError, StoredFile, UploadApiClient, UploadFile};
