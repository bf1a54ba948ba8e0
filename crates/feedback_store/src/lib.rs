mod backend;
mod error;
mod export;
mod paths;
mod schema;
mod store;

pub use backend::{FeedbackBackend, JsonFileBackend, MemoryBackend};
pub use error::FeedbackStoreError;
pub use export::{
    export_records, header_for, parse_table, records_from_table, FeedbackExport, FIXED_COLUMNS,
};
pub use paths::{export_file_name, feedback_path, FEEDBACK_COLLECTION, FEEDBACK_FILE};
pub use schema::{now_rfc3339, FeedbackRecord, FEEDBACK_SCHEMA_VERSION};
pub use store::FeedbackStore;
