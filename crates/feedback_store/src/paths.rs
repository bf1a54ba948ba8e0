use std::path::{Path, PathBuf};

/// Name of the durable feedback collection.
pub const FEEDBACK_COLLECTION: &str = "error_feedback";
pub const FEEDBACK_FILE: &str = "feedback.json";

#[must_use]
pub fn feedback_path(data_dir: &Path) -> PathBuf {
    data_dir.join(FEEDBACK_FILE)
}

#[must_use]
pub fn sanitize_timestamp_for_filename(timestamp: &str) -> String {
    timestamp
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' | ' ' => '-',
            _ => c,
        })
        .collect()
}

#[must_use]
pub fn export_file_name(created_at: &str) -> String {
    format!(
        "feedback_export_{}.csv",
        sanitize_timestamp_for_filename(created_at)
    )
}
