use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::models::candidate::{CandidateProfile, InterviewRecord};
use crate::models::transcript::Message;
use crate::storage::{BlobStore, StorageError};

pub const DEFAULT_EXPORT_PREFIX: &str = "interview_log";

/// Where an exported record ended up, e.g. `s3://bucket/interview_log_20250101_120000.json`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct StorageLocator(pub String);

impl fmt::Display for StorageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Writes one JSON record per finished interview to the blob store.
#[derive(Clone)]
pub struct TranscriptExporter {
    store: Arc<dyn BlobStore>,
    bucket: String,
    prefix: String,
}

impl TranscriptExporter {
    pub fn new(store: Arc<dyn BlobStore>, bucket: String, prefix: String) -> Self {
        Self {
            store,
            bucket,
            prefix,
        }
    }

    pub async fn export(
        &self,
        profile: &CandidateProfile,
        transcript: &[Message],
    ) -> Result<StorageLocator, StorageError> {
        let record = InterviewRecord::new(profile, transcript);
        let json_blob = serde_json::to_string_pretty(&record)?;
        let name = object_name(&self.prefix, Utc::now());

        info!(
            "Exporting interview record ({} messages) as {}",
            transcript.len(),
            name
        );
        let locator = self.store.upload(&self.bucket, json_blob, &name).await?;
        Ok(StorageLocator(locator))
    }
}

/// `{prefix}_{YYYYmmdd_HHMMSS}.json`. Second resolution: two exports within the
/// same second share a name.
pub fn object_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.json", prefix, at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;

    /// Records every upload in memory; optionally fails all of them.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub uploads: Mutex<Vec<(String, String, String)>>,
        pub fail: bool,
    }

    impl MemoryStore {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub(crate) fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl BlobStore for MemoryStore {
        async fn upload(
            &self,
            bucket: &str,
            json_blob: String,
            object_name: &str,
        ) -> Result<String, StorageError> {
            if self.fail {
                return Err(StorageError::Upload("access denied".to_string()));
            }
            self.uploads.lock().unwrap().push((
                bucket.to_string(),
                json_blob,
                object_name.to_string(),
            ));
            Ok(crate::storage::s3_locator(bucket, object_name))
        }
    }

    fn profile() -> CandidateProfile {
        CandidateProfile {
            full_name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "555-0100".to_string(),
            experience: 4,
            desired_positions: "ML Engineer".to_string(),
            location: "Paris".to_string(),
            tech_stack: vec!["Python".to_string(), "PyTorch".to_string()],
        }
    }

    #[test]
    fn test_object_name_uses_second_resolution_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            object_name("interview_log", at),
            "interview_log_20250309_140507.json"
        );
    }

    #[tokio::test]
    async fn test_export_uploads_record_json() {
        let store = Arc::new(MemoryStore::default());
        let exporter = TranscriptExporter::new(
            store.clone(),
            "interview-logs".to_string(),
            DEFAULT_EXPORT_PREFIX.to_string(),
        );
        let transcript = vec![
            Message::system("rules"),
            Message::assistant("What is a tensor?"),
            Message::user("exit"),
        ];

        let locator = exporter.export(&profile(), &transcript).await.unwrap();

        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        let (bucket, blob, name) = &uploads[0];
        assert_eq!(bucket, "interview-logs");
        assert!(name.starts_with("interview_log_") && name.ends_with(".json"));
        assert_eq!(locator.0, format!("s3://interview-logs/{name}"));

        let json: serde_json::Value = serde_json::from_str(blob).unwrap();
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["experience"], 4);
        assert_eq!(json["tech_stack"][1], "PyTorch");
        assert_eq!(json["interview_log"].as_array().unwrap().len(), 3);
        assert_eq!(json["interview_log"][2]["role"], "user");
        assert_eq!(json["interview_log"][2]["content"], "exit");
    }

    #[tokio::test]
    async fn test_export_surfaces_upload_failure() {
        let exporter = TranscriptExporter::new(
            Arc::new(MemoryStore::failing()),
            "interview-logs".to_string(),
            DEFAULT_EXPORT_PREFIX.to_string(),
        );
        let err = exporter.export(&profile(), &[]).await.unwrap_err();
        assert!(matches!(err, StorageError::Upload(_)));
    }
}
