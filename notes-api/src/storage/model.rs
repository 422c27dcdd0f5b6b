use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage key of an uploaded blob.
pub type StorageId = Uuid;

/// One-time destination for a blob upload.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UploadTarget {
    pub token: String,
    pub upload_url: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug)]
pub struct Upload {
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UploadResponse {
    pub storage_id: StorageId,
}

#[derive(Debug)]
pub struct Blob {
    pub content_type: String,
    pub data: Vec<u8>,
}
