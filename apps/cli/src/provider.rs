use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use autoclaim_core::assessment::{DamageAnalysisProvider, ImagePayload};
use autoclaim_core::{Error, Result};

/// Analysis provider that replays a recorded response from disk.
pub struct FileAnalysisProvider {
    response_path: PathBuf,
}

impl FileAnalysisProvider {
    pub fn new(response_path: impl Into<PathBuf>) -> Self {
        Self {
            response_path: response_path.into(),
        }
    }
}

#[async_trait]
impl DamageAnalysisProvider for FileAnalysisProvider {
    async fn analyze(&self, image: &ImagePayload) -> Result<Value> {
        tracing::debug!(
            "Replaying {} for a {} byte {} image",
            self.response_path.display(),
            image.bytes.len(),
            image.mime_type
        );
        let raw = tokio::fs::read_to_string(&self.response_path)
            .await
            .map_err(|e| {
                Error::AnalysisProvider(format!(
                    "Cannot read {}: {}",
                    self.response_path.display(),
                    e
                ))
            })?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::AnalysisProvider(format!("Response is not JSON: {}", e)))
    }
}
