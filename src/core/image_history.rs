use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::store::{data_dir, read_json_file, write_json_file, StoreError};

const HISTORY_LIMIT: usize = 20;

/// One past generation. Only the prompt and where the result landed are
/// kept; base64 payloads are never written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub prompt: String,
    pub model: Option<String>,
    /// Local file the decoded image was saved to, when the backend returned
    /// inline data.
    pub path: Option<String>,
    /// Remote URL, when the backend returned one instead.
    pub url: Option<String>,
    pub timestamp: String,
}

/// Rolling log of the last twenty image generations.
pub struct ImageHistory {
    path: PathBuf,
}

impl ImageHistory {
    pub fn new() -> Self {
        Self {
            path: data_dir().join("image_history.json"),
        }
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load_all(&self) -> Result<Vec<ImageRecord>, StoreError> {
        read_json_file(&self.path)
    }

    pub fn record(
        &self,
        prompt: &str,
        model: Option<&str>,
        path: Option<String>,
        url: Option<String>,
    ) -> Result<(), StoreError> {
        let mut records = self.load_all()?;
        records.insert(
            0,
            ImageRecord {
                prompt: prompt.to_string(),
                model: model.map(str::to_string),
                path,
                url,
                timestamp: Utc::now().to_rfc3339(),
            },
        );
        records.truncate(HISTORY_LIMIT);
        write_json_file(&self.path, &records)
    }
}

impl Default for ImageHistory {
    fn default() -> Self {
        Self::new()
    }
}
