use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::error::{ConvError, ConvResult};

/// File name of the per-item descriptor
pub const ENTRY_FILE: &str = "entry.json";

/// Fields consumed from an item's `entry.json`; unknown keys are ignored
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntryDescriptor {
    pub media_type: i64,
    pub title: String,
    pub page_data: PageData,
    /// Asset id used to query the metadata API
    pub avid: i64,
    /// Uploader id, when the client recorded it
    #[serde(default)]
    pub owner_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageData {
    pub page: i64,
}

impl EntryDescriptor {
    pub fn parse(path: &Path) -> ConvResult<Self> {
        let parse_error = |reason: String| ConvError::EntryParse {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| parse_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))
    }

    pub fn page(&self) -> i64 {
        self.page_data.page
    }

    /// Title with a `-p{page}` suffix for every page but the first
    pub fn display_title(&self) -> String {
        if self.page() == 1 {
            self.title.clone()
        } else {
            format!("{}-p{}", self.title, self.page())
        }
    }
}

/// Resolved metadata for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub media_type: i64,
    pub title: String,
    pub owner_name: String,
    /// Empty until the scanner places the item
    pub output_path: PathBuf,
}
