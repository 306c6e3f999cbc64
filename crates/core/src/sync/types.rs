use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::store::ResumeState;

/// Kind of remote request the controller issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    CatalogPage,
    Details,
    Image,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::CatalogPage => "catalog_page",
            SyncOperation::Details => "details",
            SyncOperation::Image => "image",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable outcomes of sync work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A catalog page was merged and the resume state advanced.
    PageSaved {
        url: String,
        created: usize,
        next_url: Option<String>,
    },
    /// The last catalog page was merged.
    CatalogComplete,
    /// A record was enriched from its detail resource.
    DetailsSaved { name: String },
    /// A record's image bytes were stored.
    ImageSaved { name: String },
    /// All records and the resume state were cleared.
    Reset,
    /// A request or its follow-up merge failed.
    RequestFailed {
        url: String,
        operation: SyncOperation,
        error: String,
    },
}

/// Snapshot of the controller's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub resume: ResumeState,
    pub pending_requests: usize,
    pub pending_catalog_pages: usize,
    pub pending_details: usize,
    pub pending_images: usize,
}

/// Settings the controller needs at construction.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Where pagination starts when nothing has been downloaded.
    pub first_page_url: Url,
    /// Capacity of the controller channel.
    pub channel_buffer: usize,
}

impl SyncOptions {
    pub fn new(first_page_url: Url) -> Self {
        Self {
            first_page_url,
            channel_buffer: 256,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            first_page_url: config.api.first_page_url()?,
            channel_buffer: config.sync.channel_buffer.max(1),
        })
    }
}
