//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for a scan.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root paths to scan, visited in input order, each fully before the next.
    pub roots: Vec<PathBuf>,

    /// Reserved recursion policy switch. Scans are always fully recursive.
    #[builder(default = "false")]
    #[serde(default)]
    pub deep: bool,

    /// Number of encoded records buffered between producer and consumer.
    #[builder(default = "64")]
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Publish a progress snapshot every this many files.
    #[builder(default = "256")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,

    /// Threads used to classify directory entries (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,
}

fn default_channel_capacity() -> usize {
    64
}

fn default_progress_interval() -> u64 {
    256
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.roots {
            Some(ref roots) if roots.is_empty() => {
                return Err("At least one root path is required".to_string());
            }
            None => return Err("Root paths are required".to_string()),
            _ => {}
        }
        if self.channel_capacity == Some(0) {
            return Err("Channel capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config scanning the given roots.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            deep: false,
            channel_capacity: default_channel_capacity(),
            progress_interval: default_progress_interval(),
            threads: 0,
        }
    }
}

impl From<ScanRequest> for ScanConfig {
    fn from(request: ScanRequest) -> Self {
        let mut config = Self::new(request.root_paths);
        config.deep = request.deep;
        config
    }
}

/// Scan request as received from the UI layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default)]
    pub root_paths: Vec<String>,
    #[serde(default)]
    pub deep: bool,
}
