//! Local file payload fetcher.

use super::PayloadFetcher;
use crate::error::FetchError;
use std::fs;
use std::path::{Path, PathBuf};

/// Default cap on payload size (20 MiB)
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Reads payloads from `file://` urls or plain paths
///
/// Relative paths are resolved against `base_dir`. Remote schemes are
/// rejected as unsupported.
pub struct FilePayloadFetcher {
    base_dir: PathBuf,
    max_bytes: u64,
}

impl FilePayloadFetcher {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// Override the payload size cap
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        let raw = match url.split_once("://") {
            Some(("file", rest)) => rest,
            Some(_) => {
                return Err(FetchError::UnsupportedUrl {
                    url: url.to_string(),
                })
            }
            None => url,
        };

        let path = Path::new(raw);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.base_dir.join(path))
        }
    }
}

impl PayloadFetcher for FilePayloadFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(url)?;

        let size = fs::metadata(&path)
            .map_err(|source| FetchError::Io {
                path: path.clone(),
                source,
            })?
            .len();
        if size > self.max_bytes {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                size,
                limit: self.max_bytes,
            });
        }

        fs::read(&path).map_err(|source| FetchError::Io { path, source })
    }
}
