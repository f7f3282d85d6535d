//! Plain-text view file reader/writer.
//!
//! The view file format is one rule per line, as it appears in a client
//! specification:
//!
//! ```text
//! # comments and blank lines are ignored
//! //depot/main/... //ws/main/...
//! -//depot/main/tmp/... //ws/main/tmp/...
//! "//depot/main/my docs/..." "//ws/main/my docs/..."
//! ```

use std::path::Path;

use tracing::{debug, info};

use super::mapper::PathMapper;
use crate::errors::MapError;

/// Utilities for loading and saving view files.
pub struct ViewFile;

impl ViewFile {
    /// Load a view file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<PathMapper, MapError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading view file");

        if !path.exists() {
            return Err(MapError::ViewFileError {
                path: path.display().to_string(),
                detail: "file not found".into(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let mapper = Self::parse(&contents).map_err(|e| MapError::ViewFileError {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        debug!(count = mapper.count(), "loaded view rules");
        Ok(mapper)
    }

    /// Parse view file contents.
    pub fn parse(contents: &str) -> Result<PathMapper, MapError> {
        PathMapper::from_lines(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Save a mapper to disk, one rendered rule per line.
    pub fn save<P: AsRef<Path>>(path: P, mapper: &PathMapper) -> Result<(), MapError> {
        let path = path.as_ref();
        info!(path = %path.display(), "saving view file");

        let mut contents = mapper.to_lines().join("\n");
        contents.push('\n');
        std::fs::write(path, contents)?;

        debug!(count = mapper.count(), "saved view rules");
        Ok(())
    }
}
