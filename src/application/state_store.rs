use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use compio::fs;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::filesystem::{SnapshotError, TreeSnapshot};

/// Host tree state persisted between runs as a compressed snapshot.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the saved snapshot. A missing file is not an error.
    pub async fn load(&self) -> Result<Option<TreeSnapshot>, StateStoreError> {
        let file_path = self.path.display().to_string();
        debug!("Reading state from {}", file_path);

        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("No saved state at {}, starting fresh", file_path);
                return Ok(None);
            }
            Err(error) => return Err(error).context(ReadSnafu { file_path }),
        };

        let snapshot = TreeSnapshot::decode(&bytes).context(DecodeSnafu { file_path })?;
        Ok(Some(snapshot))
    }

    pub async fn save(&self, snapshot: &TreeSnapshot) -> Result<(), StateStoreError> {
        let file_path = self.path.display().to_string();
        let bytes = snapshot.encode().context(EncodeSnafu)?;

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.context(WriteSnafu {
                file_path: &file_path,
            })?;
        }

        let size = bytes.len();
        fs::write(&self.path, bytes).await.0.context(WriteSnafu {
            file_path: &file_path,
        })?;
        info!("Saved state to {} ({} bytes)", file_path, size);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum StateStoreError {
    #[snafu(display("Failed to read the state file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("State file {} is corrupted", file_path))]
    DecodeError {
        file_path: String,
        source: SnapshotError,
    },
    #[snafu(display("Failed to encode the current state"))]
    EncodeError { source: SnapshotError },
    #[snafu(display("Failed to write the state file: {}", file_path))]
    WriteError {
        file_path: String,
        source: std::io::Error,
    },
}
