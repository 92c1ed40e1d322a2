use std::path::PathBuf;

use crate::error::ProvisionerError;
use crate::state::ProvisionerState;

/// State persistence on local disk.
pub struct StatePersistence {
    pub local_path: PathBuf,
}

impl StatePersistence {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
        }
    }

    /// Atomic write: serialize to a sibling tmp file, then rename over the
    /// real one.
    pub async fn flush(&self, state: &ProvisionerState) -> Result<(), ProvisionerError> {
        let json = serde_json::to_vec_pretty(state)?;
        if let Some(parent) = self.local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp_path = self.local_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &self.local_path).await?;

        tracing::debug!(
            path = %self.local_path.display(),
            resources = state.resources.len(),
            "state flushed"
        );
        Ok(())
    }

    /// Load state, or a fresh one when the file does not exist yet.
    pub async fn load(&self) -> Result<ProvisionerState, ProvisionerError> {
        match tokio::fs::read(&self.local_path).await {
            Ok(json) => {
                let state: ProvisionerState = serde_json::from_slice(&json).map_err(|e| {
                    ProvisionerError::State(format!("{}: {e}", self.local_path.display()))
                })?;
                tracing::debug!(path = %self.local_path.display(), "state loaded");
                Ok(state)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no existing state found, starting fresh");
                Ok(ProvisionerState::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}
