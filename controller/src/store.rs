use std::{io::ErrorKind, path::PathBuf};

use thermostat_common::{PersistedSettings, PersistenceError};

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// A missing file yields the defaults; anything unreadable, malformed or out
    /// of range is an error for the caller to decide on.
    pub async fn load(&self) -> Result<PersistedSettings, PersistenceError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(PersistedSettings::default())
            }
            Err(err) => return Err(err.into()),
        };

        let settings: PersistedSettings = serde_json::from_slice(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn save(&self, settings: &PersistedSettings) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(settings)?;
        tokio::fs::write(&self.path, payload).await?;
        Ok(())
    }
}
