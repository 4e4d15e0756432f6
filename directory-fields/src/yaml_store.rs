//! Settings persisted as YAML, one file per record.
//!
//! ```text
//! settings/
//!   12.yaml   ← every setting of record 12
//!   13.yaml
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::error::Result;
use crate::settings::Settings;
use crate::store::SettingsStore;

/// File-backed [`SettingsStore`].
#[derive(Debug, Clone)]
pub struct YamlSettingsStore {
    root: PathBuf,
}

impl YamlSettingsStore {
    /// Open or create a settings directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "settings store opened");
        Ok(Self { root })
    }

    /// The root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, record_id: u64) -> PathBuf {
        self.root.join(format!("{record_id}.yaml"))
    }

    fn persist(&self, record_id: u64, settings: &Settings) -> Result<()> {
        let yaml = serde_yaml_ng::to_string(settings)?;
        atomic_write(&self.record_path(record_id), yaml.as_bytes())
    }
}

impl SettingsStore for YamlSettingsStore {
    fn read(&self, record_id: u64) -> Result<Settings> {
        let path = self.record_path(record_id);
        if !path.exists() {
            return Ok(Settings::new());
        }
        let content = fs::read_to_string(&path)?;
        match serde_yaml_ng::from_str::<Option<Settings>>(&content) {
            Ok(settings) => Ok(settings.unwrap_or_default()),
            Err(e) => {
                warn!(?path, %e, "skipping invalid settings file");
                Ok(Settings::new())
            }
        }
    }

    fn write(&mut self, record_id: u64, key: &str, value: Value) -> Result<()> {
        let mut settings = self.read(record_id)?;
        settings.insert(key.to_string(), value);
        self.persist(record_id, &settings)
    }

    fn clear(&mut self, record_id: u64) -> Result<()> {
        let path = self.record_path(record_id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Write to a temp file then rename for atomic persistence.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"))?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
