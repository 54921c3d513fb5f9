//! JSON profile store, one file per keyboard serial

use std::io::Write;
use std::path::{Path, PathBuf};

use k65_keyboard::{DeviceProfile, KeyboardError, ProfileStore};
use tracing::debug;

pub struct JsonProfileStore {
    dir: PathBuf,
}

impl JsonProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, serial: &str) -> PathBuf {
        let name: String = serial
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl ProfileStore for JsonProfileStore {
    fn load(&self, serial: &str) -> Result<Option<DeviceProfile>, KeyboardError> {
        let path = self.path_for(serial);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(profile_error(&path, e)),
        };
        let profile = serde_json::from_str(&content).map_err(|e| profile_error(&path, e))?;
        debug!("Loaded profile {}", path.display());
        Ok(Some(profile))
    }

    fn save(&self, profile: &DeviceProfile) -> Result<(), KeyboardError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| profile_error(&self.dir, e))?;
        let path = self.path_for(&profile.serial);
        let content =
            serde_json::to_string_pretty(profile).map_err(|e| profile_error(&path, e))?;
        // Each save gets its own temp file; rename never exposes a partial profile
        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| profile_error(&self.dir, e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| profile_error(tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| profile_error(&path, e.error))?;
        debug!("Saved profile {}", path.display());
        Ok(())
    }
}

fn profile_error(path: &Path, e: impl std::fmt::Display) -> KeyboardError {
    KeyboardError::Profile(format!("{}: {}", path.display(), e))
}
