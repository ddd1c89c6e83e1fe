//! File persistence helpers.
//!
//! Settings carry barrier credentials and the state file carries the
//! shift's takings, so both are written owner-only and replaced atomically.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::StoreError;

const APP_DIR: &str = "parkgate";
const SETTINGS_FILE: &str = "settings.json";
const STATE_FILE: &str = "state.json";

// ============================================================================
// Default Paths
// ============================================================================

/// Directory holding `settings.json`.
///
/// `~/.config/parkgate` on Linux, `~/Library/Application Support/parkgate`
/// on macOS, `%APPDATA%\parkgate` on Windows.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir().map_or_else(|| PathBuf::from("."), |dir| dir.join(APP_DIR))
}

/// Directory holding the shift state.
///
/// `~/.local/share/parkgate` on Linux; the config directory elsewhere.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir().map_or_else(default_config_dir, |dir| dir.join(APP_DIR))
}

/// Default settings file.
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join(SETTINGS_FILE)
}

/// Default shift state file.
pub fn default_state_path() -> PathBuf {
    default_data_dir().join(STATE_FILE)
}

// ============================================================================
// Permissions
// ============================================================================

#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    debug!(path = %path.display(), mode = format!("{mode:o}"), "Restricted permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

/// Creates the parent directory of `path`. A directory created here is
/// owner-only; an existing one is left alone.
async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if tokio::fs::try_exists(parent).await? {
        return Ok(());
    }

    tokio::fs::create_dir_all(parent).await?;
    restrict(parent, 0o700).await
}

// ============================================================================
// File Operations
// ============================================================================

/// Writes `data` as pretty JSON.
///
/// The file is written next to `path` and renamed over it, so a crash never
/// leaves a half-written settings or state file behind.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    ensure_parent(path).await?;

    let json = serde_json::to_vec_pretty(data)?;
    let staging = path.with_extension("json.tmp");
    tokio::fs::write(&staging, &json).await?;
    restrict(&staging, 0o600).await?;
    tokio::fs::rename(&staging, path).await?;

    debug!(path = %path.display(), bytes = json.len(), "Saved");
    Ok(())
}

/// Reads and parses a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = tokio::fs::read(path).await?;
    let data = serde_json::from_slice(&bytes)?;
    debug!(path = %path.display(), "Loaded");
    Ok(data)
}

/// Like [`load_json`], but falls back to `T::default()`.
///
/// A missing file is expected on first run; anything else is logged.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load_json(path).await {
        Ok(data) => data,
        Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable file, using defaults");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert!(default_settings_path().ends_with("parkgate/settings.json"));
        assert!(default_state_path().ends_with("state.json"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("state.json");

        save_json(&path, &serde_json::json!({"shiftProfit": 0})).await.unwrap();

        let file_mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        let dir_mode = tokio::fs::metadata(path.parent().unwrap())
            .await
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
