//! Filesystem storage for login credentials.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use assetpack_core::error::{Error, StorageError};
use assetpack_core::traits::CredentialStore;
use assetpack_core::types::Flavor;
use assetpack_core::{AccessToken, Credential, RefreshToken, Result};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Current on-disk format version.
const FORMAT_VERSION: u32 = 1;

fn map_io(path: &Path, err: std::io::Error) -> Error {
    Error::Storage(StorageError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

fn corrupt(path: &Path, message: impl Into<String>) -> Error {
    Error::Storage(StorageError::Corrupt {
        path: path.display().to_string(),
        message: message.into(),
    })
}

/// Stored credential data.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCredential {
    version: u32,
    flavor: String,
    access_token: String,
    refresh_token: String,
    access_expiry: DateTime<Utc>,
    saved_at: DateTime<Utc>,
}

/// Credential store keeping one JSON file per flavor.
///
/// Files are named `credentials.<flavor>.json`. Writes go to a temporary
/// file that is renamed over the old one while holding an exclusive lock,
/// so a concurrent reader never sees a half-written token pair.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    root: PathBuf,
}

impl FileCredentialStore {
    /// Create a new store in the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the credential file path for a flavor.
    pub fn credential_path(&self, flavor: &Flavor) -> PathBuf {
        self.root.join(format!("credentials.{}.json", flavor))
    }

    fn lock_path(&self, flavor: &Flavor) -> PathBuf {
        self.root.join(format!("credentials.{}.lock", flavor))
    }

    /// Run `f` while holding the flavor's exclusive lock file.
    fn with_lock<T>(&self, flavor: &Flavor, f: impl FnOnce() -> Result<T>) -> Result<T> {
        fs::create_dir_all(&self.root).map_err(|e| map_io(&self.root, e))?;

        let lock_path = self.lock_path(flavor);
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| map_io(&lock_path, e))?;

        lock_file.lock_exclusive().map_err(|e| map_io(&lock_path, e))?;
        let result = f();
        lock_file.unlock().map_err(|e| map_io(&lock_path, e))?;

        result
    }

    fn write_atomically(&self, path: &Path, content: &str) -> Result<()> {
        let tmp_path = self
            .root
            .join(format!(".credentials.{}.tmp", Uuid::new_v4().simple()));

        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)
            .map_err(|e| map_io(&tmp_path, e))?;

        // Set restrictive permissions before any secret is written (Unix only)
        #[cfg(unix)]
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))
            .map_err(|e| map_io(&tmp_path, e))?;

        let written = file
            .write_all(content.as_bytes())
            .and_then(|_| file.sync_all());
        drop(file);

        if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(map_io(path, e));
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, flavor: &Flavor) -> Result<Option<Credential>> {
        let path = self.credential_path(flavor);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(map_io(&path, e)),
        };

        let stored: StoredCredential =
            serde_json::from_str(&content).map_err(|e| corrupt(&path, e.to_string()))?;

        if stored.version != FORMAT_VERSION {
            return Err(corrupt(
                &path,
                format!("unsupported format version {}", stored.version),
            ));
        }

        if stored.flavor != flavor.as_str() {
            return Err(corrupt(
                &path,
                format!("file belongs to flavor '{}'", stored.flavor),
            ));
        }

        let credential = Credential::new(
            AccessToken::new(stored.access_token),
            RefreshToken::new(stored.refresh_token),
            stored.access_expiry,
        )
        .map_err(|e| corrupt(&path, e.to_string()))?;

        Ok(Some(credential))
    }

    #[instrument(skip_all, fields(%flavor))]
    fn save(&self, flavor: &Flavor, credential: &Credential) -> Result<()> {
        let path = self.credential_path(flavor);

        let stored = StoredCredential {
            version: FORMAT_VERSION,
            flavor: flavor.to_string(),
            access_token: credential.access_token().as_str().to_string(),
            refresh_token: credential.refresh_token().as_str().to_string(),
            access_expiry: credential.access_expiry(),
            saved_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&stored)
            .map_err(|e| corrupt(&path, e.to_string()))?;

        self.with_lock(flavor, || self.write_atomically(&path, &content))?;

        debug!(path = %path.display(), "Saved credential");
        Ok(())
    }

    #[instrument(skip_all, fields(%flavor))]
    fn clear(&self, flavor: &Flavor) -> Result<()> {
        let path = self.credential_path(flavor);

        self.with_lock(flavor, || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io(&path, e)),
        })?;

        debug!(path = %path.display(), "Cleared credential");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    fn temp_store() -> (TempDir, FileCredentialStore) {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path());
        (dir, store)
    }

    fn credential(access: &str, refresh: &str) -> Credential {
        Credential::new(
            AccessToken::new(access),
            RefreshToken::new(refresh),
            Utc::now() + Duration::minutes(50),
        )
        .unwrap()
    }

    #[test]
    fn missing_file_means_logged_out() {
        let (_dir, store) = temp_store();
        assert!(store.load(&Flavor::prod()).unwrap().is_none());
    }

    #[test]
    fn credential_round_trip_works() {
        let (_dir, store) = temp_store();
        let original = credential("access-1", "refresh-1");
        store.save(&Flavor::prod(), &original).unwrap();

        let loaded = store.load(&Flavor::prod()).unwrap().unwrap();
        assert_eq!(loaded.access_token().as_str(), "access-1");
        assert_eq!(loaded.refresh_token().as_str(), "refresh-1");
        assert_eq!(loaded.access_expiry(), original.access_expiry());
    }

    #[test]
    fn flavors_use_separate_files() {
        let (_dir, store) = temp_store();
        let staging = Flavor::new("staging").unwrap();
        store.save(&staging, &credential("a", "r")).unwrap();

        assert!(store.credential_path(&staging).exists());
        assert!(!store.credential_path(&Flavor::prod()).exists());
        assert!(store.load(&Flavor::prod()).unwrap().is_none());
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let (dir, store) = temp_store();
        store.save(&Flavor::prod(), &credential("a1", "r1")).unwrap();
        store.save(&Flavor::prod(), &credential("a2", "r2")).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let loaded = store.load(&Flavor::prod()).unwrap().unwrap();
        assert_eq!(loaded.refresh_token().as_str(), "r2");
    }

    #[test]
    fn clear_is_idempotent() {
        let (_dir, store) = temp_store();
        store.save(&Flavor::prod(), &credential("a", "r")).unwrap();
        store.clear(&Flavor::prod()).unwrap();
        store.clear(&Flavor::prod()).unwrap();
        assert!(store.load(&Flavor::prod()).unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let (_dir, store) = temp_store();
        fs::write(store.credential_path(&Flavor::prod()), "{not json").unwrap();

        let err = store.load(&Flavor::prod()).unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::Corrupt { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn credential_file_is_private() {
        let (_dir, store) = temp_store();
        store.save(&Flavor::prod(), &credential("a", "r")).unwrap();

        let mode = fs::metadata(store.credential_path(&Flavor::prod()))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
