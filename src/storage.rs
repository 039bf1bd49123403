use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::crypto;
use crate::models::AppData;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("data directory not found")]
    NoDataDir,
}

/// Default location of the encrypted data file, under the platform's
/// per-user data directory.
pub fn default_data_path() -> Result<PathBuf, StorageError> {
    let dir = dirs::data_local_dir()
        .ok_or(StorageError::NoDataDir)?
        .join("lunara");
    fs::create_dir_all(&dir)?;
    Ok(dir.join("data.lunara"))
}

/// Save the full application state, encrypted with the given passphrase.
pub fn save_to(path: &Path, passphrase: &str, data: &AppData) -> Result<(), StorageError> {
    let json = serde_json::to_vec(data)?;
    let sealed = crypto::seal(passphrase, &json)?;
    fs::write(path, &sealed)?;
    debug!(bytes = sealed.len(), "state saved");
    Ok(())
}

/// Load and decrypt the application state.
pub fn load_from(path: &Path, passphrase: &str) -> Result<AppData, StorageError> {
    let sealed = fs::read(path)?;
    let json = crypto::open(passphrase, &sealed)?;
    let data: AppData = serde_json::from_slice(&json)?;
    Ok(data)
}

/// Delete the data file permanently.
pub fn wipe(path: &Path) -> Result<(), StorageError> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Settings, User};
    use uuid::Uuid;

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.lunara");

        let mut data = AppData::default();
        data.users.push(User {
            id: Uuid::new_v4(),
            username: "ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$stub".into(),
        });

        save_to(&path, "passphrase", &data).unwrap();
        let loaded = load_from(&path, "passphrase").unwrap();

        assert_eq!(loaded.users.len(), 1);
        assert_eq!(loaded.users[0].username, "ada");
        assert_eq!(
            loaded.settings.token_ttl_minutes,
            Settings::default().token_ttl_minutes
        );
    }

    #[test]
    fn wrong_passphrase_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.lunara");

        save_to(&path, "correct", &AppData::default()).unwrap();
        assert!(load_from(&path, "wrong").is_err());
    }

    #[test]
    fn wipe_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.lunara");

        save_to(&path, "pass", &AppData::default()).unwrap();
        wipe(&path).unwrap();
        assert!(!path.exists());

        // Wiping a missing file is fine.
        wipe(&path).unwrap();
    }
}
