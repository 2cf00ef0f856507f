use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub db_path: PathBuf,
    pub session_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(dir) = std::env::var_os("WEIGHLOG_DATA_DIR") {
            return Self::at(PathBuf::from(dir));
        }
        let proj_dirs =
            ProjectDirs::from("", "", "weighlog").context("Could not determine home directory")?;
        Self::at(proj_dirs.data_dir().to_path_buf())
    }

    pub fn at(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join("weighlog.db"),
            session_path: data_dir.join("session.json"),
            data_dir,
        })
    }

    /// Load the API key from disk, or generate a new one.
    pub fn load_or_create_api_key(&self) -> Result<String> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok(key);
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        eprintln!("Generated new API key: {key}");
        eprintln!("Include in requests: Authorization: Bearer {key}");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::at(dir.path().join("nested")).unwrap();
        assert!(config.data_dir.is_dir());
        assert_eq!(config.db_path, config.data_dir.join("weighlog.db"));
        assert_eq!(config.session_path, config.data_dir.join("session.json"));
    }

    #[test]
    fn test_api_key_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::at(dir.path().to_path_buf()).unwrap();
        let first = config.load_or_create_api_key().unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(config.load_or_create_api_key().unwrap(), first);
    }
}
