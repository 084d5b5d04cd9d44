use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use fitlog_core::models::Identity;

pub struct Config {
    pub state_db_path: PathBuf,
    pub server_db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "fitlog").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            state_db_path: data_dir.join("state.db"),
            server_db_path: data_dir.join("remote.db"),
            data_dir,
        })
    }

    // --- Sync backend ---

    /// Base URL of the sync backend. `FITLOG_REMOTE_URL` overrides the
    /// saved value; `None` means sync is not configured and the app runs
    /// local-only.
    #[must_use]
    pub fn remote_url(&self) -> Option<String> {
        if let Ok(url) = std::env::var("FITLOG_REMOTE_URL") {
            let url = url.trim().to_string();
            if !url.is_empty() {
                return Some(url);
            }
        }
        let saved = std::fs::read_to_string(self.data_dir.join("remote_url")).ok()?;
        let saved = saved.trim();
        if saved.is_empty() {
            None
        } else {
            Some(saved.to_string())
        }
    }

    pub fn set_remote_url(&self, url: &str) -> Result<()> {
        std::fs::write(self.data_dir.join("remote_url"), url.trim())
            .context("Failed to write remote URL")
    }

    /// API key the client presents to the sync backend. Falls back to the
    /// locally generated server key so a same-machine client just works.
    #[must_use]
    pub fn remote_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var("FITLOG_API_KEY") {
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Some(key);
            }
        }
        let key = std::fs::read_to_string(self.data_dir.join("api_key")).ok()?;
        let key = key.trim();
        if key.is_empty() { None } else { Some(key.to_string()) }
    }

    /// Load the server API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
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
        Ok((key, true))
    }

    // --- Login session ---

    #[must_use]
    pub fn session(&self) -> Option<Identity> {
        let json = std::fs::read_to_string(self.data_dir.join("session.json")).ok()?;
        serde_json::from_str(&json).ok()
    }

    pub fn save_session(&self, identity: &Identity) -> Result<()> {
        let json = serde_json::to_string_pretty(identity)?;
        std::fs::write(self.data_dir.join("session.json"), json)
            .context("Failed to write session file")
    }

    /// Returns true when a session existed and was removed.
    pub fn clear_session(&self) -> Result<bool> {
        let path = self.data_dir.join("session.json");
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // --- Trainer chat backend ---

    #[must_use]
    pub fn chat_api_key(&self) -> Option<String> {
        for var in ["FITLOG_CHAT_API_KEY", "OPENAI_API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                let key = key.trim().to_string();
                if !key.is_empty() {
                    return Some(key);
                }
            }
        }
        None
    }

    #[must_use]
    pub fn chat_base_url(&self) -> String {
        std::env::var("FITLOG_CHAT_URL")
            .ok()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
    }

    #[must_use]
    pub fn chat_model(&self) -> String {
        std::env::var("FITLOG_CHAT_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "gpt-4o-mini".to_string())
    }
}
