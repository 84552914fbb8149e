//! Bearer token storage.
//!
//! # Design
//! The client never reads a global; it is handed a `CredentialStore` at
//! construction. `MemoryCredentialStore` backs tests and short-lived hosts.
//! `FileCredentialStore` persists the token under the fixed key
//! `solvr_auth_token` in the `key=value` config file the Solvr CLI uses
//! (`~/.solvr/config` unless `SOLVR_CONFIG` points elsewhere). Unrelated keys
//! in that file are preserved.
//!
//! An empty token is treated as no token.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tracing::{debug, warn};

use crate::error::CredentialError;

/// Key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "solvr_auth_token";

/// Overrides the location of the durable credential file.
pub const CONFIG_PATH_ENV: &str = "SOLVR_CONFIG";

/// Read/write access to the single bearer token.
pub trait CredentialStore: Send + Sync {
    fn get_token(&self) -> Option<String>;
    fn set_token(&self, token: &str) -> Result<(), CredentialError>;
    fn clear_token(&self) -> Result<(), CredentialError>;
}

/// Process-local token cell.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(token.to_string())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_token(&self) -> Option<String> {
        let guard = self.token.read().unwrap_or_else(|e| e.into_inner());
        guard.clone().filter(|t| !t.is_empty())
    }

    fn set_token(&self, token: &str) -> Result<(), CredentialError> {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<(), CredentialError> {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        Ok(())
    }
}

/// Token persisted in a `key=value` config file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `$SOLVR_CONFIG`, else `~/.solvr/config`. `None` if no home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".solvr").join("config"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<(String, String)>, CredentialError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CredentialError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(parse_entries(&contents))
    }

    fn save(&self, entries: &[(String, String)]) -> Result<(), CredentialError> {
        let write_err = |source| CredentialError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(write_err)?;
        for (key, value) in entries {
            writeln!(file, "{key}={value}").map_err(write_err)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get_token(&self) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        match self.load() {
            Ok(entries) => entries
                .into_iter()
                .find(|(key, _)| key == TOKEN_KEY)
                .map(|(_, value)| value)
                .filter(|value| !value.is_empty()),
            Err(err) => {
                warn!(error = %err, "credential file unreadable, continuing without a token");
                None
            }
        }
    }

    fn set_token(&self, token: &str) -> Result<(), CredentialError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        match entries.iter_mut().find(|(key, _)| key == TOKEN_KEY) {
            Some(entry) => entry.1 = token.to_string(),
            None => entries.push((TOKEN_KEY.to_string(), token.to_string())),
        }
        self.save(&entries)?;
        debug!(path = %self.path.display(), "stored bearer token");
        Ok(())
    }

    fn clear_token(&self) -> Result<(), CredentialError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|(key, _)| key != TOKEN_KEY);
        if entries.len() != before {
            self.save(&entries)?;
            debug!(path = %self.path.display(), "cleared bearer token");
        }
        Ok(())
    }
}

fn parse_entries(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Mask a token for display, keeping the first six and last four characters.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 10 {
        return "****".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}
