//! Per-user settings file holding the two service base URLs.
//!
//! The file is a flat JSON object. Keys other than `auth_base` and
//! `books_base` are kept as they are and written back on save, so other
//! tools can share the file.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const DEFAULT_AUTH_BASE: &str = "http://127.0.0.1:5001";
pub const DEFAULT_BOOKS_BASE: &str = "http://127.0.0.1:5000";

const AUTH_BASE_KEY: &str = "auth_base";
const BOOKS_BASE_KEY: &str = "books_base";
const FILE_NAME: &str = ".bookdesk_config.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub auth_base: String,
    pub books_base: String,
    /// Keys this program does not know about, in file order.
    extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            books_base: DEFAULT_BOOKS_BASE.to_string(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Merge a persisted document over the defaults. Known keys whose value
    /// is not a string fall back to the default.
    pub fn from_document(mut document: Map<String, Value>) -> Self {
        let mut settings = Settings::default();
        if let Some(Value::String(url)) = document.remove(AUTH_BASE_KEY) {
            settings.auth_base = url;
        }
        if let Some(Value::String(url)) = document.remove(BOOKS_BASE_KEY) {
            settings.books_base = url;
        }
        settings.extra = document;
        settings
    }

    pub fn to_document(&self) -> Map<String, Value> {
        let mut document = Map::new();
        document.insert(AUTH_BASE_KEY.to_string(), Value::String(self.auth_base.clone()));
        document.insert(BOOKS_BASE_KEY.to_string(), Value::String(self.books_base.clone()));
        for (key, value) in &self.extra {
            document.insert(key.clone(), value.clone());
        }
        document
    }

    /// A key this program does not interpret.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid settings document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings file is not a JSON object")]
    NotAnObject,
}

/// Loads and saves `Settings` at a fixed path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store at `~/.bookdesk_config.json`. Falls back to the working
    /// directory when no home directory is known.
    pub fn new() -> Self {
        Self::at(home_dir(|key| std::env::var_os(key)).join(FILE_NAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted settings merged over the defaults. A missing or unreadable
    /// file yields the defaults.
    pub fn load(&self) -> Settings {
        if !self.path.exists() {
            return Settings::default();
        }
        match self.try_load() {
            Ok(settings) => settings,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "ignoring unreadable settings file");
                Settings::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<Settings, SettingsError> {
        let raw = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(document) => Ok(Settings::from_document(document)),
            _ => Err(SettingsError::NotAnObject),
        }
    }

    /// Write `settings` as pretty-printed JSON. Failures are logged and
    /// otherwise ignored.
    pub fn save(&self, settings: &Settings) {
        if let Err(e) = self.try_save(settings) {
            warn!(path = %self.path.display(), error = %e, "could not save settings");
        }
    }

    pub fn try_save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let text = serde_json::to_string_pretty(&Value::Object(settings.to_document()))?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `HOME`, then `USERPROFILE`; empty when neither is set.
fn home_dir(lookup: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    ["HOME", "USERPROFILE"]
        .into_iter()
        .filter_map(lookup)
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_default()
}
