//! Read-only view of the application's configuration.

use std::path::PathBuf;

use crate::config_store::ConfigStore;
use crate::overlay;

pub const APPS_DIR: &str = "apps_dir";
pub const CACHE_DIR: &str = "cache_dir";
pub const URL: &str = "url";
pub const APPS_URL: &str = "apps_url";

/// Config accessor collaborator: `get(key)`, never writes.
pub trait ConfigAccessor: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Directories come from the installer settings; URLs are read from the
/// application's config file on every call so a freshly configured value is
/// visible to later steps.
pub struct AppConfigAccessor {
    apps_dir: PathBuf,
    cache_dir: PathBuf,
    store: ConfigStore,
}

impl AppConfigAccessor {
    pub fn new(apps_dir: PathBuf, cache_dir: PathBuf, store: ConfigStore) -> Self {
        Self {
            apps_dir,
            cache_dir,
            store,
        }
    }

    fn file_value(&self, key: &str) -> Option<String> {
        match self.store.value(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "could not read config value");
                None
            }
        }
    }
}

impl ConfigAccessor for AppConfigAccessor {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            APPS_DIR => Some(self.apps_dir.display().to_string()),
            CACHE_DIR => Some(self.cache_dir.display().to_string()),
            URL => self.file_value(overlay::URL),
            APPS_URL => self.file_value(overlay::APPS_URL),
            _ => None,
        }
    }
}
