//! Config Store Writer: overlays values onto the application's `KEY="value"`
//! config file.
//!
//! The file is parsed with `dotenvy` (file order preserved), every existing key
//! is re-emitted with either the overlay value or its current value, and the
//! result is committed only when its SHA-256 differs from the file on disk.
//! Commits go through a sibling temporary file renamed over the original, so a
//! reader never observes a half-written file. A symlinked file is resolved
//! first and its target is replaced. When the target's directory is not
//! writable the file is truncated and rewritten in place instead.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::ConfigStoreError;
use crate::overlay::ConfigOverlay;
use crate::preconditions::is_writable;
use crate::util::sha256_hex;

static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write side of the config file as the configure step sees it.
pub trait ConfigWriter: Send + Sync {
    fn path(&self) -> &Path;

    /// Overlay `overlay` onto the file.
    fn apply(&self, overlay: &ConfigOverlay) -> Result<WriteOutcome, ConfigStoreError>;

    /// File name as shown to the user, e.g. `.env`.
    fn file_name(&self) -> String {
        display_name(self.path())
    }
}

/// Whether `apply` touched the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Unchanged,
    Written,
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }

    fn read_raw(&self) -> Result<String, ConfigStoreError> {
        fs::read_to_string(&self.path).map_err(|source| ConfigStoreError::Read {
            path: self.path.clone(),
            source,
        })
    }

    /// Current entries in file order.
    pub fn entries(&self) -> Result<Vec<(String, String)>, ConfigStoreError> {
        let content = self.read_raw()?;
        parse_entries(&content).map_err(|message| ConfigStoreError::Parse {
            path: self.path.clone(),
            message,
        })
    }

    /// Current value of a single key.
    pub fn value(&self, key: &str) -> Result<Option<String>, ConfigStoreError> {
        Ok(self
            .entries()?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v))
    }

    /// Overlay `overlay` onto the file. Keys not already in the file are
    /// ignored.
    pub fn apply(&self, overlay: &ConfigOverlay) -> Result<WriteOutcome, ConfigStoreError> {
        let current = self.read_raw()?;
        let entries = parse_entries(&current).map_err(|message| ConfigStoreError::Parse {
            path: self.path.clone(),
            message,
        })?;
        let content = render(&entries, overlay);

        if sha256_hex(content.as_bytes()) == sha256_hex(current.as_bytes()) {
            tracing::debug!(path = %self.path.display(), "config file already up to date");
            return Ok(WriteOutcome::Unchanged);
        }

        let write_error = |source: std::io::Error| ConfigStoreError::Write {
            path: self.path.clone(),
            source,
        };
        let target = fs::canonicalize(&self.path).map_err(write_error)?;
        let dir_writable = target.parent().is_some_and(is_writable);
        commit(&target, &content, dir_writable).map_err(write_error)?;
        tracing::info!(
            path = %self.path.display(),
            target = %target.display(),
            keys = entries.len(),
            "config file rewritten"
        );
        Ok(WriteOutcome::Written)
    }
}

impl ConfigWriter for ConfigStore {
    fn path(&self) -> &Path {
        ConfigStore::path(self)
    }

    fn apply(&self, overlay: &ConfigOverlay) -> Result<WriteOutcome, ConfigStoreError> {
        ConfigStore::apply(self, overlay)
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse `KEY=value` content. A key defined twice keeps its first position
/// and its last value.
pub fn parse_entries(content: &str) -> Result<Vec<(String, String)>, String> {
    let mut entries: Vec<(String, String)> = Vec::new();
    for item in dotenvy::from_read_iter(content.as_bytes()) {
        let (key, value) = item.map_err(|e| e.to_string())?;
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => entries.push((key, value)),
        }
    }
    Ok(entries)
}

/// Serialize entries as `KEY="value"` lines, taking overlay values where
/// defined.
pub fn render(entries: &[(String, String)], overlay: &ConfigOverlay) -> String {
    let mut content = String::new();
    for (key, value) in entries {
        let value = overlay.get(key).unwrap_or(value);
        content.push_str(key);
        content.push_str("=\"");
        content.push_str(&escape_value(value));
        content.push_str("\"\n");
    }
    content
}

/// Escape a value for a double-quoted entry. `$` is escaped so it is never
/// read back as a variable reference.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '$' => escaped.push_str("\\$"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Replace the content of `path`, which must not be a symlink. Staged and
/// renamed when `dir_writable`, rewritten in place otherwise.
fn commit(path: &Path, content: &str, dir_writable: bool) -> std::io::Result<()> {
    if dir_writable {
        write_atomic(path, content)
    } else {
        tracing::debug!(path = %path.display(), "directory not writable, rewriting in place");
        write_in_place(path, content)
    }
}

/// Unique per process and call, so concurrent commits never share a file.
fn staged_path(path: &Path) -> PathBuf {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let seq = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(".{}.{}.{}.tmp", name, std::process::id(), seq))
}

fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let staged = staged_path(path);

    let result = (|| {
        let mut file = fs::File::create(&staged)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(&staged, metadata.permissions())?;
        }
        fs::rename(&staged, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&staged);
    }
    result
}

fn write_in_place(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new().write(true).truncate(true).open(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{APPS_URL, CONNECTION, PROJECT_KEY, URL};
    use tempfile::tempdir;

    const ENV: &str = "APP_PROJECT_KEY=\"\"\nAPP_URL=\"http://127.0.0.1\"\nAPP_APPS_URL=\"http://127.0.0.1/apps\"\nAPP_CONNECTION=\"pdo-sqlite:///tmp/db.sqlite\"\n";

    fn store_with(content: &str) -> (tempfile::TempDir, ConfigStore) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, content).unwrap();
        (dir, ConfigStore::new(path))
    }

    fn overlay() -> ConfigOverlay {
        ConfigOverlay::new()
            .set(PROJECT_KEY, "abc123")
            .set(URL, "https://example.com/fusio")
            .set(APPS_URL, "https://example.com/fusio/apps")
            .set(CONNECTION, "pdo-mysql://u:p@localhost/f")
    }

    #[test]
    fn test_parse_entries_keeps_file_order() {
        let entries = parse_entries("B=\"2\"\n# comment\nA=1\n\nC='three'\n").unwrap();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["B", "A", "C"]);
        assert_eq!(entries[2].1, "three");
    }

    #[test]
    fn test_parse_entries_duplicate_key_last_value_wins() {
        let entries = parse_entries("A=1\nB=2\nA=3\n").unwrap();
        assert_eq!(
            entries,
            vec![("A".to_string(), "3".to_string()), ("B".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn test_apply_rewrites_overlaid_keys() {
        let (_dir, store) = store_with(ENV);
        let outcome = store.apply(&overlay()).unwrap();
        assert_eq!(outcome, WriteOutcome::Written);

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("APP_CONNECTION=\"pdo-mysql://u:p@localhost/f\"\n"));
        assert!(content.contains("APP_APPS_URL=\"https://example.com/fusio/apps\"\n"));
        assert!(content.starts_with("APP_PROJECT_KEY=\"abc123\"\n"));
    }

    #[test]
    fn test_apply_twice_is_a_no_op() {
        let (_dir, store) = store_with(ENV);
        assert_eq!(store.apply(&overlay()).unwrap(), WriteOutcome::Written);
        let first = fs::read_to_string(store.path()).unwrap();
        assert_eq!(store.apply(&overlay()).unwrap(), WriteOutcome::Unchanged);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), first);
    }

    #[test]
    fn test_apply_keeps_keys_outside_overlay() {
        let (_dir, store) = store_with("APP_ENV=\"prod\"\nAPP_URL=\"x\"\n");
        store.apply(&ConfigOverlay::new().set(URL, "https://a.b")).unwrap();
        assert_eq!(store.value("APP_ENV").unwrap().as_deref(), Some("prod"));
        assert_eq!(store.value(URL).unwrap().as_deref(), Some("https://a.b"));
    }

    #[test]
    fn test_apply_does_not_append_unknown_keys() {
        let (_dir, store) = store_with("APP_URL=\"x\"\n");
        store
            .apply(&ConfigOverlay::new().set("APP_NEW", "1").set(URL, "y"))
            .unwrap();
        assert_eq!(store.value("APP_NEW").unwrap(), None);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "APP_URL=\"y\"\n");
    }

    #[test]
    fn test_escaped_values_read_back_unchanged() {
        let (_dir, store) = store_with("APP_CONNECTION=\"\"\n");
        let tricky = r#"pdo-mysql://u:p"a$HOME\x@h/d"#;
        store
            .apply(&ConfigOverlay::new().set(CONNECTION, tricky))
            .unwrap();
        assert_eq!(store.value(CONNECTION).unwrap().as_deref(), Some(tricky));
        // a second pass sees identical content
        assert_eq!(
            store.apply(&ConfigOverlay::new().set(CONNECTION, tricky)).unwrap(),
            WriteOutcome::Unchanged
        );
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(escape_value(r#"a"b$c"#), r#"a\"b\$c"#);
        assert_eq!(escape_value("plain"), "plain");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join(".env"));
        assert!(matches!(
            store.apply(&overlay()),
            Err(ConfigStoreError::Read { .. })
        ));
    }

    #[test]
    fn test_no_staged_file_left_behind() {
        let (dir, store) = store_with(ENV);
        store.apply(&overlay()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_file_name() {
        let store = ConfigStore::new("/srv/app/.env");
        assert_eq!(store.file_name(), ".env");
    }

    #[cfg(unix)]
    #[test]
    fn test_apply_through_symlink_updates_target() {
        let dir = tempdir().unwrap();
        let shared = dir.path().join("shared");
        fs::create_dir(&shared).unwrap();
        let target = shared.join("real.env");
        fs::write(&target, ENV).unwrap();
        let link = dir.path().join(".env");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let store = ConfigStore::new(&link);
        assert_eq!(store.apply(&overlay()).unwrap(), WriteOutcome::Written);

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        let content = fs::read_to_string(&target).unwrap();
        assert!(content.starts_with("APP_PROJECT_KEY=\"abc123\"\n"));
        assert_eq!(store.value(PROJECT_KEY).unwrap().as_deref(), Some("abc123"));
        assert_eq!(store.file_name(), ".env");
    }

    #[cfg(unix)]
    #[test]
    fn test_in_place_commit_keeps_inode() {
        use std::os::unix::fs::MetadataExt;

        let (dir, store) = store_with(ENV);
        let inode = fs::metadata(store.path()).unwrap().ino();

        commit(store.path(), "APP_URL=\"y\"\n", false).unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "APP_URL=\"y\"\n");
        assert_eq!(fs::metadata(store.path()).unwrap().ino(), inode);
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_in_place_commit_shrinks_file() {
        let (_dir, store) = store_with(ENV);
        commit(store.path(), "A=\"1\"\n", false).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "A=\"1\"\n");
    }

    #[test]
    fn test_staged_paths_are_unique() {
        let path = Path::new("/srv/app/.env");
        let first = staged_path(path);
        let second = staged_path(path);
        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(Path::new("/srv/app")));
        assert!(first.file_name().unwrap().to_string_lossy().starts_with(".env."));
    }

    #[test]
    fn test_concurrent_applies_all_land() {
        let (_dir, store) = store_with(ENV);
        let store = std::sync::Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.apply(&ConfigOverlay::new().set(PROJECT_KEY, format!("key{}", i)))
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        let key = store.value(PROJECT_KEY).unwrap().unwrap();
        assert!(key.starts_with("key"));
    }
}
