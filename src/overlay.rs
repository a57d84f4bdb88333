//! Configuration overlay built from the configure step's request fields.

use std::collections::BTreeMap;

use reqwest::Url;
use webinstall_common::StepParams;

pub const PROJECT_KEY: &str = "APP_PROJECT_KEY";
pub const URL: &str = "APP_URL";
pub const APPS_URL: &str = "APP_APPS_URL";
pub const CONNECTION: &str = "APP_CONNECTION";

/// Config keys the caller wants to override. Keys missing here keep their
/// on-disk value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverlay {
    values: BTreeMap<String, String>,
}

impl ConfigOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of `key`, empty when the overlay does not define it.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Derive the overlay from the installer form fields.
    ///
    /// - `APP_URL` keeps scheme, host, port and path of `url`; empty when
    ///   `url` is not an absolute URL.
    /// - `APP_APPS_URL` is `APP_URL` + `/apps`.
    /// - `APP_CONNECTION` is a `pdo-mysql` DSN; empty without host or name.
    pub fn from_params(params: &StepParams) -> Self {
        let url = normalize_url(StepParams::field(&params.url));
        let apps_url = if url.is_empty() {
            String::new()
        } else {
            format!("{}/apps", url)
        };

        let db_host = StepParams::field(&params.db_host);
        let db_name = StepParams::field(&params.db_name);
        let connection = if db_host.is_empty() || db_name.is_empty() {
            String::new()
        } else {
            format!(
                "pdo-mysql://{}:{}@{}/{}",
                StepParams::field(&params.db_user),
                StepParams::field(&params.db_pw),
                db_host,
                db_name
            )
        };

        Self::new()
            .set(PROJECT_KEY, StepParams::field(&params.key).trim())
            .set(URL, url)
            .set(APPS_URL, apps_url)
            .set(CONNECTION, connection)
    }
}

/// `scheme://host[:port]/path` without query, fragment or trailing slash.
fn normalize_url(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw.trim()) else {
        return String::new();
    };
    let Some(host) = parsed.host_str() else {
        return String::new();
    };
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
    format!(
        "{}://{}{}{}",
        parsed.scheme(),
        host,
        port,
        parsed.path().trim_end_matches('/')
    )
}
