//! Connection strings and the connectivity probe used by the configure gate.
//!
//! The probe never issues a query. Network drivers are checked by opening a
//! TCP connection to `host:port`; SQLite by checking the database directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::errors::{DsnError, ProbeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Mysql,
    Pgsql,
    Sqlite,
}

impl Driver {
    fn from_scheme(scheme: &str) -> Result<Self, DsnError> {
        match scheme {
            "pdo-mysql" | "mysql" => Ok(Driver::Mysql),
            "pdo-pgsql" | "pgsql" | "postgres" => Ok(Driver::Pgsql),
            "pdo-sqlite" | "sqlite" => Ok(Driver::Sqlite),
            other => Err(DsnError::UnsupportedDriver(other.to_string())),
        }
    }

    pub fn default_port(self) -> Option<u16> {
        match self {
            Driver::Mysql => Some(3306),
            Driver::Pgsql => Some(5432),
            Driver::Sqlite => None,
        }
    }
}

/// Parsed form of a connection string such as `pdo-mysql://user:pw@host:3306/db`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub driver: Driver,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    /// Database file, SQLite only.
    pub path: Option<PathBuf>,
}

impl ConnectionParams {
    pub fn parse(dsn: &str) -> Result<Self, DsnError> {
        let (scheme, rest) = dsn.trim().split_once("://").ok_or(DsnError::MissingScheme)?;
        if scheme.is_empty() {
            return Err(DsnError::MissingScheme);
        }
        let driver = Driver::from_scheme(scheme)?;

        if driver == Driver::Sqlite {
            let path = rest.split(['?', '#']).next().unwrap_or("");
            if path.is_empty() {
                return Err(DsnError::MissingPath);
            }
            return Ok(Self {
                driver,
                user: None,
                password: None,
                host: None,
                port: None,
                dbname: None,
                path: Some(PathBuf::from(path)),
            });
        }

        let rest = rest.split(['?', '#']).next().unwrap_or("");
        let (authority, dbname) = match rest.split_once('/') {
            Some((authority, db)) => (authority, non_empty(db)),
            None => (rest, None),
        };
        let (userinfo, hostport) = match authority.rsplit_once('@') {
            Some((userinfo, hostport)) => (Some(userinfo), hostport),
            None => (None, authority),
        };
        let (user, password) = match userinfo {
            Some(info) => match info.split_once(':') {
                Some((user, password)) => (non_empty(user), non_empty(password)),
                None => (non_empty(info), None),
            },
            None => (None, None),
        };
        let (host, port) = match hostport.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| DsnError::InvalidPort(port.to_string()))?;
                (host, Some(port))
            }
            None => (hostport, None),
        };
        if host.is_empty() {
            return Err(DsnError::MissingHost);
        }

        Ok(Self {
            driver,
            user,
            password,
            host: Some(host.to_string()),
            port,
            dbname,
            path: None,
        })
    }

    /// `host:port` with the driver's default port filled in.
    pub fn address(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        let port = self.port.or(self.driver.default_port())?;
        Some(format!("{}:{}", host, port))
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Connectivity probe collaborator.
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    fn parse(&self, dsn: &str) -> Result<ConnectionParams, DsnError> {
        ConnectionParams::parse(dsn)
    }

    /// Open (and drop) a connection. Must not touch the schema.
    async fn connect(&self, params: &ConnectionParams) -> Result<(), ProbeError>;
}

/// Default probe: TCP reachability for network drivers, directory presence
/// for SQLite.
pub struct NetworkProbe {
    timeout: Duration,
}

impl NetworkProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DatabaseProbe for NetworkProbe {
    async fn connect(&self, params: &ConnectionParams) -> Result<(), ProbeError> {
        if params.driver == Driver::Sqlite {
            let path = params.path.as_deref().ok_or(DsnError::MissingPath)?;
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            if !dir.is_dir() {
                return Err(ProbeError::MissingDirectory(dir.to_path_buf()));
            }
            return Ok(());
        }

        let address = params.address().ok_or(DsnError::MissingHost)?;
        match tokio::time::timeout(self.timeout, TcpStream::connect(&address)).await {
            Ok(Ok(_stream)) => {
                tracing::debug!(%address, "database endpoint reachable");
                Ok(())
            }
            Ok(Err(source)) => Err(ProbeError::Connect { address, source }),
            Err(_) => Err(ProbeError::Timeout {
                address,
                timeout: self.timeout,
            }),
        }
    }
}
