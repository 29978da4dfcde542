use std::io::Write;
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};

/// Application-level constants
pub const APP_NAME: &str = "PainTrack";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_BIND: &str = "PAINTRACK_BIND";
pub const ENV_DB: &str = "PAINTRACK_DB";
pub const ENV_ADMIN_TOKEN: &str = "PAINTRACK_ADMIN_TOKEN";

const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,paintrack_lib=debug"
}

/// Get the application data directory (~/PainTrack/).
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default database location inside the data directory
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("paintrack.db")
}

/// File holding a generated admin token, next to the database.
pub fn admin_token_path(db_path: &Path) -> PathBuf {
    db_path.with_file_name("admin.token")
}

/// Write the admin token to `path`, readable by the owner only.
pub fn write_admin_token(path: &Path, token: &str) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::TokenFile {
        path: path.to_path_buf(),
        source,
    };

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(io_err)?;

    // mode() only applies on create
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(io_err)?;
    }

    file.write_all(token.as_bytes()).map_err(io_err)?;
    Ok(())
}

/// Short, non-secret prefix of a token for log lines.
pub fn token_hint(token: &str) -> &str {
    token.get(..6).unwrap_or("")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value} is not a socket address: {source}")]
    InvalidBind {
        var: &'static str,
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("Cannot write admin token to {path}: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime settings for the API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    /// `None` means one is generated at startup.
    pub admin_token: Option<String>,
}

impl ServerConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (environment, test map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidBind {
                var: ENV_BIND,
                value: bind_raw.clone(),
                source,
            })?;

        let db_path = lookup(ENV_DB)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let admin_token = lookup(ENV_ADMIN_TOKEN)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            bind,
            db_path,
            admin_token,
        })
    }
}
