use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// The error type of the `fibre_httpd` service.
#[derive(Debug, Error)]
pub enum Error {
  #[error("Failed to read configuration file {path:?}: {source}")]
  ConfigRead {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse configuration: {0}")]
  ConfigParse(String),

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidConfigValue { field: String, message: String },

  #[error("Failed to bind {addr}: {source}")]
  Bind {
    addr: SocketAddr,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to install the tracing subscriber: {0}")]
  Logging(String),

  #[error(transparent)]
  App(#[from] fibre_app::Error),
}

/// A specialized `Result` type for `fibre_httpd` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
