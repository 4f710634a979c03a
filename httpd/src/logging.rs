use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) -> Result<()> {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(level))
    .map_err(|e| Error::InvalidConfigValue {
      field: "log_level".to_owned(),
      message: e.to_string(),
    })?;

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer())
    .try_init()
    .map_err(|e| Error::Logging(e.to_string()))
}
