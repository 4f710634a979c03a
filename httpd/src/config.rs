//! Service configuration: YAML on disk, discovered by name and environment.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_CONFIG_BASE_NAME: &str = "fibre_httpd";
const DEFAULT_CONFIG_EXTENSION: &str = "yaml";

/// Names an explicit configuration file, bypassing discovery.
pub const CONFIG_PATH_VAR: &str = "FIBRE_HTTPD_CONFIG";

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_TIMEOUT: &str = "15s";

/// The configuration file as written.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigRaw {
  #[serde(default)]
  addr: Option<String>,
  #[serde(default)]
  log_level: Option<String>,
  #[serde(default)]
  start_timeout: Option<String>,
  #[serde(default)]
  shutdown_timeout: Option<String>,
}

/// Validated service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub addr: SocketAddr,
  pub log_level: String,
  pub start_timeout: Duration,
  pub shutdown_timeout: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
      log_level: DEFAULT_LOG_LEVEL.to_owned(),
      start_timeout: Duration::from_secs(15),
      shutdown_timeout: Duration::from_secs(15),
    }
  }
}

impl Config {
  /// Loads the configuration named by `FIBRE_HTTPD_CONFIG`, else the first
  /// file [`find_config_file`] finds in the working directory, else the
  /// defaults.
  pub fn load() -> Result<Config> {
    if let Some(path) = env::var_os(CONFIG_PATH_VAR) {
      return Config::from_file(Path::new(&path));
    }
    match find_config_file(Path::new("."), None) {
      Some(path) => Config::from_file(&path),
      None => Ok(Config::default()),
    }
  }

  pub fn from_file(path: &Path) -> Result<Config> {
    let yaml = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
      path: path.to_path_buf(),
      source,
    })?;
    Config::from_yaml_str(&yaml).map_err(|err| match err {
      Error::ConfigParse(message) => Error::ConfigParse(format!("{:?}: {}", path, message)),
      other => other,
    })
  }

  pub fn from_yaml_str(yaml: &str) -> Result<Config> {
    // An empty document means "all defaults".
    if yaml.trim().is_empty() {
      return Ok(Config::default());
    }
    let raw: ConfigRaw = serde_yaml::from_str(yaml).map_err(|e| Error::ConfigParse(e.to_string()))?;
    process_raw_config(raw)
  }
}

fn process_raw_config(raw: ConfigRaw) -> Result<Config> {
  Ok(Config {
    addr: parse_addr(raw.addr.as_deref().unwrap_or(DEFAULT_ADDR))?,
    log_level: raw.log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
    start_timeout: parse_timeout("start_timeout", raw.start_timeout.as_deref())?,
    shutdown_timeout: parse_timeout("shutdown_timeout", raw.shutdown_timeout.as_deref())?,
  })
}

/// Accepts `host:port`, or `:port` for every interface.
fn parse_addr(value: &str) -> Result<SocketAddr> {
  let candidate = match value.strip_prefix(':') {
    Some(port) => format!("0.0.0.0:{}", port),
    None => value.to_owned(),
  };
  candidate.parse().map_err(|e| Error::InvalidConfigValue {
    field: "addr".to_owned(),
    message: format!("'{}': {}", value, e),
  })
}

fn parse_timeout(field: &str, value: Option<&str>) -> Result<Duration> {
  let value = value.unwrap_or(DEFAULT_TIMEOUT);
  humantime::parse_duration(value).map_err(|e| Error::InvalidConfigValue {
    field: field.to_owned(),
    message: format!("'{}': {}", value, e),
  })
}

/// Finds `fibre_httpd.<env>.yaml` or `fibre_httpd.yaml` in `dir`.
///
/// The environment is `environment_suffix` if given, else `FIBRE_ENV`, else
/// `APP_ENV`.
pub fn find_config_file(dir: &Path, environment_suffix: Option<&str>) -> Option<PathBuf> {
  let base_name = DEFAULT_CONFIG_BASE_NAME;
  let extension = DEFAULT_CONFIG_EXTENSION;

  let env_from_var = environment_suffix
    .map(|s| s.to_string())
    .or_else(|| env::var("FIBRE_ENV").ok())
    .or_else(|| env::var("APP_ENV").ok());

  let mut files_to_check: Vec<String> = Vec::new();
  if let Some(env_str) = &env_from_var {
    if !env_str.is_empty() {
      files_to_check.push(format!("{}.{}.{}", base_name, env_str, extension));
    }
  }
  files_to_check.push(format!("{}.{}", base_name, extension));

  files_to_check
    .iter()
    .map(|file_name| dir.join(file_name))
    .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_empty_document_yields_defaults() {
    let config = Config::from_yaml_str("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.addr.port(), 8080);
  }

  #[test]
  fn test_full_document() {
    // Arrange
    let yaml = r#"
addr: "127.0.0.1:9000"
log_level: debug
start_timeout: 2s
shutdown_timeout: 1m 30s
"#;

    // Act
    let config = Config::from_yaml_str(yaml).unwrap();

    // Assert
    assert_eq!(
      config,
      Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
        log_level: "debug".to_owned(),
        start_timeout: Duration::from_secs(2),
        shutdown_timeout: Duration::from_secs(90),
      }
    );
  }

  #[test]
  fn test_port_only_addr_binds_every_interface() {
    let config = Config::from_yaml_str("addr: \":8081\"").unwrap();
    assert_eq!(config.addr, SocketAddr::from(([0, 0, 0, 0], 8081)));
  }

  #[test]
  fn test_unknown_field_is_rejected() {
    let result = Config::from_yaml_str("listen: 127.0.0.1:80");
    assert!(matches!(result, Err(Error::ConfigParse(_))));
  }

  #[test]
  fn test_bad_duration_names_the_field() {
    match Config::from_yaml_str("shutdown_timeout: soon") {
      Err(Error::InvalidConfigValue { field, .. }) => assert_eq!(field, "shutdown_timeout"),
      other => panic!("expected an invalid value, got {:?}", other),
    }
  }

  #[test]
  fn test_environment_file_is_preferred() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("fibre_httpd.yaml"), "log_level: info\n").unwrap();
    fs::write(dir.path().join("fibre_httpd.staging.yaml"), "log_level: warn\n").unwrap();

    // Act
    let staging = find_config_file(dir.path(), Some("staging")).unwrap();
    let config = Config::from_file(&staging).unwrap();

    // Assert
    assert_eq!(staging, dir.path().join("fibre_httpd.staging.yaml"));
    assert_eq!(config.log_level, "warn");
  }

  #[test]
  fn test_base_file_when_environment_file_is_absent() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("fibre_httpd.yaml"), "addr: 127.0.0.1:0\n").unwrap();

    // Act
    let found = find_config_file(dir.path(), Some("production"));

    // Assert
    assert_eq!(found, Some(dir.path().join("fibre_httpd.yaml")));
  }

  #[test]
  fn test_no_file_found() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(find_config_file(dir.path(), Some("dev")), None);
  }

  #[test]
  fn test_missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::from_file(&dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(Error::ConfigRead { .. })));
  }
}
