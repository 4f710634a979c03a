use std::fmt;

use thiserror::Error;

use crate::app::Phase;
use crate::key::Key;

/// The error type returned by constructors and lifecycle actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for `fibre_app`.
#[derive(Debug, Error)]
pub enum Error {
  #[error("{key} is already provided by '{existing}', cannot provide it again from '{provider}'")]
  DuplicateBinding {
    key: Key,
    existing: String,
    provider: String,
  },

  #[error("missing binding for {key} required by '{required_by}'")]
  MissingBinding { key: Key, required_by: String },

  #[error("dependency cycle detected: {}", format_path(.path))]
  Cycle { path: Vec<Key> },

  #[error("constructor '{provider}' failed: {source}")]
  Construction {
    provider: String,
    #[source]
    source: BoxError,
  },

  #[error("invalid provider '{provider}': {reason}")]
  InvalidProvider { provider: String, reason: String },

  #[error("start hook '{hook}' failed: {source}")]
  Start {
    hook: String,
    #[source]
    source: BoxError,
    /// Failures of the compensating stops run after the start failure.
    rollback: Vec<StopFailure>,
  },

  #[error(transparent)]
  Stop(#[from] StopErrors),

  #[error("cannot {action} while the application is {phase:?}")]
  InvalidPhase { action: &'static str, phase: Phase },

  #[error("a running resource reported a fatal error: {source}")]
  Fatal {
    #[source]
    source: BoxError,
    /// Errors of the shutdown triggered by the fatal error, if any.
    shutdown: Option<StopErrors>,
  },
}

/// A specialized `Result` type for `fibre_app` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

fn format_path(path: &[Key]) -> String {
  path
    .iter()
    .map(|key| key.to_string())
    .collect::<Vec<_>>()
    .join(" -> ")
}

/// A single stop action that did not complete cleanly.
#[derive(Debug, Error)]
pub enum StopFailure {
  #[error("stop hook '{hook}' failed: {source}")]
  Failed {
    hook: String,
    #[source]
    source: BoxError,
  },

  /// The stop action was still running when the shutdown deadline passed.
  #[error("stop hook '{hook}' did not finish before the shutdown deadline")]
  Timeout { hook: String },
}

impl StopFailure {
  pub fn hook(&self) -> &str {
    match self {
      StopFailure::Failed { hook, .. } | StopFailure::Timeout { hook } => hook,
    }
  }

  pub fn is_timeout(&self) -> bool {
    matches!(self, StopFailure::Timeout { .. })
  }
}

/// The cause of a [`Error::Start`] whose start action missed the start
/// deadline.
#[derive(Debug, Error)]
#[error("start hook did not finish before the start deadline")]
pub struct StartTimeout;

/// Returned by a stop action that gave up at the shutdown deadline. The
/// lifecycle reports it as [`StopFailure::Timeout`].
#[derive(Debug, Error)]
#[error("stop action did not finish before the shutdown deadline")]
pub struct StopTimeout;

/// Every failure of one stop sequence, in the order the stops ran.
#[derive(Debug)]
pub struct StopErrors {
  failures: Vec<StopFailure>,
}

impl StopErrors {
  pub(crate) fn new(failures: Vec<StopFailure>) -> Self {
    Self { failures }
  }

  pub fn failures(&self) -> &[StopFailure] {
    &self.failures
  }

  pub fn into_failures(self) -> Vec<StopFailure> {
    self.failures
  }
}

impl fmt::Display for StopErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} stop hook(s) failed", self.failures.len())?;
    for failure in &self.failures {
      write!(f, "; {}", failure)?;
    }
    Ok(())
  }
}

impl std::error::Error for StopErrors {}
