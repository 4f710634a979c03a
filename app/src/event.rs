//! Container events and the loggers that observe them.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{BoxError, Error, StopFailure};
use crate::key::Key;
use crate::shutdown::ShutdownSignal;

/// Something the container did, reported to the installed [`EventLogger`].
#[derive(Debug)]
pub enum Event<'a> {
  /// A provider was registered.
  Provided { provider: &'a str, results: &'a [Key] },
  /// A provider's constructor ran successfully.
  Constructed { provider: &'a str },
  /// An invoke target is about to be resolved.
  Invoking { function: &'a str },
  /// An invoke target finished resolving.
  Invoked {
    function: &'a str,
    error: Option<&'a Error>,
  },
  OnStartExecuting { hook: &'a str },
  OnStartExecuted {
    hook: &'a str,
    runtime: Duration,
    error: Option<&'a BoxError>,
  },
  OnStopExecuting { hook: &'a str },
  OnStopExecuted {
    hook: &'a str,
    runtime: Duration,
    failure: Option<&'a StopFailure>,
  },
  /// Already started hooks were stopped after a start failure.
  RolledBack { failures: &'a [StopFailure] },
  Started { error: Option<&'a Error> },
  Signaled { signal: &'a ShutdownSignal },
  Stopped { error: Option<&'a Error> },
}

/// Receives every [`Event`] of a container.
pub trait EventLogger: Send + Sync {
  fn log_event(&self, event: &Event<'_>);
}

/// The default logger, writing events as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl EventLogger for TracingLogger {
  fn log_event(&self, event: &Event<'_>) {
    match event {
      Event::Provided { provider, results } => {
        for key in results.iter() {
          debug!(provider = %provider, key = %key, "provided");
        }
      }
      Event::Constructed { provider } => debug!(provider = %provider, "constructed"),
      Event::Invoking { function } => info!(function = %function, "invoking"),
      Event::Invoked {
        function,
        error: Some(err),
      } => error!(function = %function, error = %err, "invoke failed"),
      Event::Invoked { .. } => {}
      Event::OnStartExecuting { hook } => info!(callee = %hook, "OnStart hook executing"),
      Event::OnStartExecuted {
        hook,
        runtime,
        error,
      } => match error {
        Some(err) => error!(callee = %hook, error = %err, "OnStart hook failed"),
        None => info!(callee = %hook, runtime = ?runtime, "OnStart hook executed"),
      },
      Event::OnStopExecuting { hook } => info!(callee = %hook, "OnStop hook executing"),
      Event::OnStopExecuted {
        hook,
        runtime,
        failure,
      } => match failure {
        Some(err) => error!(callee = %hook, error = %err, "OnStop hook failed"),
        None => info!(callee = %hook, runtime = ?runtime, "OnStop hook executed"),
      },
      Event::RolledBack { failures } if failures.is_empty() => {
        warn!("start failed, rolled back started hooks")
      }
      Event::RolledBack { failures } => {
        for failure in failures.iter() {
          error!(error = %failure, "rollback failed");
        }
      }
      Event::Started { error: Some(err) } => error!(error = %err, "start failed"),
      Event::Started { error: None } => info!("started"),
      Event::Signaled { signal } => info!(signal = %signal, "received signal"),
      Event::Stopped { error: Some(err) } => error!(error = %err, "stop failed"),
      Event::Stopped { error: None } => info!("stopped"),
    }
  }
}

/// A logger that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopLogger;

impl EventLogger for NopLogger {
  fn log_event(&self, _event: &Event<'_>) {}
}
