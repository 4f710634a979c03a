//! Termination signals and the handle resources use to request shutdown.

use std::fmt;

use tokio::sync::mpsc;

use crate::error::BoxError;

/// Why a running application moved to stopping.
#[derive(Debug)]
pub enum ShutdownSignal {
  /// SIGINT / Ctrl-C.
  Interrupt,
  /// SIGTERM.
  Terminate,
  /// [`Shutdowner::shutdown`] was called.
  Requested,
  /// A running resource reported an unrecoverable error.
  Fatal(BoxError),
}

impl fmt::Display for ShutdownSignal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ShutdownSignal::Interrupt => f.write_str("interrupt"),
      ShutdownSignal::Terminate => f.write_str("terminated"),
      ShutdownSignal::Requested => f.write_str("shutdown requested"),
      ShutdownSignal::Fatal(err) => write!(f, "fatal error: {}", err),
    }
  }
}

/// A handle bound in every container that lets constructed values end the
/// application's run.
///
/// Depend on it with `Key::of::<Shutdowner>()`.
#[derive(Debug, Clone)]
pub struct Shutdowner {
  tx: mpsc::UnboundedSender<ShutdownSignal>,
}

impl Shutdowner {
  pub(crate) fn channel() -> (Shutdowner, mpsc::UnboundedReceiver<ShutdownSignal>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Shutdowner { tx }, rx)
  }

  /// Requests a graceful shutdown. Has no effect once the application is
  /// gone.
  pub fn shutdown(&self) {
    let _ = self.tx.send(ShutdownSignal::Requested);
  }

  /// Reports an unrecoverable error from a running resource. The application
  /// stops and its run fails with [`crate::Error::Fatal`].
  pub fn fatal(&self, error: impl Into<BoxError>) {
    let _ = self.tx.send(ShutdownSignal::Fatal(error.into()));
  }
}

/// Completes when the process receives SIGINT or, on Unix, SIGTERM.
pub(crate) async fn os_signal() -> ShutdownSignal {
  #[cfg(unix)]
  {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
      Ok(mut terminate) => {
        tokio::select! {
          _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
          _ = terminate.recv() => ShutdownSignal::Terminate,
        }
      }
      Err(err) => {
        tracing::warn!(error = %err, "cannot listen for SIGTERM, waiting for Ctrl-C only");
        ctrl_c().await
      }
    }
  }
  #[cfg(not(unix))]
  {
    ctrl_c().await
  }
}

async fn ctrl_c() -> ShutdownSignal {
  match tokio::signal::ctrl_c().await {
    Ok(()) => ShutdownSignal::Interrupt,
    Err(err) => {
      tracing::warn!(error = %err, "cannot listen for Ctrl-C");
      std::future::pending().await
    }
  }
}
