//! Lifecycle hooks and the ordered start/stop driver.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::time::{timeout_at, Instant};

use crate::error::{BoxError, Error, Result, StartTimeout, StopErrors, StopFailure, StopTimeout};
use crate::event::{Event, EventLogger};

type HookFn = Box<dyn FnOnce(Instant) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// A long-running resource the lifecycle can start and stop.
///
/// `start` must return promptly and hand any serving loop to its own task.
/// `stop` asks that task to finish and may wait for it until `deadline`.
/// Both should be idempotent.
pub trait Resource: Send + Sync + 'static {
  fn start(&self, deadline: Instant) -> BoxFuture<'_, Result<(), BoxError>>;

  fn stop(&self, deadline: Instant) -> BoxFuture<'_, Result<(), BoxError>>;
}

/// A start/stop action pair tied to the running lifetime of a constructed
/// value.
///
/// Either action may be omitted. A hook without a start action still counts
/// as started, so its stop action runs on shutdown.
pub struct Hook {
  label: String,
  on_start: Option<HookFn>,
  on_stop: Option<HookFn>,
}

impl Hook {
  pub fn new(label: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      on_start: None,
      on_stop: None,
    }
  }

  /// Sets the start action. It receives the start deadline.
  pub fn on_start<F, Fut>(mut self, action: F) -> Self
  where
    F: FnOnce(Instant) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
  {
    self.on_start = Some(Box::new(move |deadline| action(deadline).boxed()));
    self
  }

  /// Sets the stop action. It receives the shutdown deadline.
  pub fn on_stop<F, Fut>(mut self, action: F) -> Self
  where
    F: FnOnce(Instant) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
  {
    self.on_stop = Some(Box::new(move |deadline| action(deadline).boxed()));
    self
  }

  /// A hook driving `resource`'s own start and stop.
  pub fn for_resource<R: Resource + ?Sized>(label: impl Into<String>, resource: Arc<R>) -> Self {
    let starter = Arc::clone(&resource);
    Hook::new(label)
      .on_start(move |deadline| async move { starter.start(deadline).await })
      .on_stop(move |deadline| async move { resource.stop(deadline).await })
  }

  pub fn label(&self) -> &str {
    &self.label
  }
}

impl fmt::Debug for Hook {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Hook")
      .field("label", &self.label)
      .field("has_start", &self.on_start.is_some())
      .field("has_stop", &self.on_stop.is_some())
      .finish()
  }
}

/// The ordered hook list of an application.
///
/// Hooks are kept in the order their values were constructed. Starting runs
/// them front to back; stopping runs the started prefix back to front.
pub struct Lifecycle {
  hooks: Vec<Hook>,
  // Hooks `[0, started)` have started and not yet been stopped.
  started: usize,
  events: Arc<dyn EventLogger>,
}

impl Lifecycle {
  pub fn new(events: Arc<dyn EventLogger>) -> Self {
    Self {
      hooks: Vec::new(),
      started: 0,
      events,
    }
  }

  pub fn append(&mut self, hook: Hook) {
    self.hooks.push(hook);
  }

  pub fn len(&self) -> usize {
    self.hooks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.hooks.is_empty()
  }

  /// Number of hooks currently started.
  pub fn started(&self) -> usize {
    self.started
  }

  pub fn labels(&self) -> impl Iterator<Item = &str> {
    self.hooks.iter().map(Hook::label)
  }

  /// Runs every pending start action in registration order.
  ///
  /// When a start action fails or misses `deadline`, the hooks started so far
  /// are stopped in reverse order under a fresh `rollback_timeout`, and the
  /// original failure is returned. The failing hook is not stopped.
  pub async fn start_all(&mut self, deadline: Instant, rollback_timeout: Duration) -> Result<()> {
    while self.started < self.hooks.len() {
      let hook = &mut self.hooks[self.started];
      if let Some(action) = hook.on_start.take() {
        let label = hook.label.clone();
        self.events.log_event(&Event::OnStartExecuting { hook: &label });
        let began = Instant::now();
        let outcome = match timeout_at(deadline, action(deadline)).await {
          Ok(outcome) => outcome,
          Err(_) => Err(Box::new(StartTimeout) as BoxError),
        };
        self.events.log_event(&Event::OnStartExecuted {
          hook: &label,
          runtime: began.elapsed(),
          error: outcome.as_ref().err(),
        });

        if let Err(source) = outcome {
          let rollback = self.stop_started(Instant::now() + rollback_timeout).await;
          self.events.log_event(&Event::RolledBack {
            failures: &rollback,
          });
          return Err(Error::Start {
            hook: label,
            source,
            rollback,
          });
        }
      }
      self.started += 1;
    }
    Ok(())
  }

  /// Runs the stop action of every started hook in reverse registration
  /// order. Failures and timeouts are collected without skipping the
  /// remaining hooks. Calling it again after everything stopped is a no-op.
  pub async fn stop_all(&mut self, deadline: Instant) -> Result<()> {
    let failures = self.stop_started(deadline).await;
    if failures.is_empty() {
      Ok(())
    } else {
      Err(Error::Stop(StopErrors::new(failures)))
    }
  }

  async fn stop_started(&mut self, deadline: Instant) -> Vec<StopFailure> {
    let mut failures = Vec::new();
    while self.started > 0 {
      self.started -= 1;
      let hook = &mut self.hooks[self.started];
      let Some(action) = hook.on_stop.take() else {
        continue;
      };
      let label = hook.label.clone();
      self.events.log_event(&Event::OnStopExecuting { hook: &label });
      let began = Instant::now();
      let failure = match timeout_at(deadline, action(deadline)).await {
        Ok(Ok(())) => None,
        Ok(Err(source)) if source.is::<StopTimeout>() => Some(StopFailure::Timeout {
          hook: label.clone(),
        }),
        Ok(Err(source)) => Some(StopFailure::Failed {
          hook: label.clone(),
          source,
        }),
        Err(_) => Some(StopFailure::Timeout {
          hook: label.clone(),
        }),
      };
      self.events.log_event(&Event::OnStopExecuted {
        hook: &label,
        runtime: began.elapsed(),
        failure: failure.as_ref(),
      });
      failures.extend(failure);
    }
    failures
  }
}

impl fmt::Debug for Lifecycle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Lifecycle")
      .field("hooks", &self.hooks)
      .field("started", &self.started)
      .finish_non_exhaustive()
  }
}
