//! The `Container` (registry, instance cache and hook list) and the `App`
//! that drives it through its phases.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use once_cell::unsync::OnceCell;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::event::{Event, EventLogger, TracingLogger};
use crate::key::{Instance, Key};
use crate::lifecycle::Lifecycle;
use crate::provider::{Invoke, Provider};
use crate::registry::{ProviderId, Registry};
use crate::resolver::{InstanceCache, Resolver};
use crate::shutdown::{os_signal, ShutdownSignal, Shutdowner};

/// Default budget for starting all hooks, and for stopping them.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Registry, instance cache and lifecycle hook list of one application.
///
/// Resolution is synchronous and needs exclusive access; it always completes
/// before any hook starts.
pub struct Container {
  registry: Registry,
  cache: InstanceCache,
  lifecycle: Lifecycle,
  events: Arc<dyn EventLogger>,
}

impl Container {
  /// Creates a new, empty `Container` logging through `tracing`.
  pub fn new() -> Self {
    Self::with_event_logger(Arc::new(TracingLogger))
  }

  pub fn with_event_logger(events: Arc<dyn EventLogger>) -> Self {
    Self {
      registry: Registry::new(),
      cache: InstanceCache::new(),
      lifecycle: Lifecycle::new(Arc::clone(&events)),
      events,
    }
  }

  // --- Registration ---

  pub fn provide(&mut self, provider: Provider) -> Result<ProviderId> {
    let id = self.registry.register(provider)?;
    self.cache.push(OnceCell::new());
    let descriptor = self.registry.descriptor(id);
    self.events.log_event(&Event::Provided {
      provider: descriptor.label(),
      results: descriptor.results(),
    });
    Ok(id)
  }

  // --- Resolution ---

  /// Starts a resolution attempt sharing this container's cache.
  pub fn resolver(&mut self) -> Resolver<'_> {
    Resolver::new(
      &self.registry,
      &self.cache,
      &mut self.lifecycle,
      self.events.as_ref(),
    )
  }

  pub fn resolve<T: ?Sized + Any + Send + Sync>(&mut self) -> Result<Arc<T>> {
    self.resolve_as::<T>(&Key::of::<T>())
  }

  pub fn resolve_named<T: ?Sized + Any + Send + Sync>(&mut self, name: &str) -> Result<Arc<T>> {
    self.resolve_as::<T>(&Key::named::<T>(name))
  }

  /// Resolves every member of `group` bound as `T`, in declaration order.
  pub fn resolve_group<T: ?Sized + Any + Send + Sync>(&mut self, group: &str) -> Result<Vec<Arc<T>>> {
    let key = Key::grouped::<T>(group);
    let members = self.resolver().resolve_group(&key)?;
    members
      .iter()
      .map(|member| downcast::<T>(member, &key))
      .collect()
  }

  pub fn resolve_key(&mut self, key: &Key) -> Result<Instance> {
    self.resolver().resolve(key)
  }

  fn resolve_as<T: ?Sized + Any + Send + Sync>(&mut self, key: &Key) -> Result<Arc<T>> {
    let instance = self.resolver().resolve(key)?;
    downcast::<T>(&instance, key)
  }

  /// Resolves an invoke target as its own resolution attempt and runs it.
  pub fn invoke(&mut self, invoke: &Invoke) -> Result<()> {
    self.events.log_event(&Event::Invoking {
      function: invoke.label(),
    });
    let result = self.resolver().invoke(invoke);
    self.events.log_event(&Event::Invoked {
      function: invoke.label(),
      error: result.as_ref().err(),
    });
    result
  }

  // --- Accessors ---

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  pub fn lifecycle(&self) -> &Lifecycle {
    &self.lifecycle
  }

  pub fn lifecycle_mut(&mut self) -> &mut Lifecycle {
    &mut self.lifecycle
  }
}

impl Default for Container {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("registry", &self.registry)
      .field("lifecycle", &self.lifecycle)
      .finish_non_exhaustive()
  }
}

fn downcast<T: ?Sized + Any + Send + Sync>(instance: &Instance, key: &Key) -> Result<Arc<T>> {
  instance
    .downcast::<T>()
    .ok_or_else(|| Error::Construction {
      provider: key.to_string(),
      source: format!("value bound as {} has an unexpected type", key).into(),
    })
}

/// The phase of an [`App`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Resolving,
  Starting,
  Running,
  Stopping,
  Stopped,
  Failed,
}

/// Collects providers, invoke targets and settings for an [`App`].
pub struct AppBuilder {
  providers: Vec<Provider>,
  invokes: Vec<Invoke>,
  start_timeout: Duration,
  stop_timeout: Duration,
  events: Arc<dyn EventLogger>,
  os_signals: bool,
}

impl AppBuilder {
  pub fn provide(mut self, provider: Provider) -> Self {
    self.providers.push(provider);
    self
  }

  /// Adds an invoke target. Targets are resolved in the order added.
  pub fn invoke(mut self, invoke: Invoke) -> Self {
    self.invokes.push(invoke);
    self
  }

  pub fn start_timeout(mut self, timeout: Duration) -> Self {
    self.start_timeout = timeout;
    self
  }

  /// Shutdown budget. Also bounds the compensating stops after a failed
  /// start.
  pub fn stop_timeout(mut self, timeout: Duration) -> Self {
    self.stop_timeout = timeout;
    self
  }

  pub fn event_logger(mut self, events: impl EventLogger + 'static) -> Self {
    self.events = Arc::new(events);
    self
  }

  /// Whether [`App::wait`] completes on SIGINT/SIGTERM. Enabled by default.
  pub fn os_signals(mut self, enabled: bool) -> Self {
    self.os_signals = enabled;
    self
  }

  /// Registers every provider. Registration errors surface here, before
  /// anything is resolved.
  pub fn build(self) -> Result<App> {
    let mut container = Container::with_event_logger(self.events);
    let (shutdowner, signals) = Shutdowner::channel();
    container.provide(Provider::supply(shutdowner.clone()))?;
    for provider in self.providers {
      container.provide(provider)?;
    }
    if let Some(invoke) = self.invokes.iter().find(|invoke| !invoke.provider.results.is_empty()) {
      return Err(Error::InvalidProvider {
        provider: invoke.label().to_owned(),
        reason: "an invoke target cannot declare results".to_owned(),
      });
    }

    Ok(App {
      container,
      invokes: self.invokes,
      phase: Phase::Idle,
      start_timeout: self.start_timeout,
      stop_timeout: self.stop_timeout,
      os_signals: self.os_signals,
      shutdowner,
      signals,
    })
  }
}

/// An assembled application: resolves its invoke targets, starts the hooks
/// registered while constructing them, waits for a termination signal and
/// stops the hooks again.
///
/// ```no_run
/// use fibre_app::{App, Hook, Invoke, Key, Provider};
///
/// struct Listener;
///
/// # async fn example() -> fibre_app::Result<()> {
/// let mut app = App::builder()
///   .provide(Provider::builder("new_listener").value(|ctx| {
///     ctx.on_lifecycle(
///       Hook::new("listener")
///         .on_start(|_| async { Ok(()) })
///         .on_stop(|_| async { Ok(()) }),
///     )?;
///     Ok(Listener)
///   }))
///   .invoke(Invoke::requiring("serve", [Key::of::<Listener>()]))
///   .build()?;
///
/// app.run().await
/// # }
/// ```
pub struct App {
  container: Container,
  invokes: Vec<Invoke>,
  phase: Phase,
  start_timeout: Duration,
  stop_timeout: Duration,
  os_signals: bool,
  shutdowner: Shutdowner,
  signals: mpsc::UnboundedReceiver<ShutdownSignal>,
}

impl App {
  pub fn builder() -> AppBuilder {
    AppBuilder {
      providers: Vec::new(),
      invokes: Vec::new(),
      start_timeout: DEFAULT_TIMEOUT,
      stop_timeout: DEFAULT_TIMEOUT,
      events: Arc::new(TracingLogger),
      os_signals: true,
    }
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn container(&mut self) -> &mut Container {
    &mut self.container
  }

  pub fn shutdowner(&self) -> Shutdowner {
    self.shutdowner.clone()
  }

  /// Requests a graceful shutdown; a pending or later [`wait`](Self::wait)
  /// completes with [`ShutdownSignal::Requested`].
  pub fn shutdown(&self) {
    self.shutdowner.shutdown();
  }

  /// Resolves every invoke target, then runs all start actions in
  /// construction order. Nothing starts if any target fails to resolve.
  pub async fn start(&mut self) -> Result<()> {
    if self.phase != Phase::Idle {
      return Err(Error::InvalidPhase {
        action: "start",
        phase: self.phase,
      });
    }

    for invoke in &self.invokes {
      self.phase = Phase::Resolving;
      if let Err(err) = self.container.invoke(invoke) {
        self.phase = Phase::Failed;
        self.container.events.log_event(&Event::Started { error: Some(&err) });
        return Err(err);
      }
    }

    self.phase = Phase::Starting;
    let deadline = Instant::now() + self.start_timeout;
    let result = self
      .container
      .lifecycle
      .start_all(deadline, self.stop_timeout)
      .await;
    self.phase = match result {
      Ok(()) => Phase::Running,
      Err(_) => Phase::Failed,
    };
    self.container.events.log_event(&Event::Started {
      error: result.as_ref().err(),
    });
    result
  }

  /// Waits for a termination signal: OS signals (unless disabled) or a
  /// request made through a [`Shutdowner`].
  pub async fn wait(&mut self) -> ShutdownSignal {
    let signal = if self.os_signals {
      tokio::select! {
        Some(signal) = self.signals.recv() => signal,
        signal = os_signal() => signal,
      }
    } else {
      // `self.shutdowner` keeps the channel open.
      self
        .signals
        .recv()
        .await
        .unwrap_or(ShutdownSignal::Requested)
    };
    self.container.events.log_event(&Event::Signaled { signal: &signal });
    signal
  }

  /// Stops every started hook within the configured stop timeout.
  pub async fn stop(&mut self) -> Result<()> {
    self
      .stop_with_deadline(Instant::now() + self.stop_timeout)
      .await
  }

  /// Stops every started hook in reverse construction order. Stopping an
  /// application that already stopped, failed, or never started succeeds
  /// without doing anything.
  pub async fn stop_with_deadline(&mut self, deadline: Instant) -> Result<()> {
    match self.phase {
      // A dropped `start` future leaves the app in `Starting`; the hooks
      // started so far still get stopped.
      Phase::Running | Phase::Starting => {}
      Phase::Idle => {
        self.phase = Phase::Stopped;
        return Ok(());
      }
      Phase::Stopped | Phase::Failed => return Ok(()),
      phase => {
        return Err(Error::InvalidPhase {
          action: "stop",
          phase,
        })
      }
    }

    self.phase = Phase::Stopping;
    let result = self.container.lifecycle.stop_all(deadline).await;
    self.phase = match result {
      Ok(()) => Phase::Stopped,
      Err(_) => Phase::Failed,
    };
    self.container.events.log_event(&Event::Stopped {
      error: result.as_ref().err(),
    });
    result
  }

  /// Starts the application, blocks until a termination signal and stops it.
  ///
  /// A fatal error reported through a [`Shutdowner`] fails the run even when
  /// the shutdown itself succeeds.
  pub async fn run(&mut self) -> Result<()> {
    self.start().await?;
    let signal = self.wait().await;
    let stopped = self.stop().await;
    match signal {
      ShutdownSignal::Fatal(source) => Err(Error::Fatal {
        source,
        shutdown: match stopped {
          Err(Error::Stop(errors)) => Some(errors),
          _ => None,
        },
      }),
      _ => stopped,
    }
  }
}

impl fmt::Debug for App {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("App")
      .field("phase", &self.phase)
      .field("container", &self.container)
      .field("invokes", &self.invokes)
      .finish_non_exhaustive()
  }
}
