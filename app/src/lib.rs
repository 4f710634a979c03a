//! # Fibre App
//!
//! An explicit dependency-injection container that assembles an application
//! from declared constructors and runs it through an ordered start/stop
//! lifecycle.
//!
//! ## Core Concepts
//!
//! - **Key**: the identity of a producible value, a type (or trait object)
//!   plus an optional name or group tag.
//! - **Provider**: a constructor with the keys it requires and produces,
//!   declared up front.
//! - **Group**: values contributed by several providers, collected in
//!   declaration order and consumed as one sequence.
//! - **Hook**: a start/stop pair registered while constructing a long-running
//!   value. Hooks start in construction order and stop in reverse.
//! - **App**: resolves its invoke targets, starts every hook, waits for a
//!   termination signal and shuts down within a deadline.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_app::{Container, Key, Provider};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!   fn greet(&self) -> String;
//! }
//!
//! struct EnglishGreeter {
//!   message: String,
//! }
//!
//! impl Greeter for EnglishGreeter {
//!   fn greet(&self) -> String {
//!     self.message.clone()
//!   }
//! }
//!
//! let mut container = Container::new();
//! container
//!   .provide(Provider::supply_named("greeting", String::from("Hello, World!")))
//!   .unwrap();
//! container
//!   .provide(
//!     Provider::builder("new_greeter")
//!       .param(Key::named::<String>("greeting"))
//!       .result(Key::of::<dyn Greeter>())
//!       .build(|ctx| {
//!         let message = ctx.get_named::<String>("greeting")?;
//!         let greeter: Arc<dyn Greeter> = Arc::new(EnglishGreeter {
//!           message: (*message).clone(),
//!         });
//!         ctx.provide(greeter)
//!       }),
//!   )
//!   .unwrap();
//!
//! let greeter = container.resolve::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "Hello, World!");
//! ```

mod app;
mod error;
mod event;
mod key;
mod lifecycle;
mod provider;
mod registry;
mod resolver;
mod shutdown;

pub use app::{App, AppBuilder, Container, Phase, DEFAULT_TIMEOUT};
pub use error::{BoxError, Error, Result, StartTimeout, StopErrors, StopFailure, StopTimeout};
pub use event::{Event, EventLogger, NopLogger, TracingLogger};
pub use key::{Capability, Dependency, Instance, Key};
pub use lifecycle::{Hook, Lifecycle, Resource};
pub use provider::{Construction, Invoke, Provider, ProviderBuilder};
pub use registry::{Descriptor, Lookup, ProviderId, Registry};
pub use resolver::Resolver;
pub use shutdown::{ShutdownSignal, Shutdowner};

pub use futures_util::future::BoxFuture;
pub use tokio::time::Instant;
