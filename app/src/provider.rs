//! Provider descriptors and the construction context handed to constructors.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::key::{Dependency, Instance, Key};
use crate::lifecycle::Hook;

pub(crate) type ConstructorFn =
  Box<dyn Fn(&mut Construction<'_>) -> Result<(), BoxError> + Send + Sync>;

/// A constructor together with the keys it requires and the keys it produces.
///
/// Providers are described up front: the container never inspects a
/// constructor to discover its dependencies, it only trusts the declared
/// parameter and result lists.
///
/// ```
/// use fibre_app::{Key, Provider};
///
/// struct Config {
///   addr: String,
/// }
/// struct Server {
///   addr: String,
/// }
///
/// let config = Provider::supply(Config { addr: "127.0.0.1:8080".into() });
/// let server = Provider::builder("new_server")
///   .param(Key::of::<Config>())
///   .value(|ctx| {
///     let config = ctx.get::<Config>()?;
///     Ok(Server { addr: config.addr.clone() })
///   });
///
/// assert_eq!(server.results(), &[Key::of::<Server>()]);
/// # let _ = config;
/// ```
pub struct Provider {
  pub(crate) label: String,
  pub(crate) params: Vec<Dependency>,
  pub(crate) results: Vec<Key>,
  pub(crate) constructor: ConstructorFn,
}

impl Provider {
  /// Starts describing a provider. `label` names it in errors and events.
  pub fn builder(label: impl Into<String>) -> ProviderBuilder {
    ProviderBuilder {
      label: label.into(),
      params: Vec::new(),
      results: Vec::new(),
    }
  }

  /// A provider for an already built value, bound as the unnamed `T`.
  pub fn supply<T: Any + Send + Sync>(value: T) -> Provider {
    let value = Arc::new(value);
    Provider::builder(format!("supply {}", type_name::<T>()))
      .result(Key::of::<T>())
      .build(move |ctx| ctx.provide(Arc::clone(&value)))
  }

  /// A provider for an already built value, bound as `T` under `name`.
  pub fn supply_named<T: Any + Send + Sync>(name: &str, value: T) -> Provider {
    let value = Arc::new(value);
    let owned_name = name.to_owned();
    Provider::builder(format!("supply {}[{}]", type_name::<T>(), name))
      .result(Key::named::<T>(name))
      .build(move |ctx| ctx.provide_named(&owned_name, Arc::clone(&value)))
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn params(&self) -> &[Dependency] {
    &self.params
  }

  pub fn results(&self) -> &[Key] {
    &self.results
  }
}

impl fmt::Debug for Provider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Provider")
      .field("label", &self.label)
      .field("params", &self.params)
      .field("results", &self.results)
      .finish_non_exhaustive()
  }
}

/// Collects the declared parameters and results of a [`Provider`] or an
/// [`Invoke`].
#[derive(Debug)]
pub struct ProviderBuilder {
  label: String,
  params: Vec<Dependency>,
  results: Vec<Key>,
}

impl ProviderBuilder {
  /// Declares a parameter. Pass a [`Key`] for a required binding, or
  /// `key.optional()` for one that may be absent. Group keys request the
  /// whole group.
  pub fn param(mut self, dependency: impl Into<Dependency>) -> Self {
    self.params.push(dependency.into());
    self
  }

  /// Declares a produced key. A provider may declare several results,
  /// including the same group key more than once.
  pub fn result(mut self, key: Key) -> Self {
    self.results.push(key);
    self
  }

  /// Finishes the provider with a constructor that fills every declared
  /// result through the [`Construction`] it receives.
  pub fn build<F>(self, constructor: F) -> Provider
  where
    F: Fn(&mut Construction<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
  {
    Provider {
      label: self.label,
      params: self.params,
      results: self.results,
      constructor: Box::new(constructor),
    }
  }

  /// Finishes the provider with a constructor returning a single value bound
  /// as the unnamed `T`.
  pub fn value<T, F>(self, constructor: F) -> Provider
  where
    T: Any + Send + Sync,
    F: Fn(&mut Construction<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
  {
    self.result(Key::of::<T>()).build(move |ctx| {
      let value = constructor(ctx)?;
      ctx.provide(Arc::new(value))
    })
  }

  /// Finishes an invoke target: a function run for its dependencies and side
  /// effects, producing nothing.
  pub fn invoke<F>(self, function: F) -> Invoke
  where
    F: Fn(&mut Construction<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
  {
    Invoke {
      provider: self.build(function),
    }
  }
}

/// An entry point whose resolution forces construction of its dependencies.
#[derive(Debug)]
pub struct Invoke {
  pub(crate) provider: Provider,
}

impl Invoke {
  /// An invoke target that only demands `dependencies` to be built.
  pub fn requiring<I, D>(label: impl Into<String>, dependencies: I) -> Invoke
  where
    I: IntoIterator<Item = D>,
    D: Into<Dependency>,
  {
    let builder = dependencies
      .into_iter()
      .fold(Provider::builder(label), |builder, dependency| {
        builder.param(dependency)
      });
    builder.invoke(|_| Ok(()))
  }

  pub fn label(&self) -> &str {
    &self.provider.label
  }

  pub fn params(&self) -> &[Dependency] {
    &self.provider.params
  }
}

/// A resolved parameter, positionally matching the declared parameters.
pub(crate) enum Arg {
  Single(Option<Instance>),
  Group(Vec<Instance>),
}

/// The view a constructor has of one construction: its resolved parameters,
/// its result slots and the lifecycle side channel.
pub struct Construction<'a> {
  label: &'a str,
  params: &'a [Dependency],
  args: Vec<Arg>,
  results: &'a [Key],
  outputs: Vec<Option<Instance>>,
  hook: Option<Hook>,
}

impl<'a> Construction<'a> {
  pub(crate) fn new(
    label: &'a str,
    params: &'a [Dependency],
    args: Vec<Arg>,
    results: &'a [Key],
  ) -> Self {
    Self {
      label,
      params,
      args,
      results,
      outputs: vec![None; results.len()],
      hook: None,
    }
  }

  /// The label of the provider being constructed.
  pub fn label(&self) -> &str {
    self.label
  }

  // --- Parameters ---

  pub fn get<T: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<T>, BoxError> {
    self.required::<T>(&Key::of::<T>())
  }

  pub fn get_named<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, BoxError> {
    self.required::<T>(&Key::named::<T>(name))
  }

  /// Returns `None` when an optional parameter has no producer.
  pub fn get_optional<T: ?Sized + Any + Send + Sync>(&self) -> Result<Option<Arc<T>>, BoxError> {
    self.single::<T>(&Key::of::<T>())
  }

  pub fn get_optional_named<T: ?Sized + Any + Send + Sync>(
    &self,
    name: &str,
  ) -> Result<Option<Arc<T>>, BoxError> {
    self.single::<T>(&Key::named::<T>(name))
  }

  /// Every member of `group`, in provider declaration order.
  pub fn get_group<T: ?Sized + Any + Send + Sync>(&self, group: &str) -> Result<Vec<Arc<T>>, BoxError> {
    let key = Key::grouped::<T>(group);
    match self.arg(&key)? {
      Arg::Group(members) => members
        .iter()
        .map(|member| member.downcast::<T>().ok_or_else(|| self.mismatch(&key)))
        .collect(),
      Arg::Single(_) => Err(self.mismatch(&key)),
    }
  }

  fn required<T: ?Sized + Any + Send + Sync>(&self, key: &Key) -> Result<Arc<T>, BoxError> {
    self.single::<T>(key)?.ok_or_else(|| {
      format!(
        "optional parameter {} of '{}' has no producer",
        key, self.label
      )
      .into()
    })
  }

  fn single<T: ?Sized + Any + Send + Sync>(&self, key: &Key) -> Result<Option<Arc<T>>, BoxError> {
    match self.arg(key)? {
      Arg::Single(Some(instance)) => instance
        .downcast::<T>()
        .map(Some)
        .ok_or_else(|| self.mismatch(key)),
      Arg::Single(None) => Ok(None),
      Arg::Group(_) => Err(self.mismatch(key)),
    }
  }

  fn arg(&self, key: &Key) -> Result<&Arg, BoxError> {
    let index = self
      .params
      .iter()
      .position(|dependency| dependency.key == *key)
      .ok_or_else(|| format!("{} is not a declared parameter of '{}'", key, self.label))?;
    Ok(&self.args[index])
  }

  fn mismatch(&self, key: &Key) -> BoxError {
    format!("value resolved for {} in '{}' has an unexpected type", key, self.label).into()
  }

  // --- Results ---

  pub fn provide<T: ?Sized + Any + Send + Sync>(&mut self, value: Arc<T>) -> Result<(), BoxError> {
    self.output(Key::of::<T>(), Instance::new(value))
  }

  pub fn provide_named<T: ?Sized + Any + Send + Sync>(
    &mut self,
    name: &str,
    value: Arc<T>,
  ) -> Result<(), BoxError> {
    self.output(Key::named::<T>(name), Instance::new(value))
  }

  /// Contributes a member to `group`. Repeated calls fill the provider's
  /// declared slots for that group in order.
  pub fn provide_grouped<T: ?Sized + Any + Send + Sync>(
    &mut self,
    group: &str,
    value: Arc<T>,
  ) -> Result<(), BoxError> {
    self.output(Key::grouped::<T>(group), Instance::new(value))
  }

  fn output(&mut self, key: Key, instance: Instance) -> Result<(), BoxError> {
    let results = self.results;
    let slot = results
      .iter()
      .zip(self.outputs.iter_mut())
      .find(|(declared, output)| **declared == key && output.is_none());
    match slot {
      Some((_, output)) => {
        *output = Some(instance);
        Ok(())
      }
      None if results.contains(&key) => {
        Err(format!("'{}' provided {} more than once", self.label, key).into())
      }
      None => Err(format!("{} is not a declared result of '{}'", key, self.label).into()),
    }
  }

  // --- Lifecycle ---

  /// Registers the lifecycle hook of the value being constructed. The hook is
  /// appended to the application's lifecycle only if construction succeeds.
  pub fn on_lifecycle(&mut self, hook: Hook) -> Result<(), BoxError> {
    if self.hook.is_some() {
      return Err(format!("'{}' registered more than one lifecycle hook", self.label).into());
    }
    self.hook = Some(hook);
    Ok(())
  }

  /// Checks that every declared result was provided.
  pub(crate) fn finish(self) -> Result<(Vec<Instance>, Option<Hook>), BoxError> {
    let mut instances = Vec::with_capacity(self.outputs.len());
    for (key, output) in self.results.iter().zip(self.outputs) {
      match output {
        Some(instance) => instances.push(instance),
        None => return Err(format!("'{}' did not provide {}", self.label, key).into()),
      }
    }
    Ok((instances, self.hook))
  }
}
