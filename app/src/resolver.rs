//! Graph resolution: planning and running constructors in dependency order.
//!
//! Each resolution attempt first walks the declared graph to find missing
//! bindings and cycles, so no constructor runs for a graph that cannot be
//! built. It then constructs the planned providers in topological order.

use std::collections::HashSet;

use once_cell::unsync::OnceCell;

use crate::error::{Error, Result};
use crate::event::{Event, EventLogger};
use crate::key::{Dependency, Instance, Key};
use crate::lifecycle::Lifecycle;
use crate::provider::{Arg, Construction, Invoke};
use crate::registry::{ProviderId, Registry};

/// Outputs of each provider, indexed by `ProviderId`.
///
/// A cell is only filled by a successful construction; a failed constructor
/// leaves it empty so a later attempt may run it again.
pub(crate) type InstanceCache = Vec<OnceCell<Vec<Instance>>>;

/// One resolution attempt over a container's registry.
pub struct Resolver<'c> {
  registry: &'c Registry,
  cache: &'c InstanceCache,
  lifecycle: &'c mut Lifecycle,
  events: &'c dyn EventLogger,
}

impl<'c> Resolver<'c> {
  pub(crate) fn new(
    registry: &'c Registry,
    cache: &'c InstanceCache,
    lifecycle: &'c mut Lifecycle,
    events: &'c dyn EventLogger,
  ) -> Self {
    Self {
      registry,
      cache,
      lifecycle,
      events,
    }
  }

  /// Resolves a singular key, constructing its dependencies first.
  /// Resolving the same key again returns the cached instance.
  pub fn resolve(&mut self, key: &Key) -> Result<Instance> {
    let slot = self
      .registry
      .singular_slot(key)
      .ok_or_else(|| Error::MissingBinding {
        key: key.clone(),
        required_by: "resolve".to_owned(),
      })?;
    self.build(&[Dependency::from(key.clone())], "resolve")?;
    Ok(self.cached(slot.provider)[slot.result].clone())
  }

  /// Resolves every member of a group in declaration order. A group without
  /// members resolves to an empty sequence.
  pub fn resolve_group(&mut self, key: &Key) -> Result<Vec<Instance>> {
    if !key.is_group() {
      return Err(Error::MissingBinding {
        key: key.clone(),
        required_by: "resolve_group".to_owned(),
      });
    }
    self.build(&[Dependency::from(key.clone())], "resolve_group")?;
    Ok(
      self
        .registry
        .group_slots(key)
        .iter()
        .map(|slot| self.cached(slot.provider)[slot.result].clone())
        .collect(),
    )
  }

  /// Builds the dependencies of an invoke target and runs it.
  pub fn invoke(&mut self, invoke: &Invoke) -> Result<()> {
    let provider = &invoke.provider;
    if !provider.results.is_empty() {
      return Err(Error::InvalidProvider {
        provider: provider.label.clone(),
        reason: "an invoke target cannot declare results".to_owned(),
      });
    }
    self.build(&provider.params, &provider.label)?;

    let args = collect_args(self.registry, self.cache, &provider.params);
    let mut construction = Construction::new(&provider.label, &provider.params, args, &[]);
    let (_, hook) = (provider.constructor)(&mut construction)
      .and_then(|()| construction.finish())
      .map_err(|source| Error::Construction {
        provider: provider.label.clone(),
        source,
      })?;
    if let Some(hook) = hook {
      self.lifecycle.append(hook);
    }
    Ok(())
  }

  fn build(&mut self, roots: &[Dependency], required_by: &str) -> Result<()> {
    let mut plan = Plan {
      registry: self.registry,
      cache: self.cache,
      stack: Vec::new(),
      visited: HashSet::new(),
      order: Vec::new(),
    };
    for root in roots {
      plan.visit_dependency(root, required_by)?;
    }
    for id in plan.order {
      self.construct(id)?;
    }
    Ok(())
  }

  fn construct(&mut self, id: ProviderId) -> Result<()> {
    let registry = self.registry;
    let cache = self.cache;
    let descriptor = registry.descriptor(id);

    let mut hook = None;
    cache[id.index()].get_or_try_init(|| {
      let args = collect_args(registry, cache, descriptor.params());
      let mut construction = Construction::new(
        descriptor.label(),
        descriptor.params(),
        args,
        descriptor.results(),
      );
      let (instances, constructed_hook) = (descriptor.constructor)(&mut construction)
        .and_then(|()| construction.finish())
        .map_err(|source| Error::Construction {
          provider: descriptor.label().to_owned(),
          source,
        })?;
      hook = constructed_hook;
      Ok::<_, Error>(instances)
    })?;

    self.events.log_event(&Event::Constructed {
      provider: descriptor.label(),
    });
    if let Some(hook) = hook {
      self.lifecycle.append(hook);
    }
    Ok(())
  }

  fn cached(&self, id: ProviderId) -> &'c [Instance] {
    let cache: &'c InstanceCache = self.cache;
    cache[id.index()].get().map(Vec::as_slice).unwrap_or(&[])
  }
}

/// Gathers the already constructed values for `params`, in declared order.
fn collect_args(registry: &Registry, cache: &InstanceCache, params: &[Dependency]) -> Vec<Arg> {
  let lookup = |provider: ProviderId, result: usize| {
    cache[provider.index()]
      .get()
      .and_then(|instances| instances.get(result))
      .cloned()
  };
  params
    .iter()
    .map(|dependency| {
      if dependency.key.is_group() {
        Arg::Group(
          registry
            .group_slots(&dependency.key)
            .iter()
            .filter_map(|slot| lookup(slot.provider, slot.result))
            .collect(),
        )
      } else {
        Arg::Single(
          registry
            .singular_slot(&dependency.key)
            .and_then(|slot| lookup(slot.provider, slot.result)),
        )
      }
    })
    .collect()
}

/// Depth-first walk of the declared graph producing a construction order.
struct Plan<'c> {
  registry: &'c Registry,
  cache: &'c InstanceCache,
  // Providers being visited, with the key each was reached through.
  stack: Vec<(Key, ProviderId)>,
  visited: HashSet<ProviderId>,
  order: Vec<ProviderId>,
}

impl<'c> Plan<'c> {
  fn visit_dependency(&mut self, dependency: &Dependency, required_by: &str) -> Result<()> {
    let registry = self.registry;
    let key = &dependency.key;
    if key.is_group() {
      for slot in registry.group_slots(key) {
        self.visit_provider(slot.provider, key)?;
      }
      return Ok(());
    }
    match registry.singular_slot(key) {
      Some(slot) => self.visit_provider(slot.provider, key),
      None if dependency.optional => Ok(()),
      None => Err(Error::MissingBinding {
        key: key.clone(),
        required_by: required_by.to_owned(),
      }),
    }
  }

  fn visit_provider(&mut self, id: ProviderId, via: &Key) -> Result<()> {
    if self.visited.contains(&id) || self.cache[id.index()].get().is_some() {
      return Ok(());
    }
    if let Some(start) = self.stack.iter().position(|(_, on_stack)| *on_stack == id) {
      let mut path: Vec<Key> = self.stack[start..].iter().map(|(key, _)| key.clone()).collect();
      path.push(via.clone());
      return Err(Error::Cycle { path });
    }

    let registry = self.registry;
    let descriptor = registry.descriptor(id);
    self.stack.push((via.clone(), id));
    for dependency in descriptor.params() {
      self.visit_dependency(dependency, descriptor.label())?;
    }
    self.stack.pop();
    self.visited.insert(id);
    self.order.push(id);
    Ok(())
  }
}
