//! The provider registry: pure bookkeeping of who produces which key.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::key::{Dependency, Key};
use crate::provider::{ConstructorFn, Provider};

/// Identifies a registered provider. Ids follow declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(pub(crate) usize);

impl ProviderId {
  pub fn index(&self) -> usize {
    self.0
  }
}

/// One result position of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Slot {
  pub(crate) provider: ProviderId,
  pub(crate) result: usize,
}

/// A registered, immutable provider.
pub struct Descriptor {
  id: ProviderId,
  label: String,
  params: Vec<Dependency>,
  results: Vec<Key>,
  pub(crate) constructor: ConstructorFn,
}

impl Descriptor {
  pub fn id(&self) -> ProviderId {
    self.id
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

impl fmt::Debug for Descriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Descriptor")
      .field("id", &self.id)
      .field("label", &self.label)
      .field("params", &self.params)
      .field("results", &self.results)
      .finish_non_exhaustive()
  }
}

/// What produces a key.
#[derive(Debug)]
pub enum Lookup<'r> {
  Singular(&'r Descriptor),
  /// Every contributing provider in declaration order, each listed once.
  /// Empty when the group has no members.
  Group(Vec<&'r Descriptor>),
}

#[derive(Debug, Default)]
pub struct Registry {
  descriptors: Vec<Descriptor>,
  singular: HashMap<Key, Slot>,
  groups: HashMap<Key, Vec<Slot>>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records `provider`. Fails without changing the registry when one of its
  /// singular results is already produced, by another provider or by an
  /// earlier result of the same one. Group results never collide.
  pub fn register(&mut self, provider: Provider) -> Result<ProviderId> {
    if provider.results.is_empty() {
      return Err(Error::InvalidProvider {
        provider: provider.label,
        reason: "a provider must declare at least one result".to_owned(),
      });
    }

    let mut seen = HashSet::new();
    for key in provider.results.iter().filter(|key| !key.is_group()) {
      if let Some(existing) = self.singular.get(key) {
        return Err(Error::DuplicateBinding {
          key: key.clone(),
          existing: self.descriptors[existing.provider.0].label.clone(),
          provider: provider.label,
        });
      }
      if !seen.insert(key) {
        return Err(Error::DuplicateBinding {
          key: key.clone(),
          existing: provider.label.clone(),
          provider: provider.label,
        });
      }
    }

    let id = ProviderId(self.descriptors.len());
    for (result, key) in provider.results.iter().enumerate() {
      let slot = Slot {
        provider: id,
        result,
      };
      if key.is_group() {
        self.groups.entry(key.clone()).or_default().push(slot);
      } else {
        self.singular.insert(key.clone(), slot);
      }
    }

    self.descriptors.push(Descriptor {
      id,
      label: provider.label,
      params: provider.params,
      results: provider.results,
      constructor: provider.constructor,
    });
    Ok(id)
  }

  /// The producer of a singular key or the contributors of a group key.
  /// `None` means a singular key nobody produces.
  pub fn lookup(&self, key: &Key) -> Option<Lookup<'_>> {
    if key.is_group() {
      let mut members: Vec<&Descriptor> = Vec::new();
      for slot in self.group_slots(key) {
        if members.last().map(|last| last.id) != Some(slot.provider) {
          members.push(self.descriptor(slot.provider));
        }
      }
      return Some(Lookup::Group(members));
    }
    self
      .singular_slot(key)
      .map(|slot| Lookup::Singular(self.descriptor(slot.provider)))
  }

  pub fn descriptor(&self, id: ProviderId) -> &Descriptor {
    &self.descriptors[id.0]
  }

  pub fn len(&self) -> usize {
    self.descriptors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.descriptors.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
    self.descriptors.iter()
  }

  pub(crate) fn singular_slot(&self, key: &Key) -> Option<Slot> {
    self.singular.get(key).copied()
  }

  /// Member slots of a group in declaration order, then result position.
  pub(crate) fn group_slots(&self, key: &Key) -> &[Slot] {
    self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
  }
}
