//! Binding keys: the identity of every value the container can produce.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The capability half of a [`Key`]: the type (or trait object) a value is
/// bound as.
///
/// Equality and hashing only consider the `TypeId`; the type name is kept
/// for error messages.
#[derive(Clone, Copy)]
pub struct Capability {
  id: TypeId,
  type_name: &'static str,
}

impl Capability {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
    }
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }
}

impl PartialEq for Capability {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for Capability {}

impl Hash for Capability {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.type_name)
  }
}

/// Identity of a producible value: a capability plus an optional name or an
/// optional group tag.
///
/// A grouped key never equals the singular key of the same capability, so a
/// value contributed to a group cannot be resolved on its own.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
  capability: Capability,
  name: Option<String>,
  group: Option<String>,
}

impl Key {
  /// The unnamed singular key for `T`.
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      capability: Capability::of::<T>(),
      name: None,
      group: None,
    }
  }

  /// A singular key for `T` distinguished by `name`.
  pub fn named<T: ?Sized + Any>(name: &str) -> Self {
    Self {
      capability: Capability::of::<T>(),
      name: Some(name.to_owned()),
      group: None,
    }
  }

  /// The key of the value group `group` whose members are bound as `T`.
  pub fn grouped<T: ?Sized + Any>(group: &str) -> Self {
    Self {
      capability: Capability::of::<T>(),
      name: None,
      group: Some(group.to_owned()),
    }
  }

  /// Turns this key into a dependency that tolerates a missing producer.
  pub fn optional(self) -> Dependency {
    Dependency {
      key: self,
      optional: true,
    }
  }

  pub fn capability(&self) -> Capability {
    self.capability
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn group(&self) -> Option<&str> {
    self.group.as_deref()
  }

  pub fn is_group(&self) -> bool {
    self.group.is_some()
  }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.capability.type_name)?;
    if let Some(name) = &self.name {
      write!(f, "[name = {:?}]", name)?;
    }
    if let Some(group) = &self.group {
      write!(f, "[group = {:?}]", group)?;
    }
    Ok(())
  }
}

impl fmt::Debug for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Key({})", self)
  }
}

/// A parameter declared by a provider: the key it needs and whether a missing
/// producer is acceptable.
///
/// Group parameters are always satisfiable; an empty group resolves to an
/// empty sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
  pub(crate) key: Key,
  pub(crate) optional: bool,
}

impl Dependency {
  pub fn key(&self) -> &Key {
    &self.key
  }

  pub fn is_optional(&self) -> bool {
    self.optional
  }
}

impl From<Key> for Dependency {
  fn from(key: Key) -> Self {
    Self {
      key,
      optional: false,
    }
  }
}

/// A constructed value as stored in the instance cache.
///
/// The payload is always an `Arc<T>` for the bound capability `T`, which lets
/// trait-object capabilities share the same storage as concrete types.
#[derive(Clone)]
pub struct Instance(Arc<dyn Any + Send + Sync>);

impl Instance {
  pub(crate) fn new<T: ?Sized + Any + Send + Sync>(value: Arc<T>) -> Self {
    Self(Arc::new(value))
  }

  /// Returns the value as `Arc<T>`, or `None` if it is bound as another type.
  pub fn downcast<T: ?Sized + Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.0.downcast_ref::<Arc<T>>().cloned()
  }

  /// Whether both instances are the same cached allocation.
  pub fn ptr_eq(&self, other: &Instance) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl fmt::Debug for Instance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Instance(..)")
  }
}
