//! Document-scoped ID → object lookup table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::object::ObjectRef;
use crate::error::OmeError;

/// What to do when a second, different object claims an ID.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateIdPolicy {
    /// Fail with [`OmeError::DuplicateId`].
    #[default]
    Error,
    /// Replace the earlier entry with the later one.
    LastWriteWins,
}

/// Outcome of a successful registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The ID was not known before.
    New,
    /// The same object was registered again under the same ID.
    Unchanged,
    /// A different object previously held the ID and was replaced.
    Replaced(ObjectRef),
}

/// Maps XML `ID` strings to the objects they denote.
///
/// Entries keep registration order, which is document order.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: IndexMap<String, ObjectRef>,
    policy: DuplicateIdPolicy,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicateIdPolicy) -> Self {
        Self {
            entries: IndexMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicateIdPolicy {
        self.policy
    }

    /// Registers `object` under `id`.
    ///
    /// Registering the same object twice is allowed; a different object
    /// under a taken ID is handled according to the duplicate policy.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        object: ObjectRef,
    ) -> Result<Registration, OmeError> {
        let id = id.into();
        match self.entries.get(&id).copied() {
            None => {
                self.entries.insert(id, object);
                Ok(Registration::New)
            }
            Some(existing) if existing == object => Ok(Registration::Unchanged),
            Some(existing) => match self.policy {
                DuplicateIdPolicy::Error => Err(OmeError::DuplicateId {
                    id,
                    existing: existing.type_name(),
                    incoming: object.type_name(),
                }),
                DuplicateIdPolicy::LastWriteWins => {
                    self.entries.insert(id, object);
                    Ok(Registration::Replaced(existing))
                }
            },
        }
    }

    pub fn resolve(&self, id: &str) -> Option<ObjectRef> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ObjectRef)> {
        self.entries.iter().map(|(id, obj)| (id.as_str(), *obj))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Annotation, Channel, Entity, Model};

    fn two_objects() -> (ObjectRef, ObjectRef) {
        let mut model = Model::default();
        let channel = model.alloc(Channel::default());
        let annotation = model.alloc(Annotation::default());
        (Channel::object_ref(channel), Annotation::object_ref(annotation))
    }

    #[test]
    fn register_then_resolve() {
        let (channel, _) = two_objects();
        let mut registry = Registry::new();
        assert_eq!(
            registry.register("Channel:0", channel).unwrap(),
            Registration::New
        );
        assert_eq!(registry.resolve("Channel:0"), Some(channel));
        assert_eq!(registry.resolve("Channel:1"), None);
    }

    #[test]
    fn re_registering_same_object_is_a_no_op() {
        let (channel, _) = two_objects();
        let mut registry = Registry::new();
        registry.register("Channel:0", channel).unwrap();
        assert_eq!(
            registry.register("Channel:0", channel).unwrap(),
            Registration::Unchanged
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_id_is_an_error_by_default() {
        let (channel, annotation) = two_objects();
        let mut registry = Registry::new();
        registry.register("X:0", channel).unwrap();
        let err = registry.register("X:0", annotation).unwrap_err();
        match err {
            OmeError::DuplicateId {
                id,
                existing,
                incoming,
            } => {
                assert_eq!(id, "X:0");
                assert_eq!(existing, "Channel");
                assert_eq!(incoming, "Annotation");
            }
            other => panic!("expected DuplicateId, got {other:?}"),
        }
    }

    #[test]
    fn last_write_wins_replaces_entry() {
        let (channel, annotation) = two_objects();
        let mut registry = Registry::with_policy(DuplicateIdPolicy::LastWriteWins);
        registry.register("X:0", channel).unwrap();
        assert_eq!(
            registry.register("X:0", annotation).unwrap(),
            Registration::Replaced(channel)
        );
        assert_eq!(registry.resolve("X:0"), Some(annotation));
    }
}
