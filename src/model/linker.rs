//! The link pass and the symmetric relation helpers.
//!
//! Resolution happens only after the whole document is registered, so
//! forward references work regardless of element order. Each descriptor is
//! dispatched on its source object's type; the source checks the kind and
//! the target's type, stores the forward edge and updates the target's
//! back reference in the same call.

use super::keys::{Key, RefList};
use super::object::{Entity, ObjectRef};
use super::reference::{DescriptorState, LinkOp, RefKind, ReferenceQueue};
use super::registry::Registry;
use super::Model;
use crate::error::OmeError;

/// Resolves every queued descriptor, in enqueue order.
///
/// Descriptors already resolved (or failed) by an earlier pass are
/// skipped. The pass stops at the first failure; that descriptor is left
/// in the `Failed` state and the error is returned. Returns the number of
/// descriptors resolved.
pub fn resolve_all(
    model: &mut Model,
    queue: &mut ReferenceQueue,
    registry: &Registry,
) -> Result<usize, OmeError> {
    let mut resolved = 0;
    for descriptor in queue
        .descriptors
        .iter_mut()
        .filter(|d| d.state == DescriptorState::Queued)
    {
        let outcome = match registry.resolve(&descriptor.target_id) {
            Some(target) => model
                .dispatch_relate(descriptor.source, descriptor.kind, target, LinkOp::Link)
                .map(|_| ()),
            None => Err(OmeError::DanglingReference {
                owner: model.describe(descriptor.source),
                kind: descriptor.kind,
                id: descriptor.target_id.clone(),
            }),
        };

        match outcome {
            Ok(()) => {
                descriptor.state = DescriptorState::Resolved;
                resolved += 1;
            }
            Err(err) => {
                tracing::debug!(
                    target_id = %descriptor.target_id,
                    kind = %descriptor.kind,
                    "reference failed to resolve"
                );
                descriptor.state = DescriptorState::Failed(err.to_string());
                return Err(err);
            }
        }
    }
    tracing::debug!(resolved, "link pass complete");
    Ok(resolved)
}

/// Narrows `target` to the type `kind` requires.
pub(crate) fn expect<T: Entity>(
    model: &Model,
    kind: RefKind,
    target: ObjectRef,
) -> Result<Key<T>, OmeError> {
    T::from_object_ref(target).ok_or_else(|| OmeError::ReferenceTypeMismatch {
        kind,
        id: model.id_of(target).unwrap_or_default().to_string(),
        expected: T::TYPE_NAME,
        found: target.type_name(),
    })
}

pub(crate) fn unsupported<S: Entity>(kind: RefKind) -> OmeError {
    OmeError::UnsupportedReferenceKind {
        owner: S::TYPE_NAME,
        kind,
    }
}

/// Links or unlinks a many-valued reference and its back reference.
pub(crate) fn relate_many<S: Entity, T: Entity, B: Copy + PartialEq>(
    model: &mut Model,
    source: Key<S>,
    target: Key<T>,
    back_item: B,
    op: LinkOp,
    forward: fn(&mut S) -> &mut RefList<Key<T>>,
    back: fn(&mut T) -> &mut RefList<B>,
) -> bool {
    match op {
        LinkOp::Link => {
            let added = forward(&mut S::arena_mut(model)[source]).link(target);
            back(&mut T::arena_mut(model)[target]).link(back_item);
            added
        }
        LinkOp::Unlink => {
            let removed = forward(&mut S::arena_mut(model)[source]).unlink(target);
            back(&mut T::arena_mut(model)[target]).unlink(back_item);
            removed
        }
    }
}

/// Links or unlinks a single-valued reference and its back reference.
///
/// Linking replaces any previous target, which loses its back edge.
/// Unlinking only clears the slot when it holds `target`.
pub(crate) fn relate_one<S: Entity, T: Entity, B: Copy + PartialEq>(
    model: &mut Model,
    source: Key<S>,
    target: Key<T>,
    back_item: B,
    op: LinkOp,
    forward: fn(&mut S) -> &mut Option<Key<T>>,
    back: fn(&mut T) -> &mut RefList<B>,
) -> bool {
    let slot = forward(&mut S::arena_mut(model)[source]);
    match op {
        LinkOp::Link => {
            let previous = slot.replace(target);
            if let Some(previous) = previous.filter(|p| *p != target) {
                back(&mut T::arena_mut(model)[previous]).unlink(back_item);
            }
            back(&mut T::arena_mut(model)[target]).link(back_item);
            previous != Some(target)
        }
        LinkOp::Unlink => {
            if *slot != Some(target) {
                return false;
            }
            *slot = None;
            back(&mut T::arena_mut(model)[target]).unlink(back_item);
            true
        }
    }
}
