//! Entity identifiers and the entity manager.
//!
//! An [`Entity`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and an *index* in the low 32 bits. Indices live in
//! `[0, capacity)`; the generation is bumped every time an index is destroyed,
//! so a handle captured before a destroy-and-recycle is detected as stale.
//!
//! The [`EntityManager`] keeps each live entity's [`Signature`] in a sparse set:
//! `sparse[index]` points into the parallel `dense_entities` /
//! `dense_signatures` arrays, which are compacted with swap-remove on destroy.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::signature::Signature;
use crate::EcsError;

/// Default entity capacity of a scene.
pub const DEFAULT_MAX_ENTITIES: u32 = 5000;

/// Largest entity capacity a scene accepts.
///
/// Every sparse array is sized to the capacity up front, so the ceiling keeps
/// each one at 4 MiB.
pub const MAX_ENTITIES: u32 = 1 << 20;

/// Sentinel stored in sparse arrays for "no dense slot".
pub(crate) const EMPTY_SLOT: u32 = u32::MAX;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A generational entity handle.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(u64);

impl Entity {
    /// Construct an `Entity` from an index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityManager
// ---------------------------------------------------------------------------

/// Issues, recycles and validates [`Entity`] handles and stores their
/// signatures.
///
/// Fresh indices come from a linear counter; destroyed indices go into a FIFO
/// queue and are handed out again (with a bumped generation) before the
/// counter advances, so generations spread over many slots instead of piling
/// up on one hot index.
#[derive(Debug)]
pub struct EntityManager {
    /// Upper bound (exclusive) on entity indices.
    capacity: u32,
    /// Next never-used index.
    next_index: u32,
    /// Current generation per issued index.
    generations: Vec<u32>,
    /// Recyclable indices, oldest first.
    free_indices: VecDeque<u32>,
    /// index -> dense slot, `EMPTY_SLOT` when not alive.
    sparse: Vec<u32>,
    /// Live entities, compacted.
    dense_entities: Vec<Entity>,
    /// Signature of `dense_entities[i]`.
    dense_signatures: Vec<Signature>,
}

impl EntityManager {
    /// Create a manager able to hold `capacity` simultaneously live entities.
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            next_index: 0,
            generations: Vec::new(),
            free_indices: VecDeque::new(),
            sparse: vec![EMPTY_SLOT; capacity as usize],
            dense_entities: Vec::new(),
            dense_signatures: Vec::new(),
        }
    }

    /// Issue a new entity with an empty signature.
    ///
    /// Recycled indices are reused in the order they were destroyed. Fails
    /// with [`EcsError::EntityPoolExhausted`] once every index is live.
    pub fn create(&mut self) -> Result<Entity, EcsError> {
        let index = if let Some(index) = self.free_indices.pop_front() {
            index
        } else if self.next_index < self.capacity {
            let index = self.next_index;
            self.next_index += 1;
            self.generations.push(0);
            index
        } else {
            tracing::warn!(capacity = self.capacity, "entity pool exhausted");
            return Err(EcsError::EntityPoolExhausted {
                capacity: self.capacity,
            });
        };

        let entity = Entity::new(index, self.generations[index as usize]);
        self.sparse[index as usize] = self.dense_entities.len() as u32;
        self.dense_entities.push(entity);
        self.dense_signatures.push(Signature::EMPTY);
        tracing::trace!(%entity, "entity created");
        Ok(entity)
    }

    /// Destroy `entity`, clearing its signature and queueing its index for
    /// reuse.
    pub fn destroy(&mut self, entity: Entity) -> Result<(), EcsError> {
        let slot = self.slot(entity)?;
        let index = entity.index() as usize;

        self.dense_entities.swap_remove(slot);
        self.dense_signatures.swap_remove(slot);
        if let Some(moved) = self.dense_entities.get(slot) {
            self.sparse[moved.index() as usize] = slot as u32;
        }
        self.sparse[index] = EMPTY_SLOT;

        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free_indices.push_back(entity.index());
        tracing::trace!(%entity, "entity destroyed");
        Ok(())
    }

    /// Overwrite the signature of a live entity.
    pub fn set_signature(&mut self, entity: Entity, signature: Signature) -> Result<(), EcsError> {
        let slot = self.slot(entity)?;
        self.dense_signatures[slot] = signature;
        Ok(())
    }

    /// The signature of a live entity.
    pub fn signature(&self, entity: Entity) -> Result<Signature, EcsError> {
        let slot = self.slot(entity)?;
        Ok(self.dense_signatures[slot])
    }

    /// Signature stored for `index`, or the empty signature when the index is
    /// not live. Used by scene views, whose candidates are always live.
    #[inline]
    pub(crate) fn signature_at(&self, index: u32) -> Signature {
        match self.sparse.get(index as usize) {
            Some(&slot) if slot != EMPTY_SLOT => self.dense_signatures[slot as usize],
            _ => Signature::EMPTY,
        }
    }

    /// Validate `entity` without looking anything up.
    pub fn check(&self, entity: Entity) -> Result<(), EcsError> {
        self.slot(entity).map(|_| ())
    }

    /// Whether `entity` refers to a live entity of the current generation.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slot(entity).is_ok()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.dense_entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense_entities.is_empty()
    }

    /// Maximum number of simultaneously live entities.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Live entities in dense (not creation) order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.dense_entities.iter().copied()
    }

    fn slot(&self, entity: Entity) -> Result<usize, EcsError> {
        let index = entity.index();
        if index >= self.capacity {
            return Err(EcsError::EntityOutOfRange {
                entity,
                capacity: self.capacity,
            });
        }
        let slot = self.sparse[index as usize];
        if slot == EMPTY_SLOT || self.generations[index as usize] != entity.generation() {
            return Err(EcsError::StaleEntity { entity });
        }
        Ok(slot as usize)
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTITIES)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentType;

    #[test]
    fn create_unique_indices() {
        let mut mgr = EntityManager::new(100);
        let ids: Vec<Entity> = (0..100).map(|_| mgr.create().unwrap()).collect();
        let mut indices: Vec<u32> = ids.iter().map(|e| e.index()).collect();
        indices.sort();
        indices.dedup();
        assert_eq!(indices.len(), 100);
    }

    #[test]
    fn fresh_entity_has_empty_signature() {
        let mut mgr = EntityManager::new(8);
        let e = mgr.create().unwrap();
        assert_eq!(mgr.signature(e).unwrap(), Signature::EMPTY);
    }

    #[test]
    fn recycled_indices_are_fifo() {
        let mut mgr = EntityManager::new(16);
        let e0 = mgr.create().unwrap();
        let e1 = mgr.create().unwrap();
        let e2 = mgr.create().unwrap();
        mgr.destroy(e1).unwrap();
        mgr.destroy(e0).unwrap();

        let a = mgr.create().unwrap();
        let b = mgr.create().unwrap();
        assert_eq!(a.index(), e1.index());
        assert_eq!(b.index(), e0.index());
        assert!(mgr.is_alive(e2));
    }

    #[test]
    fn generation_increments_on_recycle() {
        let mut mgr = EntityManager::new(4);
        let e0 = mgr.create().unwrap();
        assert_eq!(e0.generation(), 0);
        mgr.destroy(e0).unwrap();
        let e1 = mgr.create().unwrap();
        assert_eq!(e1.index(), e0.index());
        assert_eq!(e1.generation(), 1);
        assert!(!mgr.is_alive(e0), "stale handle must not be alive");
        assert!(matches!(
            mgr.signature(e0),
            Err(EcsError::StaleEntity { .. })
        ));
    }

    #[test]
    fn exhaustion_is_a_typed_error() {
        let mut mgr = EntityManager::new(2);
        let e = mgr.create().unwrap();
        mgr.create().unwrap();
        assert!(matches!(
            mgr.create(),
            Err(EcsError::EntityPoolExhausted { capacity: 2 })
        ));
        // Destroying frees a slot again.
        mgr.destroy(e).unwrap();
        assert!(mgr.create().is_ok());
    }

    #[test]
    fn out_of_range_and_double_destroy() {
        let mut mgr = EntityManager::new(4);
        let e = mgr.create().unwrap();
        assert!(matches!(
            mgr.destroy(Entity::new(10, 0)),
            Err(EcsError::EntityOutOfRange { .. })
        ));
        mgr.destroy(e).unwrap();
        assert!(matches!(
            mgr.destroy(e),
            Err(EcsError::StaleEntity { .. })
        ));
    }

    #[test]
    fn destroy_compacts_and_keeps_other_signatures() {
        let mut mgr = EntityManager::new(8);
        let e0 = mgr.create().unwrap();
        let e1 = mgr.create().unwrap();
        let e2 = mgr.create().unwrap();
        mgr.set_signature(e0, Signature::of(ComponentType(0))).unwrap();
        mgr.set_signature(e1, Signature::of(ComponentType(1))).unwrap();
        mgr.set_signature(e2, Signature::of(ComponentType(2))).unwrap();

        mgr.destroy(e0).unwrap();
        assert_eq!(mgr.len(), 2);
        assert_eq!(mgr.signature(e1).unwrap(), Signature::of(ComponentType(1)));
        assert_eq!(mgr.signature(e2).unwrap(), Signature::of(ComponentType(2)));
        assert_eq!(mgr.signature_at(e0.index()), Signature::EMPTY);
    }

    #[test]
    fn entity_roundtrip() {
        let e = Entity::new(42, 7);
        assert_eq!(e.index(), 42);
        assert_eq!(e.generation(), 7);
        assert_eq!(Entity::from_raw(e.to_raw()), e);
        assert_eq!(e.to_string(), "42v7");
    }

    #[test]
    fn entity_serializes_as_raw_u64() {
        let e = Entity::new(3, 1);
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, e.to_raw().to_string());
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
