//! Component storage.
//!
//! Every component type gets one [`ComponentArray<T>`]: a sparse array from
//! entity index to dense slot, plus dense parallel vectors of owning entities
//! and values. Insert, remove and lookup are O(1); removal swaps the last dense
//! element into the hole so storage stays contiguous.
//!
//! The [`ComponentManager`] owns one type-erased array per registered type,
//! keyed by Rust `TypeId`, and hands out the [`ComponentType`] bit index used
//! in [`Signature`]s.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::entity::{Entity, EMPTY_SLOT};
use crate::signature::{Signature, MAX_COMPONENTS};
use crate::EcsError;

// ---------------------------------------------------------------------------
// Component / ComponentType
// ---------------------------------------------------------------------------

/// Marker for types storable as components. Any `'static` type qualifies.
pub trait Component: 'static {}

impl<T: 'static> Component for T {}

/// Bit index assigned to a component type at registration.
///
/// Indices are handed out in registration order and never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentType(pub(crate) u8);

impl ComponentType {
    /// The bit index of this type within a [`Signature`].
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentArray
// ---------------------------------------------------------------------------

/// Dense storage for every instance of one component type.
pub struct ComponentArray<T> {
    /// entity index -> dense slot, `EMPTY_SLOT` when the entity lacks `T`.
    sparse: Vec<u32>,
    /// Owner of `values[i]`.
    entities: Vec<Entity>,
    values: Vec<T>,
}

impl<T: Component> ComponentArray<T> {
    /// Create an array for entity indices in `[0, capacity)`.
    pub fn new(capacity: u32) -> Self {
        Self {
            sparse: vec![EMPTY_SLOT; capacity as usize],
            entities: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Attach `value` to `entity`.
    ///
    /// Fails if the entity already owns a `T` or its index is outside the
    /// array's capacity.
    pub fn insert(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        let capacity = self.sparse.len() as u32;
        let slot = self
            .sparse
            .get_mut(entity.index() as usize)
            .ok_or(EcsError::EntityOutOfRange { entity, capacity })?;
        if *slot != EMPTY_SLOT {
            return Err(EcsError::DuplicateComponent {
                entity,
                name: type_name::<T>(),
            });
        }
        *slot = self.entities.len() as u32;
        self.entities.push(entity);
        self.values.push(value);
        Ok(())
    }

    /// Detach and return `entity`'s value.
    ///
    /// The last dense element is moved into the vacated slot.
    pub fn remove(&mut self, entity: Entity) -> Result<T, EcsError> {
        let slot = self.slot(entity)?;
        self.sparse[entity.index() as usize] = EMPTY_SLOT;
        self.entities.swap_remove(slot);
        let value = self.values.swap_remove(slot);
        if let Some(moved) = self.entities.get(slot) {
            self.sparse[moved.index() as usize] = slot as u32;
        }
        Ok(value)
    }

    pub fn get(&self, entity: Entity) -> Result<&T, EcsError> {
        let slot = self.slot(entity)?;
        Ok(&self.values[slot])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        let slot = self.slot(entity)?;
        Ok(&mut self.values[slot])
    }

    /// Whether `entity` owns a `T`.
    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_ok()
    }

    /// Drop `entity`'s value if it has one.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        if self.contains(entity) {
            // Presence was just checked, so the removal cannot fail.
            let _ = self.remove(entity);
        }
    }

    /// Number of entities currently owning a `T`.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Owning entities in dense order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// `(owner, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    /// `(owner, value)` pairs in dense order, values mutable.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }

    fn slot(&self, entity: Entity) -> Result<usize, EcsError> {
        match self.sparse.get(entity.index() as usize) {
            Some(&slot) if slot != EMPTY_SLOT && self.entities[slot as usize] == entity => {
                Ok(slot as usize)
            }
            _ => Err(EcsError::MissingComponent {
                entity,
                name: type_name::<T>(),
            }),
        }
    }
}

impl<T> fmt::Debug for ComponentArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentArray")
            .field("type", &type_name::<T>())
            .field("len", &self.entities.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ErasedArray -- the common interface of every ComponentArray<T>
// ---------------------------------------------------------------------------

pub(crate) trait ErasedArray {
    fn entity_destroyed(&mut self, entity: Entity);
    fn len(&self) -> usize;
    fn entities(&self) -> &[Entity];
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedArray for ComponentArray<T> {
    fn entity_destroyed(&mut self, entity: Entity) {
        ComponentArray::entity_destroyed(self, entity);
    }

    fn len(&self) -> usize {
        ComponentArray::len(self)
    }

    fn entities(&self) -> &[Entity] {
        ComponentArray::entities(self)
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// ComponentSet -- compile-time lists of component types
// ---------------------------------------------------------------------------

/// A tuple of component types used for signatures and scene views.
///
/// The empty tuple `()` stands for "every registered component type".
pub trait ComponentSet {
    /// Number of member types.
    const LEN: usize;

    /// Call `visit` with the [`ComponentType`] of each member in order.
    ///
    /// Fails on the first member that has not been registered.
    fn for_each_type(
        components: &ComponentManager,
        visit: &mut dyn FnMut(ComponentType),
    ) -> Result<(), EcsError>;
}

macro_rules! impl_component_set {
    ($($name:ident),*) => {
        impl<$($name: Component),*> ComponentSet for ($($name,)*) {
            const LEN: usize = {
                let names: &[&str] = &[$(stringify!($name)),*];
                names.len()
            };

            #[allow(unused_variables)]
            fn for_each_type(
                components: &ComponentManager,
                visit: &mut dyn FnMut(ComponentType),
            ) -> Result<(), EcsError> {
                $( visit(components.component_type::<$name>()?); )*
                Ok(())
            }
        }
    };
}

impl_component_set!();
impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

// ---------------------------------------------------------------------------
// ComponentManager
// ---------------------------------------------------------------------------

/// Owns one [`ComponentArray`] per registered component type.
pub struct ComponentManager {
    /// Entity capacity every array is sized for.
    capacity: u32,
    by_type: HashMap<TypeId, ComponentType>,
    /// Indexed by `ComponentType.0`.
    arrays: Vec<Box<dyn ErasedArray>>,
    /// Union of all registered types.
    registered: Signature,
}

impl ComponentManager {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            by_type: HashMap::new(),
            arrays: Vec::new(),
            registered: Signature::EMPTY,
        }
    }

    /// Register `T` and assign it the next free bit index.
    pub fn register<T: Component>(&mut self) -> Result<ComponentType, EcsError> {
        let rust_type = TypeId::of::<T>();
        if self.by_type.contains_key(&rust_type) {
            return Err(EcsError::ComponentAlreadyRegistered {
                name: type_name::<T>(),
            });
        }
        if self.arrays.len() >= MAX_COMPONENTS {
            return Err(EcsError::ComponentLimitReached {
                max: MAX_COMPONENTS,
            });
        }

        let ty = ComponentType(self.arrays.len() as u8);
        self.arrays.push(Box::new(ComponentArray::<T>::new(self.capacity)));
        self.by_type.insert(rust_type, ty);
        self.registered.set(ty);
        tracing::debug!(component = type_name::<T>(), index = ty.0, "component registered");
        Ok(ty)
    }

    /// The bit index assigned to `T`.
    pub fn component_type<T: Component>(&self) -> Result<ComponentType, EcsError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or_else(|| EcsError::ComponentNotRegistered {
                name: type_name::<T>(),
                registered: self.registered_names().join(", "),
            })
    }

    pub fn is_registered<T: Component>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Typed access to `T`'s array.
    pub fn array<T: Component>(&self) -> Result<&ComponentArray<T>, EcsError> {
        let ty = self.component_type::<T>()?;
        // `register::<T>` stores a `ComponentArray<T>` at the index it maps
        // `TypeId::of::<T>()` to, so the downcast cannot fail.
        Ok(self.arrays[ty.index()]
            .as_any()
            .downcast_ref::<ComponentArray<T>>()
            .expect("component array registered under a foreign TypeId"))
    }

    /// Typed mutable access to `T`'s array.
    pub fn array_mut<T: Component>(&mut self) -> Result<&mut ComponentArray<T>, EcsError> {
        let ty = self.component_type::<T>()?;
        // Same invariant as `array`.
        Ok(self.arrays[ty.index()]
            .as_any_mut()
            .downcast_mut::<ComponentArray<T>>()
            .expect("component array registered under a foreign TypeId"))
    }

    /// Purge every component `entity` owned. `owned` is the entity's signature
    /// at the time of destruction; only those arrays are visited.
    pub fn entity_destroyed(&mut self, entity: Entity, owned: Signature) {
        for ty in owned.iter() {
            if let Some(array) = self.arrays.get_mut(ty.index()) {
                array.entity_destroyed(entity);
            }
        }
    }

    /// Union of the single-type signatures of `S`; all registered types for `()`.
    pub fn signature_of<S: ComponentSet>(&self) -> Result<Signature, EcsError> {
        if S::LEN == 0 {
            return Ok(self.registered);
        }
        let mut signature = Signature::EMPTY;
        S::for_each_type(self, &mut |ty| signature.set(ty))?;
        Ok(signature)
    }

    /// Owner list of whichever array in `S` (or among all registered arrays,
    /// for `()`) currently has the fewest entities.
    pub fn smallest_candidates<S: ComponentSet>(&self) -> Result<&[Entity], EcsError> {
        let mut best: Option<usize> = None;
        let mut consider = |ty: ComponentType| {
            let idx = ty.index();
            let rarer = best.map_or(true, |b| self.arrays[idx].len() < self.arrays[b].len());
            if rarer {
                best = Some(idx);
            }
        };
        if S::LEN == 0 {
            for ty in self.registered.iter() {
                consider(ty);
            }
        } else {
            S::for_each_type(self, &mut consider)?;
        }
        Ok(best.map_or(&[][..], |idx| self.arrays[idx].entities()))
    }

    /// Number of owners of component type `ty`.
    pub fn owner_count(&self, ty: ComponentType) -> usize {
        self.arrays.get(ty.index()).map_or(0, |a| a.len())
    }

    /// Union of every registered component type.
    pub fn registered_signature(&self) -> Signature {
        self.registered
    }

    /// Number of registered component types.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Type names of all registered components, in registration order.
    pub fn registered_names(&self) -> Vec<&'static str> {
        self.arrays.iter().map(|a| a.type_name()).collect()
    }
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("registered", &self.registered_names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
