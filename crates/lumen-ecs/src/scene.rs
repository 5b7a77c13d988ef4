//! The [`Scene`] is the single entry point to the ECS. It composes the entity,
//! component, event and system managers and keeps entity signatures in sync
//! with component ownership.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::component::{Component, ComponentArray, ComponentManager, ComponentSet, ComponentType};
use crate::entity::{Entity, EntityManager, DEFAULT_MAX_ENTITIES, MAX_ENTITIES};
use crate::event::{Event, EventId, EventManager};
use crate::signature::Signature;
use crate::system::SystemManager;
use crate::view::{MatchMode, SceneView};
use crate::EcsError;

// ---------------------------------------------------------------------------
// SceneConfig
// ---------------------------------------------------------------------------

/// Construction parameters for a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneConfig {
    /// Maximum number of simultaneously live entities, at most
    /// [`MAX_ENTITIES`].
    pub max_entities: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
        }
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Facade over the ECS managers.
///
/// Every operation that takes an [`Entity`] validates the handle first:
/// indices outside the scene's capacity fail with
/// [`EcsError::EntityOutOfRange`], destroyed or recycled handles with
/// [`EcsError::StaleEntity`].
pub struct Scene {
    entities: EntityManager,
    components: ComponentManager,
    events: EventManager,
    systems: SystemManager,
}

impl Scene {
    /// A scene with the default entity capacity.
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// A scene sized by `config`. Capacities above [`MAX_ENTITIES`] are
    /// clamped to it.
    pub fn with_config(config: SceneConfig) -> Self {
        let capacity = if config.max_entities > MAX_ENTITIES {
            tracing::warn!(
                requested = config.max_entities,
                max = MAX_ENTITIES,
                "entity capacity clamped"
            );
            MAX_ENTITIES
        } else {
            config.max_entities
        };
        Self {
            entities: EntityManager::new(capacity),
            components: ComponentManager::new(capacity),
            events: EventManager::new(),
            systems: SystemManager::new(),
        }
    }

    // -- entities -----------------------------------------------------------

    /// Create an entity with no components.
    pub fn create_entity(&mut self) -> Result<Entity, EcsError> {
        self.entities.create()
    }

    /// Destroy `entity` together with every component it owns.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        let owned = self.entities.signature(entity)?;
        self.entities.destroy(entity)?;
        self.components.entity_destroyed(entity, owned);
        Ok(())
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Maximum number of simultaneously live entities.
    pub fn capacity(&self) -> u32 {
        self.entities.capacity()
    }

    /// Every live entity, in storage order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    /// The component signature of a live entity.
    pub fn signature(&self, entity: Entity) -> Result<Signature, EcsError> {
        self.entities.signature(entity)
    }

    // -- components ---------------------------------------------------------

    /// Register component type `T`, assigning it the next signature bit.
    pub fn register_component<T: Component>(&mut self) -> Result<ComponentType, EcsError> {
        self.components.register::<T>()
    }

    /// The signature bit assigned to `T`.
    pub fn component_type<T: Component>(&self) -> Result<ComponentType, EcsError> {
        self.components.component_type::<T>()
    }

    pub fn is_component_registered<T: Component>(&self) -> bool {
        self.components.is_registered::<T>()
    }

    /// Attach `value` to `entity` and set `T`'s bit in its signature.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        let mut signature = self.entities.signature(entity)?;
        let ty = self.components.component_type::<T>()?;
        self.components.array_mut::<T>()?.insert(entity, value)?;
        signature.set(ty);
        self.entities.set_signature(entity, signature)
    }

    /// Detach `entity`'s `T`, clear the bit and return the value.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, EcsError> {
        let mut signature = self.entities.signature(entity)?;
        let ty = self.components.component_type::<T>()?;
        let value = self.components.array_mut::<T>()?.remove(entity)?;
        signature.clear(ty);
        self.entities.set_signature(entity, signature)?;
        Ok(value)
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.entities.check(entity)?;
        self.components.array::<T>()?.get(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.entities.check(entity)?;
        self.components.array_mut::<T>()?.get_mut(entity)
    }

    /// Whether `entity` is alive and owns a `T`. Unregistered types and dead
    /// handles answer `false`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        match (self.entities.signature(entity), self.components.component_type::<T>()) {
            (Ok(signature), Ok(ty)) => signature.contains(ty),
            _ => false,
        }
    }

    /// Read-only access to all instances of `T`.
    pub fn components<T: Component>(&self) -> Result<&ComponentArray<T>, EcsError> {
        self.components.array::<T>()
    }

    /// Mutable access to all instances of `T`. Ownership (and therefore
    /// signatures) cannot change through this handle's value accessors.
    pub fn components_mut<T: Component>(&mut self) -> Result<ComponentsMut<'_, T>, EcsError> {
        Ok(ComponentsMut {
            array: self.components.array_mut::<T>()?,
        })
    }

    /// Union of the signatures of `S`; every registered type for `()`.
    pub fn signature_of<S: ComponentSet>(&self) -> Result<Signature, EcsError> {
        self.components.signature_of::<S>()
    }

    // -- queries ------------------------------------------------------------

    /// Entities owning at least the components in `S`.
    pub fn view<S: ComponentSet>(&self) -> Result<SceneView<'_, S>, EcsError> {
        SceneView::build(
            &self.entities,
            &self.components,
            Signature::EMPTY,
            MatchMode::Inclusive,
        )
    }

    /// Entities owning the components in `S` and none of those in `X`.
    /// An empty `X` excludes nothing.
    pub fn view_excluding<S: ComponentSet, X: ComponentSet>(
        &self,
    ) -> Result<SceneView<'_, S>, EcsError> {
        let excluded = if X::LEN == 0 {
            Signature::EMPTY
        } else {
            self.components.signature_of::<X>()?
        };
        SceneView::build(
            &self.entities,
            &self.components,
            excluded,
            MatchMode::Inclusive,
        )
    }

    /// Entities whose signature is exactly that of `S`.
    pub fn view_exact<S: ComponentSet>(&self) -> Result<SceneView<'_, S>, EcsError> {
        SceneView::build(
            &self.entities,
            &self.components,
            Signature::EMPTY,
            MatchMode::Exclusive,
        )
    }

    // -- events -------------------------------------------------------------

    /// Bind `listener` to `id` for the lifetime of the scene.
    pub fn add_listener<F>(&mut self, id: EventId, listener: F)
    where
        F: FnMut(&mut Event) + 'static,
    {
        self.events.add_listener(id, listener);
    }

    /// Synchronously dispatch `event` to its listeners, in registration order.
    pub fn send_event(&mut self, event: &mut Event) {
        self.events.send_event(event);
    }

    /// Dispatch a payload-less event.
    pub fn send_event_id(&mut self, id: EventId) {
        self.events.send_event_id(id);
    }

    pub fn listener_count(&self, id: EventId) -> usize {
        self.events.listener_count(id)
    }

    // -- systems ------------------------------------------------------------

    /// Store the single instance of system `T` and return a shared handle.
    pub fn register_system<T: 'static>(&mut self, system: T) -> Result<Rc<RefCell<T>>, EcsError> {
        self.systems.register(system)
    }

    /// Handle to the registered instance of `T`.
    pub fn system<T: 'static>(&self) -> Result<Rc<RefCell<T>>, EcsError> {
        self.systems.get::<T>()
    }

    pub fn has_system<T: 'static>(&self) -> bool {
        self.systems.contains::<T>()
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("entity_count", &self.entities.len())
            .field("components", &self.components)
            .field("systems", &self.systems)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ComponentsMut
// ---------------------------------------------------------------------------

/// Value-only mutable access to one component array.
///
/// Unlike `&mut ComponentArray<T>` this cannot insert or remove, so entity
/// signatures stay consistent.
pub struct ComponentsMut<'s, T: Component> {
    array: &'s mut ComponentArray<T>,
}

impl<T: Component> ComponentsMut<'_, T> {
    pub fn get(&self, entity: Entity) -> Result<&T, EcsError> {
        self.array.get(entity)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.array.get_mut(entity)
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// `(owner, value)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.array.iter_mut()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
