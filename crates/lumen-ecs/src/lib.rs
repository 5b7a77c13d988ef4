//! Lumen ECS -- sparse-set Entity Component System with a synchronous event bus.
//!
//! Each component type is stored densely in its own [`ComponentArray`]
//! (sparse-set indirection gives O(1) insert/remove/lookup). Entities carry a
//! bitset [`Signature`] of the component types they own, and a [`SceneView`]
//! answers "which entities own these components?" by walking only the rarest
//! requested array. Generational [`Entity`] handles detect use after destroy.
//!
//! # Quick Start
//!
//! ```
//! use lumen_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Position { x: f32, y: f32, z: f32 }
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Velocity { x: f32, y: f32, z: f32 }
//!
//! let mut scene = Scene::new();
//! scene.register_component::<Position>().unwrap();
//! scene.register_component::<Velocity>().unwrap();
//!
//! let a = scene.create_entity().unwrap();
//! scene.add_component(a, Position { x: 0.0, y: 0.0, z: 0.0 }).unwrap();
//! scene.add_component(a, Velocity { x: 1.0, y: 0.0, z: 0.0 }).unwrap();
//! let b = scene.create_entity().unwrap();
//! scene.add_component(b, Position { x: 5.0, y: 0.0, z: 0.0 }).unwrap();
//!
//! let moving: Vec<Entity> = scene.view::<(Position, Velocity)>().unwrap().collect();
//! assert_eq!(moving, vec![a]);
//! ```
//!
//! [`ComponentArray`]: component::ComponentArray
//! [`Signature`]: signature::Signature
//! [`SceneView`]: view::SceneView
//! [`Entity`]: entity::Entity

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod event;
pub mod scene;
pub mod signature;
pub mod system;
pub mod view;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
///
/// Every variant is a caller contract violation; nothing here is retried
/// internally.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// Every entity index is live and no destroyed index is waiting for reuse.
    #[error("entity pool exhausted: all {capacity} entities are alive")]
    EntityPoolExhausted { capacity: u32 },

    /// The handle's index lies outside the scene's capacity.
    #[error("entity {entity} is out of range (capacity {capacity})")]
    EntityOutOfRange {
        entity: entity::Entity,
        capacity: u32,
    },

    /// The entity was destroyed (and possibly its index recycled).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::Entity },

    #[error("component type '{name}' is already registered")]
    ComponentAlreadyRegistered { name: &'static str },

    /// A component type was referenced that has not been registered.
    #[error("component type '{name}' not registered. Registered components: [{registered}]")]
    ComponentNotRegistered {
        name: &'static str,
        registered: String,
    },

    #[error("cannot register more than {max} component types")]
    ComponentLimitReached { max: usize },

    #[error("entity {entity} already has a '{name}' component")]
    DuplicateComponent {
        entity: entity::Entity,
        name: &'static str,
    },

    #[error("entity {entity} has no '{name}' component")]
    MissingComponent {
        entity: entity::Entity,
        name: &'static str,
    },

    #[error("system '{name}' is already registered")]
    SystemAlreadyRegistered { name: &'static str },

    #[error("system '{name}' is not registered")]
    SystemNotRegistered { name: &'static str },

    #[error("cannot register more than {max} systems")]
    SystemLimitReached { max: usize },

    /// An event parameter could not be read.
    #[error(transparent)]
    Event(#[from] event::EventError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Component, ComponentArray, ComponentSet, ComponentType};
    pub use crate::entity::{Entity, DEFAULT_MAX_ENTITIES, MAX_ENTITIES};
    pub use crate::event::{Event, EventError, EventId, ParamId};
    pub use crate::scene::{ComponentsMut, Scene, SceneConfig};
    pub use crate::signature::{Signature, MAX_COMPONENTS};
    pub use crate::system::MAX_SYSTEMS;
    pub use crate::view::{MatchMode, SceneView};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
