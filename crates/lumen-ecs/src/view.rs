//! Signature queries over a scene.
//!
//! A [`SceneView`] enumerates the entities whose signature matches a component
//! set. Its iteration domain is the owner list of the *rarest* requested
//! component array, so the cost of a query is bounded by the least common
//! component rather than by the number of live entities. Each candidate's
//! full signature is then tested against the request.
//!
//! Views borrow the scene, so entities and components cannot be added or
//! removed while one is alive. Systems that mutate while walking a view first
//! drain it into a reusable buffer:
//!
//! ```
//! use lumen_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Position(f32);
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Velocity(f32);
//!
//! let mut scene = Scene::new();
//! scene.register_component::<Position>().unwrap();
//! scene.register_component::<Velocity>().unwrap();
//! let e = scene.create_entity().unwrap();
//! scene.add_component(e, Position(0.0)).unwrap();
//! scene.add_component(e, Velocity(2.0)).unwrap();
//!
//! let mut movers = Vec::new();
//! movers.extend(scene.view::<(Position, Velocity)>().unwrap());
//! for &entity in &movers {
//!     let v = *scene.get_component::<Velocity>(entity).unwrap();
//!     scene.get_component_mut::<Position>(entity).unwrap().0 += v.0;
//! }
//! assert_eq!(scene.get_component::<Position>(e).unwrap(), &Position(2.0));
//! ```

use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::slice;

use crate::component::{ComponentManager, ComponentSet};
use crate::entity::{Entity, EntityManager};
use crate::signature::Signature;
use crate::EcsError;

/// How a candidate's signature is compared with the requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The entity owns at least the requested components.
    Inclusive,
    /// The entity owns exactly the requested components and nothing else.
    Exclusive,
}

/// Lazy, single-pass iterator over the entities matching `S`.
pub struct SceneView<'s, S: ComponentSet> {
    candidates: slice::Iter<'s, Entity>,
    /// Size of the candidate range chosen at construction.
    probe_limit: usize,
    entities: &'s EntityManager,
    required: Signature,
    excluded: Signature,
    mode: MatchMode,
    _set: PhantomData<fn() -> S>,
}

impl<'s, S: ComponentSet> SceneView<'s, S> {
    pub(crate) fn build(
        entities: &'s EntityManager,
        components: &'s ComponentManager,
        excluded: Signature,
        mode: MatchMode,
    ) -> Result<Self, EcsError> {
        let required = components.signature_of::<S>()?;
        let candidates = components.smallest_candidates::<S>()?;
        Ok(Self {
            candidates: candidates.iter(),
            probe_limit: candidates.len(),
            entities,
            required,
            excluded,
            mode,
            _set: PhantomData,
        })
    }

    /// The signature candidates are matched against.
    pub fn required(&self) -> Signature {
        self.required
    }

    /// Signature whose bits disqualify a candidate.
    pub fn excluded(&self) -> Signature {
        self.excluded
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Number of candidates the view examines in total: the owner count of
    /// the rarest requested component array.
    pub fn probe_limit(&self) -> usize {
        self.probe_limit
    }
}

#[inline]
fn accepts(signature: Signature, required: Signature, excluded: Signature, mode: MatchMode) -> bool {
    let shape_ok = match mode {
        MatchMode::Inclusive => signature.is_superset_of(required),
        MatchMode::Exclusive => signature == required,
    };
    shape_ok && !signature.intersects(excluded)
}

impl<S: ComponentSet> Iterator for SceneView<'_, S> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let entities = self.entities;
        let (required, excluded, mode) = (self.required, self.excluded, self.mode);
        self.candidates
            .by_ref()
            .copied()
            .find(|e| accepts(entities.signature_at(e.index()), required, excluded, mode))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.candidates.len()))
    }
}

impl<S: ComponentSet> FusedIterator for SceneView<'_, S> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
        z: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Frozen;

    const ORIGIN: Position = Position { x: 0.0, y: 0.0, z: 0.0 };
    const STILL: Velocity = Velocity { x: 0.0, y: 0.0, z: 0.0 };

    fn setup_scene() -> Scene {
        let mut scene = Scene::new();
        scene.register_component::<Position>().unwrap();
        scene.register_component::<Velocity>().unwrap();
        scene.register_component::<Frozen>().unwrap();
        scene
    }

    fn sorted(mut v: Vec<Entity>) -> Vec<Entity> {
        v.sort();
        v
    }

    #[test]
    fn position_velocity_scenario() {
        let mut scene = setup_scene();
        let a = scene.create_entity().unwrap();
        scene.add_component(a, ORIGIN).unwrap();
        scene.add_component(a, STILL).unwrap();
        let b = scene.create_entity().unwrap();
        scene.add_component(b, ORIGIN).unwrap();

        let both: Vec<_> = scene.view::<(Position, Velocity)>().unwrap().collect();
        assert_eq!(both, vec![a]);

        let positioned = sorted(scene.view::<(Position,)>().unwrap().collect());
        assert_eq!(positioned, sorted(vec![a, b]));
    }

    #[test]
    fn exclusion_rejects_intersecting_signatures() {
        let mut scene = setup_scene();
        let moving = scene.create_entity().unwrap();
        scene.add_component(moving, ORIGIN).unwrap();
        let frozen = scene.create_entity().unwrap();
        scene.add_component(frozen, ORIGIN).unwrap();
        scene.add_component(frozen, Frozen).unwrap();

        let unfrozen: Vec<_> = scene
            .view_excluding::<(Position,), (Frozen,)>()
            .unwrap()
            .collect();
        assert_eq!(unfrozen, vec![moving]);
    }

    #[test]
    fn empty_exclusion_excludes_nothing() {
        let mut scene = setup_scene();
        let e = scene.create_entity().unwrap();
        scene.add_component(e, ORIGIN).unwrap();
        let all: Vec<_> = scene.view_excluding::<(Position,), ()>().unwrap().collect();
        assert_eq!(all, vec![e]);
    }

    #[test]
    fn exact_mode_requires_identical_signature() {
        let mut scene = setup_scene();
        let only_pos = scene.create_entity().unwrap();
        scene.add_component(only_pos, ORIGIN).unwrap();
        let pos_vel = scene.create_entity().unwrap();
        scene.add_component(pos_vel, ORIGIN).unwrap();
        scene.add_component(pos_vel, STILL).unwrap();

        let exact: Vec<_> = scene.view_exact::<(Position,)>().unwrap().collect();
        assert_eq!(exact, vec![only_pos]);
        let view = scene.view_exact::<(Position,)>().unwrap();
        assert_eq!(view.mode(), MatchMode::Exclusive);
    }

    #[test]
    fn empty_set_means_every_registered_component() {
        let mut scene = setup_scene();
        let full = scene.create_entity().unwrap();
        scene.add_component(full, ORIGIN).unwrap();
        scene.add_component(full, STILL).unwrap();
        scene.add_component(full, Frozen).unwrap();
        let partial = scene.create_entity().unwrap();
        scene.add_component(partial, ORIGIN).unwrap();
        scene.add_component(partial, STILL).unwrap();

        let owners_of_all: Vec<_> = scene.view::<()>().unwrap().collect();
        assert_eq!(owners_of_all, vec![full]);
    }

    #[test]
    fn iteration_domain_is_rarest_array() {
        let mut scene = setup_scene();
        let mut with_velocity = Vec::new();
        for i in 0..1000 {
            let e = scene.create_entity().unwrap();
            scene.add_component(e, ORIGIN).unwrap();
            if i % 500 == 0 {
                scene.add_component(e, STILL).unwrap();
                with_velocity.push(e);
            }
        }

        let view = scene.view::<(Position, Velocity)>().unwrap();
        assert_eq!(view.probe_limit(), 2);
        assert_eq!(sorted(view.collect()), sorted(with_velocity));
    }

    #[test]
    fn unregistered_component_fails_construction() {
        #[derive(Debug)]
        struct Unregistered;
        let scene = setup_scene();
        assert!(matches!(
            scene.view::<(Position, Unregistered)>(),
            Err(EcsError::ComponentNotRegistered { .. })
        ));
    }

    #[test]
    fn view_is_fused() {
        let mut scene = setup_scene();
        let e = scene.create_entity().unwrap();
        scene.add_component(e, ORIGIN).unwrap();
        let mut view = scene.view::<(Position,)>().unwrap();
        assert_eq!(view.next(), Some(e));
        assert_eq!(view.next(), None);
        assert_eq!(view.next(), None);
    }
}
