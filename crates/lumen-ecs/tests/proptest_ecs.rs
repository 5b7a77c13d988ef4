//! Property tests for scene operations.
//!
//! Random sequences of entity and component operations are replayed against a
//! small scene and a plain model of what it should contain; signatures, views
//! and index recycling are checked against the model after every step.

use std::collections::{BTreeSet, VecDeque};

use lumen_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Pos {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Vel {
    dx: f32,
    dy: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct Tag(u32);

const CAPACITY: u32 = 24;

/// Operations we can perform on the scene.
#[derive(Debug, Clone)]
enum SceneOp {
    Create,
    Destroy(usize),
    AddPos(usize, f32),
    AddVel(usize, f32),
    AddTag(usize, u32),
    RemovePos(usize),
    RemoveVel(usize),
    RemoveTag(usize),
}

/// Strategy that generates finite f32 values.
fn finite_f32() -> impl Strategy<Value = f32> {
    (-1_000_000i32..1_000_000i32).prop_map(|v| v as f32 * 0.01)
}

fn scene_op_strategy() -> impl Strategy<Value = SceneOp> {
    prop_oneof![
        3 => Just(SceneOp::Create),
        1 => (0..64usize).prop_map(SceneOp::Destroy),
        2 => (0..64usize, finite_f32()).prop_map(|(i, x)| SceneOp::AddPos(i, x)),
        2 => (0..64usize, finite_f32()).prop_map(|(i, dx)| SceneOp::AddVel(i, dx)),
        1 => (0..64usize, any::<u32>()).prop_map(|(i, t)| SceneOp::AddTag(i, t)),
        1 => (0..64usize).prop_map(SceneOp::RemovePos),
        1 => (0..64usize).prop_map(SceneOp::RemoveVel),
        1 => (0..64usize).prop_map(SceneOp::RemoveTag),
    ]
}

fn small_scene() -> Scene {
    let mut scene = Scene::with_config(SceneConfig {
        max_entities: CAPACITY,
    });
    scene.register_component::<Pos>().unwrap();
    scene.register_component::<Vel>().unwrap();
    scene.register_component::<Tag>().unwrap();
    scene
}

fn pick(alive: &[Entity], idx: usize) -> Option<Entity> {
    if alive.is_empty() {
        None
    } else {
        Some(alive[idx % alive.len()])
    }
}

fn brute_force(scene: &Scene, alive: &[Entity], pred: impl Fn(&Scene, Entity) -> bool) -> BTreeSet<Entity> {
    alive.iter().copied().filter(|&e| pred(scene, e)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn scene_random_ops_preserve_invariants(ops in prop::collection::vec(scene_op_strategy(), 1..120)) {
        let mut scene = small_scene();
        let mut alive: Vec<Entity> = Vec::new();

        // Model of index allocation: fresh counter plus FIFO of freed indices.
        let mut next_fresh: u32 = 0;
        let mut freed: VecDeque<u32> = VecDeque::new();

        for op in ops {
            match op {
                SceneOp::Create => {
                    let expected = freed.front().copied().or_else(|| {
                        (next_fresh < CAPACITY).then_some(next_fresh)
                    });
                    match (scene.create_entity(), expected) {
                        (Ok(e), Some(index)) => {
                            prop_assert_eq!(e.index(), index);
                            if freed.front() == Some(&index) {
                                freed.pop_front();
                            } else {
                                next_fresh += 1;
                            }
                            prop_assert_eq!(scene.signature(e).unwrap(), Signature::EMPTY);
                            alive.push(e);
                        }
                        (Err(EcsError::EntityPoolExhausted { capacity }), None) => {
                            prop_assert_eq!(capacity, CAPACITY);
                        }
                        (got, want) => {
                            prop_assert!(false, "create returned {:?}, model expected {:?}", got, want);
                        }
                    }
                }
                SceneOp::Destroy(idx) => {
                    if !alive.is_empty() {
                        let e = alive.remove(idx % alive.len());
                        scene.destroy_entity(e).unwrap();
                        freed.push_back(e.index());
                        prop_assert!(!scene.is_alive(e));
                    }
                }
                SceneOp::AddPos(idx, x) => {
                    if let Some(e) = pick(&alive, idx) {
                        let had = scene.has_component::<Pos>(e);
                        let result = scene.add_component(e, Pos { x, y: 0.0 });
                        prop_assert_eq!(result.is_ok(), !had);
                    }
                }
                SceneOp::AddVel(idx, dx) => {
                    if let Some(e) = pick(&alive, idx) {
                        let had = scene.has_component::<Vel>(e);
                        let result = scene.add_component(e, Vel { dx, dy: 0.0 });
                        prop_assert_eq!(result.is_ok(), !had);
                    }
                }
                SceneOp::AddTag(idx, t) => {
                    if let Some(e) = pick(&alive, idx) {
                        let _ = scene.add_component(e, Tag(t));
                        prop_assert!(scene.has_component::<Tag>(e));
                    }
                }
                SceneOp::RemovePos(idx) => {
                    if let Some(e) = pick(&alive, idx) {
                        let had = scene.has_component::<Pos>(e);
                        prop_assert_eq!(scene.remove_component::<Pos>(e).is_ok(), had);
                    }
                }
                SceneOp::RemoveVel(idx) => {
                    if let Some(e) = pick(&alive, idx) {
                        let had = scene.has_component::<Vel>(e);
                        prop_assert_eq!(scene.remove_component::<Vel>(e).is_ok(), had);
                    }
                }
                SceneOp::RemoveTag(idx) => {
                    if let Some(e) = pick(&alive, idx) {
                        let had = scene.has_component::<Tag>(e);
                        prop_assert_eq!(scene.remove_component::<Tag>(e).is_ok(), had);
                    }
                }
            }

            // Invariant: entity_count matches our tracking.
            prop_assert_eq!(scene.entity_count(), alive.len());

            // Invariant: signature bits agree with array ownership.
            let pos_ty = scene.component_type::<Pos>().unwrap();
            let vel_ty = scene.component_type::<Vel>().unwrap();
            for &e in &alive {
                prop_assert!(scene.is_alive(e));
                let sig = scene.signature(e).unwrap();
                prop_assert_eq!(sig.contains(pos_ty), scene.components::<Pos>().unwrap().contains(e));
                prop_assert_eq!(sig.contains(vel_ty), scene.components::<Vel>().unwrap().contains(e));
            }

            // Invariant: views agree with a brute-force scan.
            let view: BTreeSet<Entity> = scene.view::<(Pos, Vel)>().unwrap().collect();
            let expected = brute_force(&scene, &alive, |s, e| {
                s.has_component::<Pos>(e) && s.has_component::<Vel>(e)
            });
            prop_assert_eq!(view, expected);

            let excluding: BTreeSet<Entity> =
                scene.view_excluding::<(Pos,), (Tag,)>().unwrap().collect();
            let expected = brute_force(&scene, &alive, |s, e| {
                s.has_component::<Pos>(e) && !s.has_component::<Tag>(e)
            });
            prop_assert_eq!(excluding, expected);

            let exact: BTreeSet<Entity> = scene.view_exact::<(Vel,)>().unwrap().collect();
            let expected = brute_force(&scene, &alive, |s, e| {
                s.has_component::<Vel>(e)
                    && !s.has_component::<Pos>(e)
                    && !s.has_component::<Tag>(e)
            });
            prop_assert_eq!(exact, expected);
        }
    }

    /// Handles captured before a destroy never resolve again, even once
    /// their index has been handed out to a new entity.
    #[test]
    fn stale_handles_detected_after_destroy_and_recycle(
        create_count in 1..20usize,
        destroy_indices in prop::collection::vec(0..20usize, 1..10),
    ) {
        let mut scene = small_scene();

        let mut entities: Vec<Entity> = Vec::new();
        for i in 0..create_count {
            let e = scene.create_entity().unwrap();
            scene.add_component(e, Pos { x: i as f32, y: 0.0 }).unwrap();
            entities.push(e);
        }

        let mut stale: Vec<Entity> = Vec::new();
        for &idx in &destroy_indices {
            if !entities.is_empty() {
                let e = entities.remove(idx % entities.len());
                scene.destroy_entity(e).unwrap();
                stale.push(e);
            }
        }

        for _ in 0..stale.len() {
            let e = scene.create_entity().unwrap();
            scene.add_component(e, Pos { x: 999.0, y: 999.0 }).unwrap();
            entities.push(e);
        }

        for &e in &stale {
            prop_assert!(!scene.is_alive(e));
            let is_stale = matches!(
                scene.get_component::<Pos>(e),
                Err(EcsError::StaleEntity { .. })
            );
            prop_assert!(is_stale);
        }
        for &e in &entities {
            prop_assert!(scene.is_alive(e));
            prop_assert!(scene.get_component::<Pos>(e).is_ok());
        }
    }

    /// Removing components from some entities never disturbs the values of
    /// the others, whatever the swap-remove order.
    #[test]
    fn swap_remove_preserves_other_values(
        count in 2..24usize,
        removals in prop::collection::vec(0..24usize, 1..12),
    ) {
        let mut scene = small_scene();
        let mut owners: Vec<(Entity, f32)> = Vec::new();
        for i in 0..count {
            let e = scene.create_entity().unwrap();
            let dx = i as f32 * 1.5;
            scene.add_component(e, Vel { dx, dy: -dx }).unwrap();
            owners.push((e, dx));
        }

        for &idx in &removals {
            if !owners.is_empty() {
                let (e, dx) = owners.remove(idx % owners.len());
                let removed = scene.remove_component::<Vel>(e).unwrap();
                prop_assert_eq!(removed, Vel { dx, dy: -dx });
            }
        }

        prop_assert_eq!(scene.components::<Vel>().unwrap().len(), owners.len());
        for &(e, dx) in &owners {
            prop_assert_eq!(scene.get_component::<Vel>(e).unwrap(), &Vel { dx, dy: -dx });
        }
    }
}
