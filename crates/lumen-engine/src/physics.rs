//! Rigid-body integration over scene components.
//!
//! [`PhysicsSystem`] advances every entity owning a [`Transform`],
//! [`Velocity`] and [`Force`] with semi-implicit Euler:
//!
//! ```text
//! v += (F / m + g) * dt
//! p += v * dt
//! F  = 0
//! ```
//!
//! Bodies with a non-positive mass are kinematic: forces and gravity are
//! ignored, but their velocity still moves them.

use lumen_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::app::{ensure_registered, System};
use crate::math::{Mat4, Vec3};

/// System name reported in diagnostics.
pub const PHYSICS_SYSTEM_NAME: &str = "physics";

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// World-space placement of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians, applied Z, then X, then Y.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// `T * Ry * Rx * Rz * S`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::translation(self.position)
            * Mat4::rotation_y(self.rotation.y)
            * Mat4::rotation_x(self.rotation.x)
            * Mat4::rotation_z(self.rotation.z)
            * Mat4::scale(self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Linear velocity in units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity(pub Vec3);

/// Force accumulated over a frame, cleared after integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Force {
    pub accumulated: Vec3,
    pub mass: f32,
}

impl Force {
    pub fn with_mass(mass: f32) -> Self {
        Self {
            accumulated: Vec3::ZERO,
            mass,
        }
    }

    pub fn apply(&mut self, force: Vec3) {
        self.accumulated += force;
    }

    fn inverse_mass(&self) -> f32 {
        if self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }
}

impl Default for Force {
    fn default() -> Self {
        Self::with_mass(1.0)
    }
}

// ---------------------------------------------------------------------------
// PhysicsSystem
// ---------------------------------------------------------------------------

/// Integrates bodies once per frame.
#[derive(Debug)]
pub struct PhysicsSystem {
    gravity: Vec3,
    /// Reused per frame so the view can be released before mutating.
    scratch: Vec<Entity>,
}

impl PhysicsSystem {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            scratch: Vec::new(),
        }
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Register the physics components on `scene` if needed.
    pub fn register_components(scene: &mut Scene) -> Result<(), EcsError> {
        ensure_registered::<Transform>(scene)?;
        ensure_registered::<Velocity>(scene)?;
        ensure_registered::<Force>(scene)
    }
}

impl System for PhysicsSystem {
    fn name(&self) -> &str {
        PHYSICS_SYSTEM_NAME
    }

    fn init(&mut self, scene: &mut Scene) -> Result<(), EcsError> {
        Self::register_components(scene)
    }

    fn update(&mut self, scene: &mut Scene, dt: f32) -> Result<(), EcsError> {
        self.scratch.clear();
        self.scratch
            .extend(scene.view::<(Transform, Velocity, Force)>()?);

        for &entity in &self.scratch {
            let force = scene.get_component_mut::<Force>(entity)?;
            let inv_mass = force.inverse_mass();
            let accel = if inv_mass > 0.0 {
                force.accumulated * inv_mass + self.gravity
            } else {
                Vec3::ZERO
            };
            force.accumulated = Vec3::ZERO;

            let velocity = scene.get_component_mut::<Velocity>(entity)?;
            velocity.0 += accel * dt;
            let v = velocity.0;

            scene.get_component_mut::<Transform>(entity)?.position += v * dt;
        }
        tracing::trace!(bodies = self.scratch.len(), "physics step");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Scene, PhysicsSystem) {
        let mut scene = Scene::new();
        let mut physics = PhysicsSystem::new(Vec3::new(0.0, -10.0, 0.0));
        physics.init(&mut scene).unwrap();
        (scene, physics)
    }

    fn spawn_body(scene: &mut Scene, velocity: Vec3, mass: f32) -> Entity {
        let e = scene.create_entity().unwrap();
        scene.add_component(e, Transform::default()).unwrap();
        scene.add_component(e, Velocity(velocity)).unwrap();
        scene.add_component(e, Force::with_mass(mass)).unwrap();
        e
    }

    #[test]
    fn gravity_then_position_semi_implicit() {
        let (mut scene, mut physics) = setup();
        let e = spawn_body(&mut scene, Vec3::ZERO, 1.0);

        physics.update(&mut scene, 0.5).unwrap();
        // v = -10 * 0.5 = -5, p = -5 * 0.5 = -2.5
        assert_eq!(scene.get_component::<Velocity>(e).unwrap().0.y, -5.0);
        assert_eq!(
            scene.get_component::<Transform>(e).unwrap().position.y,
            -2.5
        );
    }

    #[test]
    fn force_is_divided_by_mass_and_cleared() {
        let (mut scene, mut physics) = setup();
        physics.set_gravity(Vec3::ZERO);
        let e = spawn_body(&mut scene, Vec3::ZERO, 2.0);
        scene
            .get_component_mut::<Force>(e)
            .unwrap()
            .apply(Vec3::new(4.0, 0.0, 0.0));

        physics.update(&mut scene, 1.0).unwrap();
        assert_eq!(scene.get_component::<Velocity>(e).unwrap().0.x, 2.0);
        assert_eq!(
            scene.get_component::<Force>(e).unwrap().accumulated,
            Vec3::ZERO
        );

        // No force the second step: constant velocity.
        physics.update(&mut scene, 1.0).unwrap();
        assert_eq!(scene.get_component::<Velocity>(e).unwrap().0.x, 2.0);
        assert_eq!(
            scene.get_component::<Transform>(e).unwrap().position.x,
            4.0
        );
    }

    #[test]
    fn kinematic_bodies_ignore_gravity() {
        let (mut scene, mut physics) = setup();
        let e = spawn_body(&mut scene, Vec3::new(1.0, 0.0, 0.0), 0.0);
        physics.update(&mut scene, 1.0).unwrap();
        let t = scene.get_component::<Transform>(e).unwrap();
        assert_eq!(t.position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn entities_without_force_are_not_integrated() {
        let (mut scene, mut physics) = setup();
        let e = scene.create_entity().unwrap();
        scene.add_component(e, Transform::default()).unwrap();
        scene
            .add_component(e, Velocity(Vec3::new(1.0, 1.0, 1.0)))
            .unwrap();
        physics.update(&mut scene, 1.0).unwrap();
        assert_eq!(
            scene.get_component::<Transform>(e).unwrap().position,
            Vec3::ZERO
        );
    }

    #[test]
    fn init_is_idempotent_for_shared_components() {
        let mut scene = Scene::new();
        scene.register_component::<Transform>().unwrap();
        let mut physics = PhysicsSystem::new(Vec3::ZERO);
        physics.init(&mut scene).unwrap();
        assert!(scene.is_component_registered::<Force>());
    }

    #[test]
    fn transform_matrix_places_origin_at_position() {
        let t = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.4, 1.1, -0.2),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let p = t.matrix().transform_point(Vec3::ZERO);
        assert!((p - t.position).length() < 1e-6);
    }
}
