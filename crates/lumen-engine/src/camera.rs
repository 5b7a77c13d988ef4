//! Free-fly camera control.
//!
//! [`CameraController`] listens to [`camera::MOVEMENT`], [`input::MOUSE`] and
//! [`input::SCROLL`], buffers what it hears, and applies it to every entity
//! owning a [`Camera`] and a [`Transform`] when it updates.

use std::cell::RefCell;
use std::rc::Rc;

use lumen_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::app::{ensure_registered, System};
use crate::events::{camera, input, Moves, MouseData, ScrollData};
use crate::math::Vec3;
use crate::physics::Transform;

/// Pitch is kept strictly inside (-90°, 90°) so the view never flips.
pub const PITCH_LIMIT: f32 = 89.0 * std::f32::consts::PI / 180.0;
pub const MIN_FOV: f32 = 1.0 * std::f32::consts::PI / 180.0;
pub const MAX_FOV: f32 = 90.0 * std::f32::consts::PI / 180.0;
/// Field-of-view change per scroll unit, in radians.
pub const ZOOM_STEP: f32 = 1.0 * std::f32::consts::PI / 180.0;

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Orientation and control parameters of a camera entity.
///
/// Yaw 0 and pitch 0 look down -Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Radians, positive turns right.
    pub yaw: f32,
    /// Radians, positive looks up.
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Units per second.
    pub speed: f32,
    /// Radians per pixel of mouse motion.
    pub sensitivity: f32,
    pub sprint_multiplier: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            fov_y: 45.0 * std::f32::consts::PI / 180.0,
            speed: 5.0,
            sensitivity: 0.002,
            sprint_multiplier: 2.5,
        }
    }
}

impl Camera {
    /// Unit view direction.
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(cp * sy, sp, -cp * cy)
    }

    /// Unit vector to the right of the view, always horizontal.
    pub fn right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cy, 0.0, sy)
    }
}

// ---------------------------------------------------------------------------
// CameraController
// ---------------------------------------------------------------------------

/// Input gathered by the listeners between two updates.
#[derive(Debug, Clone, Copy, Default)]
struct PendingInput {
    /// Latched: stays in effect until the next MOVEMENT event.
    moves: Moves,
    look_dx: f32,
    look_dy: f32,
    zoom: f32,
}

/// Moves and turns camera entities from input events.
#[derive(Debug, Default)]
pub struct CameraController {
    pending: Rc<RefCell<PendingInput>>,
    scratch: Vec<Entity>,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Movement flags from the most recent MOVEMENT event.
    pub fn moves(&self) -> Moves {
        self.pending.borrow().moves
    }
}

impl System for CameraController {
    fn name(&self) -> &str {
        "camera"
    }

    fn init(&mut self, scene: &mut Scene) -> Result<(), EcsError> {
        ensure_registered::<Camera>(scene)?;
        ensure_registered::<Transform>(scene)?;

        let pending = Rc::clone(&self.pending);
        scene.add_listener(camera::MOVEMENT, move |event| {
            match event.param::<Moves>(camera::MOVES) {
                Ok(moves) => pending.borrow_mut().moves = *moves,
                Err(err) => tracing::warn!(%err, "ignoring malformed movement event"),
            }
        });

        let pending = Rc::clone(&self.pending);
        scene.add_listener(input::MOUSE, move |event| {
            match event.param::<MouseData>(input::MOUSE_DATA) {
                Ok(data) => {
                    let mut p = pending.borrow_mut();
                    p.look_dx += data.dx;
                    p.look_dy += data.dy;
                }
                Err(err) => tracing::warn!(%err, "ignoring malformed mouse event"),
            }
        });

        let pending = Rc::clone(&self.pending);
        scene.add_listener(input::SCROLL, move |event| {
            match event.param::<ScrollData>(input::SCROLL_DATA) {
                Ok(data) => pending.borrow_mut().zoom += data.dy,
                Err(err) => tracing::warn!(%err, "ignoring malformed scroll event"),
            }
        });
        Ok(())
    }

    fn update(&mut self, scene: &mut Scene, dt: f32) -> Result<(), EcsError> {
        let input = {
            let mut pending = self.pending.borrow_mut();
            let snapshot = *pending;
            pending.look_dx = 0.0;
            pending.look_dy = 0.0;
            pending.zoom = 0.0;
            snapshot
        };

        self.scratch.clear();
        self.scratch.extend(scene.view::<(Camera, Transform)>()?);

        for &entity in &self.scratch {
            let cam = scene.get_component_mut::<Camera>(entity)?;
            cam.yaw += input.look_dx * cam.sensitivity;
            cam.pitch = (cam.pitch - input.look_dy * cam.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
            cam.fov_y = (cam.fov_y - input.zoom * ZOOM_STEP).clamp(MIN_FOV, MAX_FOV);
            let cam = *cam;

            let direction = movement_direction(&cam, input.moves);
            if direction == Vec3::ZERO {
                continue;
            }
            let mut speed = cam.speed;
            if input.moves.contains(Moves::SPRINT) {
                speed *= cam.sprint_multiplier;
            }
            scene.get_component_mut::<Transform>(entity)?.position += direction * (speed * dt);
        }
        Ok(())
    }
}

/// Unit direction for `moves`, or zero when the keys cancel out.
fn movement_direction(cam: &Camera, moves: Moves) -> Vec3 {
    let forward = cam.forward();
    let right = cam.right();
    let mut dir = Vec3::ZERO;
    if moves.contains(Moves::FORWARD) {
        dir += forward;
    }
    if moves.contains(Moves::BACKWARD) {
        dir += -forward;
    }
    if moves.contains(Moves::RIGHT) {
        dir += right;
    }
    if moves.contains(Moves::LEFT) {
        dir += -right;
    }
    if moves.contains(Moves::UP) {
        dir += Vec3::Y;
    }
    if moves.contains(Moves::DOWN) {
        dir += -Vec3::Y;
    }
    dir.normalize_or_zero()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;

    fn setup() -> (Scene, CameraController, Entity) {
        let mut scene = Scene::new();
        let mut controller = CameraController::new();
        controller.init(&mut scene).unwrap();
        let e = scene.create_entity().unwrap();
        scene.add_component(e, Camera::default()).unwrap();
        scene.add_component(e, Transform::default()).unwrap();
        (scene, controller, e)
    }

    fn position(scene: &Scene, e: Entity) -> Vec3 {
        scene.get_component::<Transform>(e).unwrap().position
    }

    #[test]
    fn forward_moves_down_negative_z() {
        let (mut scene, mut controller, e) = setup();
        scene.send_event(&mut events::movement(Moves::FORWARD));
        controller.update(&mut scene, 1.0).unwrap();
        let p = position(&scene, e);
        assert!((p - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5, "{p:?}");
    }

    #[test]
    fn movement_is_latched_until_next_event() {
        let (mut scene, mut controller, e) = setup();
        scene.send_event(&mut events::movement(Moves::UP));
        controller.update(&mut scene, 1.0).unwrap();
        controller.update(&mut scene, 1.0).unwrap();
        assert!((position(&scene, e).y - 10.0).abs() < 1e-5);

        scene.send_event(&mut events::movement(Moves::empty()));
        controller.update(&mut scene, 1.0).unwrap();
        assert!((position(&scene, e).y - 10.0).abs() < 1e-5);
    }

    #[test]
    fn sprint_scales_speed() {
        let (mut scene, mut controller, e) = setup();
        scene.send_event(&mut events::movement(Moves::RIGHT | Moves::SPRINT));
        controller.update(&mut scene, 1.0).unwrap();
        assert!((position(&scene, e).x - 12.5).abs() < 1e-4);
    }

    #[test]
    fn opposite_keys_cancel() {
        let (mut scene, mut controller, e) = setup();
        scene.send_event(&mut events::movement(Moves::LEFT | Moves::RIGHT));
        controller.update(&mut scene, 1.0).unwrap();
        assert_eq!(position(&scene, e), Vec3::ZERO);
    }

    #[test]
    fn mouse_turns_and_pitch_is_clamped() {
        let (mut scene, mut controller, e) = setup();
        let look = MouseData {
            dx: 100.0,
            dy: -1_000_000.0,
            ..MouseData::default()
        };
        scene.send_event(&mut events::mouse(look));
        controller.update(&mut scene, 0.016).unwrap();

        let cam = *scene.get_component::<Camera>(e).unwrap();
        assert!((cam.yaw - 0.2).abs() < 1e-6);
        assert_eq!(cam.pitch, PITCH_LIMIT);

        // Look deltas are consumed, not reapplied.
        controller.update(&mut scene, 0.016).unwrap();
        assert_eq!(scene.get_component::<Camera>(e).unwrap().yaw, cam.yaw);
    }

    #[test]
    fn scroll_zooms_within_limits() {
        let (mut scene, mut controller, e) = setup();
        scene.send_event(&mut events::scroll(ScrollData { dx: 0.0, dy: 5.0 }));
        controller.update(&mut scene, 0.016).unwrap();
        let fov = scene.get_component::<Camera>(e).unwrap().fov_y;
        assert!((fov - 40.0f32.to_radians()).abs() < 1e-5);

        scene.send_event(&mut events::scroll(ScrollData { dx: 0.0, dy: 500.0 }));
        controller.update(&mut scene, 0.016).unwrap();
        assert_eq!(scene.get_component::<Camera>(e).unwrap().fov_y, MIN_FOV);

        scene.send_event(&mut events::scroll(ScrollData { dx: 0.0, dy: -500.0 }));
        controller.update(&mut scene, 0.016).unwrap();
        assert_eq!(scene.get_component::<Camera>(e).unwrap().fov_y, MAX_FOV);
    }

    #[test]
    fn malformed_movement_is_ignored() {
        let (mut scene, mut controller, e) = setup();
        let mut bad = Event::new(camera::MOVEMENT).with_param(camera::MOVES, 3u32);
        scene.send_event(&mut bad);
        controller.update(&mut scene, 1.0).unwrap();
        assert_eq!(controller.moves(), Moves::empty());
        assert_eq!(position(&scene, e), Vec3::ZERO);
    }
}
