//! Projection state and per-frame draw collection.
//!
//! The engine does not talk to a graphics API itself. Each frame the
//! [`RenderSystem`] walks the scene and fills a [`FrameDrawList`]:
//!
//! - one [`DrawItem`] per visible entity with [`Renderable`], [`Model`] and
//!   [`Transform`], plus its world matrix,
//! - one [`LightItem`] per entity with [`Light`] and [`Transform`],
//! - the first entity with [`Camera`] and [`Transform`] as the active view,
//!
//! and hands it to a [`RenderBackend`]. Nothing is drawn until
//! [`window::GL_INIT`] has been received. [`window::RESIZED`] rebuilds the
//! [`Projection`].

use std::cell::RefCell;
use std::rc::Rc;

use lumen_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::app::{ensure_registered, System};
use crate::camera::Camera;
use crate::events::window;
use crate::math::{Mat4, Vec3};
use crate::physics::Transform;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Marks an entity as drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renderable {
    pub visible: bool,
}

impl Default for Renderable {
    fn default() -> Self {
        Self { visible: true }
    }
}

/// Backend-side identifier of loaded mesh data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub handle: ModelHandle,
}

/// Point light at the entity's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Linear RGB.
    pub color: Vec3,
    pub intensity: f32,
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Viewport size and perspective parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub width: u32,
    pub height: u32,
    /// Always `width / height`.
    pub aspect: f32,
    /// Vertical field of view in radians, used when no camera overrides it.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    /// A 45° projection for a `width` x `height` viewport. A zero height
    /// yields an aspect of 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            aspect: if height == 0 {
                1.0
            } else {
                width as f32 / height as f32
            },
            fov_y: 45.0 * std::f32::consts::PI / 180.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Adopt a new viewport size. Non-positive sizes (a minimized window)
    /// are ignored and `false` is returned.
    pub fn resize(&mut self, width: i32, height: i32) -> bool {
        if width <= 0 || height <= 0 {
            tracing::warn!(width, height, "ignoring resize to an empty viewport");
            return false;
        }
        self.width = width as u32;
        self.height = height as u32;
        self.aspect = width as f32 / height as f32;
        true
    }

    pub fn perspective_matrix(&self) -> Mat4 {
        self.perspective_matrix_with_fov(self.fov_y)
    }

    pub fn perspective_matrix_with_fov(&self, fov_y: f32) -> Mat4 {
        Mat4::perspective(fov_y, self.aspect, self.near, self.far)
    }
}

// ---------------------------------------------------------------------------
// FrameDrawList
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub entity: Entity,
    pub model: ModelHandle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightItem {
    pub entity: Entity,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

/// The camera a frame is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub entity: Entity,
    pub position: Vec3,
    pub view: Mat4,
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDrawList {
    /// 1-based index of the drawn frame.
    pub frame: u64,
    pub items: Vec<DrawItem>,
    /// `world_matrices[i]` belongs to `items[i]`.
    pub world_matrices: Vec<Mat4>,
    pub lights: Vec<LightItem>,
    pub camera: Option<CameraView>,
    pub projection: Mat4,
}

impl FrameDrawList {
    pub fn clear(&mut self) {
        self.items.clear();
        self.world_matrices.clear();
        self.lights.clear();
        self.camera = None;
    }

    /// Number of draw items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// World matrices as raw bytes for a single buffer upload.
    pub fn world_matrix_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.world_matrices)
    }
}

// ---------------------------------------------------------------------------
// RenderBackend
// ---------------------------------------------------------------------------

/// The graphics layer that turns a [`FrameDrawList`] into pixels.
pub trait RenderBackend {
    fn draw(&mut self, frame: &FrameDrawList);
}

// ---------------------------------------------------------------------------
// RenderSystem
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RenderState {
    projection: Projection,
    /// Set by GL_INIT.
    ready: bool,
}

/// Collects draw data every frame and submits it to the backend.
pub struct RenderSystem {
    backend: Box<dyn RenderBackend>,
    state: Rc<RefCell<RenderState>>,
    list: FrameDrawList,
    scratch: Vec<Entity>,
    frames_drawn: u64,
}

impl RenderSystem {
    /// A render system for an initial `width` x `height` viewport.
    pub fn new<B: RenderBackend + 'static>(backend: B, width: u32, height: u32) -> Self {
        Self {
            backend: Box::new(backend),
            state: Rc::new(RefCell::new(RenderState {
                projection: Projection::new(width, height),
                ready: false,
            })),
            list: FrameDrawList::default(),
            scratch: Vec::new(),
            frames_drawn: 0,
        }
    }

    pub fn projection(&self) -> Projection {
        self.state.borrow().projection
    }

    /// Whether GL_INIT has been received.
    pub fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// The list submitted by the most recent draw.
    pub fn last_frame(&self) -> &FrameDrawList {
        &self.list
    }

    fn collect(&mut self, scene: &Scene) -> Result<(), EcsError> {
        self.list.clear();

        self.scratch.clear();
        self.scratch
            .extend(scene.view::<(Renderable, Model, Transform)>()?);
        for &entity in &self.scratch {
            if !scene.get_component::<Renderable>(entity)?.visible {
                continue;
            }
            let model = scene.get_component::<Model>(entity)?.handle;
            let world = scene.get_component::<Transform>(entity)?.matrix();
            self.list.items.push(DrawItem { entity, model });
            self.list.world_matrices.push(world);
        }

        self.scratch.clear();
        self.scratch.extend(scene.view::<(Light, Transform)>()?);
        for &entity in &self.scratch {
            let light = scene.get_component::<Light>(entity)?;
            self.list.lights.push(LightItem {
                entity,
                position: scene.get_component::<Transform>(entity)?.position,
                color: light.color,
                intensity: light.intensity,
            });
        }

        let state = self.state.borrow();
        let mut fov_y = state.projection.fov_y;
        if let Some(entity) = scene.view::<(Camera, Transform)>()?.next() {
            let cam = scene.get_component::<Camera>(entity)?;
            let position = scene.get_component::<Transform>(entity)?.position;
            fov_y = cam.fov_y;
            self.list.camera = Some(CameraView {
                entity,
                position,
                view: Mat4::look_at(position, position + cam.forward(), Vec3::Y),
            });
        }
        self.list.projection = state.projection.perspective_matrix_with_fov(fov_y);
        Ok(())
    }
}

impl System for RenderSystem {
    fn name(&self) -> &str {
        "render"
    }

    fn init(&mut self, scene: &mut Scene) -> Result<(), EcsError> {
        ensure_registered::<Transform>(scene)?;
        ensure_registered::<Renderable>(scene)?;
        ensure_registered::<Model>(scene)?;
        ensure_registered::<Light>(scene)?;
        ensure_registered::<Camera>(scene)?;

        let state = Rc::clone(&self.state);
        scene.add_listener(window::RESIZED, move |event| {
            let size = event
                .param::<i32>(window::WIDTH)
                .and_then(|w| Ok((*w, *event.param::<i32>(window::HEIGHT)?)));
            match size {
                Ok((width, height)) => {
                    if state.borrow_mut().projection.resize(width, height) {
                        tracing::debug!(width, height, "projection rebuilt");
                    }
                }
                Err(err) => tracing::warn!(%err, "ignoring malformed resize event"),
            }
        });

        let state = Rc::clone(&self.state);
        scene.add_listener(window::GL_INIT, move |_| {
            state.borrow_mut().ready = true;
            tracing::debug!("graphics context ready");
        });
        Ok(())
    }

    fn update(&mut self, scene: &mut Scene, _dt: f32) -> Result<(), EcsError> {
        if !self.is_ready() {
            tracing::trace!("graphics context not ready, skipping draw");
            return Ok(());
        }
        self.collect(scene)?;
        self.frames_drawn += 1;
        self.list.frame = self.frames_drawn;
        self.backend.draw(&self.list);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;

    /// Keeps a copy of every submitted frame.
    struct RecordingBackend {
        frames: Rc<RefCell<Vec<FrameDrawList>>>,
    }

    impl RenderBackend for RecordingBackend {
        fn draw(&mut self, frame: &FrameDrawList) {
            self.frames.borrow_mut().push(frame.clone());
        }
    }

    fn setup() -> (Scene, RenderSystem, Rc<RefCell<Vec<FrameDrawList>>>) {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let backend = RecordingBackend {
            frames: Rc::clone(&frames),
        };
        let mut scene = Scene::new();
        let mut render = RenderSystem::new(backend, 1280, 720);
        render.init(&mut scene).unwrap();
        (scene, render, frames)
    }

    fn spawn_model(scene: &mut Scene, x: f32, visible: bool, handle: u32) -> Entity {
        let e = scene.create_entity().unwrap();
        scene
            .add_component(e, Transform::from_position(Vec3::new(x, 0.0, 0.0)))
            .unwrap();
        scene.add_component(e, Renderable { visible }).unwrap();
        scene
            .add_component(e, Model { handle: ModelHandle(handle) })
            .unwrap();
        e
    }

    // -- projection ---------------------------------------------------------

    #[test]
    fn resize_800x600_gives_exact_aspect() {
        let (mut scene, render, _) = setup();
        scene.send_event(&mut events::resized(800, 600));
        let p = render.projection();
        assert_eq!(p.aspect, 800.0 / 600.0);
        assert_eq!((p.width, p.height), (800, 600));
    }

    #[test]
    fn zero_height_resize_is_ignored() {
        let (mut scene, render, _) = setup();
        let before = render.projection();
        scene.send_event(&mut events::resized(800, 0));
        assert_eq!(render.projection(), before);
        assert!(!render.projection().aspect.is_nan());
    }

    #[test]
    fn malformed_resize_is_ignored() {
        let (mut scene, render, _) = setup();
        let before = render.projection();
        let mut bad = Event::new(window::RESIZED).with_param(window::WIDTH, 800u32);
        scene.send_event(&mut bad);
        assert_eq!(render.projection(), before);
    }

    #[test]
    fn perspective_matrix_uses_aspect() {
        let p = Projection::new(200, 100);
        let m = p.perspective_matrix().to_cols_array();
        assert!((m[5] / m[0] - 2.0).abs() < 1e-5);
    }

    // -- draw collection ----------------------------------------------------

    #[test]
    fn nothing_is_drawn_before_gl_init() {
        let (mut scene, mut render, frames) = setup();
        spawn_model(&mut scene, 0.0, true, 1);
        render.update(&mut scene, 0.016).unwrap();
        assert!(frames.borrow().is_empty());
        assert!(!render.is_ready());

        scene.send_event(&mut events::gl_init());
        render.update(&mut scene, 0.016).unwrap();
        assert_eq!(frames.borrow().len(), 1);
        assert_eq!(frames.borrow()[0].frame, 1);
    }

    #[test]
    fn collects_visible_models_lights_and_camera() {
        let (mut scene, mut render, frames) = setup();
        scene.send_event(&mut events::gl_init());

        let shown = spawn_model(&mut scene, 3.0, true, 7);
        spawn_model(&mut scene, 5.0, false, 8);

        let lamp = scene.create_entity().unwrap();
        scene
            .add_component(lamp, Transform::from_position(Vec3::new(0.0, 10.0, 0.0)))
            .unwrap();
        scene
            .add_component(lamp, Light { color: Vec3::ONE, intensity: 2.0 })
            .unwrap();

        let eye = scene.create_entity().unwrap();
        scene
            .add_component(eye, Transform::from_position(Vec3::new(0.0, 0.0, 5.0)))
            .unwrap();
        scene.add_component(eye, Camera::default()).unwrap();

        render.update(&mut scene, 0.016).unwrap();
        let frames = frames.borrow();
        let frame = &frames[0];

        assert_eq!(frame.items, vec![DrawItem { entity: shown, model: ModelHandle(7) }]);
        assert_eq!(
            frame.world_matrices[0].transform_point(Vec3::ZERO),
            Vec3::new(3.0, 0.0, 0.0)
        );
        assert_eq!(frame.world_matrix_bytes().len(), 64);

        assert_eq!(frame.lights.len(), 1);
        assert_eq!(frame.lights[0].position, Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(frame.lights[0].intensity, 2.0);

        let camera = frame.camera.expect("camera entity exists");
        assert_eq!(camera.entity, eye);
        let eye_in_view = camera.view.transform_point(Vec3::new(0.0, 0.0, 5.0));
        assert!(eye_in_view.length() < 1e-5);
    }

    #[test]
    fn list_is_rebuilt_each_frame() {
        let (mut scene, mut render, _) = setup();
        scene.send_event(&mut events::gl_init());
        let e = spawn_model(&mut scene, 0.0, true, 1);
        render.update(&mut scene, 0.016).unwrap();
        assert_eq!(render.last_frame().len(), 1);

        scene.destroy_entity(e).unwrap();
        render.update(&mut scene, 0.016).unwrap();
        assert!(render.last_frame().is_empty());
        assert_eq!(render.frames_drawn(), 2);
    }
}
