//! Lumen Engine -- frame loop and built-in systems on top of [`lumen_ecs`].
//!
//! The [`Application`](app::Application) polls a [`Platform`](platform::Platform),
//! turns what it reports into scene events, and runs systems in a fixed order
//! every frame. Physics integration, free-fly camera control and draw-list
//! collection for an external renderer ship as ready-made systems.
//!
//! # Quick Start
//!
//! ```
//! use lumen_engine::prelude::*;
//!
//! let config = EngineConfig::default();
//! let platform = HeadlessPlatform::scripted(vec![vec![]; 10]).quit_when_drained();
//! let mut app = Application::new(&config, platform).unwrap();
//! app.add_system(PhysicsSystem::new(config.gravity())).unwrap();
//!
//! let scene = app.scene_mut();
//! let ball = scene.create_entity().unwrap();
//! scene.add_component(ball, Transform::default()).unwrap();
//! scene.add_component(ball, Velocity::default()).unwrap();
//! scene.add_component(ball, Force::with_mass(1.0)).unwrap();
//!
//! app.run().unwrap();
//! let fallen = app.scene().get_component::<Transform>(ball).unwrap().position.y;
//! assert!(fallen < 0.0);
//! ```

#![deny(unsafe_code)]

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod math;
pub mod physics;
pub mod platform;
pub mod render;

pub use error::EngineError;

/// Re-export the ECS crate for convenience.
pub use lumen_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use lumen_ecs::prelude::*;

    pub use crate::app::{
        ensure_registered, movement_from_keys, Application, EventQueue, FrameDiagnostics, System,
    };
    pub use crate::camera::{Camera, CameraController};
    pub use crate::config::{EngineConfig, WindowConfig};
    pub use crate::error::EngineError;
    pub use crate::events::{Moves, MouseData, ScrollData};
    pub use crate::math::{Mat4, Vec3};
    pub use crate::physics::{Force, PhysicsSystem, Transform, Velocity, PHYSICS_SYSTEM_NAME};
    pub use crate::platform::{HeadlessPlatform, Key, KeyState, Platform, PlatformEvent};
    pub use crate::render::{
        FrameDrawList, Light, Model, ModelHandle, Projection, RenderBackend, RenderSystem,
        Renderable,
    };
}
