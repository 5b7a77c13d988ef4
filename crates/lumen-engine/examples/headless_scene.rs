//! Headless Lumen scene: a falling cube, a lamp and a camera that walks
//! forward while turning, driven by a scripted platform.
//!
//! Run with: `cargo run --example headless_scene -- [config.json]`

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use lumen_engine::logging;
use lumen_engine::prelude::*;

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Prints a one-line summary of every tenth frame.
#[derive(Default)]
struct LogBackend {
    bytes_uploaded: Rc<RefCell<usize>>,
}

impl RenderBackend for LogBackend {
    fn draw(&mut self, frame: &FrameDrawList) {
        *self.bytes_uploaded.borrow_mut() += frame.world_matrix_bytes().len();
        if frame.frame % 10 == 1 {
            let eye = frame.camera.map(|c| c.position).unwrap_or_default();
            println!(
                "frame {:>3}: {} models, {} lights, eye at ({:.2}, {:.2}, {:.2})",
                frame.frame,
                frame.len(),
                frame.lights.len(),
                eye.x,
                eye.y,
                eye.z
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

fn script(width: i32, height: i32) -> Vec<Vec<PlatformEvent>> {
    let mut frames = vec![vec![
        PlatformEvent::ContextCreated,
        PlatformEvent::Resized { width, height },
        PlatformEvent::Key {
            key: Key::W,
            pressed: true,
        },
    ]];
    for _ in 0..30 {
        frames.push(vec![PlatformEvent::MouseMotion(MouseData {
            dx: 4.0,
            ..MouseData::default()
        })]);
    }
    frames.push(vec![
        PlatformEvent::Key {
            key: Key::W,
            pressed: false,
        },
        PlatformEvent::Scroll(ScrollData { dx: 0.0, dy: 3.0 }),
    ]);
    frames.extend(std::iter::repeat(Vec::new()).take(20));
    frames
}

// ---------------------------------------------------------------------------
// Scene setup
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => EngineConfig::default(),
    };
    logging::init(&config.log_filter);

    let width = i32::try_from(config.window.width).context("window width")?;
    let height = i32::try_from(config.window.height).context("window height")?;
    let platform = HeadlessPlatform::scripted(script(width, height)).quit_when_drained();
    let mut app = Application::new(&config, platform)?;

    let uploaded = Rc::new(RefCell::new(0));
    app.add_system(PhysicsSystem::new(config.gravity()))?;
    app.add_system(CameraController::new())?;
    app.add_system(RenderSystem::new(
        LogBackend {
            bytes_uploaded: Rc::clone(&uploaded),
        },
        config.window.width,
        config.window.height,
    ))?;

    let scene = app.scene_mut();

    let cube = scene.create_entity()?;
    scene.add_component(cube, Transform::from_position(Vec3::new(0.0, 10.0, -5.0)))?;
    scene.add_component(cube, Velocity::default())?;
    scene.add_component(cube, Force::with_mass(2.0))?;
    scene.add_component(cube, Renderable::default())?;
    scene.add_component(cube, Model { handle: ModelHandle(0) })?;

    let lamp = scene.create_entity()?;
    scene.add_component(lamp, Transform::from_position(Vec3::new(2.0, 5.0, 0.0)))?;
    scene.add_component(
        lamp,
        Light {
            color: Vec3::new(1.0, 0.9, 0.8),
            intensity: 3.0,
        },
    )?;

    let eye = scene.create_entity()?;
    scene.add_component(eye, Transform::from_position(Vec3::new(0.0, 1.5, 5.0)))?;
    scene.add_component(eye, Camera::default())?;

    let frames = app.run()?;

    let cube_y = app.scene().get_component::<Transform>(cube)?.position.y;
    let cam = app.scene().get_component::<Camera>(eye)?;
    println!();
    println!("ran {frames} frames, cube fell to y = {cube_y:.2}");
    println!(
        "camera yaw {:.1} deg, fov {:.1} deg",
        cam.yaw.to_degrees(),
        cam.fov_y.to_degrees()
    );
    println!("uploaded {} bytes of world matrices", uploaded.borrow());
    println!("last frame:");
    for (name, time) in &app.last_diagnostics().system_times {
        println!("  {name:<8} {time:?}");
    }
    Ok(())
}
