//! The per-frame application loop.
//!
//! Each call to [`Application::frame`]:
//!
//! 1. Polls the [`Platform`] and translates its events into scene events
//!    (keyboard state is folded into a single [`camera::MOVEMENT`] event).
//! 2. Dispatches the events posted to the [`EventQueue`] since the last
//!    frame, including follow-ups posted by the listeners of step 1.
//! 3. Runs every system, strictly in the order they were added.
//! 4. Runs the GUI hook, if any, then presents.
//!
//! Quitting is an ordinary [`window::QUIT`] listener that raises a flag;
//! [`Application::run`] checks it at the top of each iteration, so the frame
//! in which QUIT arrives still completes.
//!
//! # Example
//!
//! ```
//! use lumen_engine::prelude::*;
//!
//! let platform = HeadlessPlatform::scripted(vec![vec![], vec![]]).quit_when_drained();
//! let mut app = Application::new(&EngineConfig::default(), platform).unwrap();
//! let frames = app.run().unwrap();
//! assert_eq!(frames, 3);
//! assert!(app.quit_requested());
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use lumen_ecs::prelude::*;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{self, camera, window, Moves};
use crate::platform::{Key, KeyState, Platform, PlatformEvent};

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Per-frame logic run by the [`Application`].
pub trait System {
    /// Name used in diagnostics and logs.
    fn name(&self) -> &str;

    /// Called once when the system is added. Register the components the
    /// system needs and subscribe listeners here.
    fn init(&mut self, _scene: &mut Scene) -> Result<(), EcsError> {
        Ok(())
    }

    /// Advance by `dt` seconds.
    fn update(&mut self, scene: &mut Scene, dt: f32) -> Result<(), EcsError>;
}

/// Register `T` unless the scene already knows it.
pub fn ensure_registered<T: Component>(scene: &mut Scene) -> Result<(), EcsError> {
    if !scene.is_component_registered::<T>() {
        scene.register_component::<T>()?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// EventQueue
// ---------------------------------------------------------------------------

/// Events to dispatch at the start of the next frame.
///
/// Listeners cannot send events while they are being dispatched; they clone
/// this handle and post follow-ups instead.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Rc<RefCell<VecDeque<Event>>>,
}

impl EventQueue {
    pub fn post(&self, event: Event) {
        self.inner.borrow_mut().push_back(event);
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    fn take(&self) -> VecDeque<Event> {
        std::mem::take(&mut *self.inner.borrow_mut())
    }
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Wall-clock time per system (in order of execution).
    pub system_times: Vec<(String, Duration)>,
    /// Total time for the frame, including polling and present.
    pub total_time: Duration,
    /// Events dispatched before the systems ran.
    pub events_dispatched: usize,
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

struct RegisteredSystem {
    name: String,
    system: Rc<RefCell<dyn System>>,
}

type GuiHook = Box<dyn FnMut(&mut Scene)>;

/// Owns the scene and the platform and drives frames.
pub struct Application<P: Platform> {
    scene: Scene,
    platform: P,
    systems: Vec<RegisteredSystem>,
    queue: EventQueue,
    quit: Rc<Cell<bool>>,
    gui: Option<GuiHook>,
    fixed_dt: f32,
    frame_counter: u64,
    last_diagnostics: FrameDiagnostics,
    /// Reused across frames to avoid reallocating the poll buffer.
    polled: Vec<PlatformEvent>,
}

impl<P: Platform> Application<P> {
    /// Validate `config`, build the scene and subscribe the quit listener.
    pub fn new(config: &EngineConfig, platform: P) -> Result<Self, EngineError> {
        config.validate()?;
        let mut scene = Scene::with_config(config.scene_config());

        let quit = Rc::new(Cell::new(false));
        let flag = Rc::clone(&quit);
        scene.add_listener(window::QUIT, move |_| flag.set(true));

        tracing::debug!(
            max_entities = config.max_entities,
            fixed_dt = config.fixed_dt,
            "application created"
        );
        Ok(Self {
            scene,
            platform,
            systems: Vec::new(),
            queue: EventQueue::default(),
            quit,
            gui: None,
            fixed_dt: config.fixed_dt,
            frame_counter: 0,
            last_diagnostics: FrameDiagnostics::default(),
            polled: Vec::new(),
        })
    }

    /// Add a system to run after every system added before it.
    ///
    /// The instance is also stored in the scene's system registry, so each
    /// system type can be added once. `init` runs before the system is
    /// stored; if it fails, nothing is registered and the same type can be
    /// added again. Listeners `init` bound before failing stay bound.
    pub fn add_system<S: System + 'static>(
        &mut self,
        mut system: S,
    ) -> Result<Rc<RefCell<S>>, EngineError> {
        if self.scene.has_system::<S>() {
            return Err(EcsError::SystemAlreadyRegistered {
                name: std::any::type_name::<S>(),
            }
            .into());
        }
        if self.scene.system_count() >= MAX_SYSTEMS {
            return Err(EcsError::SystemLimitReached { max: MAX_SYSTEMS }.into());
        }
        system.init(&mut self.scene)?;
        let handle = self.scene.register_system(system)?;
        let name = handle.borrow().name().to_owned();
        tracing::debug!(system = %name, order = self.systems.len(), "system added");
        self.systems.push(RegisteredSystem {
            name,
            system: handle.clone(),
        });
        Ok(handle)
    }

    /// Install a callback that runs after the systems, before present.
    pub fn set_gui_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Scene) + 'static,
    {
        self.gui = Some(Box::new(hook));
    }

    /// Run one frame.
    pub fn frame(&mut self) -> Result<(), EngineError> {
        let frame_start = Instant::now();

        // Phase 1: platform events.
        let mut polled = std::mem::take(&mut self.polled);
        self.platform.poll_events(&mut polled);
        let mut dispatched = 0;
        for platform_event in polled.drain(..) {
            if let Some(mut event) = translate(&platform_event) {
                self.scene.send_event(&mut event);
                dispatched += 1;
            }
        }
        self.polled = polled;

        let moves = movement_from_keys(self.platform.key_state());
        self.scene.send_event(&mut events::movement(moves));
        dispatched += 1;

        // Phase 2: deferred events. Anything posted while these dispatch
        // waits for the next frame.
        for mut event in self.queue.take() {
            self.scene.send_event(&mut event);
            dispatched += 1;
        }

        // Phase 3: systems in order.
        let mut system_times = Vec::with_capacity(self.systems.len());
        for registered in &self.systems {
            let sys_start = Instant::now();
            if let Err(err) = registered
                .system
                .borrow_mut()
                .update(&mut self.scene, self.fixed_dt)
            {
                tracing::error!(system = %registered.name, %err, "system update failed");
                return Err(err.into());
            }
            system_times.push((registered.name.clone(), sys_start.elapsed()));
        }

        // Phase 4: GUI and present.
        if let Some(gui) = self.gui.as_mut() {
            gui(&mut self.scene);
        }
        self.platform.present();

        self.frame_counter += 1;
        self.last_diagnostics = FrameDiagnostics {
            system_times,
            total_time: frame_start.elapsed(),
            events_dispatched: dispatched,
        };
        tracing::trace!(frame = self.frame_counter, events = dispatched, "frame finished");
        Ok(())
    }

    /// Run frames until QUIT has been seen. Returns the number of frames run.
    pub fn run(&mut self) -> Result<u64, EngineError> {
        let start = self.frame_counter;
        while !self.quit_requested() {
            self.frame()?;
        }
        tracing::debug!(frames = self.frame_counter - start, "application quit");
        Ok(self.frame_counter - start)
    }

    /// Run at most `count` frames, stopping early on QUIT. Returns the number
    /// of frames run.
    pub fn run_frames(&mut self, count: u64) -> Result<u64, EngineError> {
        let start = self.frame_counter;
        for _ in 0..count {
            if self.quit_requested() {
                break;
            }
            self.frame()?;
        }
        Ok(self.frame_counter - start)
    }

    // -- accessors ----------------------------------------------------------

    pub fn quit_requested(&self) -> bool {
        self.quit.get()
    }

    /// Number of frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable scene access for setup and tests.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Handle for posting events to the next frame.
    pub fn event_queue(&self) -> EventQueue {
        self.queue.clone()
    }

    /// The names of all systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    /// Diagnostics from the last frame.
    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }
}

/// Map a platform event to its scene event. Keys are read through
/// [`KeyState`] instead.
fn translate(event: &PlatformEvent) -> Option<Event> {
    match *event {
        PlatformEvent::Quit => Some(events::quit()),
        PlatformEvent::Resized { width, height } => Some(events::resized(width, height)),
        PlatformEvent::MouseMotion(data) => Some(events::mouse(data)),
        PlatformEvent::Scroll(data) => Some(events::scroll(data)),
        PlatformEvent::ContextCreated => Some(events::gl_init()),
        PlatformEvent::Key { .. } => None,
    }
}

/// Default WASD / Space / Ctrl / Shift bindings.
pub fn movement_from_keys(keys: &KeyState) -> Moves {
    const BINDINGS: [(Key, Moves); 7] = [
        (Key::W, Moves::FORWARD),
        (Key::S, Moves::BACKWARD),
        (Key::A, Moves::LEFT),
        (Key::D, Moves::RIGHT),
        (Key::Space, Moves::UP),
        (Key::LeftControl, Moves::DOWN),
        (Key::LeftShift, Moves::SPRINT),
    ];
    BINDINGS
        .iter()
        .filter(|(key, _)| keys.is_pressed(*key))
        .fold(Moves::empty(), |acc, (_, m)| acc | *m)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
