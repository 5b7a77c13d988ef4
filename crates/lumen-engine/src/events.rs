//! Engine event taxonomy.
//!
//! | Event | Parameters |
//! |-------|------------|
//! | [`window::QUIT`] | none |
//! | [`window::RESIZED`] | [`window::WIDTH`]: `i32`, [`window::HEIGHT`]: `i32` |
//! | [`window::GL_INIT`] | none, sent once after the graphics context exists |
//! | [`camera::MOVEMENT`] | [`camera::MOVES`]: [`Moves`] |
//! | [`input::MOUSE`] | [`input::MOUSE_DATA`]: [`MouseData`] |
//! | [`input::SCROLL`] | [`input::SCROLL_DATA`]: [`ScrollData`] |
//!
//! Ids are FNV-1a hashes of the names below, so any crate that hashes the
//! same string talks to the same listeners.

use bitflags::bitflags;
use lumen_ecs::event::Event;

/// Window lifecycle events.
pub mod window {
    use lumen_ecs::event::{EventId, ParamId};

    pub const QUIT: EventId = EventId::from_name("Events::Window::QUIT");
    pub const RESIZED: EventId = EventId::from_name("Events::Window::RESIZED");
    pub const GL_INIT: EventId = EventId::from_name("Events::Window::GL_INIT");

    pub const WIDTH: ParamId = ParamId::from_name("Events::Window::Resized::WIDTH");
    pub const HEIGHT: ParamId = ParamId::from_name("Events::Window::Resized::HEIGHT");
}

/// Camera control events.
pub mod camera {
    use lumen_ecs::event::{EventId, ParamId};

    /// Aggregated keyboard movement for this frame.
    pub const MOVEMENT: EventId = EventId::from_name("Events::Camera::MOVEMENT");
    pub const MOVES: ParamId = ParamId::from_name("Events::Camera::Movement::MOVES");
}

/// Pointer input events.
pub mod input {
    use lumen_ecs::event::{EventId, ParamId};

    pub const MOUSE: EventId = EventId::from_name("Events::Input::MOUSE");
    pub const SCROLL: EventId = EventId::from_name("Events::Input::SCROLL");

    pub const MOUSE_DATA: ParamId = ParamId::from_name("Events::Input::Mouse::MOUSE_DATA");
    pub const SCROLL_DATA: ParamId = ParamId::from_name("Events::Input::Scroll::SCROLL_DATA");
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

bitflags! {
    /// Movement keys held during a frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Moves: u8 {
        const FORWARD = 1 << 0;
        const BACKWARD = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const UP = 1 << 4;
        const DOWN = 1 << 5;
        const SPRINT = 1 << 6;
    }
}

/// Cursor motion since the previous mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseData {
    /// Horizontal motion in pixels, positive to the right.
    pub dx: f32,
    /// Vertical motion in pixels, positive downwards.
    pub dy: f32,
    /// Absolute cursor position.
    pub x: f32,
    pub y: f32,
    /// Pressed buttons, bit 0 = left, 1 = right, 2 = middle.
    pub buttons: u8,
}

/// Wheel or trackpad scroll delta.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollData {
    pub dx: f32,
    /// Positive when scrolling away from the user.
    pub dy: f32,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn quit() -> Event {
    Event::new(window::QUIT)
}

pub fn resized(width: i32, height: i32) -> Event {
    Event::new(window::RESIZED)
        .with_param(window::WIDTH, width)
        .with_param(window::HEIGHT, height)
}

pub fn gl_init() -> Event {
    Event::new(window::GL_INIT)
}

pub fn movement(moves: Moves) -> Event {
    Event::new(camera::MOVEMENT).with_param(camera::MOVES, moves)
}

pub fn mouse(data: MouseData) -> Event {
    Event::new(input::MOUSE).with_param(input::MOUSE_DATA, data)
}

pub fn scroll(data: ScrollData) -> Event {
    Event::new(input::SCROLL).with_param(input::SCROLL_DATA, data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
