//! Window and input boundary.
//!
//! A [`Platform`] is the native layer the application polls once per frame:
//! it reports discrete [`PlatformEvent`]s and exposes the keyboard as a
//! separately polled [`KeyState`]. [`HeadlessPlatform`] replays a script and
//! stands in for a real window in tests and tools.

use std::collections::{HashSet, VecDeque};

use crate::events::{MouseData, ScrollData};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Keys the engine binds by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    LeftShift,
    LeftControl,
    Escape,
    /// Any other key, by platform scancode.
    Other(u32),
}

/// Keys currently held down.
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    pressed: HashSet<Key>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn set(&mut self, key: Key, pressed: bool) {
        if pressed {
            self.pressed.insert(key);
        } else {
            self.pressed.remove(&key);
        }
    }

    pub fn clear(&mut self) {
        self.pressed.clear();
    }
}

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A discrete event reported by the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// The user asked to close the window.
    Quit,
    Resized { width: i32, height: i32 },
    MouseMotion(MouseData),
    Scroll(ScrollData),
    Key { key: Key, pressed: bool },
    /// The graphics context is ready for use.
    ContextCreated,
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Native window and input layer.
pub trait Platform {
    /// Append every event that arrived since the last poll to `out`.
    fn poll_events(&mut self, out: &mut Vec<PlatformEvent>);

    /// Keyboard state after the most recent poll.
    fn key_state(&self) -> &KeyState;

    /// Show the finished frame.
    fn present(&mut self);
}

// ---------------------------------------------------------------------------
// HeadlessPlatform
// ---------------------------------------------------------------------------

/// A platform without a window that plays back one event list per frame.
///
/// Key events in the script update the key state as they are polled, so a
/// key pressed in frame 2 stays held until a matching release.
#[derive(Debug, Default)]
pub struct HeadlessPlatform {
    script: VecDeque<Vec<PlatformEvent>>,
    keys: KeyState,
    quit_when_drained: bool,
    quit_sent: bool,
    polls: u64,
    presented: u64,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform that replays `frames`, one entry per poll.
    pub fn scripted<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = Vec<PlatformEvent>>,
    {
        Self {
            script: frames.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Report [`PlatformEvent::Quit`] once the script has been played.
    pub fn quit_when_drained(mut self) -> Self {
        self.quit_when_drained = true;
        self
    }

    /// Queue events for a future poll.
    pub fn push_frame(&mut self, events: Vec<PlatformEvent>) {
        self.script.push_back(events);
    }

    /// Number of scripted frames not yet polled.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Number of frames presented.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Platform for HeadlessPlatform {
    fn poll_events(&mut self, out: &mut Vec<PlatformEvent>) {
        self.polls += 1;
        match self.script.pop_front() {
            Some(events) => {
                for event in &events {
                    if let PlatformEvent::Key { key, pressed } = *event {
                        self.keys.set(key, pressed);
                    }
                }
                out.extend(events);
            }
            None if self.quit_when_drained && !self.quit_sent => {
                self.quit_sent = true;
                out.push(PlatformEvent::Quit);
            }
            None => {}
        }
    }

    fn key_state(&self) -> &KeyState {
        &self.keys
    }

    fn present(&mut self) {
        self.presented += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
