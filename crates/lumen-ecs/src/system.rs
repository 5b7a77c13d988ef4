//! System registry.
//!
//! A scene owns at most one instance of each system type. Instances are kept
//! behind `Rc<RefCell<_>>` so the application can drive a system's update with
//! `&mut Scene` while event listeners registered by that system hold their own
//! handle to it.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::EcsError;

/// Maximum number of systems a scene can register.
pub const MAX_SYSTEMS: usize = 32;

/// Owns one instance per registered system type.
#[derive(Default)]
pub struct SystemManager {
    systems: HashMap<TypeId, Rc<dyn Any>>,
    /// Type names in registration order.
    names: Vec<&'static str>,
}

impl SystemManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `system` and return a shared handle to it.
    ///
    /// Fails if a system of the same type is already registered or
    /// [`MAX_SYSTEMS`] has been reached.
    pub fn register<T: 'static>(&mut self, system: T) -> Result<Rc<RefCell<T>>, EcsError> {
        let key = TypeId::of::<T>();
        if self.systems.contains_key(&key) {
            return Err(EcsError::SystemAlreadyRegistered {
                name: type_name::<T>(),
            });
        }
        if self.systems.len() >= MAX_SYSTEMS {
            return Err(EcsError::SystemLimitReached { max: MAX_SYSTEMS });
        }

        let handle = Rc::new(RefCell::new(system));
        self.systems.insert(key, Rc::clone(&handle) as Rc<dyn Any>);
        self.names.push(type_name::<T>());
        tracing::debug!(system = type_name::<T>(), "system registered");
        Ok(handle)
    }

    /// Handle to the registered instance of `T`.
    pub fn get<T: 'static>(&self) -> Result<Rc<RefCell<T>>, EcsError> {
        self.systems
            .get(&TypeId::of::<T>())
            .and_then(|any| Rc::clone(any).downcast::<RefCell<T>>().ok())
            .ok_or(EcsError::SystemNotRegistered {
                name: type_name::<T>(),
            })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.systems.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Type names of the registered systems, in registration order.
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }
}

impl fmt::Debug for SystemManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemManager")
            .field("systems", &self.names)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
