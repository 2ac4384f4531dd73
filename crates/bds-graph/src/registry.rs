// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type-name → factory registry consulted on load.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::reflect::{ObjRef, Reflect};
use crate::GraphError;

type Factory = Box<dyn Fn() -> ObjRef>;

/// Maps fully-qualified type names to default-instance factories.
///
/// Deserialization resolves every `__className` through this registry; a
/// name it does not know is a hard [`GraphError::TypeNotRegistered`]. The
/// registry is consulted behind `&self` only, so a shared registry is safe
/// across concurrent deserialize calls on independent graphs. It is not on
/// any hot path.
#[derive(Default)]
pub struct TypeRegistry {
    factories: HashMap<&'static str, Factory>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under the name its `type_name()` reports.
    ///
    /// # Errors
    /// [`GraphError::DuplicateRegistration`] if the name is already taken;
    /// the existing factory is left in place.
    pub fn register<T: Reflect + Default>(&mut self) -> Result<(), GraphError> {
        let name = T::default().type_name();
        if self.factories.contains_key(name) {
            return Err(GraphError::DuplicateRegistration {
                type_name: name.to_string(),
            });
        }
        self.factories
            .insert(name, Box::new(|| Rc::new(RefCell::new(T::default()))));
        Ok(())
    }

    /// Returns `true` if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Produces a fresh default instance of the named type.
    ///
    /// # Errors
    /// [`GraphError::TypeNotRegistered`] names the unresolvable type.
    pub fn instantiate(&self, name: &str) -> Result<ObjRef, GraphError> {
        self.factories.get(name).map_or_else(
            || {
                Err(GraphError::TypeNotRegistered {
                    type_name: name.to_string(),
                })
            },
            |factory| Ok(factory()),
        )
    }
}
