//! Binding registry.
//!
//! Insertion-ordered table keyed by hardware point name, with a second index
//! on the exposed variable name. Both names are unique.

use pvbridge_common::io::name::Direction;
use std::collections::HashMap;

use crate::binding::Binding;
use crate::error::EngineError;

#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: Vec<Binding>,
    by_hardware: HashMap<String, usize>,
    by_exposed: HashMap<String, usize>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding.
    ///
    /// # Errors
    /// `DuplicateBinding` or `DuplicateVariable`; the registry is unchanged.
    pub fn insert(&mut self, binding: Binding) -> Result<(), EngineError> {
        if self.by_hardware.contains_key(binding.hardware_name()) {
            return Err(EngineError::DuplicateBinding(
                binding.hardware_name().to_string(),
            ));
        }
        if self.by_exposed.contains_key(binding.exposed_name()) {
            return Err(EngineError::DuplicateVariable(
                binding.exposed_name().to_string(),
            ));
        }
        let idx = self.bindings.len();
        self.by_hardware
            .insert(binding.hardware_name().to_string(), idx);
        self.by_exposed.insert(binding.exposed_name().to_string(), idx);
        self.bindings.push(binding);
        Ok(())
    }

    /// Remove by hardware name, keeping the order of the rest.
    pub fn remove(&mut self, hardware_name: &str) -> Option<Binding> {
        let idx = self.by_hardware.remove(hardware_name)?;
        let binding = self.bindings.remove(idx);
        self.by_exposed.remove(binding.exposed_name());
        for slot in self
            .by_hardware
            .values_mut()
            .chain(self.by_exposed.values_mut())
        {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(binding)
    }

    pub fn get(&self, hardware_name: &str) -> Option<&Binding> {
        self.by_hardware
            .get(hardware_name)
            .map(|&idx| &self.bindings[idx])
    }

    pub fn contains(&self, hardware_name: &str) -> bool {
        self.by_hardware.contains_key(hardware_name)
    }

    pub fn contains_exposed(&self, exposed_name: &str) -> bool {
        self.by_exposed.contains_key(exposed_name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Bindings of one direction, in registration order.
    pub fn snapshot(&self, direction: Direction) -> Vec<Binding> {
        self.bindings
            .iter()
            .filter(|b| b.direction() == direction)
            .cloned()
            .collect()
    }

    pub fn inputs(&self) -> Vec<Binding> {
        self.snapshot(Direction::Input)
    }

    pub fn outputs(&self) -> Vec<Binding> {
        self.snapshot(Direction::Output)
    }
}
