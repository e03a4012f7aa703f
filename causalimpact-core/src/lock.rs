//! Write-once result fields.
//!
//! Result attributes (`p_value`, `inferences`, `summary_data`) may be set
//! exactly once per run. The guard is an explicit is-set flag rather than
//! interior mutability: a second `set` fails with the lock error even when
//! the new value equals the stored one.

use crate::error::ImpactError;

/// A named write-once slot.
#[derive(Debug, Clone)]
pub struct Locked<T> {
    name: &'static str,
    value: Option<T>,
}

impl<T> Locked<T> {
    pub fn new(name: &'static str) -> Self {
        Self { name, value: None }
    }

    /// First write wins; any later write fails with `AttributeLocked`.
    pub fn set(&mut self, value: T) -> Result<(), ImpactError> {
        if self.value.is_some() {
            return Err(ImpactError::AttributeLocked {
                attribute: self.name,
            });
        }
        self.value = Some(value);
        Ok(())
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
