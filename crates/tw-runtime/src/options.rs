//! Configuration for an instance.

use serde_json::Value as Json;

use crate::error::{RuntimeError, RuntimeResult};

/// Immutable instance configuration.
///
/// Built once from [`Default`] with the `with_*` methods, or validated from
/// an external JSON object with [`InstanceOptions::from_json`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceOptions {
    seed: String,
    name: String,
    max_steps: usize,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            seed: "talewright".to_string(),
            name: "instance".to_string(),
            max_steps: 100_000,
        }
    }
}

impl InstanceOptions {
    /// Set the random seed.
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    /// Set the instance name used in logs and snapshots.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the per-invoke step limit. Zero disables it.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Seed for the random source.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-invoke step limit.
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Validate a JSON object on top of the defaults.
    ///
    /// Recognised keys are `seed`, `name` and `max_steps`.
    pub fn from_json(value: &Json) -> RuntimeResult<Self> {
        let map = value.as_object().ok_or(RuntimeError::InvalidOptionType {
            name: "options".to_string(),
            expected: "an object",
        })?;
        let mut options = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "seed" => options.seed = text(key, value)?,
                "name" => options.name = text(key, value)?,
                "max_steps" => {
                    let steps = value.as_u64().ok_or_else(|| RuntimeError::InvalidOptionType {
                        name: key.clone(),
                        expected: "a non-negative integer",
                    })?;
                    options.max_steps =
                        usize::try_from(steps).map_err(|_| RuntimeError::InvalidOptionType {
                            name: key.clone(),
                            expected: "a non-negative integer",
                        })?;
                }
                _ => return Err(RuntimeError::InvalidOptionName(key.clone())),
            }
        }
        Ok(options)
    }
}

fn text(key: &str, value: &Json) -> RuntimeResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| RuntimeError::InvalidOptionType {
            name: key.to_string(),
            expected: "a string",
        })
}
