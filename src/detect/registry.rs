use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;
use super::backends::{LumaBackend, StubBackend};

type BackendBuilder = fn() -> Box<dyn DetectorBackend>;

/// Registry of detector backend constructors, keyed by name.
///
/// The daemon selects one backend per run; the registry exists so the
/// detection capability stays swappable without touching the pipeline.
pub struct BackendRegistry {
    builders: HashMap<String, BackendBuilder>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry preloaded with the built-in backends. `luma` is the default.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("luma", || Box::new(LumaBackend::new()));
        registry.register("stub", || Box::new(StubBackend::new()));
        registry
    }

    /// Register a backend constructor. The first registered backend becomes
    /// the default.
    pub fn register(&mut self, name: &str, builder: BackendBuilder) {
        if self.default_name.is_none() {
            self.default_name = Some(name.to_string());
        }
        self.builders.insert(name.to_string(), builder);
    }

    /// Construct a backend by name.
    pub fn build(&self, name: &str) -> Result<Box<dyn DetectorBackend>> {
        let builder = self.builders.get(name).ok_or_else(|| {
            anyhow!(
                "detector backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })?;
        Ok(builder())
    }

    /// Construct the default backend.
    pub fn build_default(&self) -> Result<Box<dyn DetectorBackend>> {
        let name = self
            .default_name
            .as_deref()
            .ok_or_else(|| anyhow!("no detector backends registered"))?;
        self.build(name)
    }

    /// Registered backend names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builders.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
