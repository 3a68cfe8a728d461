//! Name-to-backend factory registry

use super::{MockTransport, ReqwestTransport, Transport, TransportOptions};
use std::collections::HashMap;
use std::sync::Arc;
use stratus_core::{Error, Result};

/// Builds a transport from options
pub type TransportFactory =
    Arc<dyn Fn(&TransportOptions) -> Result<Arc<dyn Transport>> + Send + Sync>;

/// Maps backend names to factories
///
/// The default registry knows `reqwest` (also `default` and `http`) and
/// `mock`. Names are case-insensitive.
#[derive(Clone)]
pub struct TransportRegistry {
    factories: HashMap<String, TransportFactory>,
}

impl TransportRegistry {
    /// A registry with no backends
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the built-in backends
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        for name in ["reqwest", "default", "http"] {
            registry.register(name, |options| {
                Ok(Arc::new(ReqwestTransport::new(options)?) as Arc<dyn Transport>)
            });
        }
        registry.register("mock", |_| Ok(Arc::new(MockTransport::new()) as Arc<dyn Transport>));
        registry
    }

    /// Register (or replace) a backend
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&TransportOptions) -> Result<Arc<dyn Transport>> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_ascii_lowercase(), Arc::new(factory));
    }

    /// Check if a backend is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the named backend
    pub fn create(&self, name: &str, options: &TransportOptions) -> Result<Arc<dyn Transport>> {
        let factory = self.factories.get(&name.to_ascii_lowercase()).ok_or_else(|| {
            Error::Config(format!(
                "unknown transport '{name}' (available: {})",
                self.names().join(", ")
            ))
        })?;
        factory(options)
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("names", &self.names())
            .finish()
    }
}
