//! Closed name to constructor table, fixed when the program starts.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::context::EngineContext;
use crate::error::{PluginError, Result};
use crate::plugin::Plugin;

pub type Factory = Arc<dyn Fn(&EngineContext) -> Arc<dyn Plugin> + Send + Sync>;

#[derive(Default)]
pub struct RegistryBuilder {
    factories: BTreeMap<&'static str, Factory>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Registering a name twice keeps the later factory.
    pub fn register<F>(mut self, name: &'static str, factory: F) -> Self
    where
        F: Fn(&EngineContext) -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        if self.factories.insert(name, Arc::new(factory)).is_some() {
            tracing::warn!("Plugin {} registered twice, keeping the last one", name);
        }
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            factories: self.factories,
        }
    }
}

#[derive(Clone)]
pub struct Registry {
    factories: BTreeMap<&'static str, Factory>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registered tool names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn get(&self, name: &str, ctx: &EngineContext) -> Result<Arc<dyn Plugin>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PluginError::UnknownTool {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            })?;
        Ok(factory(ctx))
    }
}
