//! The explicit check plugin registry.
//!
//! Instead of a dynamic registration mechanism, plugins are plain values
//! implementing [CheckPlugin] and are registered by name at startup.
//! Resolution happens once, duplicate names are rejected, and the value
//! store handed to a check is namespaced per plugin and item.

use std::collections::BTreeMap;

use crate::rate::{ScopedStore, ValueStore};
use crate::section::SectionSet;
use crate::{CheckItem, Resource};

/// A service instance proposed by discovery: either the section-wide
/// service (no item) or one named item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Service {
    pub item: Option<String>,
}

impl Service {
    pub fn new() -> Service {
        Service { item: None }
    }

    pub fn with_item(item: impl Into<String>) -> Service {
        Service {
            item: Some(item.into()),
        }
    }
}

impl Default for Service {
    fn default() -> Service {
        Service::new()
    }
}

/// Invocation environment injected into every check call.
pub struct CheckContext<'a> {
    /// Timestamp of this invocation in unix seconds.
    pub now: f64,
    /// Per-check/per-item namespaced persistent state.
    pub value_store: &'a mut dyn ValueStore,
}

/// One check plugin: a discovery function, a check function and the
/// naming glue around them. Parameters are held by the implementing
/// struct, so every plugin carries its own typed configuration.
pub trait CheckPlugin {
    /// Registry name, e.g. `"raritan_sensors"`.
    fn name(&self) -> &'static str;

    /// Service name template; `%s` is replaced with the item.
    fn service_name(&self) -> &'static str;

    /// Names of the sections this plugin consumes.
    fn sections(&self) -> &'static [&'static str];

    /// Proposes service instances from the available data.
    fn discover(&self, sections: &SectionSet) -> Vec<Service>;

    /// Evaluates one service instance. An empty result means the item
    /// has vanished from the data.
    fn check(
        &self,
        item: Option<&str>,
        sections: &SectionSet,
        ctx: &mut CheckContext,
    ) -> Vec<CheckItem>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("check plugin {0:?} is already registered")]
    Duplicate(&'static str),
    #[error("no check plugin named {0:?}")]
    UnknownPlugin(String),
}

/// All known check plugins, resolved by name.
#[derive(Default)]
pub struct Registry {
    plugins: BTreeMap<&'static str, Box<dyn CheckPlugin>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn register(&mut self, plugin: Box<dyn CheckPlugin>) -> Result<(), RegistryError> {
        let name = plugin.name();
        if self.plugins.contains_key(name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.plugins.insert(name, plugin);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn CheckPlugin> {
        self.plugins.get(name).map(|p| p.as_ref())
    }

    pub fn plugins(&self) -> impl Iterator<Item = &dyn CheckPlugin> {
        self.plugins.values().map(|p| p.as_ref())
    }

    /// Runs discovery for one plugin.
    pub fn discover(
        &self,
        name: &str,
        sections: &SectionSet,
    ) -> Result<Vec<Service>, RegistryError> {
        let plugin = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownPlugin(name.to_owned()))?;
        Ok(plugin.discover(sections))
    }

    /// Runs one check and assembles the service [Resource]. Returns
    /// `Ok(None)` if the check produced no items, which the host
    /// framework treats as "service vanished".
    pub fn run(
        &self,
        name: &str,
        item: Option<&str>,
        sections: &SectionSet,
        now: f64,
        store: &mut dyn ValueStore,
    ) -> Result<Option<Resource>, RegistryError> {
        let plugin = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownPlugin(name.to_owned()))?;

        let mut scoped = ScopedStore::new(store, format!("{}.{}", name, item.unwrap_or("")));
        let mut ctx = CheckContext {
            now,
            value_store: &mut scoped,
        };
        let items = plugin.check(item, sections, &mut ctx);
        if items.is_empty() {
            return Ok(None);
        }

        let service_name = match item {
            Some(item) => plugin.service_name().replace("%s", item),
            None => plugin.service_name().to_owned(),
        };
        Ok(Some(Resource::new(service_name).with_items(items)))
    }
}
