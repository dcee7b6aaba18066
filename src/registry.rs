//! Namespaces and the resource registry.
//!
//! A device exposes its resources under one URI prefix ending in `/`, e.g.
//! `/b/`. A resource's full URI is its namespace prefix followed by its
//! suffix (`/b/left`). Prefixes are kept disjoint: no registered prefix is a
//! prefix of another, so every URI resolves through at most one namespace.

use std::sync::Arc;

use log::{info, warn};

use crate::device::Device;
use crate::error::{Lookup, ResourceError, Result};
use crate::interface::{Interface, InterfaceTable};
use crate::resource::Resource;

/// An ordered group of resources sharing a URI prefix.
#[derive(Debug, Clone)]
pub struct Namespace {
    prefix: String,
    resources: Vec<Arc<Resource>>,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            resources: Vec::new(),
        }
    }

    pub fn with_resource(mut self, resource: Arc<Resource>) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn resources(&self) -> &[Arc<Resource>] {
        &self.resources
    }

    /// Exact match on the URI suffix.
    pub fn find(&self, suffix: &str) -> Option<&Arc<Resource>> {
        self.resources.iter().find(|r| r.uri() == suffix)
    }

    fn validate(&self) -> Result<()> {
        if !self.prefix.ends_with('/') {
            return Err(ResourceError::InvalidPrefix(self.prefix.clone()));
        }

        for (i, resource) in self.resources.iter().enumerate() {
            if self.resources[..i].iter().any(|r| r.uri() == resource.uri()) {
                return Err(ResourceError::DuplicateResource {
                    prefix: self.prefix.clone(),
                    suffix: resource.uri().to_string(),
                });
            }
        }

        Ok(())
    }

    fn overlaps(&self, prefix: &str) -> bool {
        self.prefix.starts_with(prefix) || prefix.starts_with(&self.prefix)
    }
}

/// All registered namespaces, plus the interfaces they can be viewed through.
#[derive(Debug, Default)]
pub struct Registry {
    namespaces: Vec<Namespace>,
    interfaces: InterfaceTable,
}

impl Registry {
    /// An empty registry with the stock interfaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an extra interface selectable by name.
    pub fn register_interface(&mut self, interface: Interface) -> Result<()> {
        self.interfaces.register(interface)?;
        info!("[Registry] Interface {}", interface.name());
        Ok(())
    }

    pub fn interfaces(&self) -> &InterfaceTable {
        &self.interfaces
    }

    /// Add a namespace and log the initial state of each of its resources.
    ///
    /// On error the registry is left unchanged.
    pub fn register(&mut self, namespace: Namespace) -> Result<()> {
        namespace.validate()?;

        if let Some(existing) = self
            .namespaces
            .iter()
            .find(|n| n.overlaps(&namespace.prefix))
        {
            return Err(ResourceError::DuplicatePrefix {
                prefix: namespace.prefix.clone(),
                existing: existing.prefix.clone(),
            });
        }

        info!(
            "[Registry] Namespace {} ({} resource(s))",
            namespace.prefix,
            namespace.resources.len()
        );
        for resource in &namespace.resources {
            let state = resource.retrieve();
            match resource.format_state(&Interface::BASELINE, &state) {
                Ok(line) => info!("[Registry]   {}{}", namespace.prefix, line),
                Err(e) => warn!("[Registry]   {}{}: {}", namespace.prefix, resource.uri(), e),
            }
        }

        self.namespaces.push(namespace);
        Ok(())
    }

    /// Register the namespace a device exposes.
    pub fn register_device(&mut self, device: &dyn Device) -> Result<()> {
        info!("[Registry] Registering device: {}", device.name());
        self.register(device.namespace())
    }

    /// Resolve a full URI such as `/b/left`.
    pub fn find_resource(&self, uri: &str) -> Result<Arc<Resource>> {
        self.namespaces
            .iter()
            .find_map(|n| uri.strip_prefix(n.prefix.as_str()).map(|suffix| (n, suffix)))
            .and_then(|(n, suffix)| n.find(suffix))
            .cloned()
            .ok_or_else(|| ResourceError::not_found(Lookup::Resource, uri))
    }

    pub fn find_interface(&self, name: &str) -> Result<Interface> {
        self.interfaces.find(name)
    }

    /// Every resource as `(prefix, suffix)`, in registration order.
    pub fn list_resources(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.namespaces.iter().flat_map(|n| {
            n.resources
                .iter()
                .map(move |r| (n.prefix.as_str(), r.uri()))
        })
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }
}
