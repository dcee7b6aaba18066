//! Resource descriptors.
//!
//! A [`ResourceDescriptor`] describes one *kind* of resource: the ordered
//! properties of its state type `S` and the driver operations that read and
//! write that state through the driver's handler `H`. One descriptor is
//! shared (via `Arc`) by every resource of that kind.

use crate::error::{ResourceError, Result};
use crate::property::{Property, PropertyInfo};

/// Returns the current state of the resource served by the handler.
pub type RetrieveFn<H, S> = fn(&H) -> S;

/// Validates and applies a complete candidate state.
pub type UpdateFn<H, S> = fn(&H, &S) -> Result<()>;

/// Called with the new observer count whenever an observer is added or removed.
pub type ObserveFn<H> = fn(&H, usize);

pub struct ResourceDescriptor<H, S> {
    properties: Vec<Property<S>>,
    retrieve: RetrieveFn<H, S>,
    update: Option<UpdateFn<H, S>>,
    observe: Option<ObserveFn<H>>,
}

impl<H, S> ResourceDescriptor<H, S> {
    /// A read-only, unobservable descriptor with no properties yet.
    pub fn new(retrieve: RetrieveFn<H, S>) -> Self {
        Self {
            properties: Vec::new(),
            retrieve,
            update: None,
            observe: None,
        }
    }

    /// Append a property. Property names must be unique within a descriptor.
    pub fn with_property(mut self, property: Property<S>) -> Self {
        debug_assert!(
            self.property(property.name()).is_none(),
            "duplicate property {}",
            property.name()
        );
        self.properties.push(property);
        self
    }

    pub fn with_properties(self, properties: impl IntoIterator<Item = Property<S>>) -> Self {
        properties.into_iter().fold(self, Self::with_property)
    }

    /// Make the resource writable through `update`.
    pub fn with_update(mut self, update: UpdateFn<H, S>) -> Self {
        self.update = Some(update);
        self
    }

    /// React to observers coming and going.
    pub fn with_observe(mut self, observe: ObserveFn<H>) -> Self {
        self.observe = Some(observe);
        self
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[Property<S>] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property<S>> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn property_infos(&self) -> Vec<PropertyInfo> {
        self.properties.iter().map(Property::info).collect()
    }

    pub fn is_updatable(&self) -> bool {
        self.update.is_some()
    }

    pub fn retrieve(&self, handler: &H) -> S {
        (self.retrieve)(handler)
    }

    /// Submit a full candidate state, failing with `NotSupported` when the
    /// resource has no update operation.
    pub fn update(&self, handler: &H, state: &S) -> Result<()> {
        match self.update {
            Some(update) => update(handler, state),
            None => Err(ResourceError::NotSupported),
        }
    }

    pub fn observers_changed(&self, handler: &H, count: usize) {
        if let Some(observe) = self.observe {
            observe(handler, count);
        }
    }
}
