//! Interfaces: named views over a resource's properties.
//!
//! An interface carries a `flags` value and a `mask`. A property is visible
//! through the interface when the masked bits of the property's flags equal
//! the masked bits of the interface's flags; bits outside the mask are
//! ignored. The stock interfaces follow the OCF naming.

use crate::error::{Lookup, ResourceError, Result};
use crate::property::{Property, PropertyFlags};

const RW: PropertyFlags = PropertyFlags::WRITABLE;
const RW_META: PropertyFlags = PropertyFlags::WRITABLE.union(PropertyFlags::METADATA);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interface {
    name: &'static str,
    flags: PropertyFlags,
    mask: PropertyFlags,
}

impl Interface {
    /// Every property.
    pub const BASELINE: Interface = Interface::new(
        "oic.if.baseline",
        PropertyFlags::empty(),
        PropertyFlags::empty(),
    );
    /// Read-only, non-metadata properties.
    pub const SENSOR: Interface = Interface::new("oic.if.s", PropertyFlags::empty(), RW_META);
    /// Writable, non-metadata properties.
    pub const ACTUATOR: Interface = Interface::new("oic.if.a", RW, RW_META);
    /// Read-only properties.
    pub const READ_ONLY: Interface = Interface::new("oic.if.r", PropertyFlags::empty(), RW);
    /// Writable properties.
    pub const READ_WRITE: Interface = Interface::new("oic.if.rw", RW, RW);

    /// The stock interfaces, in lookup order.
    pub const STOCK: [Interface; 5] = [
        Interface::BASELINE,
        Interface::SENSOR,
        Interface::ACTUATOR,
        Interface::READ_ONLY,
        Interface::READ_WRITE,
    ];

    pub const fn new(name: &'static str, flags: PropertyFlags, mask: PropertyFlags) -> Self {
        Self { name, flags, mask }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a property carrying `flags` is visible through this interface.
    pub fn has_property(&self, flags: PropertyFlags) -> bool {
        ((flags ^ self.flags) & self.mask).is_empty()
    }

    pub fn visible<S>(&self, property: &Property<S>) -> bool {
        self.has_property(property.flags())
    }
}

impl Default for Interface {
    fn default() -> Self {
        Interface::BASELINE
    }
}

/// Interfaces that can be selected by name.
#[derive(Debug, Clone)]
pub struct InterfaceTable {
    interfaces: Vec<Interface>,
}

impl InterfaceTable {
    /// A table holding only the stock interfaces.
    pub fn new() -> Self {
        Self {
            interfaces: Interface::STOCK.to_vec(),
        }
    }

    /// Add an interface, rejecting a name that is already present.
    pub fn register(&mut self, interface: Interface) -> Result<()> {
        if self.interfaces.iter().any(|i| i.name == interface.name) {
            return Err(ResourceError::DuplicateInterface(interface.name));
        }
        self.interfaces.push(interface);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Result<Interface> {
        self.interfaces
            .iter()
            .find(|i| i.name == name)
            .copied()
            .ok_or_else(|| ResourceError::not_found(Lookup::Interface, name))
    }
}

impl Default for InterfaceTable {
    fn default() -> Self {
        Self::new()
    }
}
