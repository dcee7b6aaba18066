//! uniport: typed resources with interface views and change notification.
//!
//! Drivers describe their state once as a list of typed properties. The
//! engine then lists, formats, parses, updates and observes every resource
//! through that description, with no per-driver formatting code.

pub mod config;
pub mod device;
pub mod error;
pub mod interface;
pub mod property;
pub mod registry;
pub mod resource;
pub mod shell;
pub mod temperature;

pub use error::{ResourceError, Result};
pub use interface::{Interface, InterfaceTable};
pub use property::{Property, PropertyFlags, PropertyType};
pub use registry::{Namespace, Registry};
pub use resource::{Notification, ObserverHandle, Resource, ResourceDescriptor, Snapshot};
