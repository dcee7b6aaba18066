//! Devices: named producers of one resource namespace each.

pub mod button;
pub mod oven;

pub use button::{ButtonEvent, Buttons};
pub use oven::OvenDevice;

use crate::registry::Namespace;

/// A driver that exposes its resources under one namespace.
pub trait Device {
    /// Name used in registration diagnostics.
    fn name(&self) -> &'static str;

    /// The namespace holding this device's resources.
    fn namespace(&self) -> Namespace;
}
