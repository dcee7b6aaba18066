//! Observer registrations and change notifications.

use std::fmt;
use std::sync::Arc;

use super::{Resource, Snapshot};
use crate::error::Result;
use crate::interface::Interface;

/// Callback invoked for every change notification.
pub type NotifyFn = dyn Fn(&Notification<'_>) + Send + Sync;

pub(super) struct Observer {
    pub(super) id: u64,
    pub(super) interface: Interface,
    pub(super) callback: Box<NotifyFn>,
}

/// One change event as seen by one observer.
///
/// All observers notified for the same event share the same `state`.
pub struct Notification<'a> {
    pub resource: &'a Resource,
    pub interface: &'a Interface,
    pub state: &'a Snapshot,
}

impl Notification<'_> {
    /// Render the state through this observer's interface.
    pub fn format(&self) -> Result<String> {
        self.resource.format_state(self.interface, self.state)
    }
}

/// A live observer registration.
///
/// Dropping the handle leaves the observer registered; call
/// [`ObserverHandle::remove`] or [`Resource::unobserve`] to end it.
#[must_use = "an observer can only be removed through its handle"]
pub struct ObserverHandle {
    pub(super) resource: Arc<Resource>,
    pub(super) id: u64,
    pub(super) interface: Interface,
}

impl ObserverHandle {
    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }

    pub fn interface(&self) -> Interface {
        self.interface
    }

    /// Remove the observer from its resource.
    pub fn remove(self) {
        let resource = self.resource.clone();
        resource.unobserve(self);
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("resource", &self.resource.uri())
            .field("id", &self.id)
            .field("interface", &self.interface.name())
            .finish()
    }
}
