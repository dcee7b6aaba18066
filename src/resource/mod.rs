//! Resources: named, observable instances of a [`ResourceDescriptor`].
//!
//! A [`Resource`] pairs a URI suffix with a driver handler and the
//! descriptor of its state. The state type is erased behind the resource so
//! that resources of different drivers can live in one registry; state
//! travels between calls as an opaque [`Snapshot`].
//!
//! Writes go through [`Resource::apply_updates`], which parses a batch of
//! `name=value` assignments into a copy of the current state and submits
//! the copy to the driver once. Any failure before submission leaves the
//! driver untouched.

mod descriptor;
mod observer;

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::error::{Lookup, ResourceError, Result};
use crate::interface::Interface;
use crate::property::PropertyInfo;

pub use descriptor::{ObserveFn, ResourceDescriptor, RetrieveFn, UpdateFn};
pub use observer::{Notification, NotifyFn, ObserverHandle};

use observer::Observer;

/// An owned copy of one resource's state.
pub struct Snapshot(Box<dyn Any + Send + Sync>);

impl Snapshot {
    fn new<S: Send + Sync + 'static>(state: S) -> Self {
        Self(Box::new(state))
    }

    /// Borrow the state as `S`, if that is what it holds.
    pub fn downcast_ref<S: 'static>(&self) -> Option<&S> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Snapshot(..)")
    }
}

/// The descriptor and handler of a resource, with the state type erased.
trait Binding: Send + Sync {
    fn retrieve(&self) -> Snapshot;
    fn is_updatable(&self) -> bool;
    fn properties(&self) -> Vec<PropertyInfo>;
    fn write_state(&self, interface: &Interface, state: &Snapshot, out: &mut String) -> Result<()>;
    fn values(&self, interface: &Interface, state: &Snapshot) -> Result<Vec<(&'static str, String)>>;
    fn apply(&self, interface: &Interface, assignments: &[(&str, &str)]) -> Result<()>;
    fn observers_changed(&self, count: usize);
}

struct Bound<H, S> {
    handler: Arc<H>,
    descriptor: Arc<ResourceDescriptor<H, S>>,
}

impl<H, S: 'static> Bound<H, S> {
    fn state<'a>(&self, snapshot: &'a Snapshot) -> Result<&'a S> {
        snapshot
            .downcast_ref::<S>()
            .ok_or(ResourceError::StateMismatch)
    }
}

impl<H, S> Binding for Bound<H, S>
where
    H: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    fn retrieve(&self) -> Snapshot {
        Snapshot::new(self.descriptor.retrieve(&self.handler))
    }

    fn is_updatable(&self) -> bool {
        self.descriptor.is_updatable()
    }

    fn properties(&self) -> Vec<PropertyInfo> {
        self.descriptor.property_infos()
    }

    fn write_state(&self, interface: &Interface, state: &Snapshot, out: &mut String) -> Result<()> {
        let state = self.state(state)?;

        for property in self.descriptor.properties() {
            if !interface.visible(property) {
                continue;
            }
            out.try_reserve(property.name().len() + 2)?;
            out.push(' ');
            out.push_str(property.name());
            out.push('=');
            property
                .write(state, out)
                .map_err(|_| ResourceError::AllocationFailure)?;
        }

        Ok(())
    }

    fn values(&self, interface: &Interface, state: &Snapshot) -> Result<Vec<(&'static str, String)>> {
        let state = self.state(state)?;

        Ok(self
            .descriptor
            .properties()
            .iter()
            .filter(|p| interface.visible(*p))
            .map(|p| (p.name(), p.format(state)))
            .collect())
    }

    fn apply(&self, interface: &Interface, assignments: &[(&str, &str)]) -> Result<()> {
        let mut candidate = self.descriptor.retrieve(&self.handler);

        for &(name, value) in assignments {
            let property = self
                .descriptor
                .property(name)
                .ok_or_else(|| ResourceError::not_found(Lookup::Property, name))?;

            if !interface.visible(property) {
                return Err(ResourceError::NotAccessible {
                    property: name.to_string(),
                    interface: interface.name(),
                });
            }
            if !property.is_writable() {
                return Err(ResourceError::ReadOnly {
                    property: name.to_string(),
                });
            }

            property
                .parse_into(value, &mut candidate)
                .map_err(|e| ResourceError::InvalidFormat {
                    property: name.to_string(),
                    type_name: property.type_name(),
                    reason: e.reason,
                })?;
        }

        self.descriptor.update(&self.handler, &candidate)
    }

    fn observers_changed(&self, count: usize) {
        self.descriptor.observers_changed(&self.handler, count);
    }
}

/// One addressable resource within a namespace.
pub struct Resource {
    uri: String,
    binding: Box<dyn Binding>,
    observers: Mutex<Vec<Arc<Observer>>>,
    next_observer: AtomicU64,
}

impl Resource {
    /// Bind `handler` to `descriptor` under the URI suffix `uri`.
    pub fn new<H, S>(
        uri: impl Into<String>,
        handler: Arc<H>,
        descriptor: Arc<ResourceDescriptor<H, S>>,
    ) -> Arc<Self>
    where
        H: Send + Sync + 'static,
        S: Send + Sync + 'static,
    {
        Arc::new(Self {
            uri: uri.into(),
            binding: Box::new(Bound {
                handler,
                descriptor,
            }),
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(1),
        })
    }

    /// The URI suffix, relative to the owning namespace.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn properties(&self) -> Vec<PropertyInfo> {
        self.binding.properties()
    }

    pub fn property(&self, name: &str) -> Result<PropertyInfo> {
        self.properties()
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ResourceError::not_found(Lookup::Property, name))
    }

    pub fn is_updatable(&self) -> bool {
        self.binding.is_updatable()
    }

    /// Take a snapshot of the current state.
    pub fn retrieve(&self) -> Snapshot {
        self.binding.retrieve()
    }

    /// Render `state` as `uri: name=value ...`, listing the properties
    /// visible through `interface` in declaration order.
    pub fn format_state(&self, interface: &Interface, state: &Snapshot) -> Result<String> {
        let mut line = String::new();
        line.try_reserve(self.uri.len() + 1)?;
        line.push_str(&self.uri);
        line.push(':');
        self.binding.write_state(interface, state, &mut line)?;
        Ok(line)
    }

    /// The formatted values of the properties visible through `interface`.
    pub fn state_values(
        &self,
        interface: &Interface,
        state: &Snapshot,
    ) -> Result<Vec<(&'static str, String)>> {
        self.binding.values(interface, state)
    }

    /// Apply a batch of `name=value` assignments through `interface`.
    ///
    /// Assignments are applied in order to one candidate state, so a later
    /// assignment to the same property wins. The driver sees at most one
    /// update, and none if any assignment fails.
    pub fn apply_updates<A: AsRef<str>>(&self, interface: &Interface, assignments: &[A]) -> Result<()> {
        let pairs = assignments
            .iter()
            .map(|a| {
                let a = a.as_ref();
                a.split_once('=')
                    .ok_or_else(|| ResourceError::MalformedAssignment(a.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "[Resource] {} update via {}: {} assignment(s)",
            self.uri,
            interface.name(),
            pairs.len()
        );
        self.binding.apply(interface, &pairs)
    }

    /// Register `callback` for change notifications rendered through
    /// `interface`.
    pub fn observe<F>(self: &Arc<Self>, interface: Interface, callback: F) -> ObserverHandle
    where
        F: Fn(&Notification<'_>) + Send + Sync + 'static,
    {
        let id = self.next_observer.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut observers = self.observers.lock();
            observers.push(Arc::new(Observer {
                id,
                interface,
                callback: Box::new(callback),
            }));
            observers.len()
        };

        debug!(
            "[Resource] {} observer {} added via {} ({} active)",
            self.uri,
            id,
            interface.name(),
            count
        );
        self.binding.observers_changed(count);

        ObserverHandle {
            resource: Arc::clone(self),
            id,
            interface,
        }
    }

    /// Remove the observer behind `handle`. Returns false if it was not
    /// registered with this resource.
    pub fn unobserve(&self, handle: ObserverHandle) -> bool {
        if !std::ptr::eq(Arc::as_ptr(&handle.resource), self) {
            return false;
        }

        let count = {
            let mut observers = self.observers.lock();
            let before = observers.len();
            observers.retain(|o| o.id != handle.id);
            if observers.len() == before {
                return false;
            }
            observers.len()
        };

        debug!(
            "[Resource] {} observer {} removed ({} active)",
            self.uri, handle.id, count
        );
        self.binding.observers_changed(count);
        true
    }

    /// Retrieve the current state once and deliver it to every observer
    /// registered at the time of the call.
    ///
    /// Callbacks may add or remove observers, including themselves; such
    /// changes take effect from the next notification.
    pub fn notify(&self) {
        let observers: Vec<Arc<Observer>> = self.observers.lock().clone();
        let state = self.retrieve();
        debug!("[Resource] {} notifying {} observer(s)", self.uri, observers.len());

        for observer in &observers {
            (observer.callback)(&Notification {
                resource: self,
                interface: &observer.interface,
                state: &state,
            });
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn has_observers(&self) -> bool {
        self.observer_count() > 0
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("uri", &self.uri)
            .field("observers", &self.observer_count())
            .finish()
    }
}
