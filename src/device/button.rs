//! Push buttons on simulated pull-up input pins.
//!
//! Each button reads as pressed (`value=true`) while its pin is pulled low.
//! Edge interrupts are only armed while the button's resource has at least
//! one observer. An armed edge queues a [`ButtonEvent`]; the consumer
//! re-reads the pin via [`handle_event`] and notifies observers if the value
//! actually changed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

use super::Device;
use crate::property;
use crate::property::PropertyFlags;
use crate::registry::Namespace;
use crate::resource::{Resource, ResourceDescriptor};

/// Capacity of the edge event queue.
pub const EVENT_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub value: bool,
    pub name: String,
}

/// One button and its input pin.
#[derive(Debug)]
pub struct Button {
    name: &'static str,
    gpio: u32,
    /// Pin level; pulled up, so high while released
    level: AtomicBool,
    /// Value seen at the last read
    value: AtomicBool,
    interrupts: AtomicBool,
}

impl Button {
    pub fn new(name: &'static str, gpio: u32) -> Self {
        Self {
            name,
            gpio,
            level: AtomicBool::new(true),
            value: AtomicBool::new(false),
            interrupts: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the pin and remember the result.
    pub fn read(&self) -> bool {
        let value = !self.level.load(Ordering::SeqCst);
        self.value.store(value, Ordering::SeqCst);
        value
    }

    /// The value seen at the last read.
    pub fn last_value(&self) -> bool {
        self.value.load(Ordering::SeqCst)
    }

    /// Drive the simulated pin. Returns true if an edge interrupt fired.
    pub fn set_level(&self, level: bool) -> bool {
        let previous = self.level.swap(level, Ordering::SeqCst);
        previous != level && self.interrupts_enabled()
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts.load(Ordering::SeqCst)
    }
}

fn retrieve(button: &Button) -> ButtonState {
    ButtonState {
        value: button.read(),
        name: button.name.to_string(),
    }
}

fn observe(button: &Button, count: usize) {
    let enable = count > 0;
    if button.interrupts.swap(enable, Ordering::SeqCst) != enable {
        info!(
            "[Button] GPIO {} edge interrupts {}",
            button.gpio,
            if enable { "enabled" } else { "disabled" }
        );
    }
}

fn descriptor() -> ResourceDescriptor<Button, ButtonState> {
    ResourceDescriptor::new(retrieve)
        .with_properties([
            property!("value", ButtonState, value, BOOLEAN),
            property!("n", ButtonState, name, STRING, PropertyFlags::METADATA),
        ])
        .with_observe(observe)
}

/// An edge seen on a button pin.
#[derive(Debug, Clone)]
pub struct ButtonEvent {
    pub button: Arc<Button>,
    pub resource: Arc<Resource>,
}

/// Re-read the pin behind `event` and notify observers if its value changed.
pub fn handle_event(event: &ButtonEvent) -> bool {
    let previous = event.button.last_value();
    let current = event.button.read();

    if current == previous {
        debug!("[Button] {} bounced, no change", event.resource.uri());
        return false;
    }

    info!(
        "[Button] {} {}",
        event.resource.uri(),
        if current { "pressed" } else { "released" }
    );
    event.resource.notify();
    true
}

/// The left and right buttons.
pub struct Buttons {
    buttons: Vec<(Arc<Button>, Arc<Resource>)>,
}

impl Buttons {
    pub const PREFIX: &'static str = "/b/";

    pub fn new() -> Self {
        let descriptor = Arc::new(descriptor());

        let buttons = [("left", "Left button", 13), ("right", "Right button", 14)]
            .into_iter()
            .map(|(uri, name, gpio)| {
                let button = Arc::new(Button::new(name, gpio));
                button.read();
                let resource = Resource::new(uri, button.clone(), descriptor.clone());
                (button, resource)
            })
            .collect();

        Self { buttons }
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    /// Drive the pin of button `index`, queueing an event if an edge
    /// interrupt fired.
    pub fn set_level(&self, index: usize, level: bool, events: &mpsc::Sender<ButtonEvent>) {
        let Some((button, resource)) = self.buttons.get(index) else {
            return;
        };

        if button.set_level(level) {
            let event = ButtonEvent {
                button: button.clone(),
                resource: resource.clone(),
            };
            if let Err(e) = events.try_send(event) {
                warn!("[Button] Dropped edge on GPIO {}: {}", button.gpio, e);
            }
        }
    }
}

impl Default for Buttons {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Buttons {
    fn name(&self) -> &'static str {
        "buttons"
    }

    fn namespace(&self) -> Namespace {
        self.buttons
            .iter()
            .fold(Namespace::new(Self::PREFIX), |ns, (_, resource)| {
                ns.with_resource(resource.clone())
            })
    }
}

/// Spawn a task that presses and releases the buttons in turn.
///
/// Each period one button's pin is toggled, cycling through the buttons.
///
/// # Returns
///
/// A `JoinHandle` that can be used to abort the simulation task.
pub fn run_button_simulation(
    buttons: Arc<Buttons>,
    period: Duration,
    events: mpsc::Sender<ButtonEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if buttons.is_empty() {
            return;
        }

        let mut ticker = interval(period);
        // The first tick completes immediately
        ticker.tick().await;

        let mut next = 0;
        loop {
            ticker.tick().await;
            if let Some((button, _)) = buttons.buttons.get(next) {
                let level = !button.level.load(Ordering::SeqCst);
                debug!("[Sim] GPIO {} -> {}", button.gpio, u8::from(level));
                buttons.set_level(next, level, &events);
            }
            next = (next + 1) % buttons.len();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::Interface;
    use parking_lot::Mutex;

    fn left(buttons: &Buttons) -> (Arc<Button>, Arc<Resource>) {
        buttons.buttons[0].clone()
    }

    #[test]
    fn test_initial_state() {
        let buttons = Buttons::new();
        let (_, resource) = left(&buttons);
        let state = resource.retrieve();

        assert_eq!(
            resource.format_state(&Interface::BASELINE, &state).unwrap(),
            "left: value=false n=\"Left button\""
        );
        assert_eq!(
            state.downcast_ref::<ButtonState>(),
            Some(&ButtonState {
                value: false,
                name: "Left button".to_string(),
            })
        );
    }

    #[test]
    fn test_namespace() {
        let buttons = Buttons::new();
        let namespace = buttons.namespace();

        assert_eq!(namespace.prefix(), "/b/");
        let uris: Vec<_> = namespace.resources().iter().map(|r| r.uri()).collect();
        assert_eq!(uris, vec!["left", "right"]);
    }

    #[test]
    fn test_retrieve_reads_pin() {
        let buttons = Buttons::new();
        let (button, resource) = left(&buttons);

        button.set_level(false);
        let state = resource.retrieve();
        assert!(state.downcast_ref::<ButtonState>().unwrap().value);
        assert!(button.last_value());
    }

    #[test]
    fn test_buttons_are_read_only() {
        let buttons = Buttons::new();
        let (_, resource) = left(&buttons);

        assert!(!resource.is_updatable());
        assert!(resource
            .apply_updates(&Interface::BASELINE, &["value=1"])
            .is_err());
    }

    #[test]
    fn test_interrupts_follow_observers() {
        let buttons = Buttons::new();
        let (button, resource) = left(&buttons);
        let (tx, mut rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

        // No observers: edges are not reported
        buttons.set_level(0, false, &tx);
        assert!(rx.try_recv().is_err());

        let handle = resource.observe(Interface::BASELINE, |_| {});
        assert!(button.interrupts_enabled());

        buttons.set_level(0, true, &tx);
        let event = rx.try_recv().unwrap();
        assert!(Arc::ptr_eq(&event.resource, &resource));

        // Same level again is not an edge
        buttons.set_level(0, true, &tx);
        assert!(rx.try_recv().is_err());

        handle.remove();
        assert!(!button.interrupts_enabled());
    }

    #[test]
    fn test_event_notifies_only_on_change() {
        let buttons = Buttons::new();
        let (button, resource) = left(&buttons);
        let (tx, mut rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let lines = Arc::new(Mutex::new(Vec::new()));

        let _handle = {
            let lines = lines.clone();
            resource.observe(Interface::SENSOR, move |n| {
                lines.lock().push(n.format().unwrap());
            })
        };

        buttons.set_level(0, false, &tx);
        let event = rx.try_recv().unwrap();
        assert!(handle_event(&event));
        assert!(button.last_value());

        // A second event for the same level is a bounce
        assert!(!handle_event(&event));

        buttons.set_level(0, true, &tx);
        let event = rx.try_recv().unwrap();
        assert!(handle_event(&event));

        assert_eq!(
            *lines.lock(),
            vec!["left: value=true".to_string(), "left: value=false".to_string()]
        );
    }

    #[test]
    fn test_full_queue_drops_event() {
        let buttons = Buttons::new();
        let (_, resource) = left(&buttons);
        let (tx, mut rx) = mpsc::channel(1);
        let _handle = resource.observe(Interface::BASELINE, |_| {});

        buttons.set_level(0, false, &tx);
        buttons.set_level(0, true, &tx);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
