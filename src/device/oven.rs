//! A simulated oven: power switch, target temperature and current temperature.
//!
//! The heater output follows the power switch. Each call to
//! [`OvenDevice::tick`] moves the current temperature one degree toward the
//! target while powered, or toward ambient while not, and notifies
//! observers of `current` when it moves.
//!
//! Temperatures are held in whole degrees Celsius. A target written in
//! another unit is converted on update.

use std::cmp::Ordering as Direction;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use parking_lot::Mutex;

use super::Device;
use crate::error::{ResourceError, Result};
use crate::property;
use crate::property::PropertyFlags;
use crate::registry::Namespace;
use crate::resource::{Resource, ResourceDescriptor};
use crate::temperature::TemperatureUnits;

const RW: PropertyFlags = PropertyFlags::WRITABLE;
const RW_META: PropertyFlags = PropertyFlags::WRITABLE.union(PropertyFlags::METADATA);

/// Absolute zero in whole degrees Celsius.
pub const ABSOLUTE_ZERO: i32 = -273;

/// Largest magnitude accepted for a target, in any unit.
pub const TEMPERATURE_LIMIT: i32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerState {
    pub value: bool,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemperatureState {
    pub temperature: i32,
    pub units: TemperatureUnits,
    pub name: String,
}

impl TemperatureState {
    fn celsius(temperature: i32, name: &str) -> Self {
        Self {
            temperature,
            units: TemperatureUnits::Celsius,
            name: name.to_string(),
        }
    }
}

/// Oven hardware and state, shared by its three resources.
#[derive(Debug)]
pub struct Oven {
    power: Mutex<PowerState>,
    target: Mutex<TemperatureState>,
    current: Mutex<TemperatureState>,
    heater: AtomicBool,
    ambient: i32,
}

impl Oven {
    pub fn new(ambient: i32) -> Self {
        Self {
            power: Mutex::new(PowerState {
                value: false,
                name: "Power Control".to_string(),
            }),
            target: Mutex::new(TemperatureState::celsius(0, "Target Temperature")),
            current: Mutex::new(TemperatureState::celsius(ambient, "Current Temperature")),
            heater: AtomicBool::new(false),
            ambient,
        }
    }

    /// Level of the simulated heater output.
    pub fn heater(&self) -> bool {
        self.heater.load(Ordering::SeqCst)
    }

    /// Advance the thermal model one step. Returns the new current
    /// temperature if it changed.
    pub fn step(&self) -> Option<i32> {
        let goal = if self.heater() {
            self.target.lock().temperature
        } else {
            self.ambient
        };

        let mut current = self.current.lock();
        match goal.cmp(&current.temperature) {
            Direction::Greater => current.temperature += 1,
            Direction::Less => current.temperature -= 1,
            Direction::Equal => return None,
        }
        Some(current.temperature)
    }
}

fn power_retrieve(oven: &Oven) -> PowerState {
    oven.power.lock().clone()
}

fn power_update(oven: &Oven, state: &PowerState) -> Result<()> {
    *oven.power.lock() = state.clone();
    oven.heater.store(state.value, Ordering::SeqCst);
    info!("[Oven] Heater {}", if state.value { "on" } else { "off" });
    Ok(())
}

fn target_retrieve(oven: &Oven) -> TemperatureState {
    oven.target.lock().clone()
}

fn target_update(oven: &Oven, state: &TemperatureState) -> Result<()> {
    if !(-TEMPERATURE_LIMIT..=TEMPERATURE_LIMIT).contains(&state.temperature) {
        return Err(ResourceError::Rejected {
            reason: format!("temperature {} out of range", state.temperature),
        });
    }

    let celsius = state.units.to_celsius(state.temperature);
    if celsius < ABSOLUTE_ZERO {
        return Err(ResourceError::Rejected {
            reason: format!("{}{} is below absolute zero", state.temperature, state.units),
        });
    }

    *oven.target.lock() = TemperatureState {
        temperature: celsius,
        units: TemperatureUnits::Celsius,
        name: state.name.clone(),
    };
    info!("[Oven] Target temperature {}C", celsius);
    Ok(())
}

fn current_retrieve(oven: &Oven) -> TemperatureState {
    oven.current.lock().clone()
}

fn temperature_properties(writable: PropertyFlags) -> [property::Property<TemperatureState>; 3] {
    [
        property!("temperature", TemperatureState, temperature, INTEGER, writable),
        property!("units", TemperatureState, units, TEMPERATURE_UNITS, writable),
        property!("n", TemperatureState, name, STRING, RW_META),
    ]
}

/// The oven device and its `/o/` resources.
pub struct OvenDevice {
    oven: Arc<Oven>,
    power: Arc<Resource>,
    target: Arc<Resource>,
    current: Arc<Resource>,
}

impl OvenDevice {
    pub const PREFIX: &'static str = "/o/";

    pub fn new(ambient: i32) -> Self {
        let oven = Arc::new(Oven::new(ambient));

        let power = ResourceDescriptor::new(power_retrieve)
            .with_properties([
                property!("value", PowerState, value, BOOLEAN, RW),
                property!("n", PowerState, name, STRING, RW_META),
            ])
            .with_update(power_update);
        let target = ResourceDescriptor::new(target_retrieve)
            .with_properties(temperature_properties(RW))
            .with_update(target_update);
        // The name is flagged writable but there is no update path
        let current = ResourceDescriptor::new(current_retrieve)
            .with_properties(temperature_properties(PropertyFlags::empty()));

        Self {
            power: Resource::new("power", oven.clone(), Arc::new(power)),
            target: Resource::new("target", oven.clone(), Arc::new(target)),
            current: Resource::new("current", oven.clone(), Arc::new(current)),
            oven,
        }
    }

    pub fn oven(&self) -> &Arc<Oven> {
        &self.oven
    }

    pub fn power(&self) -> &Arc<Resource> {
        &self.power
    }

    pub fn target(&self) -> &Arc<Resource> {
        &self.target
    }

    pub fn current(&self) -> &Arc<Resource> {
        &self.current
    }

    /// Advance the thermal model and notify observers of `current` if the
    /// temperature moved.
    pub fn tick(&self) -> bool {
        match self.oven.step() {
            Some(temperature) => {
                debug!("[Oven] Current temperature {}C", temperature);
                self.current.notify();
                true
            }
            None => false,
        }
    }
}

impl Device for OvenDevice {
    fn name(&self) -> &'static str {
        "oven"
    }

    fn namespace(&self) -> Namespace {
        Namespace::new(Self::PREFIX)
            .with_resource(self.power.clone())
            .with_resource(self.target.clone())
            .with_resource(self.current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::Interface;
    use std::sync::atomic::AtomicUsize;

    fn format(resource: &Resource, interface: &Interface) -> String {
        let state = resource.retrieve();
        resource.format_state(interface, &state).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let device = OvenDevice::new(20);

        assert_eq!(
            format(device.power(), &Interface::BASELINE),
            "power: value=false n=\"Power Control\""
        );
        assert_eq!(
            format(device.target(), &Interface::BASELINE),
            "target: temperature=0 units=C n=\"Target Temperature\""
        );
        assert_eq!(
            format(device.current(), &Interface::SENSOR),
            "current: temperature=20 units=C"
        );
    }

    #[test]
    fn test_namespace_order() {
        let device = OvenDevice::new(20);
        let namespace = device.namespace();

        assert_eq!(namespace.prefix(), "/o/");
        let uris: Vec<_> = namespace.resources().iter().map(|r| r.uri()).collect();
        assert_eq!(uris, vec!["power", "target", "current"]);
    }

    #[test]
    fn test_power_drives_heater() {
        let device = OvenDevice::new(20);

        device
            .power()
            .apply_updates(&Interface::ACTUATOR, &["value=true"])
            .unwrap();
        assert!(device.oven().heater());

        device
            .power()
            .apply_updates(&Interface::BASELINE, &["value=0", "n=Main"])
            .unwrap();
        assert!(!device.oven().heater());
        assert_eq!(
            format(device.power(), &Interface::BASELINE),
            "power: value=false n=\"Main\""
        );
    }

    #[test]
    fn test_target_converts_to_celsius() {
        let device = OvenDevice::new(20);

        device
            .target()
            .apply_updates(&Interface::ACTUATOR, &["temperature=356", "units=Fahrenheit"])
            .unwrap();
        assert_eq!(
            format(device.target(), &Interface::ACTUATOR),
            "target: temperature=180 units=C"
        );

        device
            .target()
            .apply_updates(&Interface::ACTUATOR, &["temperature=473", "units=K"])
            .unwrap();
        assert_eq!(
            format(device.target(), &Interface::ACTUATOR),
            "target: temperature=200 units=C"
        );
    }

    #[test]
    fn test_target_rejects_impossible_temperatures() {
        let device = OvenDevice::new(20);

        for assignments in [
            ["temperature=-300", "units=C"],
            ["temperature=-500", "units=F"],
            ["temperature=-1", "units=K"],
            ["temperature=0x7fffffff", "units=F"],
        ] {
            assert!(matches!(
                device
                    .target()
                    .apply_updates(&Interface::BASELINE, &assignments[..]),
                Err(ResourceError::Rejected { .. })
            ));
        }
        assert_eq!(
            format(device.target(), &Interface::ACTUATOR),
            "target: temperature=0 units=C"
        );
    }

    #[test]
    fn test_current_is_not_updatable() {
        let device = OvenDevice::new(20);

        assert_eq!(
            device
                .current()
                .apply_updates(&Interface::BASELINE, &["n=Sensor"]),
            Err(ResourceError::NotSupported)
        );
        assert_eq!(
            device
                .current()
                .apply_updates(&Interface::BASELINE, &["temperature=5"]),
            Err(ResourceError::ReadOnly {
                property: "temperature".to_string(),
            })
        );
    }

    #[test]
    fn test_thermal_model() {
        let device = OvenDevice::new(20);
        let notified = Arc::new(AtomicUsize::new(0));
        let _handle = {
            let notified = notified.clone();
            device.current().observe(Interface::SENSOR, move |_| {
                notified.fetch_add(1, Ordering::SeqCst);
            })
        };

        // Unpowered at ambient: nothing moves
        assert!(!device.tick());

        device
            .target()
            .apply_updates(&Interface::ACTUATOR, &["temperature=22"])
            .unwrap();
        device
            .power()
            .apply_updates(&Interface::ACTUATOR, &["value=1"])
            .unwrap();

        assert!(device.tick());
        assert!(device.tick());
        assert!(!device.tick());
        assert_eq!(
            format(device.current(), &Interface::SENSOR),
            "current: temperature=22 units=C"
        );

        device
            .power()
            .apply_updates(&Interface::ACTUATOR, &["value=0"])
            .unwrap();
        assert!(device.tick());
        assert_eq!(device.oven().step(), Some(20));
        assert_eq!(device.oven().step(), None);

        assert_eq!(notified.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_step_at_extreme_temperatures() {
        let cold = OvenDevice::new(i32::MIN);
        cold.target()
            .apply_updates(&Interface::ACTUATOR, &["temperature=100"])
            .unwrap();
        cold.power()
            .apply_updates(&Interface::ACTUATOR, &["value=1"])
            .unwrap();
        assert_eq!(cold.oven().step(), Some(i32::MIN + 1));

        let hot = OvenDevice::new(i32::MAX);
        assert_eq!(hot.oven().step(), None);
        hot.power()
            .apply_updates(&Interface::ACTUATOR, &["value=1"])
            .unwrap();
        assert_eq!(hot.oven().step(), Some(i32::MAX - 1));
    }
}
