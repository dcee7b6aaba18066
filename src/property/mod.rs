//! Resource properties.
//!
//! A [`Property`] names one field of a resource's state type `S` and binds it
//! to a [`PropertyType`] that knows how to format and parse it. The field is
//! reached through a pair of accessor functions fixed at construction, so a
//! property can only ever be applied to the state type it was declared for.
//!
//! Properties are usually declared with the [`property!`](crate::property!)
//! macro:
//!
//! ```
//! use uniport::property;
//! use uniport::property::{Property, PropertyFlags};
//!
//! #[derive(Clone)]
//! struct LampState {
//!     on: bool,
//!     name: String,
//! }
//!
//! let props: Vec<Property<LampState>> = vec![
//!     property!("value", LampState, on, BOOLEAN, PropertyFlags::WRITABLE),
//!     property!("n", LampState, name, STRING, PropertyFlags::METADATA),
//! ];
//! assert_eq!(props[0].type_name(), "boolean");
//! ```

mod types;

use std::fmt;

use bitflags::bitflags;

pub use crate::temperature::TEMPERATURE_UNITS;
pub use types::{BOOLEAN, FormatFn, INTEGER, InvalidFormat, ParseFn, PropertyType, STRING, UUID};

bitflags! {
    /// Access flags carried by a property and matched by interfaces.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        /// Property may be written through the update path
        const WRITABLE = 0x0001;
        /// Property describes the resource rather than its live value
        const METADATA = 0x0002;
    }
}

/// Type-erased access to one typed field of `S`.
trait Field<S>: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn write(&self, state: &S, out: &mut dyn fmt::Write) -> fmt::Result;
    fn parse_into(&self, text: &str, state: &mut S) -> Result<(), InvalidFormat>;
}

struct Accessor<S, V: 'static> {
    ty: &'static PropertyType<V>,
    get: fn(&S) -> &V,
    get_mut: fn(&mut S) -> &mut V,
}

impl<S, V: 'static> Field<S> for Accessor<S, V> {
    fn type_name(&self) -> &'static str {
        self.ty.name()
    }

    fn write(&self, state: &S, out: &mut dyn fmt::Write) -> fmt::Result {
        self.ty.write((self.get)(state), out)
    }

    fn parse_into(&self, text: &str, state: &mut S) -> Result<(), InvalidFormat> {
        // Parse fully before touching the field so a failure leaves it intact
        let value = self.ty.parse(text)?;
        *(self.get_mut)(state) = value;
        Ok(())
    }
}

/// A named, typed field of the state type `S`.
pub struct Property<S> {
    name: &'static str,
    flags: PropertyFlags,
    field: Box<dyn Field<S>>,
}

impl<S: 'static> Property<S> {
    /// Create a read-only, non-metadata property.
    pub fn new<V: 'static>(
        name: &'static str,
        ty: &'static PropertyType<V>,
        get: fn(&S) -> &V,
        get_mut: fn(&mut S) -> &mut V,
    ) -> Self {
        Self {
            name,
            flags: PropertyFlags::empty(),
            field: Box::new(Accessor { ty, get, get_mut }),
        }
    }

    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl<S> Property<S> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn type_name(&self) -> &'static str {
        self.field.type_name()
    }

    pub fn is_writable(&self) -> bool {
        self.flags.contains(PropertyFlags::WRITABLE)
    }

    /// Write this property's value from `state` into `out`.
    pub fn write(&self, state: &S, out: &mut dyn fmt::Write) -> fmt::Result {
        self.field.write(state, out)
    }

    /// Format this property's value from `state`.
    pub fn format(&self, state: &S) -> String {
        let mut text = String::new();
        let _ = self.write(state, &mut text);
        text
    }

    /// Parse `text` into this property's field of `state`.
    ///
    /// Only this property's field is modified, and only on success.
    pub fn parse_into(&self, text: &str, state: &mut S) -> Result<(), InvalidFormat> {
        self.field.parse_into(text, state)
    }

    pub fn info(&self) -> PropertyInfo {
        PropertyInfo {
            name: self.name,
            flags: self.flags,
            type_name: self.type_name(),
        }
    }
}

impl<S> fmt::Debug for Property<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("type", &self.type_name())
            .finish()
    }
}

/// Description of a property without its state type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: &'static str,
    pub flags: PropertyFlags,
    pub type_name: &'static str,
}

/// Declare a [`Property`] for a field of a state struct.
///
/// `property!(name, StateType, field, TYPE)` or
/// `property!(name, StateType, field, TYPE, flags)`. A bare `TYPE` names one
/// of the built-in types re-exported from [`crate::property`] (`BOOLEAN`,
/// `INTEGER`, `STRING`, `UUID`, `TEMPERATURE_UNITS`); any other
/// `static PropertyType` is given by its full path.
#[macro_export]
macro_rules! property {
    (@build $name:expr, $state:ty, $field:ident, $ty:path) => {
        $crate::property::Property::<$state>::new(
            $name,
            &$ty,
            |state: &$state| &state.$field,
            |state: &mut $state| &mut state.$field,
        )
    };
    ($name:expr, $state:ty, $field:ident, $ty:ident) => {
        $crate::property!(@build $name, $state, $field, $crate::property::$ty)
    };
    ($name:expr, $state:ty, $field:ident, $ty:ident, $flags:expr) => {
        $crate::property!($name, $state, $field, $ty).with_flags($flags)
    };
    ($name:expr, $state:ty, $field:ident, $ty:path) => {
        $crate::property!(@build $name, $state, $field, $ty)
    };
    ($name:expr, $state:ty, $field:ident, $ty:path, $flags:expr) => {
        $crate::property!(@build $name, $state, $field, $ty).with_flags($flags)
    };
}
