//! Console shell.
//!
//! One command per line, split on whitespace:
//!
//! ```text
//! ls
//! show [-i <interface>] [-j] <uri>
//! set [-i <interface>] <uri> [<prop>=<value>...]
//! observe [-d] [-i <interface>] <uri>
//! help [<command>]
//! ```
//!
//! All output, including lines printed later by observers, is sent to an
//! unbounded channel and printed by the console loop.

use std::sync::Arc;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use log::{debug, warn};
use serde_json::{Map, Value, json};
use thiserror::Error as ThisError;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::ResourceError;
use crate::interface::Interface;
use crate::property::{BOOLEAN, INTEGER, STRING};
use crate::registry::Registry;
use crate::resource::{ObserverHandle, Resource};

#[derive(ThisError, Debug)]
pub enum ShellError {
    #[error("{}", .0.render().to_string().trim_end())]
    Usage(#[from] clap::Error),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;

#[derive(Parser, Debug)]
#[command(name = "uniport", no_binary_name = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all resource URIs
    Ls,

    /// Show the current state of a resource
    Show {
        /// Interface to view the resource through
        #[arg(short, long)]
        interface: Option<String>,

        /// Print the state as a JSON object
        #[arg(short, long)]
        json: bool,

        uri: String,
    },

    /// Change properties of a resource
    Set {
        /// Interface to write through
        #[arg(short, long)]
        interface: Option<String>,

        uri: String,

        #[arg(value_name = "PROP=VALUE")]
        assignments: Vec<String>,
    },

    /// Print the state of a resource whenever it changes
    Observe {
        /// Stop observing
        #[arg(short, long)]
        delete: bool,

        /// Interface to view the resource through
        #[arg(short, long)]
        interface: Option<String>,

        uri: String,
    },
}

/// Command interpreter over a frozen registry.
///
/// The shell keeps at most one observer per resource.
pub struct Shell {
    registry: Arc<Registry>,
    output: UnboundedSender<String>,
    observers: Vec<ObserverHandle>,
}

impl Shell {
    pub fn new(registry: Arc<Registry>, output: UnboundedSender<String>) -> Self {
        Self {
            registry,
            output,
            observers: Vec::new(),
        }
    }

    /// Execute one line, printing any error to the output.
    pub fn handle_line(&mut self, line: &str) {
        if let Err(e) = self.execute(line) {
            self.print(e.to_string());
        }
    }

    /// Execute one line.
    pub fn execute(&mut self, line: &str) -> Result<()> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            return Ok(());
        }

        let parsed = match Line::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) if e.kind() == ErrorKind::DisplayHelp => {
                self.print(e.render().to_string().trim_end().to_string());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        debug!("[Shell] {:?}", parsed.command);

        match parsed.command {
            Command::Ls => self.list(),
            Command::Show {
                interface,
                json,
                uri,
            } => self.show(interface.as_deref(), json, &uri),
            Command::Set {
                interface,
                uri,
                assignments,
            } => self.set(interface.as_deref(), &uri, &assignments),
            Command::Observe {
                delete,
                interface,
                uri,
            } => self.observe(delete, interface.as_deref(), &uri),
        }
    }

    /// Number of resources currently observed by the shell.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn print(&self, line: String) {
        // The console loop may already be gone during shutdown
        let _ = self.output.send(line);
    }

    fn interface(&self, name: Option<&str>) -> Result<Interface> {
        match name {
            Some(name) => Ok(self.registry.find_interface(name)?),
            None => Ok(Interface::BASELINE),
        }
    }

    fn list(&self) -> Result<()> {
        for (prefix, suffix) in self.registry.list_resources() {
            self.print(format!("{prefix}{suffix}"));
        }
        Ok(())
    }

    fn show(&self, interface: Option<&str>, json: bool, uri: &str) -> Result<()> {
        let resource = self.registry.find_resource(uri)?;
        let interface = self.interface(interface)?;
        let state = resource.retrieve();

        if !json {
            let line = resource.format_state(&interface, &state)?;
            self.print(line);
            return Ok(());
        }

        let mut properties = Map::new();
        for (name, text) in resource.state_values(&interface, &state)? {
            let info = resource.property(name)?;
            properties.insert(name.to_string(), json_value(info.type_name, text));
        }

        let document = json!({
            "uri": uri,
            "interface": interface.name(),
            "properties": properties,
        });
        self.print(serde_json::to_string(&document)?);
        Ok(())
    }

    fn set(&self, interface: Option<&str>, uri: &str, assignments: &[String]) -> Result<()> {
        let resource = self.registry.find_resource(uri)?;
        let interface = self.interface(interface)?;

        resource.apply_updates(&interface, assignments)?;
        Ok(())
    }

    fn observe(&mut self, delete: bool, interface: Option<&str>, uri: &str) -> Result<()> {
        let resource = self.registry.find_resource(uri)?;
        let interface = self.interface(interface)?;

        let existing = self
            .observers
            .iter()
            .position(|h| Arc::ptr_eq(h.resource(), &resource));

        match (existing, delete) {
            (Some(index), false) if self.observers[index].interface() == interface => {}
            (None, false) => {
                let handle = self.start_observing(&resource, interface);
                self.observers.push(handle);
            }
            (Some(index), true) => {
                self.observers.swap_remove(index).remove();
            }
            (Some(index), false) => {
                self.observers.swap_remove(index).remove();
                let handle = self.start_observing(&resource, interface);
                self.observers.push(handle);
            }
            (None, true) => {}
        }

        Ok(())
    }

    fn start_observing(&self, resource: &Arc<Resource>, interface: Interface) -> ObserverHandle {
        let output = self.output.clone();
        resource.observe(interface, move |notification| match notification.format() {
            Ok(line) => {
                let _ = output.send(line);
            }
            Err(e) => warn!("[Shell] {}: {}", notification.resource.uri(), e),
        })
    }
}

/// The JSON value of one formatted property, chosen by its type.
///
/// Booleans and integers map to JSON bool and number. Strings lose their
/// display quotes. Every other type is emitted as its formatted text.
fn json_value(type_name: &str, text: String) -> Value {
    let typed = match type_name {
        name if name == BOOLEAN.name() => BOOLEAN.parse(&text).ok().map(Value::Bool),
        name if name == INTEGER.name() => INTEGER.parse(&text).ok().map(Value::from),
        name if name == STRING.name() => STRING.parse(&text).ok().map(Value::String),
        _ => None,
    };
    typed.unwrap_or(Value::String(text))
}

impl Drop for Shell {
    fn drop(&mut self) {
        for handle in self.observers.drain(..) {
            handle.remove();
        }
    }
}
