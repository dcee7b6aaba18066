use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::device::oven::{ABSOLUTE_ZERO, TEMPERATURE_LIMIT};
use crate::property::{BOOLEAN, INTEGER, PropertyType};

/// Split `.env` content into key/value pairs.
/// Values may contain spaces without quoting; one pair of surrounding
/// single or double quotes is removed.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();

        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }

        if !key.is_empty() {
            pairs.push((key.to_string(), value.to_string()));
        }
    }

    pairs
}

/// Load environment variables from a `.env` file in the working directory.
/// Variables already set in the environment take precedence.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        if std::env::var(&key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(&key, &value) };
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub console: ConsoleConfig,
    pub buttons: ButtonsConfig,
    pub oven: OvenConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonsConfig {
    /// Toggle the simulated button pins periodically
    pub simulate: bool,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvenConfig {
    pub ambient_celsius: i32,
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            console: ConsoleConfig {
                prompt: "uniport> ".to_string(),
            },
            buttons: ButtonsConfig {
                simulate: true,
                interval_ms: 5000,
            },
            oven: OvenConfig {
                ambient_celsius: 20,
                tick_ms: 1000,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Overlay the variables returned by `lookup` on the defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(prompt) = lookup("UNIPORT_PROMPT") {
            config.console.prompt = prompt;
        }

        // Buttons
        if let Some(simulate) = parse_var(&lookup, "BUTTON_SIMULATION", &BOOLEAN) {
            config.buttons.simulate = simulate;
        }
        if let Some(ms) = parse_period(&lookup, "BUTTON_SIMULATION_INTERVAL_MS") {
            config.buttons.interval_ms = ms;
        }

        // Oven
        if let Some(ambient) = parse_ambient(&lookup, "OVEN_AMBIENT_CELSIUS") {
            config.oven.ambient_celsius = ambient;
        }
        if let Some(ms) = parse_period(&lookup, "OVEN_TICK_MS") {
            config.oven.tick_ms = ms;
        }

        config
    }
}

fn parse_var<V>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    ty: &PropertyType<V>,
) -> Option<V> {
    let text = lookup(key)?;
    match ty.parse(text.trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("[Config] Ignoring {}={:?}: {}", key, text, e);
            None
        }
    }
}

fn parse_period(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let ms = parse_var(lookup, key, &INTEGER)?;
    match u64::try_from(ms) {
        Ok(ms) if ms > 0 => Some(ms),
        _ => {
            warn!("[Config] Ignoring {}={}: period must be positive", key, ms);
            None
        }
    }
}

/// An ambient temperature the oven's target range could also reach.
fn parse_ambient(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<i32> {
    let celsius = parse_var(lookup, key, &INTEGER)?;
    if (ABSOLUTE_ZERO..=TEMPERATURE_LIMIT).contains(&celsius) {
        Some(celsius)
    } else {
        warn!(
            "[Config] Ignoring {}={}: must be between {} and {}",
            key, celsius, ABSOLUTE_ZERO, TEMPERATURE_LIMIT
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config, Config::default());
        assert_eq!(config.console.prompt, "uniport> ");
        assert!(config.buttons.simulate);
        assert_eq!(config.buttons.interval_ms, 5000);
        assert_eq!(config.oven.ambient_celsius, 20);
        assert_eq!(config.oven.tick_ms, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("UNIPORT_PROMPT", "> "),
            ("BUTTON_SIMULATION", "FALSE"),
            ("BUTTON_SIMULATION_INTERVAL_MS", "0x100"),
            ("OVEN_AMBIENT_CELSIUS", "-5"),
            ("OVEN_TICK_MS", " 250 "),
        ]);

        assert_eq!(config.console.prompt, "> ");
        assert!(!config.buttons.simulate);
        assert_eq!(config.buttons.interval_ms, 256);
        assert_eq!(config.oven.ambient_celsius, -5);
        assert_eq!(config.oven.tick_ms, 250);
    }

    #[test]
    fn test_malformed_values_keep_defaults() {
        let config = config(&[
            ("BUTTON_SIMULATION", "sometimes"),
            ("BUTTON_SIMULATION_INTERVAL_MS", "0"),
            ("OVEN_AMBIENT_CELSIUS", "warm"),
            ("OVEN_TICK_MS", "-10"),
        ]);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_ambient_out_of_range_keeps_default() {
        for ambient in ["-2147483648", "-274", "10001", "0x7fffffff"] {
            let config = config(&[("OVEN_AMBIENT_CELSIUS", ambient)]);
            assert_eq!(config.oven.ambient_celsius, 20, "{ambient}");
        }

        assert_eq!(
            config(&[("OVEN_AMBIENT_CELSIUS", "-273")]).oven.ambient_celsius,
            -273
        );
        assert_eq!(
            config(&[("OVEN_AMBIENT_CELSIUS", "10000")]).oven.ambient_celsius,
            10_000
        );
    }

    #[test]
    fn test_parse_dotenv() {
        let content = "\
# comment
UNIPORT_PROMPT=\"oven> \"
BUTTON_SIMULATION = false

OVEN_TICK_MS='500'
NOT A PAIR
=orphan
";
        assert_eq!(
            parse_dotenv(content),
            vec![
                ("UNIPORT_PROMPT".to_string(), "oven> ".to_string()),
                ("BUTTON_SIMULATION".to_string(), "false".to_string()),
                ("OVEN_TICK_MS".to_string(), "500".to_string()),
            ]
        );
    }

    #[test]
    fn test_config_serializes() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["oven"]["ambient_celsius"], 20);
        assert_eq!(json["buttons"]["simulate"], true);
    }
}
