//! Persisted MIDI configuration.
//!
//! Three scalars survive restarts: the input device, the output device, and
//! the MIDI channel. The router is the only writer; saves happen whenever an
//! incoming device change differs from the held values, never periodically.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Highest valid MIDI channel (channels are 0-15 on the wire)
pub const MAX_MIDI_CHANNEL: u8 = 15;

/// A MIDI input/output device pair as broadcast to all observers.
///
/// Device ids are transport port names; `None` means unbound.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DevicePair {
    pub input: Option<String>,
    pub output: Option<String>,
}

impl DevicePair {
    pub fn new(input: Option<String>, output: Option<String>) -> Self {
        Self { input, output }
    }
}

impl std::fmt::Display for DevicePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "in:{} out:{}",
            self.input.as_deref().unwrap_or("<unset>"),
            self.output.as_deref().unwrap_or("<unset>")
        )
    }
}

/// The persisted configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi_input_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi_output_device: Option<String>,
    #[serde(default)]
    pub midi_channel: u8,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            midi_input_device: None,
            midi_output_device: None,
            midi_channel: 0,
        }
    }
}

impl Configuration {
    /// The currently held device pair.
    pub fn devices(&self) -> DevicePair {
        DevicePair::new(
            self.midi_input_device.clone(),
            self.midi_output_device.clone(),
        )
    }

    /// Replace the held device pair. Returns true if either id changed.
    pub fn set_devices(&mut self, pair: &DevicePair) -> bool {
        let changed =
            self.midi_input_device != pair.input || self.midi_output_device != pair.output;
        if changed {
            self.midi_input_device = pair.input.clone();
            self.midi_output_device = pair.output.clone();
        }
        changed
    }
}

/// Durable storage for the configuration record.
///
/// Owned and called exclusively by the router task, so there is no
/// concurrent-access contract. `load` never fails: a missing or malformed
/// file yields defaults.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read the configuration, substituting defaults on any failure.
    pub fn load(&self) -> Configuration {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!(
                    path = %self.path.display(),
                    "No readable config ({}), using defaults", e
                );
                return Configuration::default();
            }
        };

        let mut config: Configuration = match serde_yaml::from_str(&contents) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    "Malformed config ({}), using defaults", e
                );
                return Configuration::default();
            }
        };

        if config.midi_channel > MAX_MIDI_CHANNEL {
            warn!(
                channel = config.midi_channel,
                "Configured MIDI channel out of range, using 0"
            );
            config.midi_channel = 0;
        }

        config
    }

    /// Write the configuration durably, overwriting the prior value.
    ///
    /// The caller observes completion before proceeding, which makes the
    /// written values authoritative for future restarts.
    pub fn save(&self, config: &Configuration) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory {}", parent.display())
                })?;
            }
        }

        let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
        std::fs::write(&self.path, yaml)
            .with_context(|| format!("Failed to write config file {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Config saved");
        Ok(())
    }
}
