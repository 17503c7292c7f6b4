//! Input subsystem configuration.
//!
//! The config-file grammar itself lives outside this crate; what arrives here
//! is the already-parsed list of devices and their input declarations, in the
//! JSON shape below.
//!
//! ```json
//! {
//!   "input_map": "default",
//!   "devices": [
//!     {
//!       "name": "static-wand",
//!       "driver": "static",
//!       "args": "valuator=0.5",
//!       "inputs": [
//!         { "name": "trigger", "desc": "2switch(static-wand:constant[1])", "ui": "grab" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Translation plus euler rotation (degrees) used to describe a calibration
/// transform in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// X, Y, Z translation.
    pub translate: [f64; 3],
    /// Azimuth, elevation, roll in degrees.
    pub rotate: [f64; 3],
}

/// One declared input on a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputDecl {
    /// Name used in reports and UI listings.
    pub name: String,
    /// `"<type>(<device>:<kind>[<instance>])"`.
    pub desc: String,
    /// Text describing what the application does with this input.
    pub ui: Option<String>,
    /// Receiver-to-entity offset applied to 6-sensors that ask for `r2e`.
    pub r2e: Option<TransformConfig>,
}

/// One configured input device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
    /// Driver name, matched case-insensitively against the driver registry.
    pub driver: String,
    /// Driver-specific option string.
    pub args: String,
    /// Tracker-to-real-world calibration shared by every 6-sensor on the device.
    pub t2rw: Option<TransformConfig>,
    pub inputs: Vec<InputDecl>,
}

/// Configuration for the input subsystem of one FreeVR context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Map name handed to the map builder. Only `"default"` builds a map.
    pub input_map: String,
    /// Circular history length for switches and valuators; 0 disables history.
    pub history_len: usize,
    /// Minimum poll-loop frame budget in microseconds.
    pub min_frame_usec: u64,
    /// Bounded barrier wait in milliseconds; `None` waits forever.
    pub barrier_timeout_ms: Option<u64>,
    pub num_users: usize,
    /// Logical 6-sensor index used as each user's head.
    pub head_sensor: usize,
    pub devices: Vec<DeviceConfig>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            input_map: "default".to_string(),
            history_len: 50,
            min_frame_usec: 0,
            barrier_timeout_ms: Some(5_000),
            num_users: 1,
            head_sensor: 0,
            devices: Vec::new(),
        }
    }
}

impl InputConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        debug!("loading input config from {}", path.display());
        Self::from_json_str(&text)
    }

    /// Check the constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        for (idx, device) in self.devices.iter().enumerate() {
            if device.name.trim().is_empty() {
                return Err(Error::config(format!("device[{idx}] has no name")));
            }
            if device.driver.trim().is_empty() {
                return Err(Error::config(format!(
                    "device '{}' has no driver",
                    device.name
                )));
            }
            let duplicate = self.devices[..idx]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&device.name));
            if duplicate {
                return Err(Error::config(format!(
                    "device name '{}' is declared twice",
                    device.name
                )));
            }
        }
        Ok(())
    }

    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices
            .iter()
            .find(|device| device.name.eq_ignore_ascii_case(name))
    }
}
