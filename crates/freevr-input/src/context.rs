//! The explicit input context threaded through every entry point.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use freevr_common::InputConfig;
use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use crate::device::{DriverRegistry, InputDevice};
use crate::generic::GenericInput;
use crate::map::InputMap;
use crate::types::InputType;
use crate::user::User;
use crate::InputResult;

/// Everything the input subsystem of one FreeVR instance owns.
///
/// Devices are fixed at construction; the map and users are filled in once
/// the devices are operating.
#[derive(Debug)]
pub struct InputContext {
    config: InputConfig,
    devices: Vec<InputDevice>,
    map: InputMap,
    pub(crate) users: RwLock<Vec<User>>,
    paused: AtomicBool,
}

impl InputContext {
    /// Instantiates a driver for every configured device. Nothing is created
    /// or opened yet.
    pub fn new(config: InputConfig, registry: &DriverRegistry) -> InputResult<Arc<Self>> {
        let devices = config
            .devices
            .iter()
            .map(|device| InputDevice::from_config(device, registry, config.history_len))
            .collect::<InputResult<Vec<_>>>()?;
        debug!("input context with {} devices", devices.len());
        Ok(Arc::new(Self {
            config,
            devices,
            map: InputMap::new(),
            users: RwLock::new(Vec::new()),
            paused: AtomicBool::new(false),
        }))
    }

    /// Single-process start: create and open every device, then build the
    /// map and the users.
    pub fn bring_up(config: InputConfig, registry: &DriverRegistry) -> InputResult<Arc<Self>> {
        let ctx = Self::new(config, registry)?;
        for device in &ctx.devices {
            device.create(Arc::downgrade(&ctx))?;
        }
        for device in &ctx.devices {
            device.open()?;
        }
        ctx.create_input_map();
        Ok(ctx)
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    pub fn devices(&self) -> &[InputDevice] {
        &self.devices
    }

    pub fn device(&self, name: &str) -> Option<&InputDevice> {
        self.devices.iter().find(|d| d.name().eq_ignore_ascii_case(name))
    }

    pub fn map(&self) -> &InputMap {
        &self.map
    }

    pub fn all_devices_open(&self) -> bool {
        self.devices.iter().all(InputDevice::is_operating)
    }

    /// Builds the input map from the configured map name, then creates the
    /// users on top of it.
    pub fn create_input_map(&self) {
        if let Some(built) = self.map.name() {
            warn!("input map '{built}' already created");
            return;
        }
        self.map.build(&self.devices, &self.config.input_map);
        self.create_users();
        info!(
            "input map '{}' built over {} devices",
            self.config.input_map,
            self.devices.len()
        );
    }

    /// Drops every device's containers.
    pub fn delete_inputs(&self) {
        for device in &self.devices {
            device.delete_inputs();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Flips the pause flag and returns the new state.
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn get_from_type_index(&self, input_type: InputType, n: usize) -> Option<Arc<GenericInput>> {
        self.map.get_from_type_index(input_type, n)
    }

    pub fn get_from_mapname(&self, mapname: &str) -> Option<Arc<GenericInput>> {
        self.map.get_from_mapname(mapname)
    }

    /// Copies every mapped input's live value into its frozen copy.
    pub fn freeze_inputs(&self) {
        let inputs = self.map.inputs();
        for input in &inputs {
            input.freeze();
        }
        trace!("froze {} inputs", inputs.len());
    }

    /// Records what the application does with an input.
    ///
    /// Returns `false` when the slot had no input; a dummy is created to
    /// carry the text.
    pub fn set_description(&self, input_type: InputType, n: usize, ui: &str) -> bool {
        if let Some(input) = self.map.get(input_type, n) {
            input.object().set_desc_ui(ui);
            return true;
        }

        let label = match input_type {
            InputType::Switch2 => "button",
            InputType::SwitchN => "N-switch",
            InputType::Valuator => "Valuator",
            InputType::Sensor6 => "Position Sensor",
            InputType::SensorN => "N-Sensor",
            other => other.name(),
        };
        warn!("No {label} ({n}) available to '{ui}' (Creating a dummy)");
        if let Some(dummy) = self.map.add_dummy_to_input_map(input_type, n) {
            dummy.object().set_desc_ui(ui);
        }
        false
    }

    /// Lists every mapped input with a UI description, section by section.
    pub fn sprint_input_ui(&self) -> String {
        let mut out = String::new();
        for input_type in [
            InputType::Switch2,
            InputType::SwitchN,
            InputType::Valuator,
            InputType::Sensor6,
            InputType::SensorN,
        ] {
            let mut first = true;
            for (idx, slot) in self.map.slots(input_type).iter().enumerate() {
                let Some(input) = slot else { continue };
                let ui = input.object().desc_ui();
                if ui.is_empty() {
                    continue;
                }
                if first {
                    let _ = writeln!(out, "{}", input_type.ui_heading());
                    first = false;
                }
                let _ = writeln!(
                    out,
                    "  {}[{idx}] -- \"{}\" performs: {ui}",
                    input_type.ui_label(),
                    input.object().name
                );
            }
        }
        out
    }

    fn sensor6_flag(&self, n: usize, read: impl Fn(&GenericInput) -> Option<i32>) -> i32 {
        self.map
            .get(InputType::Sensor6, n)
            .and_then(|input| read(&input))
            .unwrap_or(-1)
    }

    /// `-1` when there is no 6-sensor `n`; no dummy is created.
    pub fn sensor6_oob(&self, n: usize) -> i32 {
        self.sensor6_flag(n, GenericInput::sensor6_oob)
    }

    pub fn sensor6_active(&self, n: usize) -> i32 {
        self.sensor6_flag(n, GenericInput::sensor6_active)
    }

    pub fn sensor6_error(&self, n: usize) -> i32 {
        self.sensor6_flag(n, GenericInput::sensor6_error)
    }

    /// `1` for a dummy, `0` for a real input, `-1` for an empty slot.
    pub fn input_dummy(&self, input_type: InputType, n: usize) -> i32 {
        self.map
            .get(input_type, n)
            .map_or(-1, |input| i32::from(input.is_dummy()))
    }
}
