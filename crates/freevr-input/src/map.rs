//! The flat, index-addressable view of every device's inputs.
//!
//! Each mappable [`InputType`] gets its own array of slots. Slots hold
//! `Arc<GenericInput>`, so growing an array never invalidates a handle a
//! caller already holds.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::descriptor::parse_mapname;
use crate::device::InputDevice;
use crate::generic::GenericInput;
use crate::types::InputType;

pub(crate) type Slots = Vec<Option<Arc<GenericInput>>>;

/// Logical input arrays shared by every consumer of a context.
///
/// # Example
/// ```rust
/// use freevr_input::{InputMap, InputType};
///
/// let map = InputMap::new();
/// // No devices: any lookup falls back to a placeholder.
/// let button = map.get_from_type_index(InputType::Switch2, 3).unwrap();
/// assert!(button.is_dummy());
/// assert_eq!(map.count(InputType::Switch2), 4);
/// ```
#[derive(Debug, Default)]
pub struct InputMap {
    name: RwLock<Option<String>>,
    pub(crate) arrays: [RwLock<Slots>; InputType::MAPPED.len()],
}

impl InputMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the map mode that built this map, if one ran.
    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    pub(crate) fn array(&self, input_type: InputType) -> Option<&RwLock<Slots>> {
        input_type.map_slot().map(|slot| &self.arrays[slot])
    }

    /// Number of slots of `input_type`, including empty and dummy ones.
    pub fn count(&self, input_type: InputType) -> usize {
        self.array(input_type).map_or(0, |a| a.read().len())
    }

    /// The input at slot `n`, without any fallback.
    pub fn get(&self, input_type: InputType, n: usize) -> Option<Arc<GenericInput>> {
        self.array(input_type)?.read().get(n).cloned().flatten()
    }

    /// Copy of every slot of `input_type`.
    pub fn slots(&self, input_type: InputType) -> Vec<Option<Arc<GenericInput>>> {
        self.array(input_type).map_or_else(Vec::new, |a| a.read().clone())
    }

    /// Every populated slot across all types, in type then index order.
    pub fn inputs(&self) -> Vec<Arc<GenericInput>> {
        self.arrays
            .iter()
            .flat_map(|a| a.read().iter().flatten().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Resolves an address such as `valuator[1]`.
    ///
    /// Unlike [`InputMap::get_from_type_index`], an index outside the
    /// configured range is simply not found.
    pub fn get_from_mapname(&self, mapname: &str) -> Option<Arc<GenericInput>> {
        let address = match parse_mapname(mapname) {
            Ok(address) => address,
            Err(err) => {
                warn!("{err}");
                return None;
            }
        };
        let index = usize::try_from(address.index).ok()?;
        self.get(address.input_type, index)
    }

    /// Builds the map from `devices` in declaration order.
    ///
    /// Only the `default` mode is supported: every device's inputs are
    /// appended type by type, device order first, then the order within each
    /// device. Once a map is built, later calls leave it alone.
    pub fn build(&self, devices: &[InputDevice], mapname: &str) {
        if !mapname.eq_ignore_ascii_case("default") {
            warn!("input map '{mapname}' is not a known mapping, map left empty");
            return;
        }
        if devices.is_empty() {
            warn!("no input devices have been defined!");
            return;
        }
        let mut name = self.name.write();
        if let Some(built) = name.as_deref() {
            warn!("input map '{built}' already built, not rebuilding");
            return;
        }

        for (slot, input_type) in InputType::MAPPED.iter().enumerate() {
            let total: usize = devices.iter().map(|d| d.inputs().of(*input_type).len()).sum();
            let mut array = self.arrays[slot].write();
            array.reserve(total);
            for device in devices {
                for input in device.inputs().of(*input_type) {
                    input.object().add_map_ref();
                    array.push(Some(Arc::clone(input)));
                }
            }
            debug!("mapped {} {} inputs", array.len(), input_type);
        }
        *name = Some(mapname.to_string());
    }
}

#[cfg(test)]
mod tests {
    use freevr_common::{DeviceConfig, InputDecl};

    use super::*;
    use crate::device::DriverRegistry;

    fn decl(name: &str, desc: &str) -> InputDecl {
        InputDecl {
            name: name.to_string(),
            desc: desc.to_string(),
            ..InputDecl::default()
        }
    }

    fn device(name: &str, inputs: Vec<InputDecl>) -> InputDevice {
        let config = DeviceConfig {
            name: name.to_string(),
            driver: "static".to_string(),
            inputs,
            ..DeviceConfig::default()
        };
        let device = InputDevice::from_config(&config, &DriverRegistry::with_builtin(), 0).unwrap();
        device.create(std::sync::Weak::new()).unwrap();
        device
    }

    #[test]
    fn unknown_mode_leaves_map_empty() {
        let map = InputMap::new();
        map.build(&[device("a", vec![decl("b", "2switch(a:constant[1])")])], "legacy");
        assert_eq!(map.count(InputType::Switch2), 0);
        assert_eq!(map.name(), None);
    }

    #[test]
    fn no_devices_builds_nothing() {
        let map = InputMap::new();
        map.build(&[], "default");
        assert_eq!(map.name(), None);
        assert!(map.inputs().is_empty());
    }

    #[test]
    fn mapname_lookup_does_not_synthesize() {
        let map = InputMap::new();
        map.build(
            &[device(
                "a",
                vec![decl("b0", "2switch(:constant[1])"), decl("v0", "valuator(:constant[0.5])")],
            )],
            "DEFAULT",
        );
        assert_eq!(map.name().as_deref(), Some("DEFAULT"));
        let b = map.get_from_mapname("2-way[0]").unwrap();
        assert_eq!(b.object().name, "b0");
        assert_eq!(b.object().map_refcount(), 1);
        assert!(map.get_from_mapname("v[0]").is_some());
        assert!(map.get_from_mapname("v[1]").is_none());
        assert!(map.get_from_mapname("v[-1]").is_none());
        assert!(map.get_from_mapname("joystick[0]").is_none());
        assert_eq!(map.count(InputType::Valuator), 1);
    }

    #[test]
    fn second_build_is_ignored() {
        let map = InputMap::new();
        let devices = [device("a", vec![decl("b0", "2switch(:constant[1])")])];
        map.build(&devices, "default");
        map.build(&devices, "default");
        assert_eq!(map.count(InputType::Switch2), 1);
        let b = map.get(InputType::Switch2, 0).unwrap();
        assert_eq!(b.object().map_refcount(), 1);
    }
}
