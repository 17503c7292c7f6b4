//! Placeholder inputs for logical slots with no backing device.
//!
//! Application code addresses inputs by convention ("button 3") and must keep
//! running when the active configuration has fewer inputs. Lookups through
//! [`InputMap::get_from_type_index`] therefore never come back empty for a
//! mappable type: missing slots up to [`MAX_DUMMY_INDEX`] are filled with a
//! dummy of the requested type. Controls are never synthesized.

use std::sync::Arc;

use tracing::warn;

use crate::descriptor::InputDescription;
use crate::generic::{ContainerOptions, GenericInput, InputObject};
use crate::map::InputMap;
use crate::types::InputType;

pub const DUMMY_OBJECT_NAME: &str = "unassigned input";
pub const DUMMY_DEVICE_NAME: &str = "Dummy Input Device";
const DUMMY_ORIGIN: &str = "on the fly in add_dummy_to_input_map";

/// Highest slot index a dummy may be synthesized at.
pub const MAX_DUMMY_INDEX: usize = 4095;

fn dummy_input(input_type: InputType, n: usize) -> Option<Arc<GenericInput>> {
    let args = format!("dummy[{n}]");
    let object = InputObject::new(
        DUMMY_OBJECT_NAME,
        DUMMY_DEVICE_NAME,
        format!("{}({args})", input_type.dummy_desc_name()),
    )
    .with_description(InputDescription { input_type, args })
    .with_origin(DUMMY_ORIGIN);

    let opts = ContainerOptions {
        dummy: true,
        ..ContainerOptions::default()
    };
    GenericInput::new(input_type, Arc::new(object), opts).ok()
}

impl InputMap {
    /// Returns slot `n` of `input_type`, synthesizing a dummy when the slot
    /// is missing or empty.
    ///
    /// Only [`InputType::MAPPED`] types can be looked up; the rest yield
    /// `None`, as do missing controls and indices past [`MAX_DUMMY_INDEX`].
    /// A second request for the same slot returns the same dummy.
    pub fn get_from_type_index(&self, input_type: InputType, n: usize) -> Option<Arc<GenericInput>> {
        let Some(array) = self.array(input_type) else {
            warn!("{input_type} inputs are not implemented");
            return None;
        };

        {
            let slots = array.read();
            match slots.get(n) {
                Some(Some(input)) => return Some(Arc::clone(input)),
                Some(None) => {}
                None if slots.is_empty() => warn!(
                    "Invalid {input_type} requested ({n}) -- none available"
                ),
                None => warn!(
                    "Invalid {input_type} requested ({n}) -- valid range is [0..{}]",
                    slots.len() - 1
                ),
            }
        }

        self.add_dummy_to_input_map(input_type, n)
    }

    /// Fills slot `n` of `input_type` with a dummy, growing the array to
    /// `n + 1` slots if needed. An already filled slot is returned untouched.
    ///
    /// Growth and the fill happen under the array's write lock, so racing
    /// callers agree on one dummy.
    pub fn add_dummy_to_input_map(&self, input_type: InputType, n: usize) -> Option<Arc<GenericInput>> {
        let array = self.array(input_type)?;
        let mut slots = array.write();
        if let Some(Some(existing)) = slots.get(n) {
            return Some(Arc::clone(existing));
        }
        if !input_type.has_dummy() {
            warn!("{input_type} inputs cannot be synthesized");
            return None;
        }
        if n > MAX_DUMMY_INDEX {
            warn!("no dummy {input_type} past index {MAX_DUMMY_INDEX} ({n} requested)");
            return None;
        }
        if slots.len() <= n {
            slots.resize(n + 1, None);
        }

        let dummy = dummy_input(input_type, n)?;
        dummy.object().add_map_ref();
        slots[n] = Some(Arc::clone(&dummy));
        Some(dummy)
    }
}
