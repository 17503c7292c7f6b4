#![forbid(unsafe_code)]

pub mod context;
pub mod descriptor;
pub mod device;
pub mod dummy;
pub mod generic;
pub mod map;
pub mod math;
pub mod process;
pub mod report;
pub mod sensor;
pub mod static_device;
pub mod sync;
pub mod types;
pub mod user;

pub use context::InputContext;
pub use descriptor::{parse_input_description, parse_input_dti, parse_mapname, InputDescription, InputDti, MapAddress};
pub use device::{DeviceInputs, DriverRegistry, InputDevice, InputDriver, Recognizer};
pub use generic::{Consumer, ContainerOptions, FrozenValue, GenericInput, InputObject, InputValue};
pub use map::InputMap;
pub use math::{Axis, Direction, Euler, Matrix, Point3, Vector3};
pub use process::{InputProcess, ProcessStats};
pub use sensor::{ConvFlags, Sensor6Conv};
pub use sync::{process_sync, SyncArrival, SyncBarrier, ThreadBarrier};
pub use types::{InputMatch, InputType, PrintStyle};
pub use user::{FrozenUser, Travel, User, UserSelect};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: InputType, found: InputType },
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("invalid input descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("invalid map name: {0}")]
    InvalidMapName(String),
    #[error("{what} index {index} out of range (limit {limit})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },
    #[error("invalid user {index} (have {count})")]
    InvalidUser { index: usize, count: usize },
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("device error: {0}")]
    Device(String),
    #[error("{0} inputs are not implemented")]
    Unimplemented(InputType),
}

pub type InputResult<T> = Result<T, InputError>;
