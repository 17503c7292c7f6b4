//! Input devices, their drivers and the recognizer tables that bind declared
//! inputs to driver features.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use freevr_common::{DeviceConfig, InputDecl, TransformConfig};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, warn};

use crate::context::InputContext;
use crate::descriptor::{parse_input_description, parse_input_dti, InputDti};
use crate::generic::{ContainerOptions, ControlCallback, GenericInput, InputObject};
use crate::math::{Axis, Euler, Matrix};
use crate::types::{InputMatch, InputType, PrintStyle};
use crate::{InputError, InputResult};

/// Binds one declared input to a driver feature.
pub type RecognizeFn<D> = fn(&mut D, &Arc<GenericInput>, &InputDti) -> InputMatch;

/// One row of a driver's recognizer table.
pub struct Recognizer<D> {
    /// Compared case-insensitively against the declaration's type field.
    pub name: &'static str,
    pub input_type: InputType,
    pub func: RecognizeFn<D>,
}

impl<D> fmt::Debug for Recognizer<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recognizer")
            .field("name", &self.name)
            .field("input_type", &self.input_type)
            .finish()
    }
}

/// What a driver sees when it creates its containers.
#[derive(Debug, Clone)]
pub struct DeviceSetup<'a> {
    pub name: &'a str,
    pub args: &'a str,
    pub decls: &'a [InputDecl],
    pub t2rw: Matrix,
    pub history_len: usize,
    /// Context the device belongs to, for controls that act on it.
    pub context: Weak<InputContext>,
}

/// Per-type arrays of the containers a device owns.
#[derive(Debug, Default)]
pub struct DeviceInputs {
    arrays: [Vec<Arc<GenericInput>>; InputType::MAPPED.len()],
}

impl DeviceInputs {
    pub fn of(&self, input_type: InputType) -> &[Arc<GenericInput>] {
        match input_type.map_slot() {
            Some(slot) => &self.arrays[slot],
            None => &[],
        }
    }

    pub fn count(&self, input_type: InputType) -> usize {
        self.of(input_type).len()
    }

    pub fn total(&self) -> usize {
        self.arrays.iter().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<GenericInput>> {
        self.arrays.iter().flatten()
    }

    fn push(&mut self, input: Arc<GenericInput>) {
        if let Some(slot) = input.input_type().map_slot() {
            self.arrays[slot].push(input);
        }
    }

    fn clear(&mut self) {
        for array in &mut self.arrays {
            array.clear();
        }
    }
}

/// Converts a configured translation plus euler into a transform.
pub fn transform_matrix(config: &TransformConfig) -> Matrix {
    Matrix::from_euler(
        &Euler {
            t: config.translate,
            r: config.rotate,
        },
        Axis::Y,
    )
}

/// A named device control and the callback it runs.
pub type ControlBinding = (&'static str, ControlCallback);

/// Creates a container for every declared input and offers each to `table`.
///
/// Containers land in per-type arrays in declaration order. A declaration is
/// handed to the first recognizers whose type and name match; `NoMatch`
/// moves on to the next row, anything else counts as mapped. Control inputs
/// take their callback from `controls` by input name. Declarations that
/// cannot be parsed are skipped with a warning.
pub fn create_data_containers<D>(
    driver: &mut D,
    table: &[Recognizer<D>],
    controls: &[ControlBinding],
    setup: &DeviceSetup<'_>,
) -> DeviceInputs {
    let mut inputs = DeviceInputs::default();

    for decl in setup.decls {
        let desc = match parse_input_description(&decl.desc) {
            Ok(desc) => desc,
            Err(err) => {
                warn!("device '{}' input '{}': {err}", setup.name, decl.name);
                continue;
            }
        };
        let input_type = desc.input_type;
        let desc_args = desc.args.clone();
        let dti = parse_input_dti(&desc_args);

        let object = InputObject::new(&decl.name, setup.name, &decl.desc)
            .with_description(desc)
            .with_origin(format!("configuration of device '{}'", setup.name))
            .with_calibration(decl.r2e.as_ref().map(transform_matrix));
        if let Some(ui) = &decl.ui {
            object.set_desc_ui(ui);
        }

        let opts = ContainerOptions {
            history_len: setup.history_len,
            t2rw: setup.t2rw,
            dummy: false,
        };
        let input = match GenericInput::new(input_type, Arc::new(object), opts) {
            Ok(input) => input,
            Err(err) => {
                warn!("device '{}' input '{}': {err}", setup.name, decl.name);
                continue;
            }
        };

        let mut bound = false;
        if input_type == InputType::Control {
            let callback = controls
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&decl.name))
                .map(|(_, callback)| Arc::clone(callback));
            bound = callback.is_some();
            if !bound {
                warn!(
                    "no callback function ('{}') found for device '{}' input '{}'",
                    decl.name, setup.name, desc_args
                );
            }
            let _ = input.assign_control_callback(callback);
        }

        let recognized = match &dti {
            Ok(dti) => table
                .iter()
                .filter(|r| r.input_type == input_type && r.name.eq_ignore_ascii_case(&dti.kind))
                .any(|r| (r.func)(driver, &input, dti).is_mapped()),
            Err(err) => {
                warn!("device '{}' input '{}': {err}", setup.name, decl.name);
                false
            }
        };

        if !(recognized || bound) {
            warn!("no mapping found for device '{}' input '{}'", setup.name, decl.name);
        }
        inputs.push(input);
    }

    debug!("device '{}' created {} inputs", setup.name, inputs.total());
    inputs
}

/// A device driver. Every capability defaults to a no-op.
pub trait InputDriver: Send {
    fn version(&self) -> String {
        "unversioned input device".to_string()
    }

    /// Builds the device's containers. The default recognizes nothing.
    fn create(&mut self, setup: &DeviceSetup<'_>) -> InputResult<DeviceInputs> {
        Ok(create_data_containers(&mut (), &[], &[], setup))
    }

    fn open(&mut self) -> InputResult<()> {
        Ok(())
    }

    fn poll(&mut self) -> InputResult<()> {
        Ok(())
    }

    fn close(&mut self) -> InputResult<()> {
        Ok(())
    }

    fn reset(&mut self) -> InputResult<()> {
        Ok(())
    }

    /// Driver-specific report lines.
    fn print_aux(&self, _out: &mut dyn fmt::Write, _style: PrintStyle) -> fmt::Result {
        Ok(())
    }
}

pub type DriverFactory = Arc<dyn Fn() -> Box<dyn InputDriver> + Send + Sync>;

/// Driver constructors by name.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: Vec<(String, DriverFactory)>,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the drivers shipped with this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("static", || {
            Box::new(crate::static_device::StaticDriver::default()) as Box<dyn InputDriver>
        });
        registry
    }

    /// Adds or replaces a driver. Names are matched case-insensitively.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn InputDriver> + Send + Sync + 'static,
    {
        self.drivers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.drivers.push((name.to_string(), Arc::new(factory)));
    }

    pub fn instantiate(&self, name: &str) -> Option<Box<dyn InputDriver>> {
        self.drivers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, factory)| factory())
    }

    pub fn names(&self) -> Vec<&str> {
        self.drivers.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// A configured device: its driver, the inputs it owns and its lifecycle
/// state.
pub struct InputDevice {
    name: String,
    driver_name: String,
    args: String,
    t2rw: Matrix,
    decls: Vec<InputDecl>,
    history_len: usize,
    driver: Mutex<Box<dyn InputDriver>>,
    inputs: RwLock<DeviceInputs>,
    created: AtomicBool,
    operating: AtomicBool,
}

impl fmt::Debug for InputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputDevice")
            .field("name", &self.name)
            .field("driver", &self.driver_name)
            .field("args", &self.args)
            .field("inputs", &self.inputs.read().total())
            .field("created", &self.is_created())
            .field("operating", &self.is_operating())
            .finish()
    }
}

impl InputDevice {
    pub fn new(config: &DeviceConfig, driver: Box<dyn InputDriver>, history_len: usize) -> Self {
        Self {
            name: config.name.clone(),
            driver_name: config.driver.clone(),
            args: config.args.clone(),
            t2rw: config.t2rw.as_ref().map_or(Matrix::IDENTITY, transform_matrix),
            decls: config.inputs.clone(),
            history_len,
            driver: Mutex::new(driver),
            inputs: RwLock::new(DeviceInputs::default()),
            created: AtomicBool::new(false),
            operating: AtomicBool::new(false),
        }
    }

    /// Instantiates the device's driver from `registry`.
    pub fn from_config(config: &DeviceConfig, registry: &DriverRegistry, history_len: usize) -> InputResult<Self> {
        let driver = registry.instantiate(&config.driver).ok_or_else(|| {
            InputError::Device(format!(
                "device '{}' uses unknown driver '{}'",
                config.name, config.driver
            ))
        })?;
        Ok(Self::new(config, driver, history_len))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn t2rw(&self) -> Matrix {
        self.t2rw
    }

    pub fn decls(&self) -> &[InputDecl] {
        &self.decls
    }

    pub fn inputs(&self) -> RwLockReadGuard<'_, DeviceInputs> {
        self.inputs.read()
    }

    pub fn is_created(&self) -> bool {
        self.created.load(Ordering::Acquire)
    }

    pub fn is_operating(&self) -> bool {
        self.operating.load(Ordering::Acquire)
    }

    pub fn version(&self) -> String {
        self.driver.lock().version()
    }

    /// Runs the driver's create step once. Later calls are no-ops.
    pub fn create(&self, context: Weak<InputContext>) -> InputResult<()> {
        if self.is_created() {
            return Ok(());
        }
        let setup = DeviceSetup {
            name: &self.name,
            args: &self.args,
            decls: &self.decls,
            t2rw: self.t2rw,
            history_len: self.history_len,
            context,
        };
        let inputs = self.driver.lock().create(&setup)?;
        *self.inputs.write() = inputs;
        self.created.store(true, Ordering::Release);
        debug!("created device '{}' ({})", self.name, self.driver_name);
        Ok(())
    }

    pub fn open(&self) -> InputResult<()> {
        if !self.is_created() {
            return Err(InputError::Device(format!(
                "device '{}' opened before it was created",
                self.name
            )));
        }
        self.driver.lock().open()?;
        self.operating.store(true, Ordering::Release);
        debug!("opened device '{}'", self.name);
        Ok(())
    }

    /// Polls the driver. Devices that are not operating are skipped.
    pub fn poll(&self) -> InputResult<()> {
        if !self.is_operating() {
            return Ok(());
        }
        self.driver.lock().poll()
    }

    pub fn close(&self) -> InputResult<()> {
        self.operating.store(false, Ordering::Release);
        self.driver.lock().close()?;
        debug!("closed device '{}'", self.name);
        Ok(())
    }

    pub fn reset(&self) -> InputResult<()> {
        self.driver.lock().reset()
    }

    pub fn print_aux(&self, out: &mut dyn fmt::Write, style: PrintStyle) -> fmt::Result {
        self.driver.lock().print_aux(out, style)
    }

    /// Drops every container the device owns. Handles already copied into
    /// an input map stay valid.
    pub fn delete_inputs(&self) {
        self.operating.store(false, Ordering::Release);
        self.inputs.write().clear();
        self.created.store(false, Ordering::Release);
        debug!("deleted inputs of device '{}'", self.name);
    }
}
