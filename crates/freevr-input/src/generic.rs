//! The lockable input cell shared by pollers, the simulation process and
//! renderers.
//!
//! Every [`GenericInput`] carries two locks. The live lock guards the value
//! the poller writes and the consuming reader stamps; the frozen lock guards
//! the per-frame snapshot renderers read. Renderers never touch the live lock.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use freevr_common::helpers::truncate_chars;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::warn;

use crate::descriptor::InputDescription;
use crate::math::Matrix;
use crate::types::{InputType, DEFAULT_HISTORY_LEN, INPUT_UIDESC_LEN, MAX_NSENSOR_VALUES, SENSOR6_DOF};
use crate::{InputError, InputResult};

/// Callback invoked when a control input fires.
pub type ControlCallback = Arc<dyn Fn(i32) + Send + Sync>;

/// Bounded circular buffer of recent samples.
#[derive(Debug, Clone, PartialEq)]
pub struct History<T> {
    measures: Vec<T>,
    current: usize,
}

impl<T: Copy + Default> History<T> {
    pub fn new(len: usize) -> Self {
        Self {
            measures: vec![T::default(); len],
            current: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.measures.len()
    }

    pub fn is_enabled(&self) -> bool {
        !self.measures.is_empty()
    }

    pub fn record(&mut self, value: T) {
        if self.measures.is_empty() {
            return;
        }
        self.current = (self.current + 1) % self.measures.len();
        self.measures[self.current] = value;
    }

    pub fn latest(&self) -> Option<T> {
        self.measures.get(self.current).copied()
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let split = if self.measures.is_empty() {
            0
        } else {
            (self.current + 1) % self.measures.len()
        };
        self.measures[split..]
            .iter()
            .chain(self.measures[..split].iter())
            .copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchState {
    pub value: i32,
    pub last_value: i32,
    pub history: History<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValuatorState {
    pub value: f32,
    pub last_value: f32,
    pub history: History<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sensor6State {
    pub dof: usize,
    pub active: i32,
    pub oob: i32,
    pub error: i32,
    pub raw_data: Matrix,
    pub position: Matrix,
    pub last_position: Matrix,
    pub t2rw_xform: Matrix,
    pub r2e_xform: Matrix,
}

impl Sensor6State {
    fn new(t2rw: Matrix) -> Self {
        Self {
            dof: SENSOR6_DOF,
            active: 0,
            oob: 0,
            error: 0,
            raw_data: Matrix::IDENTITY,
            position: t2rw,
            last_position: t2rw,
            t2rw_xform: t2rw,
            r2e_xform: Matrix::IDENTITY,
        }
    }

    /// `position = t2rw * raw * r2e`: tracker calibration first, then the
    /// receiver-to-entity offset in the calibrated frame.
    pub(crate) fn recompute(&mut self) {
        let mut position = self.raw_data;
        position.pre_mult(&self.t2rw_xform);
        position.post_mult(&self.r2e_xform);
        self.position = position;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorNState {
    pub dof: usize,
    pub values: Vec<f32>,
    pub last_values: Vec<f32>,
}

#[derive(Clone)]
pub struct ControlState {
    /// -1 when a callback was requested but none exists, 0 when unassigned.
    pub callback_assigned: i32,
    pub callback: ControlCallback,
}

impl std::fmt::Debug for ControlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlState")
            .field("callback_assigned", &self.callback_assigned)
            .finish_non_exhaustive()
    }
}

/// The live value of an input, one variant per input type.
#[derive(Debug, Clone)]
pub enum InputValue {
    Switch2(SwitchState),
    SwitchN(SwitchState),
    Valuator(ValuatorState),
    Sensor6(Sensor6State),
    SensorN(SensorNState),
    Control(ControlState),
}

impl InputValue {
    pub fn input_type(&self) -> InputType {
        match self {
            InputValue::Switch2(_) => InputType::Switch2,
            InputValue::SwitchN(_) => InputType::SwitchN,
            InputValue::Valuator(_) => InputType::Valuator,
            InputValue::Sensor6(_) => InputType::Sensor6,
            InputValue::SensorN(_) => InputType::SensorN,
            InputValue::Control(_) => InputType::Control,
        }
    }
}

/// The renderer-visible snapshot taken at the last freeze.
#[derive(Debug, Clone, PartialEq)]
pub enum FrozenValue {
    Switch(i32),
    Valuator(f32),
    Sensor6(Matrix),
    SensorN(Vec<f32>),
    None,
}

#[derive(Debug)]
pub(crate) struct LiveState {
    pub(crate) timestamp: Option<Instant>,
    pub(crate) value: InputValue,
}

/// Config-level owner of exactly one [`GenericInput`].
#[derive(Debug)]
pub struct InputObject {
    pub name: String,
    pub device: String,
    /// Description as written in configuration, e.g. `2switch(wand:button[1])`.
    pub desc_str: String,
    pub desc: Option<InputDescription>,
    /// Where the object came from: a config file or a synthesis site.
    pub file_created: String,
    /// Calibration snapshot copied into a 6-sensor's `r2e` on request.
    pub calibration: Option<Matrix>,
    desc_ui: RwLock<String>,
    map_refcount: AtomicUsize,
}

impl InputObject {
    pub fn new(name: impl Into<String>, device: impl Into<String>, desc_str: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: device.into(),
            desc_str: desc_str.into(),
            desc: None,
            file_created: String::new(),
            calibration: None,
            desc_ui: RwLock::new(String::new()),
            map_refcount: AtomicUsize::new(0),
        }
    }

    pub fn with_description(mut self, desc: InputDescription) -> Self {
        self.desc = Some(desc);
        self
    }

    pub fn with_origin(mut self, file_created: impl Into<String>) -> Self {
        self.file_created = file_created.into();
        self
    }

    pub fn with_calibration(mut self, calibration: Option<Matrix>) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn desc_ui(&self) -> String {
        self.desc_ui.read().clone()
    }

    pub fn set_desc_ui(&self, ui: &str) {
        *self.desc_ui.write() = truncate_chars(ui, INPUT_UIDESC_LEN).to_string();
    }

    pub fn map_refcount(&self) -> usize {
        self.map_refcount.load(Ordering::Acquire)
    }

    pub(crate) fn add_map_ref(&self) {
        self.map_refcount.fetch_add(1, Ordering::AcqRel);
    }
}

/// Creation parameters for a container.
#[derive(Debug, Clone, Copy)]
pub struct ContainerOptions {
    pub history_len: usize,
    pub t2rw: Matrix,
    pub dummy: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            history_len: DEFAULT_HISTORY_LEN,
            t2rw: Matrix::IDENTITY,
            dummy: false,
        }
    }
}

/// One lockable input cell.
#[derive(Debug)]
pub struct GenericInput {
    input_type: InputType,
    object: Arc<InputObject>,
    dummy: bool,
    queue_me: AtomicBool,
    checksum: AtomicI32,
    consumer_claimed: AtomicBool,
    pub(crate) live: RwLock<LiveState>,
    pub(crate) frozen: RwLock<FrozenValue>,
}

impl GenericInput {
    /// Creates a container of `input_type` owned by `object`.
    ///
    /// Keystroke, text, position and plane inputs have no storage and are
    /// rejected with [`InputError::Unimplemented`].
    pub fn new(
        input_type: InputType,
        object: Arc<InputObject>,
        opts: ContainerOptions,
    ) -> InputResult<Arc<Self>> {
        let value = match input_type {
            InputType::Switch2 => InputValue::Switch2(SwitchState {
                value: 0,
                last_value: 0,
                history: History::new(opts.history_len),
            }),
            InputType::SwitchN => InputValue::SwitchN(SwitchState {
                value: 0,
                last_value: 0,
                history: History::new(opts.history_len),
            }),
            InputType::Valuator => InputValue::Valuator(ValuatorState {
                value: 0.0,
                last_value: 0.0,
                history: History::new(opts.history_len),
            }),
            InputType::Sensor6 => InputValue::Sensor6(Sensor6State::new(opts.t2rw)),
            InputType::SensorN => InputValue::SensorN(SensorNState {
                dof: MAX_NSENSOR_VALUES,
                values: vec![0.0; MAX_NSENSOR_VALUES],
                last_values: vec![0.0; MAX_NSENSOR_VALUES],
            }),
            InputType::Control => InputValue::Control(ControlState {
                callback_assigned: 0,
                callback: Arc::new(|_| {}),
            }),
            other => return Err(InputError::Unimplemented(other)),
        };

        let frozen = frozen_from(&value);
        let input = Arc::new(Self {
            input_type,
            object,
            dummy: opts.dummy,
            queue_me: AtomicBool::new(false),
            checksum: AtomicI32::new(0),
            consumer_claimed: AtomicBool::new(false),
            live: RwLock::new(LiveState {
                timestamp: None,
                value,
            }),
            frozen: RwLock::new(frozen),
        });
        input.checksum.store(input.compute_checksum(), Ordering::Release);
        Ok(input)
    }

    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    pub fn object(&self) -> &Arc<InputObject> {
        &self.object
    }

    pub fn device_name(&self) -> &str {
        &self.object.device
    }

    pub fn is_dummy(&self) -> bool {
        self.dummy
    }

    pub fn queue_me(&self) -> bool {
        self.queue_me.load(Ordering::Relaxed)
    }

    pub fn set_queue_me(&self, queue: bool) {
        self.queue_me.store(queue, Ordering::Relaxed);
    }

    pub fn timestamp(&self) -> Option<Instant> {
        self.live.read().timestamp
    }

    /// Checksum recorded at creation.
    pub fn creation_checksum(&self) -> i32 {
        self.checksum.load(Ordering::Acquire)
    }

    /// Hash of the type tag and the current live value.
    pub fn checksum(&self) -> i32 {
        self.compute_checksum()
    }

    fn compute_checksum(&self) -> i32 {
        let mut hasher = DefaultHasher::new();
        self.input_type.hash(&mut hasher);
        let live = self.live.read();
        match &live.value {
            InputValue::Switch2(s) | InputValue::SwitchN(s) => s.value.hash(&mut hasher),
            InputValue::Valuator(v) => v.value.to_bits().hash(&mut hasher),
            InputValue::Sensor6(s) => {
                for value in s.position.0.to_cols_array() {
                    value.to_bits().hash(&mut hasher);
                }
                (s.active, s.oob, s.error).hash(&mut hasher);
            }
            InputValue::SensorN(n) => {
                for value in &n.values[..n.dof] {
                    value.to_bits().hash(&mut hasher);
                }
            }
            InputValue::Control(c) => c.callback_assigned.hash(&mut hasher),
        }
        hasher.finish() as i32
    }

    /// Copy of the live value. Takes the live read lock.
    pub fn snapshot(&self) -> InputValue {
        self.live.read().value.clone()
    }

    pub(crate) fn mismatch(&self, op: &str, expected: InputType) -> InputError {
        warn!(
            "{}: attempt to use a {} operation on '{}', a {} input",
            op,
            expected,
            self.object.name,
            self.input_type
        );
        InputError::TypeMismatch {
            expected,
            found: self.input_type,
        }
    }

    /// Assigns a binary switch value; any non-zero value is stored as 1.
    pub fn assign_switch2(&self, value: i32) -> InputResult<()> {
        let value = i32::from(value != 0);
        let mut live = self.live.write();
        let LiveState { timestamp, value: state } = &mut *live;
        match state {
            InputValue::Switch2(s) => {
                if s.value != value {
                    s.value = value;
                    *timestamp = Some(Instant::now());
                }
                s.history.record(value);
                Ok(())
            }
            _ => Err(self.mismatch("assign_switch2", InputType::Switch2)),
        }
    }

    pub fn assign_switchn(&self, value: i32) -> InputResult<()> {
        let mut live = self.live.write();
        let LiveState { timestamp, value: state } = &mut *live;
        match state {
            InputValue::SwitchN(s) => {
                if s.value != value {
                    s.value = value;
                    *timestamp = Some(Instant::now());
                }
                s.history.record(value);
                Ok(())
            }
            _ => Err(self.mismatch("assign_switchn", InputType::SwitchN)),
        }
    }

    pub fn assign_valuator(&self, value: f32) -> InputResult<()> {
        if !value.is_finite() {
            return Err(InputError::InvalidValue(format!(
                "valuator '{}' assigned non-finite value {}",
                self.object.name, value
            )));
        }
        let mut live = self.live.write();
        let LiveState { timestamp, value: state } = &mut *live;
        match state {
            InputValue::Valuator(v) => {
                if v.value != value {
                    v.value = value;
                    *timestamp = Some(Instant::now());
                }
                v.history.record(value);
                Ok(())
            }
            _ => Err(self.mismatch("assign_valuator", InputType::Valuator)),
        }
    }

    /// Copies the leading `dof` values of `values` into the N-sensor.
    pub fn assign_nsensor(&self, values: &[f32]) -> InputResult<()> {
        let mut live = self.live.write();
        let LiveState { timestamp, value: state } = &mut *live;
        match state {
            InputValue::SensorN(n) => {
                if values.len() < n.dof {
                    return Err(InputError::InvalidValue(format!(
                        "N-sensor '{}' needs {} values, got {}",
                        self.object.name,
                        n.dof,
                        values.len()
                    )));
                }
                n.values[..n.dof].copy_from_slice(&values[..n.dof]);
                *timestamp = Some(Instant::now());
                Ok(())
            }
            _ => Err(self.mismatch("assign_nsensor", InputType::SensorN)),
        }
    }

    /// Narrows the number of values an N-sensor reports.
    pub fn set_nsensor_dof(&self, dof: usize) -> InputResult<()> {
        if dof > MAX_NSENSOR_VALUES {
            return Err(InputError::OutOfRange {
                what: "N-sensor dof",
                index: dof,
                limit: MAX_NSENSOR_VALUES,
            });
        }
        let mut live = self.live.write();
        match &mut live.value {
            InputValue::SensorN(n) => {
                n.dof = dof;
                Ok(())
            }
            _ => Err(self.mismatch("set_nsensor_dof", InputType::SensorN)),
        }
    }

    pub fn assign_control_callback(&self, callback: Option<ControlCallback>) -> InputResult<()> {
        let mut live = self.live.write();
        match &mut live.value {
            InputValue::Control(c) => {
                match callback {
                    Some(callback) => {
                        c.callback = callback;
                        c.callback_assigned = 1;
                    }
                    None => c.callback_assigned = -1,
                }
                Ok(())
            }
            _ => Err(self.mismatch("assign_control_callback", InputType::Control)),
        }
    }

    /// Runs a control's callback with `value`. The live lock is released
    /// before the callback runs.
    pub fn invoke_control(&self, value: i32) -> InputResult<()> {
        let callback = {
            let live = self.live.read();
            match &live.value {
                InputValue::Control(c) => c.callback.clone(),
                _ => return Err(self.mismatch("invoke_control", InputType::Control)),
            }
        };
        callback(value);
        Ok(())
    }

    pub fn control_assigned(&self) -> i32 {
        match &self.live.read().value {
            InputValue::Control(c) => c.callback_assigned,
            _ => 0,
        }
    }

    /// Current switch value without marking it seen. Works for both switch kinds.
    pub fn switch_value_no_last_update(&self) -> i32 {
        match &self.live.read().value {
            InputValue::Switch2(s) | InputValue::SwitchN(s) => s.value,
            _ => {
                let _ = self.mismatch("switch_value_no_last_update", InputType::Switch2);
                0
            }
        }
    }

    pub fn valuator_value_no_last_update(&self) -> f32 {
        match &self.live.read().value {
            InputValue::Valuator(v) => v.value,
            _ => {
                let _ = self.mismatch("valuator_value_no_last_update", InputType::Valuator);
                0.0
            }
        }
    }

    /// `datum` beyond the sensor's arity reads as 0.0.
    pub fn nsensor_value_no_last_update(&self, datum: usize) -> f32 {
        match &self.live.read().value {
            InputValue::SensorN(n) => n.values[..n.dof].get(datum).copied().unwrap_or(0.0),
            _ => {
                let _ = self.mismatch("nsensor_value_no_last_update", InputType::SensorN);
                0.0
            }
        }
    }

    pub fn nsensor_array_no_last_update(&self) -> Vec<f32> {
        match &self.live.read().value {
            InputValue::SensorN(n) => n.values[..n.dof].to_vec(),
            _ => {
                let _ = self.mismatch("nsensor_array_no_last_update", InputType::SensorN);
                Vec::new()
            }
        }
    }

    /// Claims the single edge-consuming reader for this input.
    ///
    /// Returns `None` while another [`Consumer`] is alive.
    pub fn claim_consumer(self: &Arc<Self>) -> Option<Consumer> {
        self.consumer_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Consumer {
                input: Arc::clone(self),
            })
    }

    pub fn has_consumer(&self) -> bool {
        self.consumer_claimed.load(Ordering::Acquire)
    }

    /// Copies the live value into the frozen snapshot.
    ///
    /// The live value is only read-locked, so the poller may be blocked for
    /// the length of one copy but the consuming reader is not excluded.
    pub fn freeze(&self) {
        let live = self.live.read();
        let mut frozen = self.frozen.write();
        *frozen = frozen_from(&live.value);
    }

    pub fn frozen(&self) -> FrozenValue {
        self.frozen.read().clone()
    }

    pub fn visren_switch(&self) -> i32 {
        match &*self.frozen.read() {
            FrozenValue::Switch(v) => *v,
            _ => 0,
        }
    }

    pub fn visren_valuator(&self) -> f32 {
        match &*self.frozen.read() {
            FrozenValue::Valuator(v) => *v,
            _ => 0.0,
        }
    }

    pub fn visren_sensor6(&self) -> Matrix {
        match &*self.frozen.read() {
            FrozenValue::Sensor6(m) => *m,
            _ => Matrix::IDENTITY,
        }
    }

    pub fn visren_nsensor(&self) -> Vec<f32> {
        match &*self.frozen.read() {
            FrozenValue::SensorN(values) => values.clone(),
            _ => Vec::new(),
        }
    }
}

fn frozen_from(value: &InputValue) -> FrozenValue {
    match value {
        InputValue::Switch2(s) | InputValue::SwitchN(s) => FrozenValue::Switch(s.value),
        InputValue::Valuator(v) => FrozenValue::Valuator(v.value),
        InputValue::Sensor6(s) => FrozenValue::Sensor6(s.position),
        InputValue::SensorN(n) => FrozenValue::SensorN(n.values[..n.dof].to_vec()),
        InputValue::Control(_) => FrozenValue::None,
    }
}

/// The one reader allowed to advance an input's `last_value`.
///
/// Obtained through [`GenericInput::claim_consumer`]; dropping it releases
/// the claim. Every read here takes an upgradable read lock, copies the
/// value and upgrades in place to stamp the last-seen state.
#[derive(Debug)]
pub struct Consumer {
    input: Arc<GenericInput>,
}

impl Consumer {
    pub fn input(&self) -> &Arc<GenericInput> {
        &self.input
    }

    /// Current switch value, marked as seen.
    pub fn switch_value(&self) -> i32 {
        let guard = self.input.live.upgradable_read();
        let value = match &guard.value {
            InputValue::Switch2(s) | InputValue::SwitchN(s) => s.value,
            _ => {
                let _ = self.input.mismatch("switch_value", InputType::Switch2);
                return 0;
            }
        };
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        if let InputValue::Switch2(s) | InputValue::SwitchN(s) = &mut guard.value {
            s.last_value = value;
        }
        value
    }

    /// `value - last_value`, then marks the value as seen.
    pub fn switch_delta(&self) -> i32 {
        let guard = self.input.live.upgradable_read();
        let (value, delta) = match &guard.value {
            InputValue::Switch2(s) | InputValue::SwitchN(s) => (s.value, s.value - s.last_value),
            _ => {
                let _ = self.input.mismatch("switch_delta", InputType::Switch2);
                return 0;
            }
        };
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        if let InputValue::Switch2(s) | InputValue::SwitchN(s) = &mut guard.value {
            s.last_value = value;
        }
        delta
    }

    pub fn valuator_value(&self) -> f32 {
        let guard = self.input.live.upgradable_read();
        let value = match &guard.value {
            InputValue::Valuator(v) => v.value,
            _ => {
                let _ = self.input.mismatch("valuator_value", InputType::Valuator);
                return 0.0;
            }
        };
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        if let InputValue::Valuator(v) = &mut guard.value {
            v.last_value = value;
        }
        value
    }

    pub fn valuator_delta(&self) -> f32 {
        let guard = self.input.live.upgradable_read();
        let (value, delta) = match &guard.value {
            InputValue::Valuator(v) => (v.value, v.value - v.last_value),
            _ => {
                let _ = self.input.mismatch("valuator_delta", InputType::Valuator);
                return 0.0;
            }
        };
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        if let InputValue::Valuator(v) = &mut guard.value {
            v.last_value = value;
        }
        delta
    }

    /// Calibrated pose, stamped into `last_position`.
    pub fn sensor6_matrix(&self) -> Matrix {
        let guard = self.input.live.upgradable_read();
        let position = match &guard.value {
            InputValue::Sensor6(s) => s.position,
            _ => {
                let _ = self.input.mismatch("sensor6_matrix", InputType::Sensor6);
                return Matrix::IDENTITY;
            }
        };
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        if let InputValue::Sensor6(s) = &mut guard.value {
            s.last_position = position;
        }
        position
    }

    /// Pose at the previous consuming read.
    pub fn sensor6_last_matrix(&self) -> Matrix {
        match &self.input.live.read().value {
            InputValue::Sensor6(s) => s.last_position,
            _ => Matrix::IDENTITY,
        }
    }

    /// One datum, stamped into `last_values`. Out of range reads as 0.0.
    pub fn nsensor_value(&self, datum: usize) -> f32 {
        let guard = self.input.live.upgradable_read();
        let value = match &guard.value {
            InputValue::SensorN(n) if datum < n.dof => n.values[datum],
            InputValue::SensorN(n) => {
                warn!(
                    "nsensor_value: datum {} out of range for '{}' (dof {})",
                    datum, self.input.object.name, n.dof
                );
                return 0.0;
            }
            _ => {
                let _ = self.input.mismatch("nsensor_value", InputType::SensorN);
                return 0.0;
            }
        };
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        if let InputValue::SensorN(n) = &mut guard.value {
            n.last_values[datum] = value;
        }
        value
    }

    pub fn nsensor_array(&self) -> Vec<f32> {
        let guard = self.input.live.upgradable_read();
        let values = match &guard.value {
            InputValue::SensorN(n) => n.values[..n.dof].to_vec(),
            _ => {
                let _ = self.input.mismatch("nsensor_array", InputType::SensorN);
                return Vec::new();
            }
        };
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        if let InputValue::SensorN(n) = &mut guard.value {
            n.last_values[..values.len()].copy_from_slice(&values);
        }
        values
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.input.consumer_claimed.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(input_type: InputType) -> Arc<GenericInput> {
        let object = Arc::new(InputObject::new("test", "unit", "test"));
        GenericInput::new(input_type, object, ContainerOptions::default()).unwrap()
    }

    #[test]
    fn history_wraps_and_iterates_oldest_first() {
        let mut history = History::<i32>::new(3);
        for v in 1..=4 {
            history.record(v);
        }
        assert_eq!(history.latest(), Some(4));
        assert_eq!(history.iter().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn disabled_history_records_nothing() {
        let mut history = History::<f32>::new(0);
        history.record(1.0);
        assert!(!history.is_enabled());
        assert_eq!(history.latest(), None);
        assert_eq!(history.iter().count(), 0);
    }

    #[test]
    fn switch2_forces_binary_values() {
        let input = make(InputType::Switch2);
        input.assign_switch2(7).unwrap();
        assert_eq!(input.switch_value_no_last_update(), 1);
        input.assign_switch2(0).unwrap();
        assert_eq!(input.switch_value_no_last_update(), 0);
    }

    #[test]
    fn assignment_records_history_even_when_unchanged() {
        let input = make(InputType::Switch2);
        input.assign_switch2(1).unwrap();
        input.assign_switch2(1).unwrap();
        match input.snapshot() {
            InputValue::Switch2(s) => {
                let recorded: Vec<i32> = s.history.iter().collect();
                assert_eq!(&recorded[recorded.len() - 2..], &[1, 1]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn assignment_leaves_last_value_alone() {
        let input = make(InputType::Valuator);
        input.assign_valuator(0.25).unwrap();
        match input.snapshot() {
            InputValue::Valuator(v) => {
                assert_eq!(v.value, 0.25);
                assert_eq!(v.last_value, 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn type_mismatch_is_reported_and_not_written() {
        let input = make(InputType::Valuator);
        let err = input.assign_switch2(1).unwrap_err();
        assert!(matches!(
            err,
            InputError::TypeMismatch {
                expected: InputType::Switch2,
                found: InputType::Valuator
            }
        ));
        assert_eq!(input.valuator_value_no_last_update(), 0.0);
    }

    #[test]
    fn no_last_update_reads_are_idempotent() {
        let input = make(InputType::Valuator);
        input.assign_valuator(3.5).unwrap();
        for _ in 0..3 {
            assert_eq!(input.valuator_value_no_last_update(), 3.5);
        }
        let consumer = input.claim_consumer().unwrap();
        assert_eq!(consumer.valuator_delta(), 3.5);
    }

    #[test]
    fn delta_is_an_edge_not_a_level() {
        let input = make(InputType::SwitchN);
        let consumer = input.claim_consumer().unwrap();
        input.assign_switchn(4).unwrap();
        assert_eq!(consumer.switch_delta(), 4);
        assert_eq!(consumer.switch_delta(), 0);
        input.assign_switchn(1).unwrap();
        assert_eq!(consumer.switch_delta(), -3);
        assert_eq!(consumer.switch_value(), 1);
        assert_eq!(consumer.switch_delta(), 0);
    }

    #[test]
    fn only_one_consumer_at_a_time() {
        let input = make(InputType::Switch2);
        let first = input.claim_consumer().unwrap();
        assert!(input.has_consumer());
        assert!(input.claim_consumer().is_none());
        drop(first);
        assert!(!input.has_consumer());
        assert!(input.claim_consumer().is_some());
    }

    #[test]
    fn nsensor_requires_full_arity() {
        let input = make(InputType::SensorN);
        input.set_nsensor_dof(3).unwrap();
        assert!(input.assign_nsensor(&[1.0, 2.0]).is_err());
        input.assign_nsensor(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(input.nsensor_array_no_last_update(), vec![1.0, 2.0, 3.0]);
        assert_eq!(input.nsensor_value_no_last_update(5), 0.0);

        let consumer = input.claim_consumer().unwrap();
        assert_eq!(consumer.nsensor_value(1), 2.0);
        assert_eq!(consumer.nsensor_value(3), 0.0);
        assert_eq!(consumer.nsensor_array(), vec![1.0, 2.0, 3.0]);
        assert!(input.set_nsensor_dof(MAX_NSENSOR_VALUES + 1).is_err());
    }

    #[test]
    fn non_finite_valuator_is_rejected() {
        let input = make(InputType::Valuator);
        assert!(matches!(
            input.assign_valuator(f32::NAN),
            Err(InputError::InvalidValue(_))
        ));
    }

    #[test]
    fn control_callback_runs_outside_the_lock() {
        let input = make(InputType::Control);
        assert_eq!(input.control_assigned(), 0);
        let seen = Arc::new(AtomicI32::new(0));
        let seen_cb = Arc::clone(&seen);
        let reentrant = Arc::clone(&input);
        input
            .assign_control_callback(Some(Arc::new(move |value| {
                // the callback may inspect its own input
                let _ = reentrant.control_assigned();
                seen_cb.store(value, Ordering::SeqCst);
            })))
            .unwrap();
        assert_eq!(input.control_assigned(), 1);
        input.invoke_control(9).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 9);

        input.assign_control_callback(None).unwrap();
        assert_eq!(input.control_assigned(), -1);
    }

    #[test]
    fn unimplemented_types_have_no_container() {
        let object = Arc::new(InputObject::new("k", "unit", "keystroke"));
        let err = GenericInput::new(InputType::Keystroke, object, ContainerOptions::default())
            .unwrap_err();
        assert!(matches!(err, InputError::Unimplemented(InputType::Keystroke)));
    }

    #[test]
    fn checksum_tracks_value_changes() {
        let input = make(InputType::Valuator);
        let before = input.checksum();
        assert_eq!(before, input.creation_checksum());
        input.assign_valuator(1.0).unwrap();
        assert_ne!(input.checksum(), before);
    }

    #[test]
    fn desc_ui_is_bounded() {
        let object = InputObject::new("x", "unit", "x");
        object.set_desc_ui(&"a".repeat(INPUT_UIDESC_LEN + 10));
        assert_eq!(object.desc_ui().len(), INPUT_UIDESC_LEN);
    }
}
