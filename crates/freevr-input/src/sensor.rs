//! 6-sensor transform pipeline.
//!
//! Raw tracker samples become real-world poses as
//! `position = t2rw_xform * raw_data * r2e_xform`. Devices without native
//! 6-DOF hardware synthesize `raw_data` from six valuators through
//! [`GenericInput::assign_sensor6_from_valuators`].

use std::time::Instant;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::warn;

use freevr_common::helpers::{parse_float_prefix, parse_int_prefix, starts_with_ignore_case};

use crate::generic::{GenericInput, InputValue, LiveState, Sensor6State};
use crate::math::{rotation_order, Axis, Matrix, AZIM, ELEV, ROLL, W, X, Y, Z};
use crate::types::InputType;
use crate::{InputError, InputResult};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ConvFlags: u32 {
        /// Translate and rotate in the sensor's own frame instead of the world's.
        const RELATIVE_AXIS = 1 << 0;
        /// Start from identity each call instead of accumulating on the raw pose.
        const RETURN_TO_ZERO = 1 << 1;
        /// Clamp the position into the working volume.
        const RESTRICT_SPACE = 1 << 2;
        const IGNORE_ALL = 1 << 3;
        const IGNORE_TRANS = 1 << 4;
        /// Swap the Y and Z axes (Z-up devices).
        const SWAP_YZ = 1 << 5;
        /// Swap translation and rotation valuators.
        const SWAP_TRANSROT = 1 << 6;
    }
}

/// How six valuators are turned into a 6-sensor pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sensor6Conv {
    pub azimuth_axis: Axis,
    pub flags: ConvFlags,
    /// 0.0 is treated as 1.0.
    pub trans_scale: f32,
    /// Degrees per valuator unit; 0.0 is treated as 1.0.
    pub rot_scale: f32,
    pub working_volume_min: [f32; 3],
    pub working_volume_max: [f32; 3],
}

impl Default for Sensor6Conv {
    fn default() -> Self {
        Self {
            azimuth_axis: Axis::Y,
            flags: ConvFlags::empty(),
            trans_scale: 1.0,
            rot_scale: 1.0,
            working_volume_min: [-5.0, 0.0, -5.0],
            working_volume_max: [5.0, 10.0, 5.0],
        }
    }
}

impl Sensor6Conv {
    pub fn with_flags(mut self, flags: ConvFlags) -> Self {
        self.flags = flags;
        self
    }

    fn remap(&self, valuators: &[f32; 6]) -> [f32; 6] {
        let mut tmp = *valuators;
        if self.flags.contains(ConvFlags::SWAP_TRANSROT) {
            tmp[X] = -valuators[AZIM + 3];
            tmp[Z] = valuators[ELEV + 3];
            tmp[Y] = -valuators[ROLL + 3];
            tmp[AZIM + 3] = -valuators[X];
            tmp[ELEV + 3] = valuators[Z];
            tmp[ROLL + 3] = -valuators[Y];
        }
        if self.flags.contains(ConvFlags::SWAP_YZ) {
            tmp[Z] = -valuators[Y];
            tmp[Y] = -valuators[Z];
            tmp[ELEV + 3] = valuators[ROLL + 3];
            tmp[ROLL + 3] = valuators[ELEV + 3];
        }
        tmp
    }

    fn outside(&self, t: [f64; 3]) -> bool {
        (0..3).any(|axis| {
            t[axis] > f64::from(self.working_volume_max[axis])
                || t[axis] < f64::from(self.working_volume_min[axis])
        })
    }

    fn clamp(&self, t: [f64; 3]) -> [f64; 3] {
        let mut out = t;
        for axis in 0..3 {
            let max = f64::from(self.working_volume_max[axis]);
            let min = f64::from(self.working_volume_min[axis]);
            if out[axis] > max {
                out[axis] = max;
            }
            if out[axis] < min {
                out[axis] = min;
            }
        }
        out
    }
}

fn check_pose(name: &str, mat: &Matrix) -> InputResult<()> {
    if mat.is_finite() {
        Ok(())
    } else {
        Err(InputError::InvalidValue(format!(
            "6-sensor '{name}' assigned a non-finite matrix"
        )))
    }
}

fn write_pose(state: &mut Sensor6State, timestamp: &mut Option<Instant>, raw: &Matrix, oob: i32) {
    if oob >= 0 {
        state.oob = oob;
    }
    state.raw_data = *raw;
    state.recompute();
    *timestamp = Some(Instant::now());
}

impl GenericInput {
    fn with_sensor6<R>(
        &self,
        op: &str,
        f: impl FnOnce(&mut Sensor6State, &mut Option<Instant>) -> R,
    ) -> InputResult<R> {
        let mut live = self.live.write();
        let LiveState { timestamp, value } = &mut *live;
        match value {
            InputValue::Sensor6(state) => Ok(f(state, timestamp)),
            _ => Err(self.mismatch(op, InputType::Sensor6)),
        }
    }

    fn read_sensor6<R>(&self, f: impl FnOnce(&Sensor6State) -> R) -> Option<R> {
        match &self.live.read().value {
            InputValue::Sensor6(state) => Some(f(state)),
            _ => None,
        }
    }

    /// Stores a raw tracker sample and recomputes the calibrated pose.
    ///
    /// A negative `oob` leaves the out-of-bounds flag untouched.
    pub fn assign_sensor6(&self, raw: &Matrix, oob: i32) -> InputResult<()> {
        check_pose(&self.object().name, raw)?;
        self.with_sensor6("assign_sensor6", |state, timestamp| {
            write_pose(state, timestamp, raw, oob)
        })
    }

    /// Synthesizes a pose from `[x, y, z, azim, elev, roll]` valuators.
    ///
    /// Reading the previous raw pose and writing the new one happen under one
    /// write lock, so concurrent callers cannot lose an accumulation step.
    pub fn assign_sensor6_from_valuators(
        &self,
        valuators: &[f32; 6],
        conv: &Sensor6Conv,
        oob: i32,
    ) -> InputResult<()> {
        if conv.flags.contains(ConvFlags::IGNORE_ALL) {
            return Ok(());
        }
        if valuators.iter().any(|v| !v.is_finite()) {
            return Err(InputError::InvalidValue(format!(
                "6-sensor '{}' given non-finite valuators",
                self.object().name
            )));
        }

        let ts = if conv.trans_scale == 0.0 { 1.0 } else { f64::from(conv.trans_scale) };
        let rs = if conv.rot_scale == 0.0 { 1.0 } else { f64::from(conv.rot_scale) };
        let v = conv.remap(valuators);
        let relative = conv.flags.contains(ConvFlags::RELATIVE_AXIS);

        self.with_sensor6("assign_sensor6_from_valuators", |state, timestamp| {
            let mut mat = if conv.flags.contains(ConvFlags::RETURN_TO_ZERO) {
                Matrix::IDENTITY
            } else {
                state.raw_data
            };

            let mut computed_oob = None;
            if !conv.flags.contains(ConvFlags::IGNORE_TRANS) {
                let (tx, ty, tz) = (
                    f64::from(v[X]) * ts,
                    f64::from(v[Y]) * ts,
                    f64::from(v[Z]) * ts,
                );
                if relative {
                    mat.post_translate(tx, ty, tz);
                } else {
                    mat.pre_translate(tx, ty, tz);
                }

                if conv.flags.contains(ConvFlags::RESTRICT_SPACE) {
                    let clamped = conv.clamp(mat.translation_part());
                    mat.set_translation_part(clamped);
                    computed_oob = Some(0);
                } else {
                    computed_oob = Some(i32::from(conv.outside(mat.translation_part())));
                }
            }

            let order = rotation_order(conv.azimuth_axis);
            let angles = [
                f64::from(v[AZIM + 3]) * rs,
                f64::from(v[ELEV + 3]) * rs,
                f64::from(v[ROLL + 3]) * rs,
            ];
            if relative {
                for (axis, degrees) in order.iter().zip(angles) {
                    mat.post_rotate(*axis, degrees);
                }
            } else {
                // rotate about the sensor's location, not the world origin
                let saved = mat.translation_part();
                mat.set_translation_part([0.0; 3]);
                for (axis, degrees) in order.iter().zip(angles) {
                    mat.pre_rotate(*axis, degrees);
                }
                mat.set_translation_part(saved);
            }

            if let Some(flag) = computed_oob {
                state.oob = flag;
            }
            write_pose(state, timestamp, &mat, oob);
        })
    }

    pub fn assign_sensor6_oob(&self, oob: i32) -> InputResult<()> {
        self.with_sensor6("assign_sensor6_oob", |state, _| {
            if oob >= 0 {
                state.oob = oob;
            }
        })
    }

    pub fn assign_sensor6_active(&self, active: i32) -> InputResult<()> {
        self.with_sensor6("assign_sensor6_active", |state, _| {
            if active >= 0 {
                state.active = active;
            }
        })
    }

    pub fn assign_sensor6_error(&self, error: i32) -> InputResult<()> {
        self.with_sensor6("assign_sensor6_error", |state, _| {
            if error >= 0 {
                state.error = error;
            }
        })
    }

    /// Replaces the tracker calibration and recomputes the pose from raw.
    pub fn set_sensor6_t2rw(&self, t2rw: &Matrix) -> InputResult<()> {
        check_pose(&self.object().name, t2rw)?;
        self.with_sensor6("set_sensor6_t2rw", |state, _| {
            state.t2rw_xform = *t2rw;
            state.recompute();
        })
    }

    /// Replaces the receiver-to-entity offset and recomputes the pose from raw.
    pub fn set_sensor6_r2e(&self, r2e: &Matrix) -> InputResult<()> {
        check_pose(&self.object().name, r2e)?;
        self.with_sensor6("set_sensor6_r2e", |state, _| {
            state.r2e_xform = *r2e;
            state.recompute();
        })
    }

    /// Applies the receiver-to-entity part of an instance string.
    ///
    /// `None`, empty and `id` leave the offset alone; `r2e` copies the owning
    /// object's calibration snapshot; `xform:` is recognised but unsupported.
    pub fn assign_r2e_from_str(&self, info: Option<&str>) -> InputResult<()> {
        let Some(info) = info else {
            return Ok(());
        };
        let info = info.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if info.is_empty() || starts_with_ignore_case(info, "id") {
            return Ok(());
        }

        if info.trim_end().eq_ignore_ascii_case("r2e") {
            let r2e = self.object().calibration.unwrap_or(Matrix::IDENTITY);
            return self.with_sensor6("assign_r2e_from_str", |state, timestamp| {
                state.r2e_xform = r2e;
                let raw = state.raw_data;
                write_pose(state, timestamp, &raw, -1);
            });
        }

        if starts_with_ignore_case(info, "xform:") {
            warn!(
                "'xform:' receiver offsets are not yet implemented, '{}' keeps its current offset",
                self.object().name
            );
            return self.with_sensor6("assign_r2e_from_str", |state, timestamp| {
                let raw = state.raw_data;
                write_pose(state, timestamp, &raw, -1);
            });
        }

        Ok(())
    }

    /// Calibrated pose without stamping `last_position`.
    pub fn sensor6_matrix_no_last_update(&self) -> Matrix {
        self.read_sensor6(|s| s.position).unwrap_or_else(|| {
            let _ = self.mismatch("sensor6_matrix_no_last_update", InputType::Sensor6);
            Matrix::IDENTITY
        })
    }

    pub fn sensor6_raw_matrix(&self) -> Matrix {
        self.read_sensor6(|s| s.raw_data).unwrap_or(Matrix::IDENTITY)
    }

    pub fn sensor6_t2rw(&self) -> Matrix {
        self.read_sensor6(|s| s.t2rw_xform).unwrap_or(Matrix::IDENTITY)
    }

    pub fn sensor6_r2e(&self) -> Matrix {
        self.read_sensor6(|s| s.r2e_xform).unwrap_or(Matrix::IDENTITY)
    }

    /// `None` when this is not a 6-sensor.
    pub fn sensor6_oob(&self) -> Option<i32> {
        self.read_sensor6(|s| s.oob)
    }

    pub fn sensor6_active(&self) -> Option<i32> {
        self.read_sensor6(|s| s.active)
    }

    pub fn sensor6_error(&self) -> Option<i32> {
        self.read_sensor6(|s| s.error)
    }

    /// Assigns a value from its textual form.
    ///
    /// | type | accepted text |
    /// |---|---|
    /// | 2-switch, N-switch | integer |
    /// | valuator | float |
    /// | 6-sensor | `id`, `loc x y z` (`*` keeps an axis), `move x y z az el roll`, `nr xrot yrot zrot` |
    /// | N-sensor | whitespace separated floats |
    /// | control | integer passed to the callback |
    pub fn assign_from_str(&self, text: &str) -> InputResult<()> {
        match self.input_type() {
            InputType::Switch2 => self.assign_switch2(parse_int_prefix(text)),
            InputType::SwitchN => self.assign_switchn(parse_int_prefix(text)),
            InputType::Valuator => self.assign_valuator(parse_float_prefix(text) as f32),
            InputType::Sensor6 => self.assign_sensor6_from_str(text),
            InputType::SensorN => {
                let mut values = self.nsensor_array_no_last_update();
                for (slot, token) in values.iter_mut().zip(text.split_whitespace()) {
                    *slot = parse_float_prefix(token) as f32;
                }
                self.assign_nsensor(&values)
            }
            InputType::Control => self.invoke_control(parse_int_prefix(text)),
            other => Err(InputError::Unimplemented(other)),
        }
    }

    fn assign_sensor6_from_str(&self, text: &str) -> InputResult<()> {
        let text = text.trim_start();
        let mut tokens = text.split_whitespace();
        let keyword = tokens.next().unwrap_or("");
        let args: Vec<&str> = tokens.collect();

        if keyword.eq_ignore_ascii_case("id") {
            return self.assign_sensor6(&Matrix::IDENTITY, -1);
        }

        if keyword.eq_ignore_ascii_case("loc") {
            let mut raw = self.sensor6_raw_matrix();
            for (row, token) in [X, Y, Z].into_iter().zip(args.iter()) {
                if *token != "*" {
                    raw.set(row, W, parse_float_prefix(token));
                }
            }
            return self.assign_sensor6(&raw, -1);
        }

        if keyword.eq_ignore_ascii_case("move") {
            let mut valuators = [0.0f32; 6];
            for (slot, token) in valuators.iter_mut().zip(args.iter()) {
                *slot = parse_float_prefix(token) as f32;
            }
            return self.assign_sensor6_from_valuators(&valuators, &Sensor6Conv::default(), -1);
        }

        if keyword.eq_ignore_ascii_case("nr") {
            let angles: Vec<f64> = args.iter().map(|t| parse_float_prefix(t)).collect();
            return self.with_sensor6("assign_from_str", |state, timestamp| {
                for (axis, degrees) in [Axis::X, Axis::Y, Axis::Z].into_iter().zip(angles) {
                    state.r2e_xform.post_rotate(axis, degrees);
                }
                let raw = state.raw_data;
                write_pose(state, timestamp, &raw, -1);
            });
        }

        Err(InputError::InvalidValue(format!(
            "unrecognised 6-sensor assignment '{text}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::generic::{ContainerOptions, InputObject};

    fn sensor(t2rw: Matrix) -> Arc<GenericInput> {
        let object = Arc::new(InputObject::new("wand", "unit", "sensor6(unit)"));
        GenericInput::new(
            InputType::Sensor6,
            object,
            ContainerOptions {
                t2rw,
                ..ContainerOptions::default()
            },
        )
        .unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn pure_pre_multiply_of_tracker_calibration() {
        let t2rw = Matrix::rotation(Axis::Y, 90.0);
        let input = sensor(t2rw);
        input.assign_sensor6(&Matrix::IDENTITY, 0).unwrap();
        assert_eq!(input.sensor6_matrix_no_last_update(), t2rw);
    }

    #[test]
    fn r2e_offset_applies_in_the_calibrated_frame() {
        let t2rw = Matrix::rotation(Axis::Y, 90.0);
        let input = sensor(t2rw);
        input.set_sensor6_r2e(&Matrix::translation(0.0, 0.0, -1.0)).unwrap();
        input.assign_sensor6(&Matrix::IDENTITY, 0).unwrap();
        let t = input.sensor6_matrix_no_last_update().translation_part();
        // -Z in the sensor frame is -X in the world after a 90 degree azimuth
        assert!(close(t[X], -1.0), "{t:?}");
        assert!(close(t[Z], 0.0), "{t:?}");
    }

    #[test]
    fn negative_oob_is_left_alone() {
        let input = sensor(Matrix::IDENTITY);
        input.assign_sensor6(&Matrix::IDENTITY, 1).unwrap();
        input.assign_sensor6(&Matrix::translation(1.0, 0.0, 0.0), -1).unwrap();
        assert_eq!(input.sensor6_oob(), Some(1));
        input.assign_sensor6_oob(-5).unwrap();
        assert_eq!(input.sensor6_oob(), Some(1));
        input.assign_sensor6_active(1).unwrap();
        input.assign_sensor6_error(-1).unwrap();
        assert_eq!(input.sensor6_active(), Some(1));
        assert_eq!(input.sensor6_error(), Some(0));
    }

    #[test]
    fn non_finite_pose_is_an_error_not_a_halt() {
        let input = sensor(Matrix::IDENTITY);
        let mut bad = Matrix::IDENTITY;
        bad.set(X, W, f64::INFINITY);
        assert!(matches!(
            input.assign_sensor6(&bad, 0),
            Err(InputError::InvalidValue(_))
        ));
        assert_eq!(input.sensor6_raw_matrix(), Matrix::IDENTITY);
    }

    #[test]
    fn restricted_space_clamps_and_clears_oob() {
        let input = sensor(Matrix::IDENTITY);
        input.assign_sensor6(&Matrix::translation(0.0, 5.0, 0.0), 1).unwrap();
        let conv = Sensor6Conv::default().with_flags(ConvFlags::RESTRICT_SPACE);
        input
            .assign_sensor6_from_valuators(&[12.0, 0.0, 0.0, 0.0, 0.0, 0.0], &conv, -1)
            .unwrap();
        let t = input.sensor6_matrix_no_last_update().translation_part();
        assert_eq!(t[X], 5.0);
        assert_eq!(t[Y], 5.0);
        assert_eq!(input.sensor6_oob(), Some(0));
    }

    #[test]
    fn unrestricted_space_reports_oob() {
        let input = sensor(Matrix::IDENTITY);
        input.assign_sensor6(&Matrix::translation(0.0, 5.0, 0.0), 0).unwrap();
        let conv = Sensor6Conv::default();
        input
            .assign_sensor6_from_valuators(&[12.0, 0.0, 0.0, 0.0, 0.0, 0.0], &conv, -1)
            .unwrap();
        assert_eq!(input.sensor6_matrix_no_last_update().translation_part()[X], 12.0);
        assert_eq!(input.sensor6_oob(), Some(1));

        input
            .assign_sensor6_from_valuators(&[-10.0, 0.0, 0.0, 0.0, 0.0, 0.0], &conv, -1)
            .unwrap();
        assert_eq!(input.sensor6_oob(), Some(0));
    }

    #[test]
    fn caller_oob_overrides_computed_oob() {
        let input = sensor(Matrix::IDENTITY);
        let conv = Sensor6Conv::default();
        input
            .assign_sensor6_from_valuators(&[50.0, 0.0, 0.0, 0.0, 0.0, 0.0], &conv, 0)
            .unwrap();
        assert_eq!(input.sensor6_oob(), Some(0));
    }

    #[test]
    fn return_to_zero_does_not_accumulate() {
        let input = sensor(Matrix::IDENTITY);
        let conv = Sensor6Conv::default().with_flags(ConvFlags::RETURN_TO_ZERO);
        for _ in 0..3 {
            input
                .assign_sensor6_from_valuators(&[1.0, 2.0, 0.0, 0.0, 0.0, 0.0], &conv, -1)
                .unwrap();
        }
        assert_eq!(input.sensor6_raw_matrix().translation_part(), [1.0, 2.0, 0.0]);

        let accumulate = Sensor6Conv::default();
        input
            .assign_sensor6_from_valuators(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0], &accumulate, -1)
            .unwrap();
        assert_eq!(input.sensor6_raw_matrix().translation_part(), [2.0, 2.0, 0.0]);
    }

    #[test]
    fn world_rotation_keeps_the_sensor_in_place() {
        let input = sensor(Matrix::IDENTITY);
        input.assign_sensor6(&Matrix::translation(1.0, 2.0, 3.0), 0).unwrap();
        let conv = Sensor6Conv::default();
        input
            .assign_sensor6_from_valuators(&[0.0, 0.0, 0.0, 90.0, 0.0, 0.0], &conv, -1)
            .unwrap();
        let raw = input.sensor6_raw_matrix();
        assert_eq!(raw.translation_part(), [1.0, 2.0, 3.0]);
        assert!(close(raw.get(X, Z), 1.0));
    }

    #[test]
    fn relative_translation_follows_the_sensor_axes() {
        let input = sensor(Matrix::IDENTITY);
        input.assign_sensor6(&Matrix::rotation(Axis::Y, 90.0), 0).unwrap();
        let conv = Sensor6Conv::default().with_flags(ConvFlags::RELATIVE_AXIS);
        input
            .assign_sensor6_from_valuators(&[0.0, 0.0, -1.0, 0.0, 0.0, 0.0], &conv, -1)
            .unwrap();
        let t = input.sensor6_raw_matrix().translation_part();
        assert!(close(t[X], -1.0), "{t:?}");
    }

    #[test]
    fn scale_factors_and_zero_scale() {
        let input = sensor(Matrix::IDENTITY);
        let conv = Sensor6Conv {
            trans_scale: 0.0,
            flags: ConvFlags::RETURN_TO_ZERO,
            ..Sensor6Conv::default()
        };
        input
            .assign_sensor6_from_valuators(&[2.0, 0.0, 0.0, 0.0, 0.0, 0.0], &conv, -1)
            .unwrap();
        assert_eq!(input.sensor6_raw_matrix().translation_part()[X], 2.0);

        let conv = Sensor6Conv {
            trans_scale: 0.5,
            ..conv
        };
        input
            .assign_sensor6_from_valuators(&[2.0, 0.0, 0.0, 0.0, 0.0, 0.0], &conv, -1)
            .unwrap();
        assert_eq!(input.sensor6_raw_matrix().translation_part()[X], 1.0);
    }

    #[test]
    fn ignore_flags() {
        let input = sensor(Matrix::IDENTITY);
        let conv = Sensor6Conv::default().with_flags(ConvFlags::IGNORE_ALL);
        input
            .assign_sensor6_from_valuators(&[2.0, 0.0, 0.0, 0.0, 0.0, 0.0], &conv, -1)
            .unwrap();
        assert_eq!(input.sensor6_raw_matrix(), Matrix::IDENTITY);

        let conv = Sensor6Conv::default().with_flags(ConvFlags::IGNORE_TRANS);
        input
            .assign_sensor6_from_valuators(&[2.0, 0.0, 0.0, 0.0, 0.0, 0.0], &conv, -1)
            .unwrap();
        assert_eq!(input.sensor6_raw_matrix().translation_part(), [0.0; 3]);
    }

    #[test]
    fn swap_yz_remaps_axes() {
        let conv = Sensor6Conv::default().with_flags(ConvFlags::SWAP_YZ);
        let out = conv.remap(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(out, [1.0, -3.0, -2.0, 4.0, 6.0, 5.0]);
    }

    #[test]
    fn swap_transrot_remaps_axes() {
        let conv = Sensor6Conv::default().with_flags(ConvFlags::SWAP_TRANSROT);
        let out = conv.remap(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(out, [-4.0, -6.0, 5.0, -1.0, 3.0, -2.0]);
    }

    #[test]
    fn textual_sensor6_assignment() {
        let input = sensor(Matrix::IDENTITY);
        input.assign_from_str("loc 1 2 3").unwrap();
        assert_eq!(input.sensor6_raw_matrix().translation_part(), [1.0, 2.0, 3.0]);
        input.assign_from_str("loc * 7 *").unwrap();
        assert_eq!(input.sensor6_raw_matrix().translation_part(), [1.0, 7.0, 3.0]);
        input.assign_from_str("id").unwrap();
        assert_eq!(input.sensor6_raw_matrix(), Matrix::IDENTITY);
        input.assign_from_str("move 1 0 0 0 0 0").unwrap();
        assert_eq!(input.sensor6_raw_matrix().translation_part(), [1.0, 0.0, 0.0]);
        input.assign_from_str("nr 0 90 0").unwrap();
        assert!(close(input.sensor6_r2e().get(X, Z), 1.0));
        assert!(input.assign_from_str("spin 3").is_err());
    }

    #[test]
    fn r2e_from_calibration_snapshot() {
        let object = Arc::new(
            InputObject::new("wand", "unit", "sensor6(unit)")
                .with_calibration(Some(Matrix::translation(0.0, 0.0, -0.5))),
        );
        let input = GenericInput::new(InputType::Sensor6, object, ContainerOptions::default()).unwrap();
        input.assign_r2e_from_str(None).unwrap();
        input.assign_r2e_from_str(Some(",id")).unwrap();
        assert_eq!(input.sensor6_r2e(), Matrix::IDENTITY);
        input.assign_r2e_from_str(Some(", r2e")).unwrap();
        assert_eq!(input.sensor6_r2e(), Matrix::translation(0.0, 0.0, -0.5));
        assert_eq!(
            input.sensor6_matrix_no_last_update().translation_part(),
            [0.0, 0.0, -0.5]
        );
        input.assign_r2e_from_str(Some("xform:1 2 3")).unwrap();
        assert_eq!(input.sensor6_r2e(), Matrix::translation(0.0, 0.0, -0.5));
    }

    #[test]
    fn sensor6_operations_reject_other_types() {
        let object = Arc::new(InputObject::new("b", "unit", "switch2(unit)"));
        let input = GenericInput::new(InputType::Switch2, object, ContainerOptions::default()).unwrap();
        assert!(matches!(
            input.assign_sensor6(&Matrix::IDENTITY, 0),
            Err(InputError::TypeMismatch { .. })
        ));
        assert_eq!(input.sensor6_oob(), None);
    }
}
