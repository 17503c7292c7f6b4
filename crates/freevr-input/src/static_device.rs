//! The `static` input device: constant inputs plus time-driven toggles and
//! sine waves, used for testing without tracking hardware.
//!
//! Declarations look like
//!
//! ```text
//! 2switch(static:constant[1])
//! valuator(static:sinewave[4.0, 1.5])
//! 6sensor(static:constant[id,r2e])
//! control(static:print_help)
//! ```
//!
//! Device `args` supply defaults for constants without an instance value:
//! `x y z azim elev roll oob button valuator switch`, as `key=value` pairs
//! separated by `;` or `,`.

use std::f64::consts::{FRAC_2_PI, FRAC_PI_2};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;

use freevr_common::helpers::{parse_float_prefix, parse_int_prefix, starts_with_ignore_case};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::context::InputContext;
use crate::descriptor::InputDti;
use crate::device::{create_data_containers, ControlBinding, DeviceInputs, DeviceSetup, InputDriver, Recognizer};
use crate::generic::{ControlCallback, GenericInput};
use crate::math::{Axis, Euler, Matrix, AZIM, ELEV, ROLL, X, Y, Z};
use crate::report::sprint_input;
use crate::sensor::{ConvFlags, Sensor6Conv};
use crate::types::{InputMatch, InputType, PrintStyle};
use crate::InputResult;

pub const MAX_TOGGLES: usize = 10;
pub const MAX_SINEWAVES: usize = 10;

const DEFAULT_PERIOD: f64 = 10.0;
const VERSION: &str = "The Static input device, version 0.2";

/// Option defaults parsed from the device's `args`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticDefaults {
    pub button: i32,
    pub nswitch: i32,
    pub valuator: f32,
    /// `[x, y, z, azim, elev, roll]`.
    pub sensor6: [f64; 6],
    pub oob: i32,
}

impl Default for StaticDefaults {
    fn default() -> Self {
        Self {
            button: 0,
            nswitch: 0,
            valuator: 0.0,
            sensor6: [0.0; 6],
            oob: 0,
        }
    }
}

fn parse_bool(value: &str) -> i32 {
    let value = value.trim();
    let truthy = ["on", "true", "yes", "t", "y"]
        .iter()
        .any(|word| value.eq_ignore_ascii_case(word));
    if truthy {
        1
    } else {
        i32::from(parse_int_prefix(value) != 0)
    }
}

impl StaticDefaults {
    pub fn parse(args: &str) -> Self {
        let mut defaults = Self::default();
        for (key, value) in args
            .split([';', ','])
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| (key.trim().to_ascii_lowercase(), value))
        {
            match key.as_str() {
                "x" => defaults.sensor6[X] = parse_float_prefix(value),
                "y" => defaults.sensor6[Y] = parse_float_prefix(value),
                "z" => defaults.sensor6[Z] = parse_float_prefix(value),
                "azim" => defaults.sensor6[AZIM + 3] = parse_float_prefix(value),
                "elev" => defaults.sensor6[ELEV + 3] = parse_float_prefix(value),
                "roll" => defaults.sensor6[ROLL + 3] = parse_float_prefix(value),
                "oob" => defaults.oob = parse_bool(value),
                "button" => defaults.button = parse_bool(value),
                "valuator" => defaults.valuator = parse_float_prefix(value) as f32,
                "switch" => defaults.nswitch = parse_int_prefix(value),
                other => debug!("static device: ignoring unknown option '{other}'"),
            }
        }
        defaults
    }

    pub fn sensor6_matrix(&self) -> Matrix {
        let v = self.sensor6;
        Matrix::from_euler(
            &Euler {
                t: [v[X], v[Y], v[Z]],
                r: [v[AZIM + 3], v[ELEV + 3], v[ROLL + 3]],
            },
            Axis::Y,
        )
    }
}

/// A periodic signal driving one input.
#[derive(Debug, Clone)]
struct Wave {
    input: Arc<GenericInput>,
    value: f64,
    period: f64,
    pshift: f64,
}

impl Wave {
    /// Reads `"<period>{,<phase shift>}"`; a zero period becomes 10 seconds.
    fn from_instance(input: &Arc<GenericInput>, instance: &str) -> Self {
        let mut period = parse_float_prefix(instance);
        if period == 0.0 {
            period = DEFAULT_PERIOD;
        }
        let pshift = instance
            .split_once(',')
            .map_or(0.0, |(_, shift)| parse_float_prefix(shift));
        Self {
            input: Arc::clone(input),
            value: 0.0,
            period,
            pshift,
        }
    }

    fn toggle_at(&self, t: f64) -> i32 {
        if ((t + self.pshift) / (self.period * FRAC_2_PI)).cos() >= 0.0 {
            0
        } else {
            1
        }
    }

    fn sine_at(&self, t: f64) -> f64 {
        ((t + self.pshift) / (self.period * FRAC_PI_2)).cos()
    }
}

#[derive(Debug)]
struct StaticState {
    args: String,
    defaults: StaticDefaults,
    toggles: Vec<Wave>,
    sinewaves: Vec<Wave>,
    epoch: Instant,
}

impl Default for StaticState {
    fn default() -> Self {
        Self {
            args: String::new(),
            defaults: StaticDefaults::default(),
            toggles: Vec::new(),
            sinewaves: Vec::new(),
            epoch: Instant::now(),
        }
    }
}

impl StaticState {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn write_struct(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let d = &self.defaults;
        writeln!(out, "Static device internal structure:")?;
        writeln!(out, "\tdefault button value = {}", d.button)?;
        writeln!(out, "\tdefault N-switch value = {}", d.nswitch)?;
        writeln!(out, "\tdefault valuator value = {:.6}", d.valuator)?;
        writeln!(
            out,
            "\tdefault 6-sensor values = {:.6}, {:.6}, {:.6} : {:.6}, {:.6}, {:.6}",
            d.sensor6[0], d.sensor6[1], d.sensor6[2], d.sensor6[3], d.sensor6[4], d.sensor6[5]
        )?;
        writeln!(out, "\tdefault oob value = {}", d.oob)?;
        writeln!(out, "\t{} Toggles:", self.toggles.len())?;
        for (idx, wave) in self.toggles.iter().enumerate() {
            writeln!(
                out,
                "\t\ttoggle {idx}: = {}, period = {:.2}, pshift = {:.2}",
                wave.value as i32, wave.period, wave.pshift
            )?;
        }
        writeln!(out, "\t{} Sine Waves:", self.sinewaves.len())?;
        for (idx, wave) in self.sinewaves.iter().enumerate() {
            writeln!(
                out,
                "\t\tsinewave {idx}: = {:.2}, period = {:.2}, pshift = {:.2}",
                wave.value, wave.period, wave.pshift
            )?;
        }
        Ok(())
    }

    fn write_help(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let d = &self.defaults;
        writeln!(out, "Static device - inputs:")?;
        writeln!(out, "\tdefault button_value -- {}", d.button)?;
        writeln!(out, "\tdefault Nswitch_value -- {}", d.nswitch)?;
        writeln!(out, "\tdefault valuator_value -- {:.6}", d.valuator)?;
        writeln!(
            out,
            "\tdefault 6sensor_vals -- {:.6} {:.6} {:.6}   {:.6} {:.6} {:.6}",
            d.sensor6[0], d.sensor6[1], d.sensor6[2], d.sensor6[3], d.sensor6[4], d.sensor6[5]
        )?;
        for wave in self.toggles.iter().chain(&self.sinewaves) {
            let object = wave.input.object();
            writeln!(out, "\t{} -- {}", object.desc_str, object.name)?;
        }
        Ok(())
    }
}

/// Driver for the `static` device.
#[derive(Debug, Default)]
pub struct StaticDriver {
    state: Arc<Mutex<StaticState>>,
}

impl StaticDriver {
    pub fn defaults(&self) -> StaticDefaults {
        self.state.lock().defaults
    }

    fn add_wave(&mut self, kind: &str, input: &Arc<GenericInput>, dti: &InputDti) -> Option<Wave> {
        let mut state = self.state.lock();
        let (waves, limit) = if kind == "toggle" {
            (&state.toggles, MAX_TOGGLES)
        } else {
            (&state.sinewaves, MAX_SINEWAVES)
        };
        if waves.len() == limit {
            warn!(
                "static device: too many {kind}s, unable to handle '{}'",
                input.object().name
            );
            return None;
        }

        let mut wave = Wave::from_instance(input, &dti.instance);
        let t = state.now();
        wave.value = if kind == "toggle" {
            f64::from(wave.toggle_at(t))
        } else {
            wave.sine_at(t)
        };
        if kind == "toggle" {
            state.toggles.push(wave.clone());
        } else {
            state.sinewaves.push(wave.clone());
        }
        Some(wave)
    }

    fn controls(&self, context: &Weak<InputContext>) -> Vec<ControlBinding> {
        let pause_ctx = context.clone();
        let input_ctx = context.clone();
        let config_ctx = context.clone();
        let struct_state = Arc::clone(&self.state);
        let help_state = Arc::clone(&self.state);

        let pause: ControlCallback = Arc::new(move |value| {
            if value == 0 {
                return;
            }
            if let Some(ctx) = pause_ctx.upgrade() {
                let paused = ctx.toggle_pause();
                debug!("Static Control: system_pause = {}", i32::from(paused));
            }
        });
        let print_input: ControlCallback = Arc::new(move |value| {
            if value == 0 {
                return;
            }
            if let Some(ctx) = input_ctx.upgrade() {
                info!("\n{}", sprint_input(&ctx, PrintStyle::Verbose));
            }
        });
        let print_config: ControlCallback = Arc::new(move |value| {
            if value == 0 {
                return;
            }
            if let Some(ctx) = config_ctx.upgrade() {
                info!("{:#?}", ctx.config());
            }
        });
        let print_struct: ControlCallback = Arc::new(move |value| {
            if value == 0 {
                return;
            }
            let mut text = String::new();
            if struct_state.lock().write_struct(&mut text).is_ok() {
                info!("\n{text}");
            }
        });
        let print_help: ControlCallback = Arc::new(move |value| {
            if value == 0 {
                return;
            }
            let mut text = String::new();
            if help_state.lock().write_help(&mut text).is_ok() {
                info!("\n{text}");
            }
        });

        vec![
            ("system_pause_toggle", pause),
            ("print_config", print_config),
            ("print_input", print_input),
            ("print_struct", print_struct),
            ("print_help", print_help),
        ]
    }
}

fn constant_switch2(driver: &mut StaticDriver, input: &Arc<GenericInput>, dti: &InputDti) -> InputMatch {
    let value = match dti.instance_value() {
        "" => driver.defaults().button,
        text => parse_int_prefix(text),
    };
    let _ = input.assign_switch2(value);
    InputMatch::MatchAble
}

fn constant_switchn(driver: &mut StaticDriver, input: &Arc<GenericInput>, dti: &InputDti) -> InputMatch {
    let value = match dti.instance_value() {
        "" => driver.defaults().nswitch,
        text => parse_int_prefix(text),
    };
    let _ = input.assign_switchn(value);
    InputMatch::MatchAble
}

fn constant_valuator(driver: &mut StaticDriver, input: &Arc<GenericInput>, dti: &InputDti) -> InputMatch {
    let value = match dti.instance_value() {
        "" => driver.defaults().valuator,
        text => parse_float_prefix(text) as f32,
    };
    let _ = input.assign_valuator(value);
    InputMatch::MatchAble
}

fn constant_sensor6(driver: &mut StaticDriver, input: &Arc<GenericInput>, dti: &InputDti) -> InputMatch {
    let value = dti.instance_value().trim();
    if value.is_empty() {
        let defaults = driver.defaults();
        let _ = input.assign_sensor6(&defaults.sensor6_matrix(), defaults.oob);
    } else if !starts_with_ignore_case(value, "id") {
        debug!(
            "static device: constant 6-sensor value '{value}' for '{}' is not supported",
            input.object().name
        );
    }
    let _ = input.assign_r2e_from_str(dti.instance_args());
    InputMatch::MatchAble
}

fn toggle_switch2(driver: &mut StaticDriver, input: &Arc<GenericInput>, dti: &InputDti) -> InputMatch {
    match driver.add_wave("toggle", input, dti) {
        Some(wave) => {
            let _ = input.assign_switch2(wave.value as i32);
            trace!("static toggle '{}' starts at {}", input.object().name, wave.value);
            InputMatch::MatchAble
        }
        None => InputMatch::MatchUnable,
    }
}

fn sinewave_input(driver: &mut StaticDriver, input: &Arc<GenericInput>, dti: &InputDti) -> InputMatch {
    match driver.add_wave("sinewave", input, dti) {
        Some(wave) => {
            if input.input_type() == InputType::Valuator {
                let _ = input.assign_valuator(wave.value as f32);
            }
            InputMatch::MatchAble
        }
        None => InputMatch::MatchUnable,
    }
}

const RECOGNIZERS: &[Recognizer<StaticDriver>] = &[
    Recognizer { name: "toggle", input_type: InputType::Switch2, func: toggle_switch2 },
    Recognizer { name: "sinewave", input_type: InputType::Valuator, func: sinewave_input },
    Recognizer { name: "constant", input_type: InputType::Switch2, func: constant_switch2 },
    Recognizer { name: "constant", input_type: InputType::SwitchN, func: constant_switchn },
    Recognizer { name: "constant", input_type: InputType::Valuator, func: constant_valuator },
    Recognizer { name: "constant", input_type: InputType::Sensor6, func: constant_sensor6 },
    Recognizer { name: "sinewave", input_type: InputType::Sensor6, func: sinewave_input },
];

/// Drives a 6-sensor sine wave along X inside the default working volume.
fn sinewave_conv() -> Sensor6Conv {
    Sensor6Conv {
        flags: ConvFlags::RESTRICT_SPACE,
        trans_scale: 0.001,
        rot_scale: 5.0,
        ..Sensor6Conv::default()
    }
}

impl InputDriver for StaticDriver {
    fn version(&self) -> String {
        VERSION.to_string()
    }

    fn create(&mut self, setup: &DeviceSetup<'_>) -> InputResult<DeviceInputs> {
        {
            let mut state = self.state.lock();
            state.args = setup.args.to_string();
            state.defaults = StaticDefaults::parse(setup.args);
        }
        let controls = self.controls(&setup.context);
        let inputs = create_data_containers(self, RECOGNIZERS, &controls, setup);
        debug!("done creating static inputs for '{}'", setup.name);
        Ok(inputs)
    }

    fn poll(&mut self) -> InputResult<()> {
        let mut state = self.state.lock();
        let t = state.now();

        for (idx, wave) in state.toggles.iter_mut().enumerate() {
            let value = wave.toggle_at(t);
            if wave.value as i32 != value {
                wave.value = f64::from(value);
                trace!("assigning a value of {value} to static toggle {idx}");
                wave.input.assign_switch2(value)?;
            }
        }

        let conv = sinewave_conv();
        for (idx, wave) in state.sinewaves.iter_mut().enumerate() {
            wave.value = wave.sine_at(t);
            match wave.input.input_type() {
                InputType::Valuator => {
                    trace!("assigning a value of {:.2} to static sinewave {idx}", wave.value);
                    wave.input.assign_valuator(wave.value as f32)?;
                }
                InputType::Sensor6 => {
                    let valuators = [wave.value as f32, 0.0, 0.0, 0.0, 0.0, 0.0];
                    wave.input.assign_sensor6_from_valuators(&valuators, &conv, -1)?;
                }
                other => warn!("static device: unable to drive a {other} with a sinewave"),
            }
        }
        Ok(())
    }

    fn reset(&mut self) -> InputResult<()> {
        let mut state = self.state.lock();
        state.defaults = StaticDefaults::parse(&state.args);
        Ok(())
    }

    fn print_aux(&self, out: &mut dyn fmt::Write, _style: PrintStyle) -> fmt::Result {
        self.state.lock().write_struct(out)
    }
}
