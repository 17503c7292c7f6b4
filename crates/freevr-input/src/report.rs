//! Human-readable dumps of the input system, its devices and its values.

use std::fmt::{self, Write};

use crate::context::InputContext;
use crate::device::InputDevice;
use crate::generic::{FrozenValue, GenericInput, InputValue};
use crate::math::{Matrix, W, X, Y, Z};
use crate::types::{InputType, PrintStyle};

const RULE: &str = "==================================================";

/// Row-major `(a b c d/e f g h/...)` with one decimal.
pub fn format_matrix(m: &Matrix) -> String {
    let rows: Vec<String> = (0..4)
        .map(|row| {
            (0..4)
                .map(|col| format!("{:3.1}", m.get(row, col)))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    format!("({})", rows.join("/"))
}

fn section_label(input_type: InputType) -> (&'static str, &'static str) {
    match input_type {
        InputType::Switch2 => ("2-way switches", "2-way"),
        InputType::SwitchN => ("N-way switches", "N-way"),
        InputType::Valuator => ("valuators", "valuator"),
        InputType::Sensor6 => ("6-sensors", "6-sensor"),
        InputType::SensorN => ("N-sensors", "N-sensor"),
        _ => ("controls", "control"),
    }
}

fn slot_value(input: &GenericInput) -> String {
    match input.snapshot() {
        InputValue::Switch2(s) | InputValue::SwitchN(s) => format!(" -- {}", s.value),
        InputValue::Valuator(v) => format!(" -- {:.2}", v.value),
        InputValue::Sensor6(s) => format!(
            " -- [tr: {:.2} {:.2} {:.2}]",
            s.position.get(X, W),
            s.position.get(Y, W),
            s.position.get(Z, W)
        ),
        InputValue::SensorN(_) | InputValue::Control(_) => String::new(),
    }
}

/// Writes a report of the whole input system.
pub fn fprint_input(out: &mut dyn Write, ctx: &InputContext, style: PrintStyle) -> fmt::Result {
    let map = ctx.map();
    match style {
        PrintStyle::OneLine => {
            write!(out, "{} input devices, {} users", ctx.devices().len(), ctx.num_users())?;
            for input_type in InputType::MAPPED {
                write!(out, ", {} {}", map.count(input_type), section_label(input_type).0)?;
            }
            writeln!(out)
        }
        PrintStyle::Brief => {
            writeln!(out, "{RULE}")?;
            writeln!(out, "{} input devices", ctx.devices().len())?;
            writeln!(out, "{} users", ctx.num_users())?;
            for input_type in InputType::MAPPED {
                writeln!(out, "{} {}", map.count(input_type), section_label(input_type).0)?;
            }
            writeln!(out, "{RULE}")
        }
        PrintStyle::Verbose => {
            writeln!(out, "{RULE}")?;
            let name = map.name();
            writeln!(out, "input map name = \"{}\"", name.as_deref().unwrap_or(""))?;

            writeln!(out, "{} input devices:", ctx.devices().len())?;
            for (idx, device) in ctx.devices().iter().enumerate() {
                let state = if device.is_operating() { "operating" } else { "NOT OPERATING" };
                writeln!(out, "\tdevice[{idx}] named: \"{}\" ({state})", device.name())?;
            }

            let users = ctx.users.read();
            writeln!(out, "{} users:", users.len())?;
            for (idx, user) in users.iter().enumerate() {
                writeln!(
                    out,
                    "\tuser[{idx}] named \"{}\", head sensor is \"{}\"",
                    user.name(),
                    user.head().object().name
                )?;
            }
            drop(users);

            for input_type in InputType::MAPPED {
                let (plural, label) = section_label(input_type);
                let slots = map.slots(input_type);
                writeln!(out, "{} {plural}:", slots.len())?;
                for (idx, slot) in slots.iter().enumerate() {
                    match slot {
                        None => writeln!(out, "\t{label}[{idx}] is NULL")?,
                        Some(input) => writeln!(
                            out,
                            "\t{label}[{idx}] from \"{}\":\"{}\"{}{}",
                            input.device_name(),
                            input.object().name,
                            if input.is_dummy() { " (dummy)" } else { "" },
                            slot_value(input)
                        )?,
                    }
                }
            }
            writeln!(out, "{RULE}")
        }
    }
}

pub fn sprint_input(ctx: &InputContext, style: PrintStyle) -> String {
    let mut out = String::new();
    let _ = fprint_input(&mut out, ctx, style);
    out
}

/// One input's value, or `NULL Input = { }` for an empty slot.
pub fn fprint_input_value(out: &mut dyn Write, input: Option<&GenericInput>, style: PrintStyle) -> fmt::Result {
    let Some(input) = input else {
        return writeln!(out, "NULL Input = {{ }}");
    };

    match style {
        PrintStyle::Brief | PrintStyle::OneLine => {
            write!(out, "Input object_name = '{}', ", input.object().name)?;
            match input.snapshot() {
                InputValue::Switch2(s) | InputValue::SwitchN(s) => write!(out, "value = {}", s.value)?,
                InputValue::Valuator(v) => write!(out, "value = {:.2}", v.value)?,
                InputValue::Sensor6(s) => write!(
                    out,
                    "active = {}, oob = {}, error = {}, position = {}",
                    s.active,
                    s.oob,
                    s.error,
                    format_matrix(&s.position)
                )?,
                InputValue::SensorN(n) => {
                    let values: Vec<String> = n.values[..n.dof].iter().map(|v| format!("{v:.2}")).collect();
                    write!(out, "dof = {}, values = [{}]", n.dof, values.join(" "))?;
                }
                InputValue::Control(c) => write!(out, "callback_assigned = {}", c.callback_assigned)?,
            }
            writeln!(out)
        }
        PrintStyle::Verbose => {
            let object = input.object();
            writeln!(out, "Input = {{")?;
            writeln!(out, "\tinput_type = {}", input.input_type())?;
            writeln!(out, "\tchecksum = {}", input.checksum())?;
            writeln!(out, "\tdevice = '{}'", input.device_name())?;
            writeln!(out, "\tobject = '{}'", object.name)?;
            writeln!(out, "\tqueue_me = {}", i32::from(input.queue_me()))?;
            writeln!(out, "\tdummy = {}", i32::from(input.is_dummy()))?;
            match input.timestamp() {
                Some(at) => writeln!(out, "\ttimestamp = {:.2}s ago", at.elapsed().as_secs_f64())?,
                None => writeln!(out, "\ttimestamp = never")?,
            }

            match (input.snapshot(), input.frozen()) {
                (InputValue::Switch2(s) | InputValue::SwitchN(s), frozen) => {
                    let visren = match frozen {
                        FrozenValue::Switch(v) => v,
                        _ => 0,
                    };
                    writeln!(out, "\tvalue = {}\n\tlast_value = {}\n\tvisren_value = {visren}", s.value, s.last_value)?;
                }
                (InputValue::Valuator(v), frozen) => {
                    let visren = match frozen {
                        FrozenValue::Valuator(v) => v,
                        _ => 0.0,
                    };
                    writeln!(
                        out,
                        "\tvalue = {:.6}\n\tlast_value = {:.6}\n\tvisren_value = {visren:.6}",
                        v.value, v.last_value
                    )?;
                }
                (InputValue::Sensor6(s), frozen) => {
                    writeln!(
                        out,
                        "\tdof = {}\n\tactive = {}\n\toob = {}\n\terror = {}",
                        s.dof, s.active, s.oob, s.error
                    )?;
                    writeln!(out, "\tposition  = {}", format_matrix(&s.position))?;
                    writeln!(out, "\tr2e_xform = {}", format_matrix(&s.r2e_xform))?;
                    writeln!(out, "\tt2rw_xform = {}", format_matrix(&s.t2rw_xform))?;
                    if let FrozenValue::Sensor6(m) = frozen {
                        writeln!(out, "\tvisren_pos= {}", format_matrix(&m))?;
                    }
                }
                (InputValue::SensorN(n), _) => {
                    writeln!(out, "\tdof = {}", n.dof)?;
                    for (idx, (value, last)) in n.values[..n.dof].iter().zip(&n.last_values).enumerate() {
                        writeln!(out, "\tvalue[{idx}] = {value:.6} (last {last:.6})")?;
                    }
                }
                (InputValue::Control(c), _) => {
                    writeln!(out, "\tcallback_assigned = {}", c.callback_assigned)?;
                }
            }
            writeln!(out, "}}")
        }
    }
}

/// One device; the verbose form appends the driver's own report.
pub fn fprint_device(out: &mut dyn Write, device: &InputDevice, style: PrintStyle) -> fmt::Result {
    match style {
        PrintStyle::Brief | PrintStyle::OneLine => writeln!(
            out,
            "name = '{}', type = '{}', operating = {}",
            device.name(),
            device.driver_name(),
            i32::from(device.is_operating())
        ),
        PrintStyle::Verbose => {
            writeln!(out, "{{")?;
            writeln!(out, "\tname = \"{}\"", device.name())?;
            writeln!(out, "\ttype = '{}'", device.driver_name())?;
            writeln!(out, "\tversion = '{}'", device.version())?;
            writeln!(out, "\targs = '{}'", device.args())?;
            writeln!(out, "\tt2rw_xform: {}", format_matrix(&device.t2rw()))?;
            writeln!(out, "\toperating = {}", i32::from(device.is_operating()))?;
            write!(out, "\tinput objects [")?;
            for decl in device.decls() {
                write!(out, " \"{}\"", decl.name)?;
            }
            writeln!(out, " ]")?;
            device.print_aux(out, style)?;
            writeln!(out, "}}")
        }
    }
}

pub fn sprint_device(device: &InputDevice, style: PrintStyle) -> String {
    let mut out = String::new();
    let _ = fprint_device(&mut out, device, style);
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use freevr_common::{DeviceConfig, InputConfig, InputDecl};

    use super::*;
    use crate::device::DriverRegistry;

    fn context() -> Arc<InputContext> {
        let decl = |name: &str, desc: &str| InputDecl {
            name: name.to_string(),
            desc: desc.to_string(),
            ..InputDecl::default()
        };
        let config = InputConfig {
            devices: vec![DeviceConfig {
                name: "desk".to_string(),
                driver: "static".to_string(),
                args: "z=-2".to_string(),
                inputs: vec![
                    decl("left", "2switch(desk:constant[1])"),
                    decl("dial", "valuator(desk:constant[0.25])"),
                    decl("head", "6sensor(desk:constant[])"),
                    decl("print_help", "control(desk:print_help)"),
                ],
                ..DeviceConfig::default()
            }],
            ..InputConfig::default()
        };
        InputContext::bring_up(config, &DriverRegistry::with_builtin()).unwrap()
    }

    #[test]
    fn brief_report_counts() {
        let ctx = context();
        let text = sprint_input(&ctx, PrintStyle::Brief);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], RULE);
        assert_eq!(
            &lines[1..9],
            [
                "1 input devices",
                "1 users",
                "1 2-way switches",
                "0 N-way switches",
                "1 valuators",
                "1 6-sensors",
                "0 N-sensors",
                "1 controls",
            ]
        );
        assert_eq!(lines[9], RULE);
    }

    #[test]
    fn verbose_report_lists_slots_and_dummies() {
        let ctx = context();
        ctx.get_from_type_index(InputType::Switch2, 2).unwrap();
        let text = sprint_input(&ctx, PrintStyle::Verbose);
        assert!(text.contains("input map name = \"default\""));
        assert!(text.contains("\tdevice[0] named: \"desk\" (operating)"));
        assert!(text.contains("\tuser[0] named \"user0\", head sensor is \"head\""));
        assert!(text.contains("3 2-way switches:"));
        assert!(text.contains("\t2-way[0] from \"desk\":\"left\" -- 1"));
        assert!(text.contains("\t2-way[1] is NULL"));
        assert!(text.contains("\t2-way[2] from \"Dummy Input Device\":\"unassigned input\" (dummy) -- 0"));
        assert!(text.contains("\tvaluator[0] from \"desk\":\"dial\" -- 0.25"));
        assert!(text.contains("\t6-sensor[0] from \"desk\":\"head\" -- [tr: 0.00 0.00 -2.00]"));
    }

    #[test]
    fn value_lines() {
        let ctx = context();
        let mut out = String::new();
        let switch = ctx.get_from_type_index(InputType::Switch2, 0).unwrap();
        fprint_input_value(&mut out, Some(switch.as_ref()), PrintStyle::Brief).unwrap();
        let help = ctx.get_from_type_index(InputType::Control, 0).unwrap();
        fprint_input_value(&mut out, Some(help.as_ref()), PrintStyle::OneLine).unwrap();
        fprint_input_value(&mut out, None, PrintStyle::Brief).unwrap();
        assert_eq!(
            out,
            "Input object_name = 'left', value = 1\n\
             Input object_name = 'print_help', callback_assigned = 1\n\
             NULL Input = { }\n"
        );
    }

    #[test]
    fn sensor_value_line_has_the_matrix() {
        let ctx = context();
        let head = ctx.get_from_type_index(InputType::Sensor6, 0).unwrap();
        let mut out = String::new();
        fprint_input_value(&mut out, Some(head.as_ref()), PrintStyle::Brief).unwrap();
        assert!(out.contains("active = 0, oob = 0, error = 0, position = (1.0 0.0 0.0 0.0/"));
        assert!(out.contains("0.0 0.0 1.0 -2.0/0.0 0.0 0.0 1.0)"));

        out.clear();
        fprint_input_value(&mut out, Some(head.as_ref()), PrintStyle::Verbose).unwrap();
        assert!(out.starts_with("Input = {\n\tinput_type = 6-sensor\n"));
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn device_reports() {
        let ctx = context();
        let device = ctx.device("desk").unwrap();
        assert_eq!(
            sprint_device(device, PrintStyle::Brief),
            "name = 'desk', type = 'static', operating = 1\n"
        );
        let verbose = sprint_device(device, PrintStyle::Verbose);
        assert!(verbose.contains("\tversion = 'The Static input device, version 0.2'"));
        assert!(verbose.contains("\tinput objects [ \"left\" \"dial\" \"head\" \"print_help\" ]"));
        assert!(verbose.contains("0 Toggles:"));
    }
}
