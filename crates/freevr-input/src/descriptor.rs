//! Parsing of input declaration strings and logical map addresses.
//!
//! Three small grammars meet here:
//!
//! * input descriptions, `"<type>(<args>)"`, e.g. `2switch(wand:button[1])`
//! * device/type/instance triples, `"<device>:<type>[<instance>]"`
//! * logical map addresses, `"<kind>[<index>]"`, e.g. `valuator[2]`

use freevr_common::helpers::{parse_int_prefix, starts_with_ignore_case};

use crate::types::InputType;
use crate::{InputError, InputResult};

/// A parsed `"<type>(<args>)"` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescription {
    pub input_type: InputType,
    pub args: String,
}

pub fn parse_input_type_name(name: &str) -> Option<InputType> {
    let name = name.trim();
    let input_type = if name.eq_ignore_ascii_case("2switch") || name.eq_ignore_ascii_case("switch2") {
        InputType::Switch2
    } else if name.eq_ignore_ascii_case("Nswitch") || name.eq_ignore_ascii_case("switchN") {
        InputType::SwitchN
    } else if name.eq_ignore_ascii_case("valuator") {
        InputType::Valuator
    } else if name.eq_ignore_ascii_case("6sensor") || name.eq_ignore_ascii_case("sensor6") {
        InputType::Sensor6
    } else if name.eq_ignore_ascii_case("Nsensor") || name.eq_ignore_ascii_case("sensorN") {
        InputType::SensorN
    } else if name.eq_ignore_ascii_case("control") {
        InputType::Control
    } else {
        return None;
    };
    Some(input_type)
}

/// Parses `"<type>(<args>)"`. The closing parenthesis is optional.
pub fn parse_input_description(description: &str) -> InputResult<InputDescription> {
    let Some((type_name, rest)) = description.split_once('(') else {
        return Err(InputError::InvalidDescriptor(format!(
            "missing '(' in input description '{description}'"
        )));
    };
    let input_type = parse_input_type_name(type_name).ok_or_else(|| {
        InputError::InvalidDescriptor(format!(
            "unknown input type '{}' in '{description}'",
            type_name.trim()
        ))
    })?;
    let args = match rest.find(')') {
        Some(close) => &rest[..close],
        None => rest,
    };
    Ok(InputDescription {
        input_type,
        args: args.to_string(),
    })
}

/// Device, type and instance fields of `"<device>:<type>[<instance>]"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDti {
    pub device: String,
    pub kind: String,
    pub instance: String,
}

impl InputDti {
    /// The instance up to the first comma.
    pub fn instance_value(&self) -> &str {
        match self.instance.split_once(',') {
            Some((value, _)) => value,
            None => &self.instance,
        }
    }

    /// Whatever follows the first comma of the instance, comma included.
    pub fn instance_args(&self) -> Option<&str> {
        self.instance.find(',').map(|idx| &self.instance[idx..])
    }
}

/// Parses `"<device>:<type>[<instance>]"`.
///
/// Without a `[` the whole text after the colon is the instance and the type
/// is empty. A `[` that precedes the colon means the colon belongs to the
/// instance and there is no device.
pub fn parse_input_dti(text: &str) -> InputResult<InputDti> {
    let colon = text.find(':');
    let mut dti = InputDti::default();

    let after_colon = match colon {
        Some(idx) => {
            dti.device = text[..idx].to_string();
            idx + 1
        }
        None => 0,
    };

    let Some(open) = text.find('[') else {
        dti.instance = text[after_colon..].to_string();
        return Ok(dti);
    };

    match colon {
        Some(idx) if open < idx => {
            dti.device.clear();
            dti.kind = text[..open].to_string();
        }
        _ => dti.kind = text[after_colon..open].to_string(),
    }

    match text.find(']') {
        Some(close) if close > open => {
            dti.instance = text[open + 1..close].to_string();
            Ok(dti)
        }
        _ => Err(InputError::InvalidDescriptor(format!(
            "missing ']' in input specifier '{text}'"
        ))),
    }
}

/// A parsed logical address such as `2-switch[3]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapAddress {
    pub input_type: InputType,
    /// May be negative; lookups treat that as out of range.
    pub index: i32,
}

const MAPNAME_PREFIXES: &[(&str, InputType)] = &[
    ("2-way[", InputType::Switch2),
    ("2-switch[", InputType::Switch2),
    ("2switch[", InputType::Switch2),
    ("switch2[", InputType::Switch2),
    ("s2[", InputType::Switch2),
    ("N-way[", InputType::SwitchN),
    ("N-switch[", InputType::SwitchN),
    ("Nswitch[", InputType::SwitchN),
    ("switchN[", InputType::SwitchN),
    ("valuator[", InputType::Valuator),
    ("v[", InputType::Valuator),
    ("6-sensor[", InputType::Sensor6),
    ("6sensor[", InputType::Sensor6),
    ("sensor6[", InputType::Sensor6),
    ("N-sensor[", InputType::SensorN),
    ("Nsensor[", InputType::SensorN),
    ("sensorN[", InputType::SensorN),
    ("control[", InputType::Control),
];

/// Parses a logical address, matching kind aliases case-insensitively.
pub fn parse_mapname(mapname: &str) -> InputResult<MapAddress> {
    let mapname = mapname.trim_start();
    MAPNAME_PREFIXES
        .iter()
        .find(|(prefix, _)| starts_with_ignore_case(mapname, prefix))
        .map(|(prefix, input_type)| MapAddress {
            input_type: *input_type,
            index: parse_int_prefix(&mapname[prefix.len()..]),
        })
        .ok_or_else(|| InputError::InvalidMapName(mapname.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_types_are_case_insensitive() {
        let desc = parse_input_description("SWITCH2(wand:button[1])").unwrap();
        assert_eq!(desc.input_type, InputType::Switch2);
        assert_eq!(desc.args, "wand:button[1]");

        let desc = parse_input_description("sensorn(glove:finger[0])").unwrap();
        assert_eq!(desc.input_type, InputType::SensorN);

        let desc = parse_input_description("6sensor(tracker:sensor[2]").unwrap();
        assert_eq!(desc.input_type, InputType::Sensor6);
        assert_eq!(desc.args, "tracker:sensor[2]");
    }

    #[test]
    fn description_errors() {
        assert!(matches!(
            parse_input_description("switch2"),
            Err(InputError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            parse_input_description("joystick(x)"),
            Err(InputError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn dti_full_form() {
        let dti = parse_input_dti("wand:button[3]").unwrap();
        assert_eq!(dti.device, "wand");
        assert_eq!(dti.kind, "button");
        assert_eq!(dti.instance, "3");
    }

    #[test]
    fn dti_without_square_is_all_instance() {
        let dti = parse_input_dti("keyboard:Escape").unwrap();
        assert_eq!(dti.device, "keyboard");
        assert_eq!(dti.kind, "");
        assert_eq!(dti.instance, "Escape");

        let dti = parse_input_dti("plain").unwrap();
        assert_eq!(dti.device, "");
        assert_eq!(dti.instance, "plain");
    }

    #[test]
    fn dti_colon_inside_instance() {
        let dti = parse_input_dti("constant[loc:1,2]").unwrap();
        assert_eq!(dti.device, "");
        assert_eq!(dti.kind, "constant");
        assert_eq!(dti.instance, "loc:1,2");
    }

    #[test]
    fn dti_missing_close_is_an_error() {
        assert!(parse_input_dti("wand:button[3").is_err());
    }

    #[test]
    fn dti_instance_value_and_args() {
        let dti = parse_input_dti(":constant[id,r2e]").unwrap();
        assert_eq!(dti.instance_value(), "id");
        assert_eq!(dti.instance_args(), Some(",r2e"));

        let dti = parse_input_dti(":toggle[5]").unwrap();
        assert_eq!(dti.instance_args(), None);
    }

    #[test]
    fn mapname_aliases() {
        for (name, expected) in [
            ("2-way[1]", InputType::Switch2),
            ("s2[1]", InputType::Switch2),
            ("SWITCH2[1]", InputType::Switch2),
            ("n-way[1]", InputType::SwitchN),
            ("v[1]", InputType::Valuator),
            ("6sensor[1]", InputType::Sensor6),
            ("nsensor[1]", InputType::SensorN),
            ("control[1]", InputType::Control),
        ] {
            let address = parse_mapname(name).unwrap();
            assert_eq!(address.input_type, expected, "{name}");
            assert_eq!(address.index, 1);
        }
    }

    #[test]
    fn mapname_unknown_kind() {
        assert!(matches!(
            parse_mapname("joystick[0]"),
            Err(InputError::InvalidMapName(_))
        ));
    }

    #[test]
    fn mapname_negative_index_is_kept() {
        assert_eq!(parse_mapname("valuator[-2]").unwrap().index, -2);
    }
}
