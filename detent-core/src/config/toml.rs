//! Simple TOML parser for machine configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! `machine.toml`. It does NOT support the full TOML spec and does not
//! allocate.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - [section] headers
//! - [section.name] headers (`[hall_sensor.1]`)
//! - Comments (# ...)
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Dotted keys outside section headers
//!
//! ```toml
//! [solenoid]
//! pulse_ms = 100
//! supply_mv = 24000
//! coil_resistance_mohm = 30000
//!
//! [hall_sensor.1]
//! active_low = true
//!
//! [verify]
//! position_a_sensor = 1
//! position_b_sensor = 2
//! timeout_ms = 500
//!
//! [endurance]
//! direction = "alternate"
//! max_attempts = 3
//! ```

use crate::traits::SensorId;

use super::types::{ConfigError, DirectionMode, MachineConfig};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Line is neither a header, a comment nor `key = value`
    InvalidLine,
    /// Key not valid in its section
    UnknownKey,
    /// Invalid value type or out of range
    InvalidValue,
    /// Parsed fine but failed validation
    Invalid(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        ParseError::Invalid(e)
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Solenoid,
    HallSensor(usize),
    Verify,
    Endurance,
    MotionGuard,
}

/// Parse TOML configuration into a validated [`MachineConfig`]
///
/// Sections and keys that are absent keep their defaults.
pub fn parse_config(input: &str) -> Result<MachineConfig, ParseError> {
    let mut config = MachineConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = strip_comment(line).trim();

        // Skip empty lines and comments
        if line.is_empty() {
            continue;
        }

        // Check for section header
        if line.starts_with('[') {
            if !line.ends_with(']') {
                return Err(ParseError::InvalidSection);
            }
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(section, key, value, &mut config)?;
    }

    config.validate()?;
    Ok(config)
}

/// Parse section header like "solenoid" or "hall_sensor.2"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    let header = header.trim();

    if let Some((kind, name)) = header.split_once('.') {
        return match kind.trim() {
            "hall_sensor" => {
                let n: u8 = name.trim().parse().map_err(|_| ParseError::InvalidSection)?;
                let id = SensorId::from_number(n).ok_or(ParseError::InvalidSection)?;
                Ok(Section::HallSensor(id.number() as usize - 1))
            }
            _ => Err(ParseError::InvalidSection),
        };
    }

    match header {
        "solenoid" => Ok(Section::Solenoid),
        "verify" => Ok(Section::Verify),
        "endurance" => Ok(Section::Endurance),
        "motion_guard" => Ok(Section::MotionGuard),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Drop a trailing `# comment` that is not inside a string
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(hash_pos) if line[..hash_pos].matches('"').count() % 2 == 0 => &line[..hash_pos],
        _ => line,
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        // Allow unquoted strings for simple values
        value
    }
}

/// Parse an integer value, allowing `_` digit separators
fn parse_int<T: TryFrom<u64>>(value: &str) -> Result<T, ParseError> {
    let mut acc: u64 = 0;
    let mut digits = 0;
    for c in value.chars() {
        match c {
            '_' => continue,
            '0'..='9' => {
                acc = acc
                    .checked_mul(10)
                    .and_then(|a| a.checked_add(c as u64 - '0' as u64))
                    .ok_or(ParseError::InvalidValue)?;
                digits += 1;
            }
            _ => return Err(ParseError::InvalidValue),
        }
    }
    if digits == 0 {
        return Err(ParseError::InvalidValue);
    }
    T::try_from(acc).map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a sensor number (1 or 2)
fn parse_sensor(value: &str) -> Result<SensorId, ParseError> {
    SensorId::from_number(parse_int(value)?).ok_or(ParseError::InvalidValue)
}

/// Parse direction mode
fn parse_direction(value: &str) -> Result<DirectionMode, ParseError> {
    match parse_string(value) {
        "a" | "A" | "only_a" => Ok(DirectionMode::OnlyA),
        "b" | "B" | "only_b" => Ok(DirectionMode::OnlyB),
        "alternate" | "Alternate" | "both" => Ok(DirectionMode::Alternate),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut MachineConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Root => return Err(ParseError::UnknownKey),
        Section::Solenoid => {
            let solenoid = &mut config.solenoid;
            match key {
                "pulse_ms" => solenoid.pulse_ms = parse_int(value)?,
                "supply_mv" => solenoid.supply_mv = parse_int(value)?,
                "coil_resistance_mohm" => solenoid.coil_resistance_mohm = parse_int(value)?,
                "enable_inverted" => solenoid.enable_inverted = parse_bool(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::HallSensor(index) => match key {
            "active_low" => config.hall[index].active_low = parse_bool(value)?,
            _ => return Err(ParseError::UnknownKey),
        },
        Section::Verify => {
            let verify = &mut config.verify;
            match key {
                "position_a_sensor" => verify.mapping.position_a = parse_sensor(value)?,
                "position_b_sensor" => verify.mapping.position_b = parse_sensor(value)?,
                "timeout_ms" => verify.timeout_ms = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Endurance => {
            let policy = &mut config.endurance;
            match key {
                "direction" => policy.direction = parse_direction(value)?,
                "pulse_ms" => policy.pulse_ms = parse_int(value)?,
                "cooldown_ms" => policy.cooldown_ms = parse_int(value)?,
                "sensor" => policy.single_direction_sensor = parse_sensor(value)?,
                "max_attempts" => policy.max_attempts = parse_int(value)?,
                "max_consecutive_failures" => policy.max_consecutive_failures = parse_int(value)?,
                "max_time_ms" => policy.max_total_time_ms = parse_int(value)?,
                "max_cycles" => policy.max_cycles = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::MotionGuard => match key {
            "deadband" => config.motion_guard.deadband = parse_int(value)?,
            _ => return Err(ParseError::UnknownKey),
        },
    }
    Ok(())
}
