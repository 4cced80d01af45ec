//! Build script for detent-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates machine.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_PULSE_MS: i64 = 2000;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate machine.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=machine.toml");

    let config_path = Path::new("machine.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: machine.toml not found!                                  ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds machine.toml at build time.                 ║\n\
            ║  Please create one in the detent-firmware directory.             ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read machine.toml                              ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in machine.toml                      ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_solenoid(&config, &mut errors);
    validate_verify(&config, &mut errors);
    validate_endurance(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid machine.toml                                     ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=machine.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn table<'a>(config: &'a toml::Value, name: &str) -> Option<&'a toml::value::Table> {
    config.get(name).and_then(|v| v.as_table())
}

fn int(table: &toml::value::Table, key: &str) -> Option<i64> {
    table.get(key).and_then(|v| v.as_integer())
}

fn check_range(
    errors: &mut Vec<String>,
    section: &str,
    table: &toml::value::Table,
    key: &str,
    min: i64,
    max: i64,
) {
    match table.get(key) {
        None => {}
        Some(toml::Value::Integer(v)) if (min..=max).contains(v) => {}
        Some(toml::Value::Integer(_)) => {
            errors.push(format!("[{}] {} must be {}-{}", section, key, min, max));
        }
        Some(_) => errors.push(format!("[{}] {} must be an integer", section, key)),
    }
}

/// Only sections the firmware parser knows are allowed
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(root) = config.as_table() else {
        return;
    };

    for (name, value) in root {
        match name.as_str() {
            "solenoid" | "verify" | "endurance" | "motion_guard" => {}
            "hall_sensor" => {
                if let Some(sensors) = value.as_table() {
                    for id in sensors.keys() {
                        if id != "1" && id != "2" {
                            errors.push(format!("[hall_sensor.{}] sensor must be 1 or 2", id));
                        }
                    }
                }
            }
            other => errors.push(format!("Unknown section [{}]", other)),
        }
    }
}

fn validate_solenoid(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(solenoid) = table(config, "solenoid") else {
        return;
    };

    check_range(errors, "solenoid", solenoid, "pulse_ms", 1, MAX_PULSE_MS);
    check_range(errors, "solenoid", solenoid, "supply_mv", 0, u32::MAX as i64);
    check_range(errors, "solenoid", solenoid, "coil_resistance_mohm", 1, u32::MAX as i64);
}

fn validate_verify(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(verify) = table(config, "verify") else {
        return;
    };

    check_range(errors, "verify", verify, "position_a_sensor", 1, 2);
    check_range(errors, "verify", verify, "position_b_sensor", 1, 2);
    check_range(errors, "verify", verify, "timeout_ms", 1, u16::MAX as i64);

    let a = int(verify, "position_a_sensor").unwrap_or(1);
    let b = int(verify, "position_b_sensor").unwrap_or(2);
    if a == b {
        errors.push("[verify] positions A and B need different sensors".to_string());
    }
}

fn validate_endurance(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(endurance) = table(config, "endurance") else {
        return;
    };

    if let Some(direction) = endurance.get("direction") {
        let valid = ["a", "A", "only_a", "b", "B", "only_b", "alternate", "Alternate", "both"];
        match direction.as_str() {
            Some(d) if valid.contains(&d) => {}
            _ => errors.push(
                "[endurance] direction must be 'only_a', 'only_b' or 'alternate'".to_string(),
            ),
        }
    }

    check_range(errors, "endurance", endurance, "pulse_ms", 1, MAX_PULSE_MS);
    check_range(errors, "endurance", endurance, "cooldown_ms", 0, u16::MAX as i64);
    check_range(errors, "endurance", endurance, "sensor", 1, 2);
    check_range(errors, "endurance", endurance, "max_attempts", 1, u8::MAX as i64);
    check_range(errors, "endurance", endurance, "max_consecutive_failures", 1, u8::MAX as i64);
    check_range(errors, "endurance", endurance, "max_time_ms", 0, u32::MAX as i64);
    check_range(errors, "endurance", endurance, "max_cycles", 0, u32::MAX as i64);
}
