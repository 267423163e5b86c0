//! Build script for tandem-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates link.toml and compiles it into `link_config.rs`

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Fastest SPI clock the RP2040 can produce as master (clk_peri / 2)
const MAX_SPI_FREQUENCY_HZ: i64 = 62_500_000;

/// Smallest heap that still leaves room for a receive buffer
const MIN_HEAP_SIZE: i64 = 4 * 1024;

fn main() {
    setup_linker();
    let config = validate_config();
    generate_config(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Values read from link.toml
struct LinkConfig {
    frequency_hz: i64,
    mode: i64,
    max_message_len: i64,
    watchdog_timeout_ms: i64,
    payload_timeout_ms: Option<i64>,
    demo_port: i64,
    demo_rounds: i64,
    demo_retry_ms: i64,
    heap_size: i64,
}

/// Validate link.toml at compile time
fn validate_config() -> LinkConfig {
    println!("cargo:rerun-if-changed=link.toml");

    let config_path = Path::new("link.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: link.toml not found!                                     ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a link.toml file in the tandem-firmware   ║\n\
            ║  directory describing the SPI clocking and link timeouts.        ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read link.toml                                 ║\n\
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
                ║  ERROR: Invalid TOML syntax in link.toml                         ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();

    let frequency_hz = integer(&config, "spi", "frequency_hz", &mut errors);
    if !(1..=MAX_SPI_FREQUENCY_HZ).contains(&frequency_hz) {
        errors.push(format!(
            "[spi] frequency_hz must be 1-{}",
            MAX_SPI_FREQUENCY_HZ
        ));
    }

    let mode = integer(&config, "spi", "mode", &mut errors);
    if !(0..=3).contains(&mode) {
        errors.push("[spi] mode must be 0-3".to_string());
    }

    match lookup(&config, "spi", "bit_order") {
        Some(toml::Value::String(order)) if order == "msb" => {}
        Some(toml::Value::String(order)) if order == "lsb" => {
            errors.push("[spi] bit_order 'lsb' is not supported by the RP2040".to_string());
        }
        Some(_) => errors.push("[spi] bit_order must be 'msb'".to_string()),
        None => {}
    }

    let max_message_len = integer(&config, "link", "max_message_len", &mut errors);
    if !(1..=i64::from(u32::MAX)).contains(&max_message_len) {
        errors.push("[link] max_message_len must be at least 1".to_string());
    }

    let watchdog_timeout_ms = integer(&config, "link", "watchdog_timeout_ms", &mut errors);
    if !(1..=i64::from(u32::MAX)).contains(&watchdog_timeout_ms) {
        errors.push("[link] watchdog_timeout_ms must be at least 1".to_string());
    }

    let payload_timeout_ms = match lookup(&config, "link", "payload_timeout_ms") {
        Some(toml::Value::Integer(ms)) if (1..=i64::from(u32::MAX)).contains(ms) => Some(*ms),
        Some(_) => {
            errors.push("[link] payload_timeout_ms must be a positive integer".to_string());
            None
        }
        None => None,
    };

    let demo_port = integer(&config, "demo", "port", &mut errors);
    if !(0..=i64::from(u16::MAX)).contains(&demo_port) {
        errors.push("[demo] port must be 0-65535".to_string());
    }

    let demo_rounds = integer(&config, "demo", "rounds", &mut errors);
    if !(1..=i64::from(u32::MAX)).contains(&demo_rounds) {
        errors.push("[demo] rounds must be at least 1".to_string());
    }

    let demo_retry_ms = integer(&config, "demo", "retry_ms", &mut errors);
    if demo_retry_ms < 1 {
        errors.push("[demo] retry_ms must be at least 1".to_string());
    }

    let heap_size = integer(&config, "memory", "heap_size", &mut errors);
    if heap_size < MIN_HEAP_SIZE {
        errors.push(format!("[memory] heap_size must be at least {}", MIN_HEAP_SIZE));
    }
    if max_message_len > heap_size {
        errors.push("[link] max_message_len cannot exceed [memory] heap_size".to_string());
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid link configuration                               ║\n\
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

    println!("cargo:warning=link.toml validated successfully");

    LinkConfig {
        frequency_hz,
        mode,
        max_message_len,
        watchdog_timeout_ms,
        payload_timeout_ms,
        demo_port,
        demo_rounds,
        demo_retry_ms,
        heap_size,
    }
}

fn lookup<'a>(config: &'a toml::Value, section: &str, key: &str) -> Option<&'a toml::Value> {
    config.get(section).and_then(|s| s.get(key))
}

/// Read a required integer, recording an error if it is missing
fn integer(config: &toml::Value, section: &str, key: &str, errors: &mut Vec<String>) -> i64 {
    match lookup(config, section, key) {
        Some(toml::Value::Integer(value)) => *value,
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            0
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            0
        }
    }
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

/// Emit the validated values as Rust constants
fn generate_config(config: &LinkConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let payload_timeout = match config.payload_timeout_ms {
        Some(ms) => format!("Some({})", ms),
        None => "None".to_string(),
    };

    let source = format!(
        "// Generated from link.toml by build.rs\n\
         pub const SPI_FREQUENCY_HZ: u32 = {};\n\
         pub const SPI_MODE: u8 = {};\n\
         pub const MAX_MESSAGE_LEN: u32 = {};\n\
         pub const WATCHDOG_TIMEOUT_MS: u32 = {};\n\
         pub const PAYLOAD_TIMEOUT_MS: Option<u32> = {};\n\
         pub const DEMO_PORT: u16 = {};\n\
         pub const DEMO_ROUNDS: u32 = {};\n\
         pub const DEMO_RETRY_MS: u64 = {};\n\
         pub const HEAP_SIZE: usize = {};\n",
        config.frequency_hz,
        config.mode,
        config.max_message_len,
        config.watchdog_timeout_ms,
        payload_timeout,
        config.demo_port,
        config.demo_rounds,
        config.demo_retry_ms,
        config.heap_size,
    );

    fs::write(out_dir.join("link_config.rs"), source).unwrap();
}
