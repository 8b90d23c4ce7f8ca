//! Basic Usage Example
//!
//! This example demonstrates the core functionality of the TC-720 protocol library:
//! - Listing and selecting serial ports
//! - Connecting (output disabled, PID tuning applied)
//! - Enabling the output and writing a setpoint
//! - Reading the actual temperature back
//! - Closing the port
//!
//! Usage:
//!   cargo run --example basic_usage                  # Interactive mode
//!   cargo run --example basic_usage -- COM3          # Specify port
//!   cargo run --example basic_usage -- /dev/ttyUSB0
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example basic_usage   # show every TX/RX frame
//!   RUST_LOG=info cargo run --example basic_usage

use inquire::Select;
use log::info;
use tc720_protocol::{Result, Tec};

/// Interactive serial port selection using inquire
fn select_port() -> Result<String> {
    let ports = Tec::list_ports()?;

    if ports.is_empty() {
        eprintln!("No serial ports found!");
        std::process::exit(1);
    }

    let port_names: Vec<String> = ports
        .iter()
        .map(|p| format!("{} - {:?}", p.port_name, p.port_type))
        .collect();

    let selection = Select::new("Select a serial port:", port_names)
        .prompt()
        .map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Selection cancelled: {}", e),
            )
        })?;

    // Extract just the port name (before " - ")
    let port_name = selection.split(" - ").next().unwrap_or(&selection).to_string();
    Ok(port_name)
}

fn main() -> Result<()> {
    // Initialize logger with default info level if RUST_LOG is not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Get port name from command line argument or interactive selection
    let port_name = std::env::args()
        .nth(1)
        .map(Ok)
        .unwrap_or_else(|| select_port())?;

    let mut tec = Tec::connect(&port_name)?;
    info!("✓ Connected, output disabled and PID tuning applied");

    // Setting a temperature while disabled is ignored with a warning
    tec.set_temperature(3.456)?;
    info!("Setpoint while disabled: {:?}", tec.read_temperature_setpoint());

    info!("=== Enabling Output ===");
    tec.enable()?;
    tec.set_temperature(3.456)?;
    info!("Setpoint: {:?}", tec.read_temperature_setpoint());

    let actual = tec.read_temperature_value()?;
    info!("Actual temperature: {:.2}C", actual);
    info!("Settled: {}", tec.temperature_settled()?);

    tec.disable()?;
    tec.close_port()?;
    info!("=== Basic Usage Complete ===");

    Ok(())
}
