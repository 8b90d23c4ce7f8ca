//! Settle Monitor Example
//!
//! Drives the TEC to a target temperature and prints a status snapshot
//! until the temperature settles or the deadline passes:
//! - Command-line port, target, and timeout
//! - Structured status snapshots with JSON export
//!
//! Usage:
//!   cargo run --example settle_monitor -- /dev/ttyUSB0 25.0
//!   cargo run --example settle_monitor -- COM3 10.5 600
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example settle_monitor -- /dev/ttyUSB0 25.0

use log::{error, info, warn};
use std::time::{Duration, Instant};
use tc720_protocol::{Result, Tec, TecConfig};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <port> <target C> [timeout s]", args[0]);
        std::process::exit(2);
    }
    let port_name = &args[1];
    let target: f64 = args[2].parse().unwrap_or_else(|_| {
        eprintln!("Invalid target temperature: {}", args[2]);
        std::process::exit(2);
    });
    let timeout = Duration::from_secs(args.get(3).and_then(|s| s.parse().ok()).unwrap_or(300));

    let config = TecConfig {
        strict_state: true,
        ..TecConfig::default()
    };
    let mut tec = Tec::connect_with_config(port_name, config)?;
    tec.enable()?;
    tec.set_temperature(target)?;
    info!("=== Driving TEC to {:.2}C ===", target);

    let start = Instant::now();
    loop {
        match tec.status() {
            Ok(reading) => {
                if let Ok(json) = serde_json::to_string(&reading) {
                    info!("{}", json);
                }
                if reading.settled == Some(true) {
                    info!("✓ Settled after {:.1}s", start.elapsed().as_secs_f64());
                    break;
                }
            }
            Err(e) => error!("Failed to read status: {}", e),
        }

        if start.elapsed() > timeout {
            warn!("✗ Not settled after {}s", timeout.as_secs());
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    tec.disable()?;
    tec.close_port()?;
    Ok(())
}
