//! Byte transport underneath the protocol.
//!
//! The controller answers asynchronously: received bytes are pushed into a
//! registered [`ByteListener`] from a reader thread, while commands are
//! written from the caller's thread.

use log::{debug, error};
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::{BAUD_RATE, DATA_BITS, PARITY, READ_POLL_MS, STOP_BITS};
use crate::error::{Result, TecError};

/// Line settings applied after the port is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

impl PortSettings {
    /// 8N1 at the given baud rate
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        PortSettings {
            baud_rate,
            ..Self::default()
        }
    }
}

impl Default for PortSettings {
    fn default() -> Self {
        PortSettings {
            baud_rate: BAUD_RATE,
            data_bits: DATA_BITS,
            stop_bits: STOP_BITS,
            parity: PARITY,
        }
    }
}

/// Consumer of the asynchronous byte stream
pub trait ByteListener: Send + 'static {
    /// Called with every chunk read from the device
    fn on_bytes(&mut self, bytes: &[u8]);

    /// Called once when no more bytes will be delivered
    fn on_closed(&mut self) {}
}

/// Connection to the controller
pub trait Transport: Send {
    /// Apply line settings
    fn configure(&mut self, settings: &PortSettings) -> Result<()>;

    /// Write one encoded command
    fn write_text(&mut self, text: &str) -> Result<()>;

    /// Register the consumer for received bytes; only one may be registered.
    fn register_listener(&mut self, listener: Box<dyn ByteListener>) -> Result<()>;

    /// Release the connection. Further writes fail with `Disconnected`.
    fn close(&mut self) -> Result<()>;
}

/// [`Transport`] over a serial port
pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn SerialPort>>,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl SerialTransport {
    /// Open a serial port at the default baud rate
    pub fn open(port_name: &str) -> Result<Self> {
        let port = serialport::new(port_name, BAUD_RATE)
            .timeout(Duration::from_millis(READ_POLL_MS))
            .open()?;
        debug!("Opened {}", port_name);

        Ok(SerialTransport {
            name: port_name.to_string(),
            port: Some(port),
            running: Arc::new(AtomicBool::new(false)),
            reader: None,
        })
    }

    /// Port name this transport was opened with
    pub fn name(&self) -> &str {
        &self.name
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TecError::Disconnected)
    }

    fn stop_reader(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                error!("Reader thread for {} panicked", self.name);
            }
        }
    }
}

impl Transport for SerialTransport {
    fn configure(&mut self, settings: &PortSettings) -> Result<()> {
        let port = self.port_mut()?;
        port.set_baud_rate(settings.baud_rate)?;
        port.set_data_bits(settings.data_bits)?;
        port.set_stop_bits(settings.stop_bits)?;
        port.set_parity(settings.parity)?;
        port.set_flow_control(serialport::FlowControl::None)?;
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        let port = self.port_mut()?;
        port.write_all(text.as_bytes())?;
        port.flush()?;
        Ok(())
    }

    fn register_listener(&mut self, listener: Box<dyn ByteListener>) -> Result<()> {
        if self.reader.is_some() {
            return Err(TecError::Transport(format!(
                "listener already registered on {}",
                self.name
            )));
        }

        let reader = self.port_mut()?.try_clone()?;
        self.running.store(true, Ordering::Release);
        let handle = spawn_reader(&self.name, reader, listener, Arc::clone(&self.running))?;
        self.reader = Some(handle);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.stop_reader();
        if self.port.take().is_some() {
            debug!("Closed {}", self.name);
        }
        Ok(())
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.stop_reader();
    }
}

fn spawn_reader(
    name: &str,
    mut port: Box<dyn SerialPort>,
    mut listener: Box<dyn ByteListener>,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let port_name = name.to_string();
    let handle = thread::Builder::new()
        .name(format!("tc720-reader {}", name))
        .spawn(move || {
            let mut buffer = [0u8; 256];
            while running.load(Ordering::Acquire) {
                match port.read(&mut buffer) {
                    Ok(0) => {}
                    Ok(n) => listener.on_bytes(&buffer[..n]),
                    Err(e)
                        if e.kind() == io::ErrorKind::TimedOut
                            || e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        error!("Read from {} failed: {}", port_name, e);
                        break;
                    }
                }
            }
            listener.on_closed();
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_8n1() {
        let settings = PortSettings::default();
        assert_eq!(settings.baud_rate, 230_400);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.parity, Parity::None);
    }

    #[test]
    fn test_with_baud_rate() {
        let settings = PortSettings::with_baud_rate(9600);
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.parity, Parity::None);
    }

    #[test]
    fn test_open_missing_port_fails() {
        assert!(SerialTransport::open("/dev/tc720-does-not-exist").is_err());
    }
}
