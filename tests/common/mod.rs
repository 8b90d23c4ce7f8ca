#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tc720_protocol::command::{Command, Opcode};
use tc720_protocol::{ByteListener, PortSettings, Result, TecConfig, TecError, Transport};

/// Simulated controller behind a [`MockTransport`]
#[derive(Debug, Default)]
pub struct MockDevice {
    /// Every frame written, in order
    pub written: Vec<String>,
    /// Input 1 temperature in hundredths of a degree
    pub temperature_raw: u16,
    /// Number of upcoming commands to answer with a NAK
    pub naks_remaining: u32,
    /// Never answer
    pub silent: bool,
    /// Fail the next writes with a transport error
    pub fail_writes: bool,
    pub configured: Option<PortSettings>,
    pub closed: bool,
}

impl MockDevice {
    fn reply_to(&mut self, frame: &str) -> String {
        let command = match Command::parse(frame) {
            Ok(command) => command,
            Err(_) => return "*XXXX60^".to_string(),
        };
        if self.naks_remaining > 0 {
            self.naks_remaining -= 1;
            return "*XXXX60^".to_string();
        }

        let data = match command.opcode() {
            Opcode::ReadTemperature => format!("{:04x}", self.temperature_raw),
            _ => command.payload().to_string(),
        };
        let sum: u32 = data.chars().map(|c| c as u32).sum();
        format!("*{}{:02x}^", data, sum & 0xff)
    }
}

type SharedListener = Arc<Mutex<Option<Box<dyn ByteListener>>>>;

/// Mock transport that answers each written frame through the listener
pub struct MockTransport {
    device: Arc<Mutex<MockDevice>>,
    listener: SharedListener,
    /// Deliver replies from a separate thread, split into two chunks
    threaded: bool,
}

impl MockTransport {
    pub fn new() -> (Self, Arc<Mutex<MockDevice>>) {
        Self::build(false)
    }

    pub fn threaded() -> (Self, Arc<Mutex<MockDevice>>) {
        Self::build(true)
    }

    fn build(threaded: bool) -> (Self, Arc<Mutex<MockDevice>>) {
        let device = Arc::new(Mutex::new(MockDevice {
            temperature_raw: 2500,
            ..MockDevice::default()
        }));
        let transport = MockTransport {
            device: Arc::clone(&device),
            listener: Arc::new(Mutex::new(None)),
            threaded,
        };
        (transport, device)
    }

    /// Handle for pushing bytes the device sends on its own
    pub fn injector(&self) -> SharedListener {
        Arc::clone(&self.listener)
    }
}

impl Transport for MockTransport {
    fn configure(&mut self, settings: &PortSettings) -> Result<()> {
        self.device.lock().unwrap().configured = Some(*settings);
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        let reply = {
            let mut device = self.device.lock().unwrap();
            if device.closed {
                return Err(TecError::Disconnected);
            }
            if device.fail_writes {
                return Err(TecError::Transport("write failed".into()));
            }
            device.written.push(text.to_string());
            if device.silent {
                return Ok(());
            }
            device.reply_to(text)
        };

        if self.threaded {
            let listener = Arc::clone(&self.listener);
            thread::spawn(move || {
                let (head, tail) = reply.as_bytes().split_at(3);
                thread::sleep(Duration::from_millis(5));
                deliver(&listener, head);
                thread::sleep(Duration::from_millis(5));
                deliver(&listener, tail);
            });
        } else {
            deliver(&self.listener, reply.as_bytes());
        }
        Ok(())
    }

    fn register_listener(&mut self, listener: Box<dyn ByteListener>) -> Result<()> {
        *self.listener.lock().unwrap() = Some(listener);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.device.lock().unwrap().closed = true;
        if let Some(mut listener) = self.listener.lock().unwrap().take() {
            listener.on_closed();
        }
        Ok(())
    }
}

pub fn deliver(listener: &SharedListener, bytes: &[u8]) {
    if let Some(listener) = listener.lock().unwrap().as_mut() {
        listener.on_bytes(bytes);
    }
}

/// Config with short waits so failing paths finish quickly
pub fn fast_config() -> TecConfig {
    TecConfig {
        response_timeout_ms: 200,
        max_attempts: 3,
        ..TecConfig::default()
    }
}
