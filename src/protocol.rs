use chrono::Utc;
use log::{info, warn};

use crate::command::{Command, Opcode};
use crate::constants::SETTLED_HYSTERESIS_PERCENT;
use crate::correlator::Correlator;
use crate::error::{Result, TecError};
use crate::frame::Response;
use crate::transport::{SerialTransport, Transport};
use crate::types::*;

/// Percent difference of the actual temperature from the setpoint,
/// relative to their mean.
pub fn hysteresis(actual: f64, setpoint: f64) -> f64 {
    if actual == setpoint {
        return 0.0;
    }
    (actual - setpoint).abs() / ((setpoint + actual) / 2.0) * 100.0
}

/// True when the hysteresis is strictly below the settle threshold
pub fn is_settled(actual: f64, setpoint: f64) -> bool {
    let h = hysteresis(actual, setpoint);
    h.is_finite() && h < SETTLED_HYSTERESIS_PERCENT
}

/// Main TC-720 session
///
/// Callers sharing a session between threads must serialize access to it;
/// only one command is ever in flight.
pub struct Tec<T: Transport = SerialTransport> {
    link: Option<Correlator<T>>,
    state: DeviceState,
    config: TecConfig,
}

impl Tec<SerialTransport> {
    /// Connect to the controller with the default configuration
    pub fn connect(port_name: &str) -> Result<Self> {
        Self::connect_with_config(port_name, TecConfig::default())
    }

    /// Connect to the controller, disable its output and apply PID tuning
    pub fn connect_with_config(port_name: &str, config: TecConfig) -> Result<Self> {
        info!("Connecting to TC-720 on {}", port_name);
        let transport = SerialTransport::open(port_name)?;
        Self::with_transport(transport, config)
    }

    /// List available serial ports
    pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>> {
        Ok(serialport::available_ports()?)
    }
}

impl<T: Transport> Tec<T> {
    /// Run the connect sequence over an already opened transport
    pub fn with_transport(transport: T, config: TecConfig) -> Result<Self> {
        let mut link = Correlator::new(transport, config.retry_policy())?;
        link.configure(&config.port_settings())?;

        let mut tec = Tec {
            link: Some(link),
            state: DeviceState::default(),
            config,
        };
        tec.disable()?;
        tec.apply_pid()?;
        Ok(tec)
    }

    fn apply_pid(&mut self) -> Result<()> {
        let pid = self.config.pid;
        info!(
            "Applying PID tuning: P={} I={} D={}",
            pid.proportional_bandwidth, pid.integral_gain, pid.derivative_gain
        );
        self.send(&Command::with_value(
            Opcode::ProportionalBandwidth,
            pid.proportional_bandwidth,
        )?)?;
        self.send(&Command::with_value(Opcode::IntegralGain, pid.integral_gain)?)?;
        self.send(&Command::with_value(Opcode::DerivativeGain, pid.derivative_gain)?)?;
        Ok(())
    }

    fn send(&mut self, command: &Command) -> Result<Response> {
        self.link.as_mut().ok_or(TecError::Disconnected)?.send(command)
    }

    pub fn config(&self) -> &TecConfig {
        &self.config
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.output_enabled
    }

    /// False after `close_port`, or once the reader lost the port
    pub fn is_connected(&self) -> bool {
        self.link.as_ref().map_or(false, |link| link.is_open())
    }

    /// Enable the output
    pub fn enable(&mut self) -> Result<()> {
        self.send(&Command::raw(Opcode::OutputEnable, 1)?)?;
        self.state.output_enabled = true;
        info!("Output enabled");
        Ok(())
    }

    /// Disable the output
    pub fn disable(&mut self) -> Result<()> {
        self.send(&Command::raw(Opcode::OutputEnable, 0)?)?;
        self.state.output_enabled = false;
        info!("Output disabled");
        Ok(())
    }

    /// Set temperature (degrees C).
    ///
    /// With the output disabled nothing is sent and the setpoint is left
    /// alone; this is logged as a warning, or reported as
    /// [`TecError::NotEnabled`] when `strict_state` is configured.
    pub fn set_temperature(&mut self, t: f64) -> Result<()> {
        if !self.state.output_enabled {
            if self.config.strict_state {
                return Err(TecError::NotEnabled { requested: t });
            }
            warn!("Attempting to set temperature {} with output DISABLED, ignoring", t);
            return Ok(());
        }

        let command = Command::with_value(Opcode::SetTemperature, t)?;
        self.send(&command)?;
        self.state.setpoint = Some(t);
        Ok(())
    }

    /// Read the actual temperature of the TEC in degrees C
    pub fn read_temperature_value(&mut self) -> Result<f64> {
        let response = self.send(&Command::read(Opcode::ReadTemperature)?)?;
        response.value()
    }

    /// User-defined setpoint in degrees C, `None` if never set
    pub fn read_temperature_setpoint(&self) -> Option<f64> {
        self.state.setpoint
    }

    /// Whether the actual temperature has reached the setpoint
    pub fn temperature_settled(&mut self) -> Result<bool> {
        let setpoint = self.state.setpoint.ok_or(TecError::SetpointUnset)?;
        let actual = self.read_temperature_value()?;
        Ok(is_settled(actual, setpoint))
    }

    /// Read the temperature and summarize it against the setpoint
    pub fn status(&mut self) -> Result<TemperatureReading> {
        let temperature = self.read_temperature_value()?;
        let setpoint = self.state.setpoint;
        Ok(TemperatureReading {
            timestamp: Utc::now(),
            temperature,
            setpoint,
            output_enabled: self.state.output_enabled,
            hysteresis: setpoint.map(|s| hysteresis(temperature, s)),
            settled: setpoint.map(|s| is_settled(temperature, s)),
        })
    }

    /// Close the serial port. The cached state is discarded.
    pub fn close_port(&mut self) -> Result<()> {
        self.state = DeviceState::default();
        match self.link.take() {
            Some(mut link) => {
                info!("Closing port");
                link.close()
            }
            None => Ok(()),
        }
    }
}
