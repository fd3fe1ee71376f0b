//! [`SerialLink`] over a real serial port.

use std::io::{self, Read, Write};

use kmp_driver::SerialLink;
use kmp_protocol::RESPONSE_TIMEOUT;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};

/// A serial port configured for the meter's 8N2 line settings.
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
}

impl SerialPortLink {
    /// Open the port named in `config`.
    pub fn open(config: &RunnerConfig) -> RunnerResult<Self> {
        let name = config
            .port
            .clone()
            .ok_or_else(|| RunnerError::invalid("no serial port configured"))?;
        let stop_bits = match config.stop_bits {
            1 => StopBits::One,
            2 => StopBits::Two,
            n => return Err(RunnerError::invalid(format!("unsupported stop bits {}", n))),
        };

        let port = serialport::new(&name, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(stop_bits)
            .flow_control(FlowControl::None)
            .timeout(RESPONSE_TIMEOUT)
            .open()
            .map_err(|source| RunnerError::OpenPort {
                port: name.clone(),
                source,
            })?;

        debug!("Opened {} at {} baud", name, config.baud_rate);
        Ok(SerialPortLink { port })
    }
}

impl std::fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortLink")
            .field("port", &self.port.name())
            .finish()
    }
}

impl SerialLink for SerialPortLink {
    // No flush here: on unix it drains the output queue, and the input
    // clear that follows could then race the meter's first response bytes.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn clear_input(&mut self) -> io::Result<()> {
        Ok(self.port.clear(ClearBuffer::Input)?)
    }
}

/// Names of the serial ports on this machine.
pub fn available_ports() -> Vec<String> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}
