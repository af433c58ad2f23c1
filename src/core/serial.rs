//! Newline-delimited line source over the gateway's serial port.

use std::{
    io::{self, Read},
    time::Duration,
};

use serialport::SerialPort;
use tracing::{debug, info, trace};

use super::error::BridgeError;
use crate::config::serial::SerialConfig;

/// Source of raw telemetry lines.
pub trait LineSource: Send {
    /// Next complete line without its `\n`, or `None` when no full line is
    /// waiting. Never blocks for longer than the driver's read timeout.
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Releases the underlying device. Further calls are no-ops.
    fn close(&mut self) -> io::Result<()>;
}

/// Accumulates bytes and splits them into lines.
///
/// A run of `max_len` bytes without a newline is handed out as a line of
/// its own so a noisy port cannot grow the buffer without bound.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    max_len: usize,
}

impl LineBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_len),
            max_len: max_len.max(1),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        if let Some(end) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=end).collect();
            line.pop();
            return Some(line);
        }
        if self.buf.len() >= self.max_len {
            debug!("No newline within {} bytes, flushing", self.max_len);
            return Some(self.buf.drain(..self.max_len).collect());
        }
        None
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// `LineSource` backed by a `serialport` handle, opened 8N1 without flow
/// control.
pub struct SerialLineSource {
    name: String,
    port: Option<Box<dyn SerialPort>>,
    buffer: LineBuffer,
    scratch: Vec<u8>,
}

impl SerialLineSource {
    pub fn open(config: &SerialConfig) -> Result<Self, BridgeError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(Duration::from_millis(config.timeout_ms))
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|source| BridgeError::SerialOpen {
                port: config.port.clone(),
                source,
            })?;

        info!(
            "Opened serial port {} at {} baud",
            config.port, config.baud_rate
        );

        Ok(Self {
            name: config.port.clone(),
            port: Some(port),
            buffer: LineBuffer::new(config.max_line_length),
            scratch: vec![0; config.max_line_length],
        })
    }

    /// Reads whatever the driver reports as waiting, at most one buffer full.
    fn fill(&mut self) -> io::Result<()> {
        let Some(port) = self.port.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("serial port {} is closed", self.name),
            ));
        };

        let waiting = port.bytes_to_read().map_err(io::Error::from)? as usize;
        if waiting == 0 {
            return Ok(());
        }

        let want = waiting.min(self.scratch.len());
        match port.read(&mut self.scratch[..want]) {
            Ok(0) => Ok(()),
            Ok(n) => {
                trace!("Read {} bytes from {}", n, self.name);
                self.buffer.extend(&self.scratch[..n]);
                Ok(())
            }
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl LineSource for SerialLineSource {
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        if let Some(line) = self.buffer.next_line() {
            return Ok(Some(line));
        }
        self.fill()?;
        Ok(self.buffer.next_line())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.port.take().is_some() {
            if self.buffer.pending() > 0 {
                debug!(
                    "Dropping {} unterminated bytes from {}",
                    self.buffer.pending(),
                    self.name
                );
            }
            info!("Closed serial port {}", self.name);
        }
        Ok(())
    }
}
