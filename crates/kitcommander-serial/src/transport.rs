//! Transport layer abstraction for firmware communication
//!
//! The drivers only need a byte stream with a read timeout. This module
//! provides the trait and the serial port implementation.

use std::time::{Duration, Instant};

use crate::error::Result;

/// Transport trait for reading and writing bytes
pub trait Transport {
    /// Write all bytes to the transport
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes
    ///
    /// Waits at most the current timeout. Returns the number of bytes read,
    /// or 0 if nothing arrived in time.
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Number of bytes that can be read without blocking
    fn bytes_available(&mut self) -> Result<usize>;

    /// Current read timeout
    fn timeout(&self) -> Duration;

    /// Set the read timeout
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Flush any buffered output
    fn flush(&mut self) -> Result<()>;

    /// Read until `terminator` has been received or the timeout elapses
    ///
    /// The returned bytes include the terminator when it was found. On
    /// timeout whatever arrived so far is returned, possibly nothing. The
    /// deadline covers the whole call, so a peer that keeps sending without
    /// ever sending the terminator cannot stall the caller.
    fn read_until(&mut self, terminator: &[u8]) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.timeout();
        let mut data = Vec::new();
        let mut byte = [0u8; 1];

        while !data.ends_with(terminator) {
            if Instant::now() >= deadline {
                break;
            }
            if self.read_some(&mut byte)? == 1 {
                data.push(byte[0]);
            }
        }

        Ok(data)
    }

    /// Read and return everything that is pending right now
    fn drain(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut buf = [0u8; 512];

        loop {
            let pending = self.bytes_available()?;
            if pending == 0 {
                break;
            }
            let want = pending.min(buf.len());
            let n = self.read_some(&mut buf[..want])?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
        }

        Ok(data)
    }
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};

    /// Serial line settings
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SerialSettings {
        /// Baud rate
        pub baud: u32,
        /// Read timeout
        pub timeout: Duration,
        /// Stop bits
        pub stop_bits: StopBits,
    }

    impl Default for SerialSettings {
        fn default() -> Self {
            Self {
                baud: 115200,
                timeout: Duration::from_secs(10),
                stop_bits: StopBits::Two,
            }
        }
    }

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Open a serial port (8 data bits, no parity, two stop bits)
        pub fn open(device: &str, baud: u32, timeout: Duration) -> Result<Self> {
            Self::open_with(
                device,
                &SerialSettings {
                    baud,
                    timeout,
                    ..SerialSettings::default()
                },
            )
        }

        /// Open a serial port with explicit settings
        pub fn open_with(device: &str, settings: &SerialSettings) -> Result<Self> {
            let port = serialport::new(device, settings.baud)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(settings.stop_bits)
                .flow_control(FlowControl::None)
                .timeout(settings.timeout)
                .open()?;

            log::info!("Opened serial port {} at {} baud", device, settings.baud);

            Ok(Self { port })
        }

        /// Name of the underlying port, if known
        pub fn name(&self) -> Option<String> {
            self.port.name()
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
            match self.port.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                Err(e) => Err(e.into()),
            }
        }

        fn bytes_available(&mut self) -> Result<usize> {
            Ok(self.port.bytes_to_read()? as usize)
        }

        fn timeout(&self) -> Duration {
            self.port.timeout()
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
            self.port.set_timeout(timeout)?;
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }
    }
}
