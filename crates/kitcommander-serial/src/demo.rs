//! Driver for the CLI of the IoT demo applications (Wx boards)

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// End of transmission, terminates every demo response
pub const END_OF_TRANSMISSION: u8 = 0x04;

/// Pause before each request
///
/// Back-to-back requests make the demo firmware mix up its responses.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Interface to demo firmware on WiFi boards (AVR-IoT Wx, PIC-IoT Wx)
pub struct WxDemoFirmwareDriver<T: Transport> {
    transport: T,
    settle_delay: Duration,
}

impl<T: Transport> WxDemoFirmwareDriver<T> {
    /// Create a driver on an open transport
    pub fn new(transport: T) -> Self {
        Self::with_settle_delay(transport, DEFAULT_SETTLE_DELAY)
    }

    /// Create a driver with a custom delay between requests
    pub fn with_settle_delay(transport: T, settle_delay: Duration) -> Self {
        Self {
            transport,
            settle_delay,
        }
    }

    /// Send a request to the demo CLI and return its response
    ///
    /// The request is `<cmd> <arg>,<arg>\n`. It is written one byte at a
    /// time since the demo UART drops characters in longer bursts.
    pub fn demo_command(&mut self, cmd: &str, args: &[&str]) -> Result<String> {
        let request = format!("{} {}\n", cmd, args.join(","));
        log::debug!("Demo command: {:?}", request);

        std::thread::sleep(self.settle_delay);
        for byte in request.as_bytes() {
            self.transport.write(std::slice::from_ref(byte))?;
            self.transport.flush()?;
        }

        let mut response = self.transport.read_until(&[END_OF_TRANSMISSION])?;
        if response.pop() != Some(END_OF_TRANSMISSION) {
            return Err(Error::Timeout {
                command: request.trim_end().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&response).into_owned();
        log::debug!("Demo response: {:?}", text);
        Ok(text)
    }

    /// Access the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Return the transport
    pub fn into_inner(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    fn driver(mock: MockTransport) -> WxDemoFirmwareDriver<MockTransport> {
        WxDemoFirmwareDriver::with_settle_delay(mock, Duration::ZERO)
    }

    #[test]
    fn test_demo_command() {
        let mut mock = MockTransport::new();
        mock.respond("wifi MyNet,secret,2", b"Wi-Fi credentials set\r\n\x04");

        let mut drv = driver(mock);
        let response = drv.demo_command("wifi", &["MyNet", "secret", "2"]).unwrap();
        assert_eq!(response, "Wi-Fi credentials set\r\n");
        assert_eq!(drv.into_inner().written(), b"wifi MyNet,secret,2\n");
    }

    #[test]
    fn test_demo_command_without_args() {
        let mut mock = MockTransport::new();
        mock.respond("version ", b"4.1.3\x04");

        let mut drv = driver(mock);
        assert_eq!(drv.demo_command("version", &[]).unwrap(), "4.1.3");
    }

    #[test]
    fn test_missing_eot_times_out() {
        let mut mock = MockTransport::new();
        mock.respond("reset ", b"resetting");
        mock.set_timeout(Duration::from_millis(20)).unwrap();

        let mut drv = driver(mock);
        let err = drv.demo_command("reset", &[]).unwrap_err();
        assert!(matches!(err, Error::Timeout { ref command } if command == "reset"));
    }
}
