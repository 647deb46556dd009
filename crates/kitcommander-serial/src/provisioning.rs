//! Driver for the provisioning firmware command set
//!
//! Commands and responses are text lines:
//!
//! - commands end in `\r\n` (a bare `\r` or `\n` is accepted by the firmware)
//! - `<cmd>[=<arg>[,<arg>...]]\r\n [<blob>\r\n]`
//! - response: `[<line>\r\n]... OK\r\n` or `ERROR:<xxxx>\r\n`

use std::time::Duration;

use crate::command::FirmwareCommand;
use crate::error::{Error, Result};
use crate::status::FirmwareStatus;
use crate::transport::Transport;

/// Banner printed by the firmware once it is ready after reset
const READY_BANNER: &[u8] = b"READY\r\n";
/// Line terminator of the protocol
const EOL: &[u8] = b"\r\n";
/// Prompt sent by the firmware before it accepts a blob
const BLOB_PROMPT: &[u8] = b">";
/// Reply prefix to `MC+PING`
const PONG_PREFIX: &str = "MC+PONG=";

/// Timing parameters of the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// How long to wait for the `READY` banner when the driver is created
    pub reset_timeout: Duration,
    /// Read timeout for the first ping during synchronization
    pub sync_timeout: Duration,
    /// Added to the ping timeout on every retry
    pub sync_timeout_step: Duration,
    /// Pings re-sent before synchronization gives up
    pub sync_retries: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            reset_timeout: Duration::from_secs(3),
            sync_timeout: Duration::from_secs(1),
            sync_timeout_step: Duration::from_secs(1),
            sync_retries: 3,
        }
    }
}

/// How a response ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Ok,
    Error(String),
    Timeout,
}

/// Lines received before the status line, plus the status
#[derive(Debug, Clone)]
struct Response {
    lines: Vec<String>,
    outcome: Outcome,
}

impl Response {
    /// All lines for diagnostics, status included
    fn all_lines(&self) -> Vec<String> {
        let mut lines = self.lines.clone();
        match &self.outcome {
            Outcome::Ok => lines.push("OK".to_string()),
            Outcome::Error(line) => lines.push(line.clone()),
            Outcome::Timeout => lines.push("ERROR: Timeout".to_string()),
        }
        lines
    }
}

/// Driver for the "version 2" provisioning firmware
///
/// The driver owns the transport for the duration of the session; use
/// [`into_inner`](Self::into_inner) to get it back.
pub struct ProvisioningFirmwareDriver<T: Transport> {
    transport: T,
    config: DriverConfig,
    sequence_number: u32,
}

impl<T: Transport> ProvisioningFirmwareDriver<T> {
    /// Create a driver with default timing
    ///
    /// Waits for the firmware's `READY` banner first, see
    /// [`wait_for_reset`](Self::wait_for_reset).
    pub fn new(transport: T) -> Result<Self> {
        Self::with_config(transport, DriverConfig::default())
    }

    /// Create a driver with explicit timing
    pub fn with_config(transport: T, config: DriverConfig) -> Result<Self> {
        let mut driver = Self {
            transport,
            config,
            sequence_number: 0,
        };
        // Without this the first ping is likely sent before the target is
        // ready and costs a full retry.
        driver.wait_for_reset()?;
        Ok(driver)
    }

    /// Wait for the `READY` banner printed after the application restarts
    ///
    /// Times out silently if the target was not reset just before. Returns
    /// whatever was received: banner and greeting, garbage, or nothing.
    pub fn wait_for_reset(&mut self) -> Result<Vec<u8>> {
        log::debug!("Wait for reset...");
        let saved = self.transport.timeout();
        self.transport.set_timeout(self.config.reset_timeout)?;

        let response = self.transport.read_until(READY_BANNER);
        self.transport.set_timeout(saved)?;
        let response = response?;

        log::debug!("Response: {:?}", String::from_utf8_lossy(&response));
        if !response.ends_with(READY_BANNER) {
            log::debug!("Wait for reset timed out");
        }
        Ok(response)
    }

    /// Synchronize with the firmware CLI using ping and a unique sequence number
    pub fn synchronize(&mut self) -> Result<()> {
        self.sequence_number += 1;
        let saved = self.transport.timeout();
        let mut timeout = self.config.sync_timeout;
        self.transport.set_timeout(timeout)?;

        let result = self.ping_until_pong(&mut timeout);
        self.transport.set_timeout(saved)?;
        result
    }

    fn ping_until_pong(&mut self, timeout: &mut Duration) -> Result<()> {
        let garbage = self.transport.drain()?;
        if !garbage.is_empty() {
            log::debug!("Garbage: {}", String::from_utf8_lossy(&garbage));
        }

        // Written directly, a ping is not a regular command
        self.send_ping()?;

        let mut retries = 0;
        let mut last_response: Vec<String>;
        loop {
            let response = self.read_response()?;
            log::debug!("Response received: {:?}", response.all_lines());
            last_response = response.all_lines();

            match response.outcome {
                Outcome::Ok => {
                    if let Some(seq) = find_pong(&response.lines) {
                        if seq == self.sequence_number {
                            return Ok(());
                        }
                        // A pong with a stale sequence number may come from an
                        // earlier session; keep reading if more is pending.
                        log::debug!("Stale pong {} (expected {})", seq, self.sequence_number);
                    }
                    if self.transport.bytes_available()? == 0 {
                        log::debug!("Failed, retries = {}", retries);
                        break;
                    }
                }
                Outcome::Timeout if self.transport.bytes_available()? == 0 => {
                    retries += 1;
                    if retries > self.config.sync_retries {
                        log::debug!("Too many retries, giving up");
                        break;
                    }
                    self.sequence_number += 1;
                    *timeout += self.config.sync_timeout_step;
                    self.transport.set_timeout(*timeout)?;
                    self.send_ping()?;
                    log::debug!("Timed out and no more response, re-sent ping, retries = {}", retries);
                }
                _ => {
                    log::debug!("Unexpected potential garbage response: {:?}", last_response.last());
                }
            }
        }

        Err(Error::SyncFailed {
            retries,
            last_response,
        })
    }

    fn send_ping(&mut self) -> Result<()> {
        let cmd = format!("MC+PING={:06}", self.sequence_number);
        log::debug!("Sent sync command: {}", cmd);
        self.transport.write(cmd.as_bytes())?;
        self.transport.write(b"\n")?;
        Ok(())
    }

    /// Send a command and return its response
    ///
    /// The response is the payload lines joined with `\n`, or an empty
    /// string if the firmware only answered `OK`.
    pub fn firmware_command(&mut self, cmd: &FirmwareCommand) -> Result<String> {
        let line = cmd.line()?;
        log::debug!("FW command: {}", line);

        self.transport.write(line.as_bytes())?;
        self.transport.write(EOL)?;

        if let Some(blob) = cmd.payload().filter(|b| !b.is_empty()) {
            let prompt = self.transport.read_until(BLOB_PROMPT)?;
            if !prompt.ends_with(BLOB_PROMPT) {
                return Err(Error::Timeout { command: line });
            }
            log::debug!("Payload blob length: {} bytes", blob.len());
            self.transport.write(blob)?;
            self.transport.write(EOL)?;
        }

        let response = self.read_response()?;
        log::debug!("Response received: {:?}", response.all_lines());

        match response.outcome {
            Outcome::Ok => Ok(response.lines.join("\n")),
            Outcome::Error(status) => Err(Error::FirmwareReported {
                command: line,
                status: FirmwareStatus::parse(&status),
            }),
            Outcome::Timeout => Err(Error::Timeout { command: line }),
        }
    }

    /// Convenience wrapper around [`firmware_command`](Self::firmware_command)
    pub fn command(&mut self, name: &str, args: &[&str]) -> Result<String> {
        self.firmware_command(&FirmwareCommand::new(name).args(args.iter().copied()))
    }

    /// Read response lines up to the status line
    ///
    /// Blank lines are skipped. A line cut short by the timeout ends the
    /// response as a timeout.
    fn read_response(&mut self) -> Result<Response> {
        let mut lines = Vec::new();
        loop {
            let raw = self.transport.read_until(EOL)?;
            let Some(content) = raw.strip_suffix(EOL) else {
                if !raw.is_empty() {
                    log::debug!("Partial line before timeout: {:?}", String::from_utf8_lossy(&raw));
                }
                return Ok(Response {
                    lines,
                    outcome: Outcome::Timeout,
                });
            };
            if content.is_empty() {
                continue;
            }

            let text = String::from_utf8_lossy(content).into_owned();
            if text.starts_with("OK") {
                return Ok(Response {
                    lines,
                    outcome: Outcome::Ok,
                });
            }
            if text.contains("ERROR") {
                return Ok(Response {
                    lines,
                    outcome: Outcome::Error(text),
                });
            }
            lines.push(text);
        }
    }

    /// Current ping sequence number
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Access the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// End the session and return the transport
    pub fn into_inner(self) -> T {
        self.transport
    }
}

/// Sequence number of the first `MC+PONG=<n>` line
fn find_pong(lines: &[String]) -> Option<u32> {
    lines
        .iter()
        .find_map(|l| l.strip_prefix(PONG_PREFIX))
        .and_then(|seq| seq.trim().parse().ok())
}
