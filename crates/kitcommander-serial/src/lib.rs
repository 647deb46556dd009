//! kitcommander-serial - Firmware command drivers
//!
//! This crate implements the host side of the textual command protocols
//! spoken by kit bridge firmware over the debugger's CDC serial port.
//!
//! # Protocol Overview
//!
//! The provisioning firmware accepts one command per line:
//!
//! ```text
//! MC+<COMMAND>[=<ARG>[,<ARG>...]]\r\n      [<blob>\r\n]
//! ```
//!
//! and answers with zero or more payload lines followed by a status line,
//! either `OK` or `ERROR:<code>`. Commands carrying a blob announce its
//! length as the last argument and wait for a `>` prompt before the blob is
//! sent.
//!
//! The IoT demo applications use a simpler CLI: `<cmd> <arg>,<arg>\n`,
//! answered by free text terminated with an EOT byte.
//!
//! # Example
//!
//! ```no_run
//! use kitcommander_serial::{FirmwareCommand, ProvisioningFirmwareDriver, SerialTransport};
//! use std::time::Duration;
//!
//! let transport = SerialTransport::open("/dev/ttyACM0", 115200, Duration::from_secs(10))?;
//! let mut driver = ProvisioningFirmwareDriver::new(transport)?;
//!
//! driver.firmware_command(&FirmwareCommand::new("MC+SETLED").arg("conn").arg("on"))?;
//! let serial = driver.firmware_command(&FirmwareCommand::new("MC+ECC+SERIAL"))?;
//! println!("ECC serial number: {}", serial);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod command;
pub mod demo;
pub mod error;
/// Scripted transport for tests
pub mod mock;
pub mod provisioning;
pub mod status;
pub mod transport;

// Re-exports
pub use command::FirmwareCommand;
pub use demo::WxDemoFirmwareDriver;
pub use error::{Error, Result};
pub use mock::MockTransport;
pub use provisioning::{DriverConfig, ProvisioningFirmwareDriver};
pub use status::{FirmwareStatus, StatusSource};
pub use transport::serial::{SerialSettings, SerialTransport};
pub use transport::Transport;
