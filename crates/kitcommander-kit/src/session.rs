//! Talking to the application on a prepared kit

use std::time::Duration;

use kitcommander_core::kit::ProtocolId;
use kitcommander_serial::{
    DriverConfig, ProvisioningFirmwareDriver, SerialTransport, Transport, WxDemoFirmwareDriver,
};

use crate::error::{Error, Result};
use crate::setup::KitSetup;

/// Driver for the protocol an application speaks
pub enum FirmwareSession<T: Transport> {
    /// Provisioning firmware, `MC+` commands
    Provisioning(ProvisioningFirmwareDriver<T>),
    /// IoT demo application CLI
    WxDemo(WxDemoFirmwareDriver<T>),
}

impl<T: Transport> FirmwareSession<T> {
    /// Start a session for `protocol` on an open transport
    ///
    /// The WINC upgrade bridge is driven by dedicated tooling and has no
    /// session here.
    pub fn new(protocol: ProtocolId, transport: T, config: DriverConfig) -> Result<Self> {
        match protocol {
            ProtocolId::ProvisioningV2 => Ok(Self::Provisioning(
                ProvisioningFirmwareDriver::with_config(transport, config)?,
            )),
            ProtocolId::WxDemoV1 => Ok(Self::WxDemo(WxDemoFirmwareDriver::new(transport))),
            ProtocolId::WincUpgradeV1 => Err(Error::NoProtocol(format!(
                "{} (no command driver)",
                protocol
            ))),
        }
    }

    /// Send a command and return the response text
    pub fn request(&mut self, cmd: &str, args: &[&str]) -> Result<String> {
        match self {
            Self::Provisioning(drv) => Ok(drv.command(cmd, args)?),
            Self::WxDemo(drv) => Ok(drv.demo_command(cmd, args)?),
        }
    }

    /// End the session and return the transport
    pub fn into_inner(self) -> T {
        match self {
            Self::Provisioning(drv) => drv.into_inner(),
            Self::WxDemo(drv) => drv.into_inner(),
        }
    }
}

impl KitSetup {
    /// Open the kit's serial port and start a session for its application
    pub fn connect(&self, timeout: Duration) -> Result<FirmwareSession<SerialTransport>> {
        let transport = self.open_serial(timeout)?;
        let protocol = self
            .protocol_id()
            .ok_or_else(|| Error::NoProtocol("unknown application".to_string()))?;
        FirmwareSession::new(protocol, transport, DriverConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitcommander_serial::MockTransport;

    fn fast() -> DriverConfig {
        DriverConfig {
            reset_timeout: Duration::from_millis(5),
            ..DriverConfig::default()
        }
    }

    #[test]
    fn test_provisioning_session() {
        let mut mock = MockTransport::new();
        mock.respond("MC+ECC+SERIAL", b"0123EE4567890ABCDE\r\nOK\r\n");

        let mut session = FirmwareSession::new(ProtocolId::ProvisioningV2, mock, fast()).unwrap();
        assert_eq!(session.request("ECC+SERIAL", &[]).unwrap(), "0123EE4567890ABCDE");
        assert_eq!(session.into_inner().sent_lines(), vec!["MC+ECC+SERIAL"]);
    }

    #[test]
    fn test_demo_session() {
        let mut mock = MockTransport::new();
        mock.respond("version ", b"4.1.3\x04");

        let mut session = FirmwareSession::new(ProtocolId::WxDemoV1, mock, fast()).unwrap();
        assert_eq!(session.request("version", &[]).unwrap(), "4.1.3");
    }

    #[test]
    fn test_winc_upgrade_has_no_session() {
        let result = FirmwareSession::new(ProtocolId::WincUpgradeV1, MockTransport::new(), fast());
        assert!(matches!(result, Err(Error::NoProtocol(_))));
    }

    #[test]
    fn test_firmware_error_surfaces() {
        let mut mock = MockTransport::new();
        mock.respond("MC+SETLED=conn,blink", b"ERROR:0x0005\r\n");

        let mut session = FirmwareSession::new(ProtocolId::ProvisioningV2, mock, fast()).unwrap();
        let err = session.request("MC+SETLED", &["conn", "blink"]).unwrap_err();
        assert!(matches!(
            err,
            Error::Serial(kitcommander_serial::Error::FirmwareReported { .. })
        ));
    }
}
