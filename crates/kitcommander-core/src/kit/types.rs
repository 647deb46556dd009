//! Kit and firmware type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// MCU architecture of the kit's target device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    /// AVR 8-bit
    Avr,
    /// PIC16/PIC24
    Pic,
    /// SAM (Cortex-M)
    Sam,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Avr => write!(f, "avr"),
            Self::Pic => write!(f, "pic"),
            Self::Sam => write!(f, "sam"),
        }
    }
}

/// Command protocol spoken by a firmware image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolId {
    /// `MC+` command set of the provisioning firmware
    ProvisioningV2,
    /// Line-based CLI of the IoT demo applications
    WxDemoV1,
    /// Raw bridge used by the WINC upgrade tooling
    WincUpgradeV1,
}

impl ProtocolId {
    /// Baud rate the firmware of this protocol normally uses
    pub fn default_baud(&self) -> u32 {
        match self {
            Self::WxDemoV1 => 9600,
            Self::ProvisioningV2 | Self::WincUpgradeV1 => 115200,
        }
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProvisioningV2 => write!(f, "ProvisioningV2"),
            Self::WxDemoV1 => write!(f, "WxDemoV1"),
            Self::WincUpgradeV1 => write!(f, "WincUpgradeV1"),
        }
    }
}

/// Protocol and serial parameters of a firmware image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolInfo {
    /// Protocol identifier
    pub id: ProtocolId,
    /// Baud rate the firmware configures on its CDC UART
    pub baud: u32,
}

/// Function a firmware image provides on a kit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FirmwareFunction {
    /// Generic IoT provisioning
    IotProvision,
    /// IoT provisioning for AWS
    IotProvisionAws,
    /// IoT provisioning for Google Cloud
    IotProvisionGoogle,
    /// IoT provisioning for Azure
    IotProvisionAzure,
    /// Secure element provisioning only
    EccProvision,
    /// WINC module firmware upgrade bridge
    WincUpgrade,
    /// AWS demo application
    DemoAws,
    /// Google Cloud demo application
    DemoGoogle,
    /// Azure demo application
    DemoAzure,
}

impl FirmwareFunction {
    /// All functions, in display order
    pub const ALL: [FirmwareFunction; 9] = [
        Self::IotProvision,
        Self::IotProvisionAws,
        Self::IotProvisionGoogle,
        Self::IotProvisionAzure,
        Self::EccProvision,
        Self::WincUpgrade,
        Self::DemoAws,
        Self::DemoGoogle,
        Self::DemoAzure,
    ];

    /// Name used on the command line and in log messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IotProvision => "iotprovision",
            Self::IotProvisionAws => "iotprovision-aws",
            Self::IotProvisionGoogle => "iotprovision-google",
            Self::IotProvisionAzure => "iotprovision-azure",
            Self::EccProvision => "eccprovision",
            Self::WincUpgrade => "wincupgrade",
            Self::DemoAws => "demo-aws",
            Self::DemoGoogle => "demo-google",
            Self::DemoAzure => "demo-azure",
        }
    }
}

impl fmt::Display for FirmwareFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FirmwareFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|f| f.as_str()).collect();
                format!(
                    "Unknown firmware function '{}' [available: {}]",
                    s,
                    names.join(", ")
                )
            })
    }
}

/// A bundled firmware image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareImage {
    /// Human-readable description
    pub description: String,
    /// Hex file path relative to the firmware directory
    pub hexfile: PathBuf,
    /// Version of the bundled image (as reported by `MC+VERSION=FIRMWARE`)
    pub version: String,
    /// Where newer releases are published, if anywhere
    pub public_repo: Option<String>,
    /// Protocol spoken by the image, `None` if the host cannot talk to it
    pub protocol: Option<ProtocolInfo>,
    /// Time the application needs after reset before accepting commands
    pub startup_delay_ms: u64,
    /// Functions this image serves
    pub functions: Vec<FirmwareFunction>,
}

impl FirmwareImage {
    /// Startup delay as a `Duration`
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// Check whether this image serves the given function
    pub fn serves(&self, function: FirmwareFunction) -> bool {
        self.functions.contains(&function)
    }
}

/// LED names understood by `MC+SETLED` / `MC+GETLED` on a kit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitLeds {
    /// Wireless (WiFi/cellular) status LED
    pub wireless: Option<String>,
    /// Cloud connection LED
    pub connection: Option<String>,
    /// Data activity LED
    pub data: Option<String>,
    /// Error LED
    pub error: Option<String>,
    /// User LED
    pub user: Option<String>,
}

/// Registry entry for one kit family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KitDescriptor {
    /// Short identifier (e.g. "avr-iot")
    pub id: String,
    /// Accepted kit names, lower case
    pub names: Vec<String>,
    /// Target device architecture
    pub architecture: Architecture,
    /// Target device name (e.g. "atmega4808")
    pub device: String,
    /// On-board programmer (e.g. "nedbg")
    pub programmer: String,
    /// Cloud provider variants the kit ships in
    pub variants: Vec<String>,
    /// LED names
    pub leds: KitLeds,
    /// Bundled firmware images
    pub firmware: Vec<FirmwareImage>,
}

impl KitDescriptor {
    /// Check if a kit name (case-insensitive) refers to this kit
    pub fn matches(&self, kit_name: &str) -> bool {
        let lower = kit_name.trim().to_lowercase();
        self.names.iter().any(|n| *n == lower)
    }

    /// Find the image serving a function
    pub fn firmware_for(&self, function: FirmwareFunction) -> Option<&FirmwareImage> {
        self.firmware.iter().find(|fw| fw.serves(function))
    }

    /// Functions with a firmware image on this kit
    pub fn supported_functions(&self) -> Vec<FirmwareFunction> {
        FirmwareFunction::ALL
            .iter()
            .copied()
            .filter(|f| self.firmware_for(*f).is_some())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_default_baud() {
        assert_eq!(ProtocolId::ProvisioningV2.default_baud(), 115200);
        assert_eq!(ProtocolId::WxDemoV1.default_baud(), 9600);
    }

    #[test]
    fn test_function_names_roundtrip() {
        for function in FirmwareFunction::ALL {
            assert_eq!(function.as_str().parse::<FirmwareFunction>(), Ok(function));
        }
        assert_eq!(
            "IoTProvision-AWS".parse::<FirmwareFunction>(),
            Ok(FirmwareFunction::IotProvisionAws)
        );
        assert!("provision".parse::<FirmwareFunction>().is_err());
    }

    #[test]
    fn test_kit_matches_case_insensitive() {
        let kit = KitDescriptor {
            id: "pic-iot".into(),
            names: vec!["pic-iot wg".into(), "pic-iot wa".into()],
            architecture: Architecture::Pic,
            device: "pic24fj128ga705".into(),
            programmer: "nedbg".into(),
            variants: vec![],
            leds: KitLeds::default(),
            firmware: vec![],
        };
        assert!(kit.matches("PIC-IoT WG"));
        assert!(kit.matches("pic-iot wa "));
        assert!(!kit.matches("pic-iot"));
    }
}
