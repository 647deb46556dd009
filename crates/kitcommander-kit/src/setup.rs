//! One-call kit setup: find, program and describe a kit for a function

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use kitcommander_core::kit::{
    FirmwareFunction, KitDatabase, KitFirmwareProvider, KitLeds, ProtocolId, ProtocolInfo,
    ResolvedFirmware,
};
use kitcommander_serial::SerialTransport;

use crate::error::{Error, Result};
use crate::kit_programmer::{KitInfo, KitProgrammer, ProgramStrategy};

/// Options for [`setup_kit`]
#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Only reset the target, keep its current application
    pub skip_programming: bool,
    /// Directory the registry's hex file paths are relative to
    pub firmware_dir: PathBuf,
    /// Programmer selection, used when no programmer is passed in
    pub programmer: String,
    /// Device pack directory for PIC targets
    pub pack_dir: Option<PathBuf>,
    /// Programming strategy
    pub strategy: ProgramStrategy,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            skip_programming: false,
            firmware_dir: PathBuf::from("."),
            programmer: "pymcuprog".to_string(),
            pack_dir: None,
            strategy: ProgramStrategy::Cached,
        }
    }
}

/// Everything a client needs to talk to a prepared kit
#[derive(Debug, Clone, Serialize)]
pub struct KitSetup {
    /// Serial port of the kit
    pub port: Option<String>,
    /// Application on the kit, if known
    pub application: Option<ResolvedFirmware>,
    /// Kit identity
    pub kit_info: KitInfo,
    /// LED names for `MC+SETLED` / `MC+GETLED`
    pub leds: KitLeds,
    /// Protocol spoken by the application
    pub protocol: Option<ProtocolInfo>,
    /// Time the application needs after reset before it accepts commands
    pub startup_delay_ms: u64,
}

impl KitSetup {
    /// Protocol identifier, if known
    pub fn protocol_id(&self) -> Option<ProtocolId> {
        self.protocol.map(|p| p.id)
    }

    /// Baud rate of the protocol, if known
    pub fn baud(&self) -> Option<u32> {
        self.protocol.map(|p| p.baud)
    }

    /// Startup delay of the application
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// Open the kit's serial port at the protocol baud rate
    pub fn open_serial(&self, timeout: Duration) -> Result<SerialTransport> {
        let port = self
            .port
            .as_deref()
            .ok_or_else(|| Error::NoSerialPort(self.kit_info.serial_number.clone()))?;
        let baud = self.baud().ok_or_else(|| {
            Error::NoProtocol(
                self.application
                    .as_ref()
                    .map_or_else(|| "unknown application".to_string(), |a| a.function.to_string()),
            )
        })?;
        Ok(SerialTransport::open(port, baud, timeout)?)
    }
}

/// Set up a kit for communication with the firmware serving `function`
///
/// Without a programmer a single-use [`KitProgrammer`] is opened from
/// `options.programmer`. Missing firmware is an error unless
/// `skip_programming` is set, in which case no protocol is reported.
pub fn setup_kit(
    db: &KitDatabase,
    function: FirmwareFunction,
    options: &SetupOptions,
    programmer: Option<&mut KitProgrammer>,
) -> Result<KitSetup> {
    let mut owned;
    let programmer = match programmer {
        Some(p) => p,
        None => {
            owned = KitProgrammer::open(&options.programmer, options.pack_dir.as_deref())?;
            &mut owned
        }
    };
    let kit_info = programmer.kit_info().clone();

    // Select application for this function on this kit
    log::info!("Looking for kit matching '{}'", kit_info.kit_name);
    let provider = KitFirmwareProvider::new(db, &kit_info.kit_name, &options.firmware_dir)?;
    let application = match provider.locate_firmware(function) {
        Ok(app) => Some(app),
        Err(e @ kitcommander_core::Error::FirmwareNotAvailable { .. }) => {
            if !options.skip_programming {
                return Err(e.into());
            }
            None
        }
        Err(e) => return Err(e.into()),
    };

    if options.skip_programming {
        // Make sure the firmware is in a known state
        programmer.reset_target(Duration::ZERO)?;
    } else if let Some(app) = &application {
        log::debug!(
            "Programming '{}' version '{}'",
            app.image.description,
            app.image.version
        );
        programmer.program_application(&app.hexfile, options.strategy)?;
    }

    let protocol = application.as_ref().and_then(|app| app.image.protocol);
    let startup_delay_ms = application
        .as_ref()
        .map_or(0, |app| app.image.startup_delay_ms);
    match protocol {
        Some(p) => log::info!(
            "Setup protocol '{}' on {} at {} on kit '{}'",
            p.id,
            kit_info.serial_port.as_deref().unwrap_or("<no port>"),
            p.baud,
            kit_info.kit_name
        ),
        None => log::warn!("No protocol information available for: '{}'", function),
    }

    let setup = KitSetup {
        port: kit_info.serial_port.clone(),
        application,
        leds: provider.kit().leds.clone(),
        kit_info,
        protocol,
        startup_delay_ms,
    };

    // Some firmwares need time after programming or reset before they are ready
    if startup_delay_ms > 0 {
        std::thread::sleep(setup.startup_delay());
    }

    Ok(setup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitcommander_dummy::DummyProgrammer;
    use std::path::Path;

    /// Firmware directory holding every builtin hex file of `kit_id`
    fn firmware_dir(db: &KitDatabase, kit_id: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "kitcommander-setup-{}-{}",
            std::process::id(),
            kit_id
        ));
        let kit = db.iter().find(|k| k.id == kit_id).unwrap();
        for image in &kit.firmware {
            let path = dir.join(&image.hexfile);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, ":00000001FF\n").unwrap();
        }
        dir
    }

    fn dummy_kit(name: &str) -> KitProgrammer {
        KitProgrammer::new(Box::new(DummyProgrammer::with_kit_name(name)), None).unwrap()
    }

    #[test]
    fn test_setup_programs_application() {
        let db = KitDatabase::builtin().unwrap();
        let options = SetupOptions {
            firmware_dir: firmware_dir(&db, "avr-iot"),
            ..SetupOptions::default()
        };
        let mut kit = dummy_kit("AVR-IoT WG");

        let setup = setup_kit(&db, FirmwareFunction::IotProvision, &options, Some(&mut kit)).unwrap();
        assert_eq!(setup.protocol_id(), Some(ProtocolId::ProvisioningV2));
        assert_eq!(setup.baud(), Some(115200));
        assert_eq!(setup.leds.connection.as_deref(), Some("CONN"));
        assert_eq!(setup.port, None);

        let app = setup.application.as_ref().unwrap();
        assert!(app.hexfile.starts_with(&options.firmware_dir));
        assert_eq!(kit.last_used(), Some(app.hexfile.as_path()));
    }

    #[test]
    fn test_setup_skip_programming_only_resets() {
        let db = KitDatabase::builtin().unwrap();
        let options = SetupOptions {
            skip_programming: true,
            firmware_dir: PathBuf::from("/nonexistent"),
            ..SetupOptions::default()
        };
        let mut kit = dummy_kit("pic-iot wg");

        let setup = setup_kit(&db, FirmwareFunction::DemoAws, &options, Some(&mut kit)).unwrap();
        assert_eq!(setup.protocol_id(), Some(ProtocolId::WxDemoV1));
        assert_eq!(setup.baud(), Some(9600));
        assert_eq!(kit.last_used(), None);
    }

    #[test]
    fn test_setup_missing_firmware() {
        let db = KitDatabase::builtin().unwrap();
        let mut kit = dummy_kit("cryptoauth trust platform");

        let err = setup_kit(
            &db,
            FirmwareFunction::WincUpgrade,
            &SetupOptions::default(),
            Some(&mut kit),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Core(kitcommander_core::Error::FirmwareNotAvailable { .. })
        ));

        // Tolerated when only resetting, without protocol information
        let options = SetupOptions {
            skip_programming: true,
            ..SetupOptions::default()
        };
        let setup = setup_kit(&db, FirmwareFunction::WincUpgrade, &options, Some(&mut kit)).unwrap();
        assert!(setup.application.is_none());
        assert!(setup.protocol.is_none());
        assert_eq!(setup.leds.error.as_deref(), Some("STATUS"));
        assert!(matches!(
            setup.open_serial(Duration::from_secs(1)),
            Err(Error::NoSerialPort(_))
        ));
    }

    #[test]
    fn test_setup_unsupported_kit() {
        let db = KitDatabase::builtin().unwrap();
        let mut kit = dummy_kit("curiosity nano");
        let err = setup_kit(
            &db,
            FirmwareFunction::IotProvision,
            &SetupOptions::default(),
            Some(&mut kit),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Core(kitcommander_core::Error::KitNotSupported(_))
        ));
    }

    #[test]
    fn test_setup_opens_programmer_and_waits() {
        let db = KitDatabase::builtin().unwrap();
        let options = SetupOptions {
            firmware_dir: firmware_dir(&db, "pic-iot"),
            programmer: "dummy:kit=pic-iot wa,device=pic24fj128ga705".to_string(),
            ..SetupOptions::default()
        };

        let setup = setup_kit(&db, FirmwareFunction::WincUpgrade, &options, None).unwrap();
        assert_eq!(setup.startup_delay(), Duration::from_millis(100));
        assert_eq!(setup.kit_info.device_name, "pic24fj128ga705");
        assert_eq!(setup.protocol_id(), Some(ProtocolId::WincUpgradeV1));
    }

    #[test]
    fn test_setup_serializes() {
        let db = KitDatabase::builtin().unwrap();
        let options = SetupOptions {
            skip_programming: true,
            ..SetupOptions::default()
        };
        let mut kit = dummy_kit("samd21-iot wg");
        let setup = setup_kit(&db, FirmwareFunction::EccProvision, &options, Some(&mut kit)).unwrap();

        let text = ron::ser::to_string_pretty(&setup, ron::ser::PrettyConfig::default()).unwrap();
        assert!(text.contains("ProvisioningV2"));
        assert!(text.contains("samd21-iot wg"));
        assert!(Path::new(&setup.application.unwrap().hexfile).is_relative());
    }
}
