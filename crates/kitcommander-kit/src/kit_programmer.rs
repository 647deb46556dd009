//! Programming applications onto kits

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use kitcommander_core::programmer::{ProgramOptions, Programmer};

use crate::error::Result;
use crate::portmap;
use crate::registry::{open_programmer, OpenedProgrammer};

/// Identity of the connected kit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KitInfo {
    /// USB serial number of the debugger
    pub serial_number: String,
    /// Target device, lower case
    pub device_name: String,
    /// Debugger product string
    pub programmer_name: String,
    /// Short debugger identifier, e.g. "nedbg"
    pub programmer_id: String,
    /// Kit name from the debugger configuration
    pub kit_name: String,
    /// Serial port of the kit, if one was found and can be opened
    pub serial_port: Option<String>,
}

/// When to program an application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgramStrategy {
    /// Skip programming if the same image was the last one programmed
    #[default]
    Cached,
    /// Always program
    Always,
}

/// A programmer connected to exactly one kit
pub struct KitProgrammer {
    programmer: Box<dyn Programmer>,
    info: KitInfo,
    last_used: Option<PathBuf>,
}

impl KitProgrammer {
    /// Open the programmer selected by `programmer` and connect to its kit
    pub fn open(programmer: &str, pack_dir: Option<&Path>) -> Result<Self> {
        let OpenedProgrammer { programmer, port } = open_programmer(programmer, pack_dir)?;
        Self::new(programmer, port)
    }

    /// Connect to the kit behind `programmer`
    ///
    /// Without a port hint the port is looked up by the debugger's USB
    /// serial number. A port the user cannot open is dropped.
    pub fn new(mut programmer: Box<dyn Programmer>, port: Option<String>) -> Result<Self> {
        let kit_name = programmer
            .read_kit_name()?
            .trim_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string();
        let tool = programmer.tool_info().clone();
        log::info!("Connected to kit '{}' ({})", kit_name, tool.serial_number);

        let port = port.or_else(|| {
            log::debug!("Looking for serial port for: {}", tool.serial_number);
            portmap::find_serial_port(&tool.serial_number)
        });
        let serial_port = port.filter(|port| {
            log::debug!("Checking access to port: {}", port);
            let ok = portmap::check_access(port);
            if !ok {
                log::error!("Port '{}' is not accessible", port);
            }
            ok
        });

        let info = KitInfo {
            programmer_id: tool.programmer_id(),
            serial_number: tool.serial_number,
            device_name: tool.device_name.to_lowercase(),
            programmer_name: tool.product,
            kit_name,
            serial_port,
        };

        Ok(Self {
            programmer,
            info,
            last_used: None,
        })
    }

    /// Information about the connected kit
    pub fn kit_info(&self) -> &KitInfo {
        &self.info
    }

    /// Hex file programmed last, if the target still holds it
    pub fn last_used(&self) -> Option<&Path> {
        self.last_used.as_deref()
    }

    /// Program an application, erasing flash first
    pub fn program_application(&mut self, hexfile: &Path, strategy: ProgramStrategy) -> Result<()> {
        if strategy == ProgramStrategy::Cached && self.last_used.as_deref() == Some(hexfile) {
            log::info!("Skipping programming as application is cached");
            return Ok(());
        }

        // Whatever was there is gone once programming starts
        self.last_used = None;
        let verified = self
            .programmer
            .program_hexfile(hexfile, &ProgramOptions::default())?;
        if !verified {
            return Err(kitcommander_core::Error::ProgrammingFailed(format!(
                "verification of {} failed",
                hexfile.display()
            ))
            .into());
        }

        self.last_used = Some(hexfile.to_path_buf());
        Ok(())
    }

    /// Reset the target and wait `delay`
    pub fn reset_target(&mut self, delay: Duration) -> Result<()> {
        self.programmer.reset_target(delay)?;
        Ok(())
    }

    /// Erase the target
    pub fn erase(&mut self) -> Result<()> {
        log::info!("Erasing target...");
        self.last_used = None;
        self.programmer.erase()?;
        Ok(())
    }

    /// Reboot the debugger
    pub fn reboot(&mut self) -> Result<()> {
        self.programmer.reboot()?;
        Ok(())
    }

    /// The underlying programmer, for memory access
    pub fn programmer_mut(&mut self) -> &mut dyn Programmer {
        self.programmer.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitcommander_dummy::DummyProgrammer;

    fn temp_hex(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kitcommander-kit-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, ":0100000042BD\n:00000001FF\n").unwrap();
        path
    }

    fn kit(name: &str) -> KitProgrammer {
        KitProgrammer::new(Box::new(DummyProgrammer::with_kit_name(name)), None).unwrap()
    }

    #[test]
    fn test_kit_info() {
        let kit = kit("AVR-IoT WG\0\0");
        let info = kit.kit_info();
        assert_eq!(info.kit_name, "AVR-IoT WG");
        assert_eq!(info.programmer_id, "nedbg");
        assert_eq!(info.programmer_name, "nEDBG CMSIS-DAP");
        assert_eq!(info.device_name, "atmega4808");
        assert_eq!(info.serial_port, None);
    }

    #[test]
    fn test_inaccessible_port_is_dropped() {
        let kit = KitProgrammer::new(
            Box::new(DummyProgrammer::new_default()),
            Some("/dev/kitcommander-no-such-port".to_string()),
        )
        .unwrap();
        assert_eq!(kit.kit_info().serial_port, None);
    }

    #[test]
    fn test_cached_strategy() {
        let app = temp_hex("cached.hex");
        let other = temp_hex("cached-other.hex");
        let mut kit = kit("avr-iot wg");

        kit.program_application(&app, ProgramStrategy::Cached).unwrap();
        assert_eq!(kit.last_used(), Some(app.as_path()));

        // A cached image is not read again, so a vanished file goes unnoticed
        std::fs::remove_file(&app).unwrap();
        kit.program_application(&app, ProgramStrategy::Cached).unwrap();
        assert!(kit.program_application(&app, ProgramStrategy::Always).is_err());
        assert_eq!(kit.last_used(), None);

        kit.program_application(&other, ProgramStrategy::Cached).unwrap();
        kit.erase().unwrap();
        assert_eq!(kit.last_used(), None);
        kit.program_application(&other, ProgramStrategy::Cached).unwrap();
        assert_eq!(kit.last_used(), Some(other.as_path()));
    }

    #[test]
    fn test_failed_programming_clears_cache() {
        let app = temp_hex("failing.hex");
        let mut dummy = DummyProgrammer::new_default();
        dummy.fail_next_program("lost connection");
        let mut kit = KitProgrammer::new(Box::new(dummy), None).unwrap();

        assert!(kit.program_application(&app, ProgramStrategy::Cached).is_err());
        assert_eq!(kit.last_used(), None);
        kit.program_application(&app, ProgramStrategy::Cached).unwrap();
        assert_eq!(kit.last_used(), Some(app.as_path()));
    }

    #[test]
    fn test_open_by_name() {
        let mut kit = KitProgrammer::open("dummy:kit=samd21-iot wg", None).unwrap();
        assert_eq!(kit.kit_info().kit_name, "samd21-iot wg");
        kit.reset_target(Duration::ZERO).unwrap();
        kit.reboot().unwrap();
    }
}
