//! Programmer trait definitions

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;

/// Target memory regions a programmer can access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MemoryType {
    /// Program flash
    Flash,
    /// Data EEPROM
    Eeprom,
    /// User row / user signatures
    UserRow,
    /// Fuses / configuration words
    Fuses,
}

impl MemoryType {
    /// Memory name as used by the programming tools
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flash => "flash",
            Self::Eeprom => "eeprom",
            Self::UserRow => "user_row",
            Self::Fuses => "fuses",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flash" => Ok(Self::Flash),
            "eeprom" => Ok(Self::Eeprom),
            "user_row" | "userrow" => Ok(Self::UserRow),
            "fuses" => Ok(Self::Fuses),
            _ => Err(format!("Unknown memory type: {}", s)),
        }
    }
}

/// Options for a programming operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramOptions {
    /// Erase before programming (flash only)
    pub erase: bool,
    /// Verify after programming
    pub verify: bool,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            erase: true,
            verify: false,
        }
    }
}

impl ProgramOptions {
    /// Whether an erase should precede writing to `memory`
    ///
    /// Erasing anything but flash can wipe calibration or configuration data.
    pub fn erase_applies_to(&self, memory: MemoryType) -> bool {
        self.erase && memory == MemoryType::Flash
    }
}

/// Information about a connected debugger/programmer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    /// USB serial number of the debugger
    pub serial_number: String,
    /// USB product string (e.g. "nEDBG CMSIS-DAP")
    pub product: String,
    /// Name of the target device, lower case
    pub device_name: String,
}

impl ToolInfo {
    /// Short programmer identifier, the first word of the product string
    pub fn programmer_id(&self) -> String {
        self.product
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// Programmer trait
///
/// A programmer is bound to exactly one connected debugger for its whole
/// lifetime. Each operation opens and closes its own session with the
/// debugger; no state is kept on the target between calls.
pub trait Programmer {
    /// Information about the connected debugger
    fn tool_info(&self) -> &ToolInfo;

    /// Read the kit name stored in the debugger's configuration
    fn read_kit_name(&mut self) -> Result<String>;

    /// Program a hex file into the target
    ///
    /// Returns `false` only if verification was requested and failed.
    fn program_hexfile(&mut self, path: &Path, options: &ProgramOptions) -> Result<bool>;

    /// Program raw bytes into a memory of the target
    ///
    /// Returns `false` only if verification was requested and failed.
    fn program_data(
        &mut self,
        data: &[u8],
        memory: MemoryType,
        offset: u32,
        options: &ProgramOptions,
    ) -> Result<bool>;

    /// Read from a memory of the target
    ///
    /// A `size` of 0 reads the whole memory.
    fn read_data(&mut self, memory: MemoryType, offset: u32, size: usize) -> Result<Vec<u8>>;

    /// Erase the target device
    fn erase(&mut self) -> Result<()>;

    /// Pulse the target reset line, then wait `delay`
    fn reset_target(&mut self, delay: Duration) -> Result<()>;

    /// Reboot the debugger itself (not the target)
    fn reboot(&mut self) -> Result<()>;
}

impl<P: Programmer + ?Sized> Programmer for Box<P> {
    fn tool_info(&self) -> &ToolInfo {
        (**self).tool_info()
    }

    fn read_kit_name(&mut self) -> Result<String> {
        (**self).read_kit_name()
    }

    fn program_hexfile(&mut self, path: &Path, options: &ProgramOptions) -> Result<bool> {
        (**self).program_hexfile(path, options)
    }

    fn program_data(
        &mut self,
        data: &[u8],
        memory: MemoryType,
        offset: u32,
        options: &ProgramOptions,
    ) -> Result<bool> {
        (**self).program_data(data, memory, offset, options)
    }

    fn read_data(&mut self, memory: MemoryType, offset: u32, size: usize) -> Result<Vec<u8>> {
        (**self).read_data(memory, offset, size)
    }

    fn erase(&mut self) -> Result<()> {
        (**self).erase()
    }

    fn reset_target(&mut self, delay: Duration) -> Result<()> {
        (**self).reset_target(delay)
    }

    fn reboot(&mut self) -> Result<()> {
        (**self).reboot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_programmer_id() {
        let info = ToolInfo {
            serial_number: "MCHP3261021800001234".into(),
            product: "nEDBG CMSIS-DAP".into(),
            device_name: "atmega4808".into(),
        };
        assert_eq!(info.programmer_id(), "nedbg");
    }

    #[test]
    fn test_erase_only_applies_to_flash() {
        let opts = ProgramOptions::default();
        assert!(opts.erase_applies_to(MemoryType::Flash));
        assert!(!opts.erase_applies_to(MemoryType::Eeprom));

        let no_erase = ProgramOptions {
            erase: false,
            verify: true,
        };
        assert!(!no_erase.erase_applies_to(MemoryType::Flash));
    }

    #[test]
    fn test_memory_type_parse() {
        assert_eq!("FLASH".parse::<MemoryType>(), Ok(MemoryType::Flash));
        assert_eq!("user_row".parse::<MemoryType>(), Ok(MemoryType::UserRow));
        assert!("sram".parse::<MemoryType>().is_err());
    }
}
