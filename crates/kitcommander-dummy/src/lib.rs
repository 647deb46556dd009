//! kitcommander-dummy - In-memory kit programmer for testing
//!
//! This crate provides a programmer that emulates a kit and its target MCU
//! in memory. It's useful for testing and for dry runs without hardware.

mod ihex;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kitcommander_core::error::{Error, Result};
use kitcommander_core::programmer::{MemoryType, ProgramOptions, Programmer, ToolInfo};

pub use ihex::{parse_ihex, Segment};

/// Configuration for the dummy kit
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Kit name reported by the debugger
    pub kit_name: String,
    /// USB serial number of the debugger
    pub serial_number: String,
    /// USB product string
    pub product: String,
    /// Target device
    pub device_name: String,
    /// Flash size in bytes
    pub flash_size: usize,
    /// EEPROM size in bytes
    pub eeprom_size: usize,
    /// User row size in bytes
    pub user_row_size: usize,
    /// Number of fuse bytes
    pub fuses_size: usize,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            kit_name: "avr-iot wg".to_string(),
            serial_number: "MCHP3261021800000001".to_string(),
            product: "nEDBG CMSIS-DAP".to_string(),
            device_name: "atmega4808".to_string(),
            flash_size: 48 * 1024,
            eeprom_size: 256,
            user_row_size: 64,
            fuses_size: 16,
        }
    }
}

/// Dummy kit programmer
///
/// Memories start erased (0xFF). Every programmed hex file is recorded so
/// tests can check what would have been flashed.
pub struct DummyProgrammer {
    config: DummyConfig,
    info: ToolInfo,
    memories: HashMap<MemoryType, Vec<u8>>,
    programmed: Vec<PathBuf>,
    resets: usize,
    erases: usize,
    reboots: usize,
    pending_failure: Option<String>,
}

impl DummyProgrammer {
    /// Create a dummy kit with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let info = ToolInfo {
            serial_number: config.serial_number.clone(),
            product: config.product.clone(),
            device_name: config.device_name.to_lowercase(),
        };
        let memories = [
            (MemoryType::Flash, config.flash_size),
            (MemoryType::Eeprom, config.eeprom_size),
            (MemoryType::UserRow, config.user_row_size),
            (MemoryType::Fuses, config.fuses_size),
        ]
        .into_iter()
        .map(|(memory, size)| (memory, vec![0xFF; size]))
        .collect();

        Self {
            config,
            info,
            memories,
            programmed: Vec::new(),
            resets: 0,
            erases: 0,
            reboots: 0,
            pending_failure: None,
        }
    }

    /// Create a dummy AVR-IoT WG kit
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy kit reporting `kit_name`
    pub fn with_kit_name(kit_name: &str) -> Self {
        Self::new(DummyConfig {
            kit_name: kit_name.to_string(),
            ..DummyConfig::default()
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Contents of a memory
    pub fn memory(&self, memory: MemoryType) -> &[u8] {
        self.memories.get(&memory).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Hex files programmed so far, oldest first
    pub fn programmed(&self) -> &[PathBuf] {
        &self.programmed
    }

    /// Number of target resets
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Number of chip erases
    pub fn erases(&self) -> usize {
        self.erases
    }

    /// Number of debugger reboots
    pub fn reboots(&self) -> usize {
        self.reboots
    }

    /// Make the next programming operation fail with `message`
    pub fn fail_next_program(&mut self, message: &str) {
        self.pending_failure = Some(message.to_string());
    }

    fn take_failure(&mut self) -> Result<()> {
        match self.pending_failure.take() {
            Some(message) => Err(Error::ProgrammingFailed(message)),
            None => Ok(()),
        }
    }

    fn memory_mut(&mut self, memory: MemoryType) -> &mut Vec<u8> {
        self.memories.entry(memory).or_default()
    }

    fn write(&mut self, memory: MemoryType, offset: usize, data: &[u8]) -> Result<()> {
        let mem = self.memory_mut(memory);
        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= mem.len())
            .ok_or_else(|| {
                Error::ProgrammingFailed(format!(
                    "{} bytes at 0x{:X} exceed {} ({} bytes)",
                    data.len(),
                    offset,
                    memory,
                    mem.len()
                ))
            })?;
        mem[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn verify(&self, memory: MemoryType, offset: usize, data: &[u8]) -> bool {
        offset
            .checked_add(data.len())
            .and_then(|end| self.memory(memory).get(offset..end))
            == Some(data)
    }
}

impl Programmer for DummyProgrammer {
    fn tool_info(&self) -> &ToolInfo {
        &self.info
    }

    fn read_kit_name(&mut self) -> Result<String> {
        Ok(self.config.kit_name.clone())
    }

    fn program_hexfile(&mut self, path: &Path, options: &ProgramOptions) -> Result<bool> {
        log::info!("Dummy: programming {}", path.display());
        self.take_failure()?;

        let text = std::fs::read_to_string(path)?;
        let segments = parse_ihex(&text)
            .map_err(|e| Error::ProgrammingFailed(format!("{}: {}", path.display(), e)))?;

        if options.erase {
            self.erase()?;
        }
        for segment in &segments {
            self.write(MemoryType::Flash, segment.address as usize, &segment.data)?;
        }

        let ok = !options.verify
            || segments
                .iter()
                .all(|s| self.verify(MemoryType::Flash, s.address as usize, &s.data));
        self.programmed.push(path.to_path_buf());
        Ok(ok)
    }

    fn program_data(
        &mut self,
        data: &[u8],
        memory: MemoryType,
        offset: u32,
        options: &ProgramOptions,
    ) -> Result<bool> {
        log::info!("Dummy: writing {} bytes to {} at 0x{:X}", data.len(), memory, offset);
        self.take_failure()?;

        if options.erase_applies_to(memory) {
            self.memory_mut(memory).fill(0xFF);
        }
        self.write(memory, offset as usize, data)?;

        Ok(!options.verify || self.verify(memory, offset as usize, data))
    }

    fn read_data(&mut self, memory: MemoryType, offset: u32, size: usize) -> Result<Vec<u8>> {
        let mem = self.memory(memory);
        let offset = offset as usize;
        let end = if size == 0 {
            Some(mem.len())
        } else {
            offset.checked_add(size)
        };
        end.and_then(|end| mem.get(offset..end)).map(<[u8]>::to_vec).ok_or_else(|| {
            Error::ProgrammingFailed(format!(
                "read of {} at 0x{:X} exceeds {} bytes",
                memory,
                offset,
                mem.len()
            ))
        })
    }

    fn erase(&mut self) -> Result<()> {
        log::debug!("Dummy: chip erase");
        self.erases += 1;
        // A chip erase leaves fuses and user row alone
        self.memory_mut(MemoryType::Flash).fill(0xFF);
        self.memory_mut(MemoryType::Eeprom).fill(0xFF);
        Ok(())
    }

    fn reset_target(&mut self, delay: Duration) -> Result<()> {
        log::debug!("Dummy: reset target");
        self.resets += 1;
        std::thread::sleep(delay);
        Ok(())
    }

    fn reboot(&mut self) -> Result<()> {
        log::debug!("Dummy: reboot debugger");
        self.reboots += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_hex(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "kitcommander-dummy-{}-{}.hex",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_program_hexfile() {
        let path = write_hex(
            "program",
            ":0400100012345678D8\n:00000001FF\n",
        );
        let mut kit = DummyProgrammer::new_default();
        let opts = ProgramOptions {
            erase: true,
            verify: true,
        };

        assert!(kit.program_hexfile(&path, &opts).unwrap());
        assert_eq!(kit.programmed(), &[path.clone()]);
        assert_eq!(kit.erases(), 1);
        assert_eq!(
            kit.read_data(MemoryType::Flash, 0x10, 4).unwrap(),
            vec![0x12, 0x34, 0x56, 0x78]
        );

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_hexfile() {
        let mut kit = DummyProgrammer::new_default();
        let err = kit
            .program_hexfile(Path::new("/nonexistent/app.hex"), &ProgramOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(kit.programmed().is_empty());
    }

    #[test]
    fn test_program_data_erase_only_flash() {
        let mut kit = DummyProgrammer::new_default();
        let opts = ProgramOptions::default();

        kit.program_data(&[1, 2], MemoryType::Eeprom, 0, &opts).unwrap();
        kit.program_data(&[3], MemoryType::Eeprom, 4, &opts).unwrap();
        assert_eq!(kit.read_data(MemoryType::Eeprom, 0, 5).unwrap(), vec![1, 2, 0xFF, 0xFF, 3]);

        kit.program_data(&[0xAA], MemoryType::Flash, 0, &opts).unwrap();
        kit.program_data(&[0xBB], MemoryType::Flash, 1, &opts).unwrap();
        assert_eq!(kit.read_data(MemoryType::Flash, 0, 2).unwrap(), vec![0xFF, 0xBB]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut kit = DummyProgrammer::new_default();
        let size = kit.config().user_row_size as u32;
        assert!(kit
            .program_data(&[0; 2], MemoryType::UserRow, size - 1, &ProgramOptions::default())
            .is_err());
        assert!(kit.read_data(MemoryType::Fuses, 0, 1024).is_err());
        assert!(matches!(
            kit.read_data(MemoryType::Flash, 1, usize::MAX),
            Err(Error::ProgrammingFailed(_))
        ));
        assert_eq!(kit.read_data(MemoryType::Fuses, 0, 0).unwrap().len(), 16);
    }

    #[test]
    fn test_injected_failure() {
        let mut kit = DummyProgrammer::new_default();
        kit.fail_next_program("target not responding");

        let err = kit
            .program_data(&[0], MemoryType::Flash, 0, &ProgramOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::ProgrammingFailed(ref m) if m == "target not responding"));
        // Only the next operation fails
        assert!(kit
            .program_data(&[0], MemoryType::Flash, 0, &ProgramOptions::default())
            .unwrap());
    }

    #[test]
    fn test_tool_info() {
        let mut kit = DummyProgrammer::with_kit_name("pic-iot wg");
        assert_eq!(kit.read_kit_name().unwrap(), "pic-iot wg");
        assert_eq!(kit.tool_info().programmer_id(), "nedbg");
        assert_eq!(kit.tool_info().device_name, "atmega4808");

        kit.reset_target(Duration::ZERO).unwrap();
        kit.reboot().unwrap();
        assert_eq!((kit.resets(), kit.reboots()), (1, 1));
    }
}
