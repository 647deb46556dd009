//! kitcommander-pymcuprog - Programmer backend driving pymcuprog
//!
//! Kits with an nEDBG on-board debugger are programmed through Microchip's
//! `pymcuprog` command-line tool. The kit name and target device are read
//! from the debugger's configuration with `pydebuggerconfig`.
//!
//! Every operation runs one tool invocation, which opens and closes its own
//! session with the debugger.

pub mod discovery;
pub mod error;
pub mod runner;

use std::path::{Path, PathBuf};
use std::time::Duration;

use kitcommander_core::programmer::{MemoryType, ProgramOptions, Programmer, ToolInfo};

pub use discovery::{find_debuggers, UsbDebugger, MICROCHIP_VID};
pub use error::{PymcuprogError, Result};
pub use runner::{CommandRunner, SystemRunner, ToolOutput};

use runner::run_checked;

/// Backend configuration
#[derive(Debug, Clone)]
pub struct PymcuprogConfig {
    /// USB serial number (or a substring of it) of the debugger to use
    pub serial_number: Option<String>,
    /// Directory of device packs; the pack for a device is `<dir>/<device>`
    pub pack_dir: Option<PathBuf>,
    /// Tool type passed to pymcuprog
    pub tool_type: String,
    /// pymcuprog executable
    pub pymcuprog: String,
    /// pydebuggerconfig executable
    pub pydebuggerconfig: String,
    /// Time the debugger needs to come back after a reboot
    pub reboot_delay: Duration,
}

impl Default for PymcuprogConfig {
    fn default() -> Self {
        Self {
            serial_number: None,
            pack_dir: None,
            tool_type: "nedbg".to_string(),
            pymcuprog: "pymcuprog".to_string(),
            pydebuggerconfig: "pydebuggerconfig".to_string(),
            reboot_delay: Duration::from_secs(2),
        }
    }
}

/// A debugger that answered the configuration query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsableKit {
    /// Debugger information
    pub info: ToolInfo,
    /// Kit name from the KITNAME register
    pub kit_name: String,
    /// CDC serial port
    pub port: Option<String>,
}

/// Query each debugger's configuration, dropping the ones that fail
///
/// A debugger that cannot be read is logged and ignored, it is definitely
/// unsuitable for programming.
pub fn usable_kits(
    debuggers: &[UsbDebugger],
    config: &PymcuprogConfig,
    runner: &mut dyn CommandRunner,
) -> Vec<UsableKit> {
    let mut kits = Vec::new();
    for dbg in debuggers {
        match read_board_config(runner, config, &dbg.serial_number) {
            Ok((kit_name, device)) => kits.push(UsableKit {
                info: ToolInfo {
                    serial_number: dbg.serial_number.clone(),
                    product: dbg.product.clone(),
                    device_name: device,
                },
                kit_name,
                port: dbg.port.clone(),
            }),
            Err(e) => log::error!("Error '{}' connecting to '{}'", e, dbg.product),
        }
    }
    kits
}

/// Read (KITNAME, DEVICE) from a debugger, device name lower case
fn read_board_config(
    runner: &mut dyn CommandRunner,
    config: &PymcuprogConfig,
    serial: &str,
) -> Result<(String, String)> {
    let args = vec!["read".to_string(), "-s".to_string(), serial.to_string()];
    let output = run_checked(runner, &config.pydebuggerconfig, &args)?;
    let regs = discovery::parse_config_registers(&output.stdout);

    let device = regs
        .get("DEVICE")
        .map(|d| d.to_lowercase())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| PymcuprogError::NoDevice(serial.to_string()))?;
    let kit_name = regs.get("KITNAME").cloned().unwrap_or_default();
    Ok((kit_name, device))
}

/// Programmer bound to one nEDBG debugger
pub struct PymcuprogProgrammer {
    config: PymcuprogConfig,
    info: ToolInfo,
    port: Option<String>,
    runner: Box<dyn CommandRunner>,
}

impl PymcuprogProgrammer {
    /// Bind to a kit found by [`usable_kits`]
    pub fn new(kit: UsableKit, config: PymcuprogConfig, runner: Box<dyn CommandRunner>) -> Self {
        log::info!(
            "Using {} ({}) with {}",
            kit.info.product,
            kit.info.serial_number,
            kit.info.device_name
        );
        Self {
            config,
            info: kit.info,
            port: kit.port,
            runner,
        }
    }

    /// CDC serial port of the debugger
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Device pack for the target, if a pack directory is configured
    pub fn packpath(&self) -> Option<PathBuf> {
        self.config
            .pack_dir
            .as_ref()
            .map(|dir| dir.join(&self.info.device_name))
    }

    /// Arguments selecting tool, debugger and device
    fn session_args(&self, action: &str) -> Vec<String> {
        let mut args = vec![
            action.to_string(),
            "-t".to_string(),
            self.config.tool_type.clone(),
            "-s".to_string(),
            self.info.serial_number.clone(),
            "-d".to_string(),
            self.info.device_name.clone(),
        ];
        if let Some(pack) = self.packpath() {
            args.push("-p".to_string());
            args.push(pack.display().to_string());
        }
        args
    }

    fn pymcuprog(&mut self, args: &[String]) -> Result<ToolOutput> {
        run_checked(self.runner.as_mut(), &self.config.pymcuprog, args)
    }

    /// Run a write with `--verify`, mapping a verify mismatch to `false`
    fn write_verified(&mut self, args: &[String], verify: bool) -> Result<bool> {
        match self.pymcuprog(args) {
            Ok(_) => Ok(true),
            Err(PymcuprogError::ToolFailed { message, .. })
                if verify && message.to_lowercase().contains("verify") =>
            {
                log::error!("Verification failed: {}", message);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

impl Programmer for PymcuprogProgrammer {
    fn tool_info(&self) -> &ToolInfo {
        &self.info
    }

    fn read_kit_name(&mut self) -> kitcommander_core::Result<String> {
        let serial = self.info.serial_number.clone();
        let (kit_name, _) = read_board_config(self.runner.as_mut(), &self.config, &serial)?;
        Ok(kit_name)
    }

    fn program_hexfile(
        &mut self,
        path: &Path,
        options: &ProgramOptions,
    ) -> kitcommander_core::Result<bool> {
        log::info!("Program hexfile to target: {}", path.display());
        let mut args = self.session_args("write");
        args.push("-f".to_string());
        args.push(path.display().to_string());
        if options.erase {
            log::info!("Erasing flash...");
            args.push("--erase".to_string());
        }
        if options.verify {
            args.push("--verify".to_string());
        }
        Ok(self.write_verified(&args, options.verify)?)
    }

    fn program_data(
        &mut self,
        data: &[u8],
        memory: MemoryType,
        offset: u32,
        options: &ProgramOptions,
    ) -> kitcommander_core::Result<bool> {
        log::info!("Program {} bytes to {}", data.len(), memory);
        let mut args = self.session_args("write");
        args.extend([
            "-m".to_string(),
            memory.as_str().to_string(),
            "-o".to_string(),
            format!("0x{:X}", offset),
            "-l".to_string(),
        ]);
        args.extend(data.iter().map(|b| format!("0x{:02X}", b)));
        // Erasing anything but flash can have side effects
        if options.erase_applies_to(memory) {
            args.push("--erase".to_string());
        }
        if options.verify {
            args.push("--verify".to_string());
        }
        Ok(self.write_verified(&args, options.verify)?)
    }

    fn read_data(
        &mut self,
        memory: MemoryType,
        offset: u32,
        size: usize,
    ) -> kitcommander_core::Result<Vec<u8>> {
        log::info!("Read data from target {}", memory);
        let mut args = self.session_args("read");
        args.extend([
            "-m".to_string(),
            memory.as_str().to_string(),
            "-o".to_string(),
            format!("0x{:X}", offset),
        ]);
        if size > 0 {
            args.push("-b".to_string());
            args.push(size.to_string());
        }

        let output = self.pymcuprog(&args)?;
        let mut data = parse_memory_dump(&output.stdout)?;
        if size > 0 {
            if data.len() < size {
                return Err(PymcuprogError::Parse {
                    tool: self.config.pymcuprog.clone(),
                    reason: format!("expected {} bytes, got {}", size, data.len()),
                }
                .into());
            }
            data.truncate(size);
        }
        Ok(data)
    }

    fn erase(&mut self) -> kitcommander_core::Result<()> {
        log::info!("Erasing target...");
        let args = self.session_args("erase");
        self.pymcuprog(&args)?;
        Ok(())
    }

    fn reset_target(&mut self, delay: Duration) -> kitcommander_core::Result<()> {
        log::info!("Resetting target device");
        let args = self.session_args("reset");
        self.pymcuprog(&args)?;
        std::thread::sleep(delay);
        Ok(())
    }

    fn reboot(&mut self) -> kitcommander_core::Result<()> {
        log::info!("Rebooting debugger {}", self.info.serial_number);
        let args = vec![
            "reboot-debugger".to_string(),
            "-t".to_string(),
            self.config.tool_type.clone(),
            "-s".to_string(),
            self.info.serial_number.clone(),
        ];
        self.pymcuprog(&args)?;
        std::thread::sleep(self.config.reboot_delay);
        Ok(())
    }
}

/// Collect the bytes of a `pymcuprog read` hex dump
///
/// Data lines look like `0x000010: 0C 94 5D 00 ...`; everything else is
/// ignored.
fn parse_memory_dump(output: &str) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    for line in output.lines() {
        let Some((addr, bytes)) = line.trim().split_once(':') else {
            continue;
        };
        let Some(addr) = addr.trim().strip_prefix("0x") else {
            continue;
        };
        if u32::from_str_radix(addr, 16).is_err() {
            continue;
        }
        for token in bytes.split_whitespace() {
            let byte = u8::from_str_radix(token, 16).map_err(|_| PymcuprogError::Parse {
                tool: "pymcuprog".to_string(),
                reason: format!("bad byte '{}' in line '{}'", token, line.trim()),
            })?;
            data.push(byte);
        }
    }
    Ok(data)
}
