//! CLI argument parsing

use clap::{Parser, Subcommand};
use kitcommander_core::kit::FirmwareFunction;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    let names: Vec<&str> = kitcommander_kit::available_programmers()
        .iter()
        .map(|p| p.name)
        .collect();
    format!(
        "Programmer to use, name[:key=value,...] [available: {}]",
        names.join(", ")
    )
}

fn function_help() -> String {
    let names: Vec<&str> = FirmwareFunction::ALL.iter().map(|f| f.as_str()).collect();
    format!("Firmware function [{}]", names.join(", "))
}

#[derive(Parser)]
#[command(name = "kitcommander")]
#[command(author, version, about = "Development kit bridge firmware manager", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Additional kit registry file or directory (contains .ron files)
    #[arg(long, global = true)]
    pub kit_db: Option<PathBuf>,

    /// Directory holding the fw/ tree of bundled hex files
    /// Defaults to the first of ., /usr/share/kitcommander and
    /// /usr/local/share/kitcommander that contains fw/
    #[arg(long, global = true)]
    pub firmware_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Kit selection shared by the programming commands
#[derive(clap::Args, Debug, Clone)]
pub struct KitArgs {
    #[arg(short, long, default_value = "pymcuprog", help = programmer_help())]
    pub programmer: String,

    /// Device pack directory (PIC targets), defaults to <firmware-dir>/picpack
    #[arg(long)]
    pub pack_dir: Option<PathBuf>,
}

/// How to reach the firmware on a kit
#[derive(clap::Args, Debug, Clone)]
pub struct LinkArgs {
    /// Serial port of the kit; without it the kit is set up first
    #[arg(long)]
    pub port: Option<String>,

    /// Baud rate (defaults to the protocol's rate)
    #[arg(long)]
    pub baud: Option<u32>,

    /// Response timeout in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    /// Application to set up when no port is given
    #[arg(short, long, help = function_help())]
    pub function: Option<FirmwareFunction>,

    /// Use the application already on the kit, only reset it
    #[arg(long)]
    pub skip_programming: bool,

    #[command(flatten)]
    pub kit: KitArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List supported kits and their firmware
    ListKits {
        /// Also show the firmware images of each kit
        #[arg(long)]
        firmware: bool,
    },

    /// List supported programmers
    ListProgrammers,

    /// Show information about the connected kit
    Info {
        #[command(flatten)]
        kit: KitArgs,
    },

    /// Program the application for a function and print how to reach it
    Setup {
        #[command(flatten)]
        kit: KitArgs,

        #[arg(short, long, help = function_help())]
        function: FirmwareFunction,

        /// Only reset the target, keep its current application
        #[arg(long)]
        skip_programming: bool,
    },

    /// Program a hex file or raw data into the kit
    Program {
        #[command(flatten)]
        kit: KitArgs,

        /// Hex file to program
        #[arg(short, long, conflicts_with_all = ["function", "data"])]
        input: Option<PathBuf>,

        /// Program the bundled firmware for this function
        #[arg(short, long, help = function_help())]
        function: Option<FirmwareFunction>,

        /// Raw binary file to write to --memory
        #[arg(long, conflicts_with = "function")]
        data: Option<PathBuf>,

        /// Memory for --data (flash, eeprom, user_row, fuses)
        #[arg(long, default_value = "flash", requires = "data")]
        memory: String,

        /// Offset for --data (hex, e.g. 0x100)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0", requires = "data")]
        offset: u32,

        /// Don't erase before writing
        #[arg(long)]
        no_erase: bool,

        /// Verify after writing
        #[arg(long)]
        verify: bool,
    },

    /// Erase the target device
    Erase {
        #[command(flatten)]
        kit: KitArgs,
    },

    /// Reset the target device
    Reset {
        #[command(flatten)]
        kit: KitArgs,

        /// Milliseconds to wait after reset
        #[arg(long, default_value = "0")]
        delay: u64,
    },

    /// Reboot the on-board debugger
    Reboot {
        #[command(flatten)]
        kit: KitArgs,
    },

    /// Send a command to the provisioning firmware
    Command {
        #[command(flatten)]
        link: LinkArgs,

        /// Command name, MC+ is added if missing (e.g. ECC+SERIAL)
        name: String,

        /// Command arguments
        args: Vec<String>,

        /// File whose contents are sent as the command's data blob
        #[arg(long)]
        blob: Option<PathBuf>,
    },

    /// Synchronize with the provisioning firmware
    Ping {
        #[command(flatten)]
        link: LinkArgs,
    },

    /// Send a command to the CLI of a demo application
    DemoCommand {
        #[command(flatten)]
        link: LinkArgs,

        /// Command name (e.g. wifi)
        name: String,

        /// Command arguments, sent comma separated
        args: Vec<String>,
    },
}
