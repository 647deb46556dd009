//! Commands working through a programmer

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use kitcommander_core::kit::{FirmwareFunction, KitFirmwareProvider};
use kitcommander_core::programmer::{MemoryType, ProgramOptions};
use kitcommander_kit::{setup_kit, KitProgrammer, ProgramStrategy, SetupOptions};

use super::Context;
use crate::cli::KitArgs;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// What the program command writes
pub enum ProgramTarget {
    /// A hex file
    HexFile(PathBuf),
    /// The bundled firmware for a function
    Function(FirmwareFunction),
    /// Raw bytes from a file into one memory
    Data {
        path: PathBuf,
        memory: MemoryType,
        offset: u32,
    },
}

/// Create a spinner for operations without progress information
pub(crate) fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn open_kit(ctx: &Context<'_>, args: &KitArgs) -> Result<KitProgrammer, Box<dyn std::error::Error>> {
    let pack_dir = ctx.pack_dir(args.pack_dir.as_deref());
    Ok(KitProgrammer::open(&args.programmer, pack_dir.as_deref())?)
}

/// Show the connected kit and what the registry knows about it
pub fn run_info(ctx: &Context<'_>, args: &KitArgs) -> CmdResult {
    let kit = open_kit(ctx, args)?;
    let info = kit.kit_info();

    println!("Kit Information");
    println!("===============");
    println!();
    println!("Kit name:        {}", info.kit_name);
    println!("Device:          {}", info.device_name);
    println!("Programmer:      {} ({})", info.programmer_name, info.programmer_id);
    println!("Serial number:   {}", info.serial_number);
    println!(
        "Serial port:     {}",
        info.serial_port.as_deref().unwrap_or("not found")
    );

    match ctx.db.find_kit(&info.kit_name) {
        Ok(descriptor) => {
            println!();
            println!("Registry entry:  {}", descriptor.id);
            if !descriptor.variants.is_empty() {
                println!("Cloud variants:  {}", descriptor.variants.join(", "));
            }
            let functions: Vec<&str> = descriptor
                .supported_functions()
                .iter()
                .map(|f| f.as_str())
                .collect();
            println!("Functions:       {}", functions.join(", "));
        }
        Err(_) => {
            println!();
            println!("Note: this kit is not in the kit registry.");
        }
    }

    Ok(())
}

/// Set up the kit for a function and print the result as RON
pub fn run_setup(
    ctx: &Context<'_>,
    args: &KitArgs,
    function: FirmwareFunction,
    skip_programming: bool,
) -> CmdResult {
    let options = SetupOptions {
        skip_programming,
        firmware_dir: ctx.firmware_dir.to_path_buf(),
        programmer: args.programmer.clone(),
        pack_dir: ctx.pack_dir(args.pack_dir.as_deref()),
        strategy: ProgramStrategy::Always,
    };

    let pb = spinner(format!("Setting up kit for {}...", function));
    let result = setup_kit(ctx.db, function, &options, None);
    pb.finish_and_clear();

    let setup = result?;
    let text = ron::ser::to_string_pretty(&setup, ron::ser::PrettyConfig::default())?;
    println!("{}", text);
    Ok(())
}

/// Program a hex file, bundled firmware or raw data
pub fn run_program(
    ctx: &Context<'_>,
    args: &KitArgs,
    target: ProgramTarget,
    options: &ProgramOptions,
) -> CmdResult {
    let mut kit = open_kit(ctx, args)?;

    let hexfile = match target {
        ProgramTarget::HexFile(path) => path,
        ProgramTarget::Function(function) => {
            let provider =
                KitFirmwareProvider::new(ctx.db, &kit.kit_info().kit_name, ctx.firmware_dir)?;
            let firmware = provider.locate_firmware(function)?;
            println!(
                "Using {} version {}",
                firmware.image.description, firmware.image.version
            );
            firmware.hexfile
        }
        ProgramTarget::Data {
            path,
            memory,
            offset,
        } => {
            let data = std::fs::read(&path)?;
            let pb = spinner(format!("Writing {} bytes to {}...", data.len(), memory));
            let result = kit
                .programmer_mut()
                .program_data(&data, memory, offset, options);
            pb.finish_and_clear();
            return report_programming(result?, &path.display().to_string());
        }
    };

    let pb = spinner(format!("Programming {}...", hexfile.display()));
    let result = kit.programmer_mut().program_hexfile(&hexfile, options);
    pb.finish_and_clear();
    report_programming(result?, &hexfile.display().to_string())
}

fn report_programming(verified: bool, what: &str) -> CmdResult {
    if !verified {
        return Err(format!("Verification of {} failed", what).into());
    }
    println!("Programmed {}", what);
    Ok(())
}

/// Erase the target
pub fn run_erase(ctx: &Context<'_>, args: &KitArgs) -> CmdResult {
    let mut kit = open_kit(ctx, args)?;
    let pb = spinner("Erasing target...".to_string());
    let result = kit.erase();
    pb.finish_and_clear();
    result?;
    println!("Target erased");
    Ok(())
}

/// Reset the target
pub fn run_reset(ctx: &Context<'_>, args: &KitArgs, delay_ms: u64) -> CmdResult {
    let mut kit = open_kit(ctx, args)?;
    kit.reset_target(Duration::from_millis(delay_ms))?;
    println!("Target reset");
    Ok(())
}

/// Reboot the debugger
pub fn run_reboot(ctx: &Context<'_>, args: &KitArgs) -> CmdResult {
    let mut kit = open_kit(ctx, args)?;
    kit.reboot()?;
    println!("Debugger rebooted");
    Ok(())
}
