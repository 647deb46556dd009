//! kitcommander - Development kit bridge firmware manager
//!
//! Programs bridge firmware onto Microchip IoT development kits and talks to
//! it over the kit's serial port.
//!
//! # Architecture
//!
//! - **Kit registry** (kitcommander-core) - which firmware serves which
//!   function on which kit, loaded from RON
//! - **Programmers** (kitcommander-pymcuprog, kitcommander-dummy) - flash and
//!   reset the target behind one `Programmer` trait
//! - **Drivers** (kitcommander-serial) - the text protocols of the firmware
//! - **Kit setup** (kitcommander-kit) - ties the above together

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use kitcommander_core::kit::KitDatabase;
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    // Load kit database
    let db = match load_kit_database(cli.kit_db.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load kit database: {}", e);
            std::process::exit(1);
        }
    };
    log::debug!("Loaded {} kit definitions", db.len());

    let firmware_dir = resolve_firmware_dir(cli.firmware_dir);
    let ctx = commands::Context {
        db: &db,
        firmware_dir: &firmware_dir,
    };

    match cli.command {
        Commands::ListKits { firmware } => {
            commands::list_kits(&db, firmware);
            Ok(())
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::Info { kit } => commands::kit::run_info(&ctx, &kit),
        Commands::Setup {
            kit,
            function,
            skip_programming,
        } => commands::kit::run_setup(&ctx, &kit, function, skip_programming),
        Commands::Program {
            kit,
            input,
            function,
            data,
            memory,
            offset,
            no_erase,
            verify,
        } => {
            let target = match (input, function, data) {
                (Some(path), _, _) => commands::kit::ProgramTarget::HexFile(path),
                (_, Some(function), _) => commands::kit::ProgramTarget::Function(function),
                (_, _, Some(path)) => commands::kit::ProgramTarget::Data {
                    path,
                    memory: memory.parse()?,
                    offset,
                },
                _ => return Err("one of --input, --function or --data is required".into()),
            };
            let options = kitcommander_core::programmer::ProgramOptions {
                erase: !no_erase,
                verify,
            };
            commands::kit::run_program(&ctx, &kit, target, &options)
        }
        Commands::Erase { kit } => commands::kit::run_erase(&ctx, &kit),
        Commands::Reset { kit, delay } => commands::kit::run_reset(&ctx, &kit, delay),
        Commands::Reboot { kit } => commands::kit::run_reboot(&ctx, &kit),
        Commands::Command {
            link,
            name,
            args,
            blob,
        } => commands::firmware::run_command(&ctx, &link, &name, &args, blob.as_deref()),
        Commands::Ping { link } => commands::firmware::run_ping(&ctx, &link),
        Commands::DemoCommand { link, name, args } => {
            commands::firmware::run_demo_command(&ctx, &link, &name, &args)
        }
    }
}

/// Load the builtin kit database plus any user supplied registry files
fn load_kit_database(path: Option<&Path>) -> Result<KitDatabase, Box<dyn std::error::Error>> {
    let mut db = KitDatabase::builtin()?;

    if let Some(path) = path {
        let count = if path.is_dir() {
            db.load_dir(path)?
        } else if path.is_file() {
            db.load_file(path)?
        } else {
            return Err(format!("Kit database path not found: {}", path.display()).into());
        };
        log::info!("Loaded {} kits from {}", count, path.display());
    }

    Ok(db)
}

/// Pick the firmware directory from the command line or default locations
fn resolve_firmware_dir(path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = path {
        return path;
    }

    let default_paths = [
        PathBuf::from("."),
        PathBuf::from("/usr/share/kitcommander"),
        PathBuf::from("/usr/local/share/kitcommander"),
    ];
    for dir in default_paths {
        if dir.join("fw").is_dir() {
            log::debug!("Using firmware from {}", dir.display());
            return dir;
        }
    }

    log::warn!("No firmware directory found in default locations");
    PathBuf::from(".")
}
