//! kitcommander-kit - Kit setup for host tools
//!
//! This crate ties the registry, the programmer backends and the serial
//! drivers together:
//!
//! - [`registry`]: selecting a programmer backend by name
//! - [`KitProgrammer`]: the single connected kit and what was programmed on it
//! - [`setup_kit`]: program (or reset) a kit for a function and report how
//!   to talk to it
//! - [`FirmwareSession`]: a driver for the protocol of the application
//!
//! # Example
//!
//! ```no_run
//! use kitcommander_core::kit::{FirmwareFunction, KitDatabase};
//! use kitcommander_kit::{setup_kit, SetupOptions};
//! use std::time::Duration;
//!
//! let db = KitDatabase::builtin()?;
//! let options = SetupOptions {
//!     firmware_dir: "/usr/share/kitcommander".into(),
//!     ..SetupOptions::default()
//! };
//! let setup = setup_kit(&db, FirmwareFunction::IotProvision, &options, None)?;
//! let mut session = setup.connect(Duration::from_secs(10))?;
//! println!("{}", session.request("MC+VERSION", &["FIRMWARE"])?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod kit_programmer;
pub mod portmap;
pub mod registry;
pub mod session;
pub mod setup;

pub use error::{Error, Result};
pub use kit_programmer::{KitInfo, KitProgrammer, ProgramStrategy};
pub use registry::{available_programmers, open_programmer, programmer_help, ProgrammerInfo};
pub use session::FirmwareSession;
pub use setup::{setup_kit, KitSetup, SetupOptions};
