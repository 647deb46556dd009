//! CLI command implementations
//!
//! ## Kit commands
//!
//! The `kit` module works through a programmer: it identifies the kit,
//! programs applications and controls the target.
//!
//! ## Firmware commands
//!
//! The `firmware` module talks to the application over the serial port,
//! setting the kit up first when no port is given.

pub mod firmware;
pub mod kit;
mod list;

use kitcommander_core::kit::KitDatabase;
use std::path::{Path, PathBuf};

pub use list::{list_kits, list_programmers};

/// State shared by all commands
pub struct Context<'a> {
    /// Kit registry
    pub db: &'a KitDatabase,
    /// Directory the registry's hex file paths are relative to
    pub firmware_dir: &'a Path,
}

impl Context<'_> {
    /// Device pack directory: explicit, or `picpack` beside the firmware
    pub fn pack_dir(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        explicit.map(Path::to_path_buf).or_else(|| {
            let dir = self.firmware_dir.join("picpack");
            dir.is_dir().then_some(dir)
        })
    }
}
