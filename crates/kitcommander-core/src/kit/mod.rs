//! Kit and firmware registry
//!
//! The registry maps kit names (as reported by the on-board debugger) to a
//! [`KitDescriptor`], which in turn lists the firmware images bundled for that
//! kit and the function each image serves. The builtin registry ships as RON
//! inside this crate; additional registries can be loaded at runtime.

mod database;
mod provider;
mod types;

pub use database::{KitDatabase, KitDbError};
pub use provider::{KitFirmwareProvider, ResolvedFirmware};
pub use types::*;
