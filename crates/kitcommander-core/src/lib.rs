//! kitcommander-core - Kit registry and programmer abstractions
//!
//! This crate holds the pieces every other kitcommander crate agrees on:
//!
//! - [`kit`]: the registry of supported development kits and the firmware
//!   images bundled for each of them, loaded from RON
//! - [`programmer`]: the [`Programmer`](programmer::Programmer) trait that
//!   programming backends implement
//! - [`error`]: the shared error type
//!
//! # Example
//!
//! ```no_run
//! use kitcommander_core::kit::{FirmwareFunction, KitDatabase, KitFirmwareProvider};
//!
//! let db = KitDatabase::builtin()?;
//! let provider = KitFirmwareProvider::new(&db, "AVR-IoT WG", "/usr/share/kitcommander")?;
//! let fw = provider.locate_firmware(FirmwareFunction::IotProvision)?;
//! println!("{} -> {}", fw.image.description, fw.hexfile.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod kit;
pub mod programmer;

pub use error::{Error, Result};
