//! Firmware lookup for a specific kit

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::database::KitDatabase;
use super::types::{FirmwareFunction, FirmwareImage, KitDescriptor};
use crate::error::{Error, Result};

/// A firmware image resolved to a path on this host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFirmware {
    /// Function that was requested
    pub function: FirmwareFunction,
    /// Registry entry of the image
    pub image: FirmwareImage,
    /// Absolute (or firmware-dir relative) path of the hex file
    pub hexfile: PathBuf,
}

/// Finds firmware for a kit based on the requested function
///
/// Only images bundled in the firmware directory are considered.
#[derive(Debug, Clone)]
pub struct KitFirmwareProvider<'a> {
    kit: &'a KitDescriptor,
    firmware_dir: PathBuf,
}

impl<'a> KitFirmwareProvider<'a> {
    /// Look up `kit_name` in the database
    pub fn new(
        db: &'a KitDatabase,
        kit_name: &str,
        firmware_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let kit = db.find_kit(kit_name)?;
        Ok(Self {
            kit,
            firmware_dir: firmware_dir.into(),
        })
    }

    /// Registry entry of the kit
    pub fn kit(&self) -> &'a KitDescriptor {
        self.kit
    }

    /// Directory hex files are resolved against
    pub fn firmware_dir(&self) -> &Path {
        &self.firmware_dir
    }

    /// Locate the firmware image for a function
    pub fn locate_firmware(&self, function: FirmwareFunction) -> Result<ResolvedFirmware> {
        match self.kit.firmware_for(function) {
            Some(image) => {
                log::info!("Locating firmware for '{}'", function);
                Ok(ResolvedFirmware {
                    function,
                    image: image.clone(),
                    hexfile: self.firmware_dir.join(&image.hexfile),
                })
            }
            None => {
                log::error!("Unable to locate firmware for '{}'", function);
                Err(Error::FirmwareNotAvailable {
                    kit: self.kit.id.clone(),
                    function: function.to_string(),
                })
            }
        }
    }
}
