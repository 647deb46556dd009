//! Kit database for runtime loading and lookup
//!
//! This module provides the `KitDatabase` type for loading kit definitions
//! from RON files. The builtin registry is compiled into the crate and parsed
//! by `KitDatabase::builtin`; further files can be layered on top of it.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::{
    Architecture, FirmwareFunction, FirmwareImage, KitDescriptor, KitLeds, ProtocolInfo,
};
use crate::error::{Error, Result};

/// Builtin kit registry
const BUILTIN_KITS: &str = include_str!("../../kits/builtin.ron");

/// Error type for kit database operations
#[derive(Debug, Error)]
pub enum KitDbError {
    /// I/O error reading files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// RON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

/// Firmware image definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct FirmwareDef {
    description: String,
    hexfile: PathBuf,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    public_repo: Option<String>,
    #[serde(default)]
    protocol: Option<ProtocolInfo>,
    #[serde(default)]
    startup_delay_ms: u64,
    functions: Vec<FirmwareFunction>,
}

fn default_version() -> String {
    "unknown".to_string()
}

fn default_programmer() -> String {
    "nedbg".to_string()
}

/// Single kit definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct KitDef {
    id: String,
    names: Vec<String>,
    architecture: Architecture,
    device: String,
    #[serde(default = "default_programmer")]
    programmer: String,
    #[serde(default)]
    variants: Vec<String>,
    #[serde(default)]
    leds: KitLeds,
    firmware: Vec<FirmwareDef>,
}

/// Top level of a kit registry file
#[derive(Debug, Clone, serde::Deserialize)]
struct KitFileDef {
    kits: Vec<KitDef>,
}

impl From<FirmwareDef> for FirmwareImage {
    fn from(def: FirmwareDef) -> Self {
        FirmwareImage {
            description: def.description,
            hexfile: def.hexfile,
            version: def.version,
            public_repo: def.public_repo,
            protocol: def.protocol,
            startup_delay_ms: def.startup_delay_ms,
            functions: def.functions,
        }
    }
}

// ============================================================================
// Kit database
// ============================================================================

/// Runtime kit database
///
/// Holds the kit descriptors known to the host. Every kit name resolves to
/// at most one descriptor; loading a file that would break this is rejected
/// as a whole.
#[derive(Debug, Clone, Default)]
pub struct KitDatabase {
    kits: Vec<KitDescriptor>,
}

impl KitDatabase {
    /// Create an empty kit database
    pub fn new() -> Self {
        Self { kits: Vec::new() }
    }

    /// Create a database holding the builtin kit registry
    pub fn builtin() -> core::result::Result<Self, KitDbError> {
        let mut db = Self::new();
        db.load_ron(BUILTIN_KITS)?;
        Ok(db)
    }

    /// Load kit definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> core::result::Result<usize, KitDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load kit definitions from a RON string
    pub fn load_ron(&mut self, content: &str) -> core::result::Result<usize, KitDbError> {
        let file: KitFileDef = ron::from_str(content)?;

        let mut new_kits = Vec::with_capacity(file.kits.len());
        for def in file.kits {
            new_kits.push(Self::convert_kit(def)?);
        }

        // Names must stay unique across the whole database
        let mut seen: HashSet<String> = self
            .kits
            .iter()
            .flat_map(|k| k.names.iter().cloned())
            .collect();
        for kit in &new_kits {
            for name in &kit.names {
                if !seen.insert(name.clone()) {
                    return Err(KitDbError::Validation(format!(
                        "kit name '{}' is defined more than once",
                        name
                    )));
                }
            }
        }

        let count = new_kits.len();
        self.kits.extend(new_kits);
        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> core::result::Result<usize, KitDbError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }

    fn convert_kit(def: KitDef) -> core::result::Result<KitDescriptor, KitDbError> {
        if def.names.is_empty() {
            return Err(KitDbError::Validation(format!(
                "kit '{}' has no names",
                def.id
            )));
        }

        let mut functions = HashSet::new();
        for fw in &def.firmware {
            if fw.hexfile.as_os_str().is_empty() {
                return Err(KitDbError::Validation(format!(
                    "firmware '{}' of kit '{}' has an empty hex file path",
                    fw.description, def.id
                )));
            }
            for function in &fw.functions {
                if !functions.insert(*function) {
                    return Err(KitDbError::Validation(format!(
                        "kit '{}' has more than one image for '{}'",
                        def.id, function
                    )));
                }
            }
        }

        Ok(KitDescriptor {
            id: def.id,
            names: def.names.iter().map(|n| n.trim().to_lowercase()).collect(),
            architecture: def.architecture,
            device: def.device.to_lowercase(),
            programmer: def.programmer,
            variants: def.variants,
            leds: def.leds,
            firmware: def.firmware.into_iter().map(FirmwareImage::from).collect(),
        })
    }

    /// Get all kits in the database
    pub fn kits(&self) -> &[KitDescriptor] {
        &self.kits
    }

    /// Get the number of kits in the database
    pub fn len(&self) -> usize {
        self.kits.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.kits.is_empty()
    }

    /// All accepted kit names
    pub fn kit_names(&self) -> Vec<&str> {
        self.kits
            .iter()
            .flat_map(|k| k.names.iter().map(String::as_str))
            .collect()
    }

    /// Find the kit matching a kit name (case-insensitive)
    pub fn find_kit(&self, kit_name: &str) -> Result<&KitDescriptor> {
        log::info!("Looking for kit matching '{}'", kit_name.to_lowercase());

        match self.kits.iter().find(|k| k.matches(kit_name)) {
            Some(kit) => Ok(kit),
            None => {
                log::warn!("kitcommander has no support for '{}'", kit_name);
                let names: Vec<String> = self
                    .kit_names()
                    .iter()
                    .map(|n| format!("'{}'", n))
                    .collect();
                log::warn!("Supported kits: {}", names.join(" "));
                Err(Error::KitNotSupported(kit_name.to_string()))
            }
        }
    }

    /// Iterate over all kits
    pub fn iter(&self) -> impl Iterator<Item = &KitDescriptor> {
        self.kits.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::ProtocolId;

    const EXTRA_KIT: &str = r#"
    (
        kits: [
            (
                id: "test-kit",
                names: ["Test Kit"],
                architecture: Avr,
                device: "ATmega4809",
                leds: (error: Some("ERR")),
                firmware: [
                    (
                        description: "Test provisioning firmware",
                        hexfile: "fw/avr/test.hex",
                        version: "1.0.0",
                        protocol: Some((id: ProvisioningV2, baud: 115200)),
                        functions: [IotProvision, EccProvision],
                    ),
                ],
            ),
        ],
    )
    "#;

    #[test]
    fn test_builtin_loads() {
        let db = KitDatabase::builtin().unwrap();
        assert_eq!(db.len(), 7);
    }

    #[test]
    fn test_every_builtin_kit_has_firmware() {
        let db = KitDatabase::builtin().unwrap();
        for kit in db.iter() {
            for name in &kit.names {
                let found = db.find_kit(name).unwrap();
                assert_eq!(found.id, kit.id);
                assert!(!found.firmware.is_empty(), "{} has no firmware", kit.id);
                for fw in &found.firmware {
                    assert!(!fw.hexfile.as_os_str().is_empty());
                    assert!(!fw.functions.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_builtin_protocols() {
        let db = KitDatabase::builtin().unwrap();

        let avr = db.find_kit("AVR-IoT WG").unwrap();
        let provision = avr.firmware_for(FirmwareFunction::IotProvisionAws).unwrap();
        let protocol = provision.protocol.unwrap();
        assert_eq!(protocol.id, ProtocolId::ProvisioningV2);
        assert_eq!(protocol.baud, 115200);

        let demo = avr.firmware_for(FirmwareFunction::DemoGoogle).unwrap();
        assert_eq!(demo.protocol.unwrap().id, ProtocolId::WxDemoV1);
        assert_eq!(demo.protocol.unwrap().baud, 9600);
        assert!(avr.firmware_for(FirmwareFunction::DemoAzure).is_none());

        let winc = db
            .find_kit("pic-iot wa")
            .unwrap()
            .firmware_for(FirmwareFunction::WincUpgrade)
            .unwrap();
        assert_eq!(winc.startup_delay_ms, 100);

        let trust = db.find_kit("CryptoAuth Trust Platform").unwrap();
        assert_eq!(trust.supported_functions(), vec![FirmwareFunction::EccProvision]);
        assert_eq!(trust.leds.error.as_deref(), Some("STATUS"));
    }

    #[test]
    fn test_unknown_kit() {
        let db = KitDatabase::builtin().unwrap();
        let err = db.find_kit("arduino uno").unwrap_err();
        assert!(matches!(err, Error::KitNotSupported(name) if name == "arduino uno"));
    }

    #[test]
    fn test_load_extra_ron() {
        let mut db = KitDatabase::builtin().unwrap();
        assert_eq!(db.load_ron(EXTRA_KIT).unwrap(), 1);
        assert_eq!(db.len(), 8);

        let kit = db.find_kit("TEST KIT").unwrap();
        assert_eq!(kit.device, "atmega4809");
        assert_eq!(kit.programmer, "nedbg");
        assert_eq!(kit.leds.error.as_deref(), Some("ERR"));
        assert_eq!(kit.leds.user, None);
        assert_eq!(kit.supported_functions().len(), 2);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut db = KitDatabase::new();
        db.load_ron(EXTRA_KIT).unwrap();
        let err = db.load_ron(EXTRA_KIT).unwrap_err();
        assert!(matches!(err, KitDbError::Validation(_)));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let ron = r#"
        (
            kits: [
                (
                    id: "dup",
                    names: ["dup kit"],
                    architecture: Sam,
                    device: "atsamd21g18a",
                    firmware: [
                        (description: "a", hexfile: "a.hex", functions: [DemoAws]),
                        (description: "b", hexfile: "b.hex", functions: [DemoAws]),
                    ],
                ),
            ],
        )
        "#;
        let mut db = KitDatabase::new();
        assert!(matches!(
            db.load_ron(ron),
            Err(KitDbError::Validation(_))
        ));
    }
}
