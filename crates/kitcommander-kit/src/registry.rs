//! Programmer registry and initialization
//!
//! Programmers are selected with a string of the form `name` or
//! `name:key1=value1,key2=value2`, e.g. `pymcuprog:serial=MCHP3261` or
//! `dummy:kit=pic-iot wg`.

use std::collections::HashMap;
use std::path::Path;

use kitcommander_core::programmer::Programmer;

use crate::error::{Error, Result};

/// Information about a programmer backend
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "pymcuprog")]
    programmers.push(ProgrammerInfo {
        name: "pymcuprog",
        aliases: &["nedbg"],
        description: "nEDBG kits through pymcuprog (serial=<usb sn>,packpath=<dir>,tool=<type>)",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory kit for testing (kit=<name>,serial=<sn>,device=<device>)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        let aliases = if p.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", p.aliases.join(", "))
        };
        help.push_str(&format!("  {:12} - {}{}\n", p.name, p.description, aliases));
    }

    help
}

/// Parsed programmer parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammerParams {
    /// Programmer name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl ProgrammerParams {
    /// Value of a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Warn about parameters the backend does not understand
    fn warn_unknown(&self, known: &[&str]) {
        for key in self.params.keys() {
            if !known.contains(&key.as_str()) {
                log::warn!("Ignoring unknown {} parameter '{}'", self.name, key);
            }
        }
    }
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidParameter("empty programmer name".to_string()));
    }

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.trim().to_string(), value.to_string());
            } else {
                return Err(Error::InvalidParameter(format!(
                    "'{}' (expected key=value)",
                    opt
                )));
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// A programmer bound to one kit
pub struct OpenedProgrammer {
    /// The backend
    pub programmer: Box<dyn Programmer>,
    /// Serial port of the kit, when the backend found it during discovery
    pub port: Option<String>,
}

/// Open a programmer by name
///
/// `pack_dir` is the default device pack directory, overridden by a
/// `packpath=` parameter.
#[allow(unused_variables)]
pub fn open_programmer(programmer: &str, pack_dir: Option<&Path>) -> Result<OpenedProgrammer> {
    let params = parse_programmer_params(programmer)?;

    match params.name.as_str() {
        #[cfg(feature = "pymcuprog")]
        "pymcuprog" | "nedbg" => open_pymcuprog(&params, pack_dir),

        #[cfg(feature = "dummy")]
        "dummy" => Ok(open_dummy(&params)),

        _ => Err(Error::UnknownProgrammer(params.name)),
    }
}

/// Pick the only item, failing when there are none or several
pub fn select_single<T>(mut items: Vec<T>) -> Result<T> {
    match items.len() {
        0 => Err(kitcommander_core::Error::NoKitFound.into()),
        1 => Ok(items.remove(0)),
        n => Err(kitcommander_core::Error::TooManyKits(n).into()),
    }
}

#[cfg(feature = "pymcuprog")]
fn open_pymcuprog(params: &ProgrammerParams, pack_dir: Option<&Path>) -> Result<OpenedProgrammer> {
    use kitcommander_pymcuprog::{
        find_debuggers, usable_kits, PymcuprogConfig, PymcuprogProgrammer, SystemRunner,
    };

    params.warn_unknown(&["serial", "sn", "packpath", "tool", "pymcuprog", "pydebuggerconfig"]);
    log::info!("Connecting to kit...");

    let defaults = PymcuprogConfig::default();
    let config = PymcuprogConfig {
        serial_number: params.get("serial").or(params.get("sn")).map(str::to_string),
        pack_dir: params
            .get("packpath")
            .map(Into::into)
            .or_else(|| pack_dir.map(Path::to_path_buf)),
        tool_type: params.get("tool").map_or(defaults.tool_type, str::to_string),
        pymcuprog: params.get("pymcuprog").map_or(defaults.pymcuprog, str::to_string),
        pydebuggerconfig: params
            .get("pydebuggerconfig")
            .map_or(defaults.pydebuggerconfig, str::to_string),
        ..defaults
    };

    let debuggers = find_debuggers(&config.tool_type, config.serial_number.as_deref())
        .map_err(kitcommander_core::Error::from)?;
    log::debug!("Found {} debugger(s)", debuggers.len());

    let mut runner = SystemRunner;
    let kit = select_single(usable_kits(&debuggers, &config, &mut runner))?;
    let port = kit.port.clone();

    Ok(OpenedProgrammer {
        programmer: Box::new(PymcuprogProgrammer::new(kit, config, Box::new(runner))),
        port,
    })
}

#[cfg(feature = "dummy")]
fn open_dummy(params: &ProgrammerParams) -> OpenedProgrammer {
    use kitcommander_dummy::{DummyConfig, DummyProgrammer};

    params.warn_unknown(&["kit", "serial", "device", "port"]);

    let defaults = DummyConfig::default();
    let config = DummyConfig {
        kit_name: params.get("kit").map_or(defaults.kit_name, str::to_string),
        serial_number: params.get("serial").map_or(defaults.serial_number, str::to_string),
        device_name: params.get("device").map_or(defaults.device_name, str::to_string),
        ..defaults
    };

    OpenedProgrammer {
        programmer: Box::new(DummyProgrammer::new(config)),
        port: params.get("port").map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer_params() {
        let p = parse_programmer_params("pymcuprog:serial=MCHP3261,packpath=/opt/packs").unwrap();
        assert_eq!(p.name, "pymcuprog");
        assert_eq!(p.get("serial"), Some("MCHP3261"));
        assert_eq!(p.get("packpath"), Some("/opt/packs"));

        let p = parse_programmer_params("dummy").unwrap();
        assert!(p.params.is_empty());

        assert!(matches!(
            parse_programmer_params("dummy:kit"),
            Err(Error::InvalidParameter(_))
        ));
        assert!(parse_programmer_params(":kit=x").is_err());
    }

    #[test]
    fn test_unknown_programmer() {
        let err = open_programmer("ch341a", None).err().unwrap();
        assert!(matches!(err, Error::UnknownProgrammer(ref name) if name == "ch341a"));
    }

    #[test]
    fn test_open_dummy() {
        let mut opened = open_programmer("dummy:kit=PIC-IoT WG,serial=MCHP42,device=pic24fj128ga705", None).unwrap();
        assert_eq!(opened.programmer.read_kit_name().unwrap(), "PIC-IoT WG");
        let info = opened.programmer.tool_info();
        assert_eq!(info.serial_number, "MCHP42");
        assert_eq!(info.device_name, "pic24fj128ga705");
        assert!(opened.port.is_none());
    }

    #[test]
    fn test_available_programmers() {
        let names: Vec<_> = available_programmers().iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["pymcuprog", "dummy"]);
        assert!(programmer_help().contains("aliases: nedbg"));
    }

    #[test]
    fn test_select_single() {
        assert_eq!(select_single(vec![7]).unwrap(), 7);
        assert!(matches!(
            select_single(Vec::<u8>::new()),
            Err(Error::Core(kitcommander_core::Error::NoKitFound))
        ));
        assert!(matches!(
            select_single(vec![1, 2]),
            Err(Error::Core(kitcommander_core::Error::TooManyKits(2)))
        ));
    }
}
