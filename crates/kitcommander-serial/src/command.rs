//! Firmware command framing

use crate::error::{Error, Result};

/// Prefix shared by all provisioning firmware commands
pub const COMMAND_PREFIX: &str = "MC+";

/// A command for the provisioning firmware
///
/// Serialized as `MC+<NAME>[=<ARG>,<ARG>...]`. A name given with its `MC+`
/// prefix is used as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareCommand {
    name: String,
    args: Vec<String>,
    blob: Option<Vec<u8>>,
}

impl FirmwareCommand {
    /// Create a command without arguments
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.starts_with(COMMAND_PREFIX) {
            name
        } else {
            format!("{}{}", COMMAND_PREFIX, name)
        };
        Self {
            name,
            args: Vec::new(),
            blob: None,
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Attach a data blob, sent after the firmware's `>` prompt
    pub fn blob(mut self, blob: impl Into<Vec<u8>>) -> Self {
        self.blob = Some(blob.into());
        self
    }

    /// Full command name, including the `MC+` prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments in order
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Attached blob, if any
    pub fn payload(&self) -> Option<&[u8]> {
        self.blob.as_deref()
    }

    /// Command line without terminator
    ///
    /// With a blob, its length is appended as the last argument.
    pub fn line(&self) -> Result<String> {
        for part in std::iter::once(&self.name).chain(self.args.iter()) {
            if part.contains(['\r', '\n']) {
                return Err(Error::InvalidArgument(format!(
                    "line terminator in '{}'",
                    part.escape_debug()
                )));
            }
        }
        if self.name.contains(['=', ',']) {
            return Err(Error::InvalidArgument(format!(
                "separator in command name '{}'",
                self.name
            )));
        }
        if let Some(arg) = self.args.iter().find(|a| a.contains(',')) {
            return Err(Error::InvalidArgument(format!(
                "separator in argument '{}'",
                arg
            )));
        }

        let mut parts: Vec<String> = self.args.clone();
        if let Some(blob) = &self.blob {
            parts.push(blob.len().to_string());
        }

        if parts.is_empty() {
            Ok(self.name.clone())
        } else {
            Ok(format!("{}={}", self.name, parts.join(",")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize() {
        assert_eq!(FirmwareCommand::new("MC+ECC+SERIAL").line().unwrap(), "MC+ECC+SERIAL");
        assert_eq!(
            FirmwareCommand::new("SETLED").arg("conn").arg("on").line().unwrap(),
            "MC+SETLED=conn,on"
        );
        assert_eq!(
            FirmwareCommand::new("MC+SETLED")
                .args(["WIFI", "off"])
                .line()
                .unwrap(),
            "MC+SETLED=WIFI,off"
        );
    }

    #[test]
    fn test_blob_length_appended() {
        let cmd = FirmwareCommand::new("MC+ECC+WRITE").arg("8").blob("DEADBEEF");
        assert_eq!(cmd.line().unwrap(), "MC+ECC+WRITE=8,8");

        let cmd = FirmwareCommand::new("MC+CERT").blob(Vec::new());
        assert_eq!(cmd.line().unwrap(), "MC+CERT=0");
    }

    #[test]
    fn test_rejects_unframeable_arguments() {
        assert!(FirmwareCommand::new("MC+X").arg("a,b").line().is_err());
        assert!(FirmwareCommand::new("MC+X").arg("a\r\n").line().is_err());
        assert!(FirmwareCommand::new("MC+X=1").line().is_err());
    }
}
