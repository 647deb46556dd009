//! Finding Microchip debuggers on USB

use std::collections::HashMap;

use serialport::{SerialPortInfo, SerialPortType};

use crate::error::Result;

/// Microchip Technology USB vendor ID
pub const MICROCHIP_VID: u16 = 0x03EB;

/// A debugger seen on USB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDebugger {
    /// USB serial number
    pub serial_number: String,
    /// USB product string
    pub product: String,
    /// CDC serial port of the debugger, if any
    pub port: Option<String>,
}

/// List connected Microchip debuggers of the given tool type
///
/// `tool` is matched case-insensitively against the product string (e.g.
/// "nedbg" matches "nEDBG CMSIS-DAP"). An optional serial number substring
/// narrows the result further.
pub fn find_debuggers(tool: &str, serial_filter: Option<&str>) -> Result<Vec<UsbDebugger>> {
    let ports = serialport::available_ports()?;
    Ok(filter_debuggers(&ports, tool, serial_filter))
}

/// Select debuggers from a port list, one entry per serial number
pub fn filter_debuggers(
    ports: &[SerialPortInfo],
    tool: &str,
    serial_filter: Option<&str>,
) -> Vec<UsbDebugger> {
    let tool = tool.to_lowercase();
    let mut found: Vec<UsbDebugger> = Vec::new();

    for port in ports {
        let SerialPortType::UsbPort(usb) = &port.port_type else {
            continue;
        };
        if usb.vid != MICROCHIP_VID {
            continue;
        }
        let Some(serial) = usb.serial_number.as_deref() else {
            continue;
        };
        let product = usb.product.clone().unwrap_or_default();
        if !tool.is_empty() && !product.to_lowercase().contains(&tool) {
            log::debug!("Skipping {} ({}): not a {}", serial, product, tool);
            continue;
        }
        if let Some(filter) = serial_filter {
            if !serial.contains(filter) {
                continue;
            }
        }

        // Composite debuggers may expose several interfaces
        if found.iter().any(|d| d.serial_number == serial) {
            continue;
        }
        found.push(UsbDebugger {
            serial_number: serial.to_string(),
            product,
            port: Some(port.port_name.clone()),
        });
    }

    found
}

/// Parse the register dump printed by `pydebuggerconfig read`
///
/// Lines look like `KITNAME: AVR-IoT WG`. Keys are returned upper case;
/// lines without a separator are ignored.
pub fn parse_config_registers(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(key, value)| {
            let key = key.trim();
            let valid = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            valid.then(|| (key.to_uppercase(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb(name: &str, vid: u16, serial: Option<&str>, product: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid,
                pid: 0x2175,
                serial_number: serial.map(str::to_string),
                manufacturer: Some("Microchip Technology Inc.".to_string()),
                product: Some(product.to_string()),
            }),
        }
    }

    #[test]
    fn test_filter_debuggers() {
        let ports = vec![
            usb("/dev/ttyACM0", MICROCHIP_VID, Some("MCHP3261021800001111"), "nEDBG CMSIS-DAP"),
            usb("/dev/ttyACM1", 0x2341, Some("ARDUINO"), "Arduino Uno"),
            usb("/dev/ttyACM2", MICROCHIP_VID, Some("MCHP3280041800002222"), "nEDBG CMSIS-DAP"),
            usb("/dev/ttyACM3", MICROCHIP_VID, Some("J50200001234"), "MPLAB PICkit 4"),
            SerialPortInfo {
                port_name: "/dev/ttyS0".to_string(),
                port_type: SerialPortType::Unknown,
            },
        ];

        let all = filter_debuggers(&ports, "nedbg", None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].port.as_deref(), Some("/dev/ttyACM0"));

        let one = filter_debuggers(&ports, "nedbg", Some("2222"));
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].serial_number, "MCHP3280041800002222");

        assert!(filter_debuggers(&ports, "nedbg", Some("9999")).is_empty());
    }

    #[test]
    fn test_parse_config_registers() {
        let output = "\
Reading board configuration from MCHP3261021800001111
KITNAME: AVR-IoT WG
DEVICE: ATmega4808
click_me_url: https://www.microchip.com/DevelopmentTools/ProductDetails/AC164160
";
        let regs = parse_config_registers(output);
        assert_eq!(regs.get("KITNAME").map(String::as_str), Some("AVR-IoT WG"));
        assert_eq!(regs.get("DEVICE").map(String::as_str), Some("ATmega4808"));
        assert!(regs.contains_key("CLICK_ME_URL"));
        assert_eq!(regs.len(), 3);
    }
}
