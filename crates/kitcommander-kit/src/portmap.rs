//! Mapping debugger serial numbers to serial ports

use std::time::Duration;

use serialport::{SerialPortInfo, SerialPortType};

/// Find the CDC port of the debugger with USB serial number `serial_number`
///
/// Returns `None` if no such port exists or the ports cannot be listed.
pub fn find_serial_port(serial_number: &str) -> Option<String> {
    match serialport::available_ports() {
        Ok(ports) => port_for_serial(&ports, serial_number),
        Err(e) => {
            log::warn!("Unable to list serial ports: {}", e);
            None
        }
    }
}

/// Find the port belonging to `serial_number` in a port list
///
/// Serial numbers are compared case-insensitively.
pub fn port_for_serial(ports: &[SerialPortInfo], serial_number: &str) -> Option<String> {
    ports.iter().find_map(|port| match &port.port_type {
        SerialPortType::UsbPort(usb)
            if usb
                .serial_number
                .as_deref()
                .is_some_and(|sn| sn.eq_ignore_ascii_case(serial_number)) =>
        {
            Some(port.port_name.clone())
        }
        _ => None,
    })
}

/// Check that the current user can open `port`
pub fn check_access(port: &str) -> bool {
    match serialport::new(port, 9600)
        .timeout(Duration::from_millis(100))
        .open()
    {
        Ok(_) => true,
        Err(e) => {
            log::debug!("Cannot open {}: {}", port, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb(name: &str, serial: Option<&str>) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x03EB,
                pid: 0x2175,
                serial_number: serial.map(str::to_string),
                manufacturer: None,
                product: Some("nEDBG CMSIS-DAP".to_string()),
            }),
        }
    }

    #[test]
    fn test_port_for_serial() {
        let ports = vec![
            SerialPortInfo {
                port_name: "/dev/ttyS0".to_string(),
                port_type: SerialPortType::PciPort,
            },
            usb("/dev/ttyACM0", None),
            usb("/dev/ttyACM1", Some("MCHP3261021800001111")),
            usb("/dev/ttyACM2", Some("MCHP3261021800002222")),
        ];
        assert_eq!(
            port_for_serial(&ports, "mchp3261021800002222").as_deref(),
            Some("/dev/ttyACM2")
        );
        assert_eq!(port_for_serial(&ports, "MCHP0000"), None);
    }

    #[test]
    fn test_check_access_missing_port() {
        assert!(!check_access("/dev/kitcommander-no-such-port"));
    }
}
