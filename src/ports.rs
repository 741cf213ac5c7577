//! Serial port enumeration for operator port selection.
//!
//! A pure query against the OS: no port is opened, nothing is cached.
//! Enumeration failure is advisory rather than critical-path, so it is
//! logged and degraded to an empty list instead of propagating.

use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};
use tracing::warn;

/// Read-only snapshot of one serial port visible to the OS.
#[derive(Debug, Clone, Serialize)]
pub struct PortDescriptor {
    /// System path, e.g. `COM3` or `/dev/ttyUSB0`.
    pub path: String,
    pub manufacturer: Option<String>,
    pub serial_number: Option<String>,
    pub pnp_id: Option<String>,
    /// Bus type: `USB`, `PCI`, `Bluetooth`, or `Unknown`.
    pub port_type: String,
}

/// List the serial ports available on this system.
///
/// Never fails: if the OS enumeration is unavailable the cause is logged
/// and an empty list is returned.
pub fn list_ports() -> Vec<PortDescriptor> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(describe).collect(),
        Err(e) => {
            warn!(error = %e, "failed to enumerate serial ports");
            Vec::new()
        }
    }
}

fn describe(info: SerialPortInfo) -> PortDescriptor {
    let (manufacturer, serial_number, pnp_id, port_type) = match info.port_type {
        SerialPortType::UsbPort(usb) => (
            usb.manufacturer,
            usb.serial_number,
            usb.product,
            "USB".to_string(),
        ),
        SerialPortType::PciPort => (None, None, None, "PCI".to_string()),
        SerialPortType::BluetoothPort => (None, None, None, "Bluetooth".to_string()),
        _ => (None, None, None, "Unknown".to_string()),
    };

    PortDescriptor {
        path: info.port_name,
        manufacturer,
        serial_number,
        pnp_id,
        port_type,
    }
}
