//! Protocol data types.

use serde::{Deserialize, Serialize};

/// Destination address of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationAddress {
    /// The heat meter itself.
    #[default]
    HeatMeter,
    /// Top logger module.
    LoggerTop,
    /// Base logger module.
    LoggerBase,
}

impl DestinationAddress {
    /// Wire value of the address.
    pub const fn to_byte(self) -> u8 {
        match self {
            DestinationAddress::HeatMeter => 0x3f,
            DestinationAddress::LoggerTop => 0x7f,
            DestinationAddress::LoggerBase => 0xbf,
        }
    }

}

impl From<DestinationAddress> for u8 {
    fn from(address: DestinationAddress) -> Self {
        address.to_byte()
    }
}

impl std::fmt::Display for DestinationAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DestinationAddress::HeatMeter => write!(f, "heat meter (0x3F)"),
            DestinationAddress::LoggerTop => write!(f, "logger top (0x7F)"),
            DestinationAddress::LoggerBase => write!(f, "logger base (0xBF)"),
        }
    }
}

/// Kamstrup unit code carried in every register response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitCode(pub u8);

impl UnitCode {
    /// Human readable unit label, or an empty string for unknown codes.
    pub fn label(self) -> &'static str {
        UNIT_LABELS.get(self.0 as usize).copied().unwrap_or("")
    }
}

impl std::fmt::Display for UnitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Unit labels indexed by unit code.
const UNIT_LABELS: [&str; 65] = [
    "", "Wh", "kWh", "MWh", "GWh", "J", "kJ", "MJ", "GJ", "Cal", "kCal", "MCal", "GCal",
    "varh", "kvarh", "Mvarh", "Gvarh", "VAh", "kVAh", "MVAh", "GVAh", "kW", "kW", "MW", "GW",
    "kvar", "kvar", "Mvar", "Gvar", "VA", "kVA", "MVA", "GVA", "V", "A", "kV", "kA", "C", "K",
    "l", "m3", "l/h", "m3/h", "m3xC", "ton", "ton/h", "h", "hh:mm:ss", "yy:mm:dd", "yyyy:mm:dd",
    "mm:dd", "", "bar", "RTC", "ASCII", "m3 x 10", "ton x 10", "GJ x 10", "minutes", "Bitfield",
    "s", "ms", "days", "RTC-Q", "Datetime",
];

/// A decoded register value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Register the value was read from.
    pub register: u16,
    /// Unit reported by the meter.
    pub unit: UnitCode,
    /// Decoded value.
    pub value: f64,
}
