//! Multical 402 register table.

use serde::{Deserialize, Serialize};

/// Heat energy (E1).
pub const REG_HEAT_ENERGY: u16 = 0x003c;
/// Current power.
pub const REG_CURRENT_POWER: u16 = 0x0050;
/// Current forward temperature.
pub const REG_FORWARD_TEMPERATURE: u16 = 0x0056;
/// Current return temperature.
pub const REG_RETURN_TEMPERATURE: u16 = 0x0057;
/// Current differential temperature.
pub const REG_DIFFERENTIAL_TEMPERATURE: u16 = 0x0059;
/// Current water flow.
pub const REG_WATER_FLOW: u16 = 0x004a;
/// Volume register V1.
pub const REG_VOLUME: u16 = 0x0044;

/// The registers polled from a Multical 402 heat meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Register {
    /// Accumulated heat energy.
    HeatEnergy,
    /// Instantaneous power.
    CurrentPower,
    /// Forward (inlet) temperature.
    ForwardTemperature,
    /// Return (outlet) temperature.
    ReturnTemperature,
    /// Forward minus return temperature.
    DifferentialTemperature,
    /// Instantaneous water flow.
    WaterFlow,
    /// Accumulated volume.
    Volume,
}

impl Register {
    /// Every register in table order.
    pub const ALL: [Register; 7] = [
        Register::HeatEnergy,
        Register::CurrentPower,
        Register::ForwardTemperature,
        Register::ReturnTemperature,
        Register::DifferentialTemperature,
        Register::WaterFlow,
        Register::Volume,
    ];

    /// Register id on the wire.
    pub const fn id(self) -> u16 {
        match self {
            Register::HeatEnergy => REG_HEAT_ENERGY,
            Register::CurrentPower => REG_CURRENT_POWER,
            Register::ForwardTemperature => REG_FORWARD_TEMPERATURE,
            Register::ReturnTemperature => REG_RETURN_TEMPERATURE,
            Register::DifferentialTemperature => REG_DIFFERENTIAL_TEMPERATURE,
            Register::WaterFlow => REG_WATER_FLOW,
            Register::Volume => REG_VOLUME,
        }
    }

    /// Look up a register by its wire id.
    pub fn from_id(id: u16) -> Option<Self> {
        Register::ALL.into_iter().find(|r| r.id() == id)
    }

    /// Human readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Register::HeatEnergy => "Heat energy",
            Register::CurrentPower => "Current power",
            Register::ForwardTemperature => "Current forward temperature",
            Register::ReturnTemperature => "Current return temperature",
            Register::DifferentialTemperature => "Current differential temperature",
            Register::WaterFlow => "Current water flow",
            Register::Volume => "Volume V1",
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:04X})", self.name(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_ids() {
        assert_eq!(Register::HeatEnergy.id(), 60);
        assert_eq!(Register::CurrentPower.id(), 80);
        assert_eq!(Register::ForwardTemperature.id(), 86);
        assert_eq!(Register::ReturnTemperature.id(), 87);
        assert_eq!(Register::DifferentialTemperature.id(), 89);
        assert_eq!(Register::WaterFlow.id(), 74);
        assert_eq!(Register::Volume.id(), 68);
    }

    #[test]
    fn test_from_id() {
        for register in Register::ALL {
            assert_eq!(Register::from_id(register.id()), Some(register));
        }
        assert_eq!(Register::from_id(0x0001), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Register::WaterFlow.to_string(), "Current water flow (0x004A)");
    }
}
