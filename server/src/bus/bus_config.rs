use std::{collections::BTreeMap, fmt, str::FromStr};

use simbus_shared::{BusAddress, DeviceIdent};

use crate::error::ConfigError;

/// Highest identity a PCI bus can route an IDSEL or interrupt for
pub const PCI_MAX_IDENT: DeviceIdent = 15;

/// Which protocol engine resolves a bus's signals
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    PointToPoint,
    Pci,
    Axi4,
    PcieTlp,
}

impl ProtocolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKind::PointToPoint => "p2p",
            ProtocolKind::Pci => "pci",
            ProtocolKind::Axi4 => "axi4",
            ProtocolKind::PcieTlp => "pcie_tlp",
        }
    }

    /// Protocols that link exactly one host to exactly one device
    pub fn is_paired(&self) -> bool {
        !matches!(self, ProtocolKind::Pci)
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolKind {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "p2p" => Ok(ProtocolKind::PointToPoint),
            "pci" => Ok(ProtocolKind::Pci),
            "axi4" => Ok(ProtocolKind::Axi4),
            "pcie_tlp" => Ok(ProtocolKind::PcieTlp),
            other => Err(format!("unknown protocol '{}'", other)),
        }
    }
}

/// Clock shape in picoseconds. `hold` is measured from the rising edge,
/// `setup` back from the next rising edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockTiming {
    pub high: u64,
    pub low: u64,
    pub hold: u64,
    pub setup: u64,
}

impl ClockTiming {
    pub fn period(&self) -> u64 {
        self.high + self.low
    }
}

impl Default for ClockTiming {
    /// A 100MHz clock with a 50% duty cycle
    fn default() -> Self {
        Self {
            high: 5_000,
            low: 5_000,
            hold: 1_000,
            setup: 1_000,
        }
    }
}

/// One participant a bus expects to connect
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    pub name: String,
    pub ident: DeviceIdent,
    pub host: bool,
}

impl DeviceConfig {
    pub fn new(name: &str, ident: DeviceIdent, host: bool) -> Self {
        Self {
            name: name.to_string(),
            ident,
            host,
        }
    }
}

/// Contains the properties of a single bus: where it listens, which
/// protocol engine it runs and which devices may join it
#[derive(Clone, Debug)]
pub struct BusConfig {
    pub name: String,
    pub address: BusAddress,
    pub protocol: ProtocolKind,
    pub clock: ClockTiming,
    pub devices: Vec<DeviceConfig>,
    /// Protocol options, e.g. `WIDTH_I` for p2p or `parking` for PCI
    pub options: BTreeMap<String, String>,
}

impl BusConfig {
    pub fn new(name: &str, address: BusAddress, protocol: ProtocolKind) -> Self {
        Self {
            name: name.to_string(),
            address,
            protocol,
            clock: ClockTiming::default(),
            devices: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_device(mut self, name: &str, ident: DeviceIdent, host: bool) -> Self {
        self.devices.push(DeviceConfig::new(name, ident, host));
        self
    }

    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.options.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_clock(mut self, clock: ClockTiming) -> Self {
        self.clock = clock;
        self
    }

    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|device| device.name == name)
    }

    /// Checks the structural rules every bus must satisfy before its
    /// listener opens. Option values are checked by the protocol engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyBusName);
        }
        let bus = || self.name.clone();

        let ClockTiming {
            high,
            low,
            hold,
            setup,
        } = self.clock;
        if hold == 0 || hold >= high {
            return Err(ConfigError::InvalidClockTiming {
                bus: bus(),
                reason: "hold must be positive and shorter than high",
            });
        }
        if setup == 0 || setup >= low {
            return Err(ConfigError::InvalidClockTiming {
                bus: bus(),
                reason: "setup must be positive and shorter than low",
            });
        }

        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices { bus: bus() });
        }

        for (index, device) in self.devices.iter().enumerate() {
            if device.name.is_empty()
                || device
                    .name
                    .chars()
                    .any(|c| c.is_whitespace() || c == '=')
            {
                return Err(ConfigError::InvalidDeviceName {
                    bus: bus(),
                    name: device.name.clone(),
                });
            }
            for other in &self.devices[..index] {
                if other.name == device.name {
                    return Err(ConfigError::DuplicateDeviceName {
                        bus: bus(),
                        name: device.name.clone(),
                    });
                }
                if other.ident == device.ident {
                    return Err(ConfigError::DuplicateIdent {
                        bus: bus(),
                        ident: device.ident,
                    });
                }
            }
        }

        if self.protocol.is_paired() {
            if self.devices.len() != 2 {
                return Err(ConfigError::WrongDeviceCount {
                    bus: bus(),
                    protocol: self.protocol,
                    expected: 2,
                    found: self.devices.len(),
                });
            }
            let hosts = self.devices.iter().filter(|device| device.host).count();
            if hosts != 1 {
                return Err(ConfigError::WrongHostCount {
                    bus: bus(),
                    protocol: self.protocol,
                    found: hosts,
                });
            }
        } else if let Some(device) = self
            .devices
            .iter()
            .find(|device| device.ident > PCI_MAX_IDENT)
        {
            return Err(ConfigError::IdentOutOfRange {
                bus: bus(),
                protocol: self.protocol,
                ident: device.ident,
                max: PCI_MAX_IDENT,
            });
        }

        Ok(())
    }
}
