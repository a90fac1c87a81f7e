mod arbiter;

pub use arbiter::{Arbiter, Parking, ARBITER_SLOTS};

use log::{debug, warn};

use simbus_shared::{BitValue, DeviceIdent, DeviceOptions, SignalVector, SignalWidths};

use super::{options, Protocol, StepContext};
use crate::{
    bus::{BusConfig, DeviceConfig, Participants, ProtocolKind},
    error::ProtocolError,
};

const FRAME: &str = "FRAME#";
const IRDY: &str = "IRDY#";
const AD: &str = "AD";
const REQ: &str = "REQ#";
const GNT: &str = "GNT#";
const IDSEL: &str = "IDSEL";
const RESET: &str = "RESET#";
const PCI_CLK: &str = "PCI_CLK";

/// Shared, open-drain or tri-state wires every participant may drive
const WIRED: [(&str, usize); 11] = [
    ("FRAME#", 1),
    ("IRDY#", 1),
    ("TRDY#", 1),
    ("STOP#", 1),
    ("DEVSEL#", 1),
    ("REQ64#", 1),
    ("ACK64#", 1),
    (AD, 64),
    ("C/BE#", 8),
    ("PAR", 1),
    ("PAR64", 1),
];

const INTERRUPTS: [&str; 4] = ["INTA#", "INTB#", "INTC#", "INTD#"];

/// AD line that carries IDSEL for device 0
const IDSEL_BASE: usize = 16;

const DEFAULT_GNT_LINGER: u32 = 4;

/// A shared PCI bus with central arbitration
pub struct Pci {
    bus: String,
    arbiter: Arbiter,
    master: Option<DeviceIdent>,
}

impl Pci {
    pub fn new(config: &BusConfig) -> Result<Self, ProtocolError> {
        let parking = match config.options.get("parking") {
            Some(text) => text
                .parse::<Parking>()
                .map_err(|_| ProtocolError::InvalidOption {
                    key: "parking".to_string(),
                    value: text.clone(),
                    reason: "expected none or last",
                })?,
            None => Parking::default(),
        };
        let linger = match config.options.get("gnt_linger") {
            Some(text) => options::parse::<u32>("gnt_linger", text)?,
            None => DEFAULT_GNT_LINGER,
        };
        let seed = match config.options.get("seed") {
            Some(text) => options::parse::<u64>("seed", text)?,
            None => 0,
        };
        Ok(Self {
            bus: config.name.clone(),
            arbiter: Arbiter::new(parking, linger, seed),
            master: None,
        })
    }

    /// Current bus master, if a transaction is in progress
    pub fn master(&self) -> Option<DeviceIdent> {
        self.master
    }

    fn track_ownership(&mut self, participants: &Participants, frame: BitValue, irdy: BitValue) {
        match self.master {
            Some(master) => {
                if frame != BitValue::Zero && irdy != BitValue::Zero {
                    debug!("{}: device {} released the bus", self.bus, master);
                    self.master = None;
                }
            }
            None => {
                if frame != BitValue::Zero {
                    return;
                }
                let Some(driver) = participants
                    .iter()
                    .find(|slot| slot.client_bit(FRAME) == BitValue::Zero)
                    .map(|slot| slot.ident())
                else {
                    return;
                };
                if self.arbiter.granted() == Some(driver) {
                    self.arbiter.spend();
                } else {
                    warn!(
                        "{}: device {} asserted FRAME# without holding GNT#",
                        self.bus, driver
                    );
                }
                debug!("{}: device {} is bus master", self.bus, driver);
                self.master = Some(driver);
            }
        }
    }

    fn publish(&mut self, context: &mut StepContext) {
        // wired signals, with each driver's own contribution subtracted
        let mut address = SignalVector::hiz(64);
        for (name, width) in WIRED {
            let resolved = resolve(context.participants, name, width);
            context.tracer.set_signal(name, &resolved);
            for slot in context.participants.iter_mut() {
                let own = slot.client_signal(name);
                let seen = resolved.feedback(&own).unwrap_or_else(|_| resolved.clone());
                slot.send(name, seen);
            }
            if name == AD {
                address = resolved;
            }
        }

        let reset = context
            .participants
            .iter()
            .filter(|slot| slot.is_host())
            .fold(BitValue::HiZ, |reset, slot| reset.blend(slot.client_bit(RESET)));
        let reset = if reset == BitValue::HiZ {
            BitValue::One
        } else {
            reset
        };
        context.broadcast(RESET, SignalVector::bit(reset));

        let interrupts: Vec<SignalVector> = INTERRUPTS
            .iter()
            .map(|name| {
                let mut lines = SignalVector::new(ARBITER_SLOTS as usize, BitValue::One);
                for slot in context.participants.iter().filter(|slot| !slot.is_host()) {
                    if slot.client_bit(name) == BitValue::Zero {
                        lines.set(slot.ident() as usize, BitValue::Zero);
                    }
                }
                lines
            })
            .collect();
        for (name, lines) in INTERRUPTS.iter().zip(&interrupts) {
            context.tracer.set_signal(name, lines);
        }

        let granted = self.arbiter.granted();
        for slot in context.participants.iter_mut() {
            let ident = slot.ident();
            let idsel = address
                .get(IDSEL_BASE + ident as usize)
                .unwrap_or(BitValue::HiZ);
            slot.send_bit(IDSEL, idsel);
            let gnt = if granted == Some(ident) {
                BitValue::Zero
            } else {
                BitValue::One
            };
            slot.send_bit(GNT, gnt);
            if slot.is_host() {
                for (name, lines) in INTERRUPTS.iter().zip(&interrupts) {
                    slot.send(name, lines.clone());
                }
            }
        }

        context.broadcast(PCI_CLK, SignalVector::bit(context.clock()));
    }
}

/// Blend of every participant's drive on one wire
fn resolve(participants: &Participants, name: &str, width: usize) -> SignalVector {
    participants
        .iter()
        .fold(SignalVector::hiz(width), |resolved, slot| {
            resolved
                .blend(&slot.client_signal(name))
                .unwrap_or_else(|_| SignalVector::new(width, BitValue::Unknown))
        })
}

impl Protocol for Pci {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Pci
    }

    fn client_signals(
        &self,
        device: &DeviceConfig,
        _announced: &DeviceOptions,
    ) -> Result<SignalWidths, ProtocolError> {
        let mut widths = SignalWidths::new().with(REQ, 1);
        for (name, width) in WIRED {
            widths.insert(name, width);
        }
        if device.host {
            widths.insert(RESET, 1);
        } else {
            for name in INTERRUPTS {
                widths.insert(name, 1);
            }
        }
        Ok(widths)
    }

    fn wrap_up_configuration(&mut self, participants: &Participants) -> Result<(), ProtocolError> {
        debug!(
            "{}: pci bus with {} participants",
            self.bus,
            participants.len()
        );
        Ok(())
    }

    fn init(&mut self, context: &mut StepContext) {
        for (name, width) in WIRED {
            context.tracer.declare_signal(name, width);
        }
        for name in INTERRUPTS {
            context.tracer.declare_signal(name, ARBITER_SLOTS as usize);
        }
        context.tracer.declare_signal(RESET, 1);
        context.tracer.declare_signal(PCI_CLK, 1);
        self.publish(context);
    }

    fn step(&mut self, context: &mut StepContext) {
        if context.is_rising_edge() {
            let frame = resolve(context.participants, FRAME, 1)
                .get(0)
                .unwrap_or(BitValue::HiZ);
            let irdy = resolve(context.participants, IRDY, 1)
                .get(0)
                .unwrap_or(BitValue::HiZ);
            self.track_ownership(context.participants, frame, irdy);

            let requests = context
                .participants
                .iter()
                .filter(|slot| !slot.is_finished() && slot.client_bit(REQ) == BitValue::Zero)
                .fold(0u16, |requests, slot| requests | (1 << slot.ident()));
            self.arbiter.arbitrate(requests);
        }
        self.publish(context);
    }
}
