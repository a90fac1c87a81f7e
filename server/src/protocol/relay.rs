use simbus_shared::{DeviceIdent, SignalVector, SignalWidths};

use crate::{bus::Participants, error::ProtocolError, trace::Tracer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

/// The two ends of a paired bus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    pub host: DeviceIdent,
    pub device: DeviceIdent,
}

impl Link {
    pub fn find(participants: &Participants) -> Result<Link, ProtocolError> {
        let host = participants
            .host()
            .ok_or(ProtocolError::MissingRole { role: "host" })?;
        let device = participants
            .device()
            .ok_or(ProtocolError::MissingRole { role: "device" })?;
        Ok(Link { host, device })
    }

    fn ends(&self, direction: Direction) -> (DeviceIdent, DeviceIdent) {
        match direction {
            Direction::HostToDevice => (self.host, self.device),
            Direction::DeviceToHost => (self.device, self.host),
        }
    }
}

/// One wire copied verbatim from one end of a link to the other
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelaySignal {
    /// Name the driving side uses
    pub source: String,
    /// Name the receiving side sees
    pub target: String,
    pub width: usize,
    pub direction: Direction,
    trace: String,
}

/// Fixed-direction wiring between the two ends of a link
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayTable {
    signals: Vec<RelaySignal>,
}

impl RelayTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal with the same name on both sides. Zero-width signals are
    /// left out.
    pub fn same(self, name: &str, width: usize, direction: Direction) -> Self {
        self.push(name, name, name, width, direction)
    }

    /// A signal that changes name on the way, e.g. `DATA_O` → `DATA_I`
    pub fn crossed(self, source: &str, target: &str, width: usize, direction: Direction) -> Self {
        let side = match direction {
            Direction::HostToDevice => "host",
            Direction::DeviceToHost => "device",
        };
        let trace = format!("{}.{}", side, source);
        self.push(source, target, &trace, width, direction)
    }

    fn push(
        mut self,
        source: &str,
        target: &str,
        trace: &str,
        width: usize,
        direction: Direction,
    ) -> Self {
        if width > 0 {
            self.signals.push(RelaySignal {
                source: source.to_string(),
                target: target.to_string(),
                width,
                direction,
                trace: trace.to_string(),
            });
        }
        self
    }

    pub fn signals(&self) -> &[RelaySignal] {
        &self.signals
    }

    pub fn get(&self, source: &str) -> Option<&RelaySignal> {
        self.signals.iter().find(|signal| signal.source == source)
    }

    /// Signals the host (`host == true`) or the device side drives
    pub fn driven_by(&self, host: bool) -> SignalWidths {
        let direction = if host {
            Direction::HostToDevice
        } else {
            Direction::DeviceToHost
        };
        let mut widths = SignalWidths::new();
        for signal in self.signals.iter().filter(|signal| signal.direction == direction) {
            widths.insert(&signal.source, signal.width);
        }
        widths
    }

    pub fn declare(&self, tracer: &mut dyn Tracer) {
        for signal in &self.signals {
            tracer.declare_signal(&signal.trace, signal.width);
        }
    }

    /// Copies every source value to its target. A finished or absent
    /// source relays `HiZ`.
    pub fn relay(&self, participants: &mut Participants, link: Link, tracer: &mut dyn Tracer) {
        for signal in &self.signals {
            let (from, to) = link.ends(signal.direction);
            let value = match participants.get(from) {
                Some(slot) if !slot.is_finished() => slot.client_signal(&signal.source),
                _ => SignalVector::hiz(signal.width),
            };
            tracer.set_signal(&signal.trace, &value);
            if let Some(slot) = participants.get_mut(to) {
                slot.send(&signal.target, value);
            }
        }
    }
}
