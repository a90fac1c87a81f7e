use log::debug;

use simbus_shared::{BitValue, DeviceOptions, SignalVector, SignalWidths};

use super::{
    options::{self, BusOptions},
    relay::{Direction, Link, RelayTable},
    Protocol, StepContext,
};
use crate::{
    bus::{BusConfig, DeviceConfig, Participants, ProtocolKind},
    error::ProtocolError,
};

const DATA_O: &str = "DATA_O";
const DATA_I: &str = "DATA_I";
const CLOCK: &str = "CLOCK";
const CLOCK_MODE: &str = "CLOCK_MODE";
const WIDTH_I: &str = "WIDTH_I";
const WIDTH_O: &str = "WIDTH_O";

/// What the host asks the device's clock to do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockMode {
    Run,
    StopZ,
    StopZero,
    StopOne,
}

impl ClockMode {
    /// `00` run, `01` hold at z, `10` hold at 0, `11` hold at 1. Anything
    /// not fully definite runs.
    pub fn from_vector(value: &SignalVector) -> ClockMode {
        match value.to_u64() {
            Some(1) => ClockMode::StopZ,
            Some(2) => ClockMode::StopZero,
            Some(3) => ClockMode::StopOne,
            _ => ClockMode::Run,
        }
    }

    pub fn apply(self, level: BitValue) -> BitValue {
        match self {
            ClockMode::Run => level,
            ClockMode::StopZ => BitValue::HiZ,
            ClockMode::StopZero => BitValue::Zero,
            ClockMode::StopOne => BitValue::One,
        }
    }
}

/// Widths of one side, from that side's own point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LinkWidths {
    input: usize,
    output: usize,
}

impl LinkWidths {
    /// Bus options are written from the host's point of view, so the
    /// device side reads them mirrored.
    fn resolve(
        device: &DeviceConfig,
        announced: &DeviceOptions,
        bus: &BusOptions,
    ) -> Result<LinkWidths, ProtocolError> {
        let (bus_input, bus_output) = if device.host {
            (WIDTH_I, WIDTH_O)
        } else {
            (WIDTH_O, WIDTH_I)
        };
        let input = options::resolve_width(&device.name, WIDTH_I, announced, bus_input, bus, None)?;
        let output =
            options::resolve_width(&device.name, WIDTH_O, announced, bus_output, bus, None)?;
        if input == 0 {
            return Err(options::invalid(WIDTH_I, input, "width must be positive"));
        }
        if output == 0 {
            return Err(options::invalid(WIDTH_O, output, "width must be positive"));
        }
        Ok(LinkWidths { input, output })
    }
}

/// Two participants exchanging a data vector each way
pub struct PointToPoint {
    bus: String,
    options: BusOptions,
    wiring: Option<(Link, RelayTable)>,
}

impl PointToPoint {
    pub fn new(config: &BusConfig) -> Result<Self, ProtocolError> {
        for key in [WIDTH_I, WIDTH_O] {
            if let Some(text) = config.options.get(key) {
                options::parse::<usize>(key, text)?;
            }
        }
        Ok(Self {
            bus: config.name.clone(),
            options: config.options.clone(),
            wiring: None,
        })
    }

    fn publish_clock(&self, context: &mut StepContext, link: Link) {
        let level = context.clock();
        let mode = context
            .participants
            .get(link.host)
            .filter(|host| !host.is_finished())
            .map(|host| ClockMode::from_vector(&host.client_signal(CLOCK_MODE)))
            .unwrap_or(ClockMode::Run);
        let device_level = mode.apply(level);

        context.tracer.set_signal(CLOCK, &SignalVector::bit(level));
        if let Some(host) = context.participants.get_mut(link.host) {
            host.send_bit(CLOCK, level);
        }
        if let Some(device) = context.participants.get_mut(link.device) {
            device.send_bit(CLOCK, device_level);
        }
    }
}

impl Protocol for PointToPoint {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::PointToPoint
    }

    fn client_signals(
        &self,
        device: &DeviceConfig,
        announced: &DeviceOptions,
    ) -> Result<SignalWidths, ProtocolError> {
        let widths = LinkWidths::resolve(device, announced, &self.options)?;
        let mut signals = SignalWidths::new().with(DATA_O, widths.output);
        if device.host {
            signals.insert(CLOCK_MODE, 2);
        }
        Ok(signals)
    }

    fn wrap_up_configuration(&mut self, participants: &Participants) -> Result<(), ProtocolError> {
        let link = Link::find(participants)?;
        let host = participants
            .get(link.host)
            .ok_or(ProtocolError::MissingRole { role: "host" })?;
        let device = participants
            .get(link.device)
            .ok_or(ProtocolError::MissingRole { role: "device" })?;
        let host_widths = LinkWidths::resolve(host.device(), host.options(), &self.options)?;
        let device_widths = LinkWidths::resolve(device.device(), device.options(), &self.options)?;

        options::agree(
            WIDTH_O,
            (host.name(), host_widths.output),
            (device.name(), device_widths.input),
        )?;
        options::agree(
            WIDTH_I,
            (host.name(), host_widths.input),
            (device.name(), device_widths.output),
        )?;
        debug!(
            "{}: p2p link {} bits to device, {} bits to host",
            self.bus, host_widths.output, host_widths.input
        );

        let table = RelayTable::new()
            .crossed(DATA_O, DATA_I, host_widths.output, Direction::HostToDevice)
            .crossed(DATA_O, DATA_I, host_widths.input, Direction::DeviceToHost);
        self.wiring = Some((link, table));
        Ok(())
    }

    fn init(&mut self, context: &mut StepContext) {
        let Some((link, table)) = &self.wiring else {
            return;
        };
        context.tracer.declare_signal(CLOCK, 1);
        table.declare(context.tracer);
        table.relay(context.participants, *link, context.tracer);
        self.publish_clock(context, *link);
    }

    fn step(&mut self, context: &mut StepContext) {
        let Some((link, table)) = &self.wiring else {
            return;
        };
        table.relay(context.participants, *link, context.tracer);
        self.publish_clock(context, *link);
    }
}
