use log::debug;

use simbus_shared::{DeviceOptions, SignalVector, SignalWidths};

use super::{
    options::{self, BusOptions},
    relay::{Direction, Link, RelayTable},
    Protocol, StepContext,
};
use crate::{
    bus::{BusConfig, DeviceConfig, Participants, ProtocolKind},
    error::ProtocolError,
};

const USER_CLK: &str = "user_clk";
const DATA_WIDTH: &str = "DATA_WIDTH";

fn resolve_width(
    device: &str,
    announced: &DeviceOptions,
    bus: &BusOptions,
) -> Result<usize, ProtocolError> {
    let width = options::resolve_width(device, DATA_WIDTH, announced, DATA_WIDTH, bus, Some(64))?;
    match width {
        64 | 128 | 256 => Ok(width),
        _ => Err(options::invalid(DATA_WIDTH, width, "must be 64, 128 or 256")),
    }
}

/// AXI4-Stream wiring of a PCIe endpoint core, root port on the host side
fn table(width: usize) -> RelayTable {
    use Direction::{DeviceToHost as ToRoot, HostToDevice as ToEndpoint};
    RelayTable::new()
        .same("m_axis_rx_tdata", width, ToEndpoint)
        .same("m_axis_rx_tkeep", width / 8, ToEndpoint)
        .same("m_axis_rx_tlast", 1, ToEndpoint)
        .same("m_axis_rx_tvalid", 1, ToEndpoint)
        .same("m_axis_rx_tuser", 22, ToEndpoint)
        .same("m_axis_rx_tready", 1, ToRoot)
        .same("s_axis_tx_tdata", width, ToRoot)
        .same("s_axis_tx_tkeep", width / 8, ToRoot)
        .same("s_axis_tx_tlast", 1, ToRoot)
        .same("s_axis_tx_tvalid", 1, ToRoot)
        .same("s_axis_tx_tuser", 4, ToRoot)
        .same("s_axis_tx_tready", 1, ToEndpoint)
        .same("user_reset", 1, ToEndpoint)
        .same("user_lnk_up", 1, ToEndpoint)
        .same("tx_buf_av", 6, ToEndpoint)
}

/// A PCIe link carried as TLP streams; packets pass through uninterpreted
pub struct PcieTlp {
    bus: String,
    options: BusOptions,
    wiring: Option<(Link, RelayTable)>,
}

impl PcieTlp {
    pub fn new(config: &BusConfig) -> Result<Self, ProtocolError> {
        resolve_width(&config.name, &DeviceOptions::new(), &config.options)?;
        Ok(Self {
            bus: config.name.clone(),
            options: config.options.clone(),
            wiring: None,
        })
    }
}

impl Protocol for PcieTlp {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::PcieTlp
    }

    fn client_signals(
        &self,
        device: &DeviceConfig,
        announced: &DeviceOptions,
    ) -> Result<SignalWidths, ProtocolError> {
        let width = resolve_width(&device.name, announced, &self.options)?;
        Ok(table(width).driven_by(device.host))
    }

    fn wrap_up_configuration(&mut self, participants: &Participants) -> Result<(), ProtocolError> {
        let link = Link::find(participants)?;
        let root = participants
            .get(link.host)
            .ok_or(ProtocolError::MissingRole { role: "root port" })?;
        let endpoint = participants
            .get(link.device)
            .ok_or(ProtocolError::MissingRole { role: "endpoint" })?;
        let root_width = resolve_width(root.name(), root.options(), &self.options)?;
        let endpoint_width = resolve_width(endpoint.name(), endpoint.options(), &self.options)?;
        options::agree(
            DATA_WIDTH,
            (root.name(), root_width),
            (endpoint.name(), endpoint_width),
        )?;
        debug!("{}: pcie link {} bits wide", self.bus, root_width);
        self.wiring = Some((link, table(root_width)));
        Ok(())
    }

    fn init(&mut self, context: &mut StepContext) {
        let Some((link, table)) = &self.wiring else {
            return;
        };
        context.tracer.declare_signal(USER_CLK, 1);
        table.declare(context.tracer);
        table.relay(context.participants, *link, context.tracer);
        context.broadcast(USER_CLK, SignalVector::bit(context.clock()));
    }

    fn step(&mut self, context: &mut StepContext) {
        let Some((link, table)) = &self.wiring else {
            return;
        };
        table.relay(context.participants, *link, context.tracer);
        context.broadcast(USER_CLK, SignalVector::bit(context.clock()));
    }
}
