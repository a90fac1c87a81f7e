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

const ACLK: &str = "ACLK";
const DATA_WIDTH: &str = "DATA_WIDTH";
const ADDR_WIDTH: &str = "ADDR_WIDTH";
const ID_WIDTH: &str = "ID_WIDTH";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Axi4Widths {
    data: usize,
    addr: usize,
    id: usize,
}

impl Axi4Widths {
    fn resolve(
        device: &str,
        announced: &DeviceOptions,
        bus: &BusOptions,
    ) -> Result<Axi4Widths, ProtocolError> {
        let data = options::resolve_width(device, DATA_WIDTH, announced, DATA_WIDTH, bus, Some(32))?;
        let addr = options::resolve_width(device, ADDR_WIDTH, announced, ADDR_WIDTH, bus, Some(32))?;
        let id = options::resolve_width(device, ID_WIDTH, announced, ID_WIDTH, bus, Some(4))?;
        if data == 0 || data % 8 != 0 {
            return Err(options::invalid(DATA_WIDTH, data, "must be a positive multiple of 8"));
        }
        if addr == 0 || addr > 64 {
            return Err(options::invalid(ADDR_WIDTH, addr, "must be between 1 and 64"));
        }
        Ok(Axi4Widths { data, addr, id })
    }

    fn table(&self) -> RelayTable {
        use Direction::{DeviceToHost as ToMaster, HostToDevice as ToSlave};
        let Axi4Widths { data, addr, id } = *self;
        RelayTable::new()
            // write address
            .same("AWVALID", 1, ToSlave)
            .same("AWREADY", 1, ToMaster)
            .same("AWID", id, ToSlave)
            .same("AWADDR", addr, ToSlave)
            .same("AWLEN", 8, ToSlave)
            .same("AWSIZE", 3, ToSlave)
            .same("AWBURST", 2, ToSlave)
            .same("AWLOCK", 1, ToSlave)
            .same("AWCACHE", 4, ToSlave)
            .same("AWPROT", 3, ToSlave)
            .same("AWQOS", 4, ToSlave)
            // write data
            .same("WVALID", 1, ToSlave)
            .same("WREADY", 1, ToMaster)
            .same("WDATA", data, ToSlave)
            .same("WSTRB", data / 8, ToSlave)
            .same("WLAST", 1, ToSlave)
            // write response
            .same("BVALID", 1, ToMaster)
            .same("BREADY", 1, ToSlave)
            .same("BID", id, ToMaster)
            .same("BRESP", 2, ToMaster)
            // read address
            .same("ARVALID", 1, ToSlave)
            .same("ARREADY", 1, ToMaster)
            .same("ARID", id, ToSlave)
            .same("ARADDR", addr, ToSlave)
            .same("ARLEN", 8, ToSlave)
            .same("ARSIZE", 3, ToSlave)
            .same("ARBURST", 2, ToSlave)
            .same("ARLOCK", 1, ToSlave)
            .same("ARCACHE", 4, ToSlave)
            .same("ARPROT", 3, ToSlave)
            .same("ARQOS", 4, ToSlave)
            // read data
            .same("RVALID", 1, ToMaster)
            .same("RREADY", 1, ToSlave)
            .same("RID", id, ToMaster)
            .same("RDATA", data, ToMaster)
            .same("RRESP", 2, ToMaster)
            .same("RLAST", 1, ToMaster)
            .same("ARESETn", 1, ToSlave)
    }
}

/// An AXI4 link: the host is the master, the other device the slave
pub struct Axi4 {
    bus: String,
    options: BusOptions,
    wiring: Option<(Link, RelayTable)>,
}

impl Axi4 {
    pub fn new(config: &BusConfig) -> Result<Self, ProtocolError> {
        Axi4Widths::resolve(&config.name, &DeviceOptions::new(), &config.options)?;
        Ok(Self {
            bus: config.name.clone(),
            options: config.options.clone(),
            wiring: None,
        })
    }
}

impl Protocol for Axi4 {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Axi4
    }

    fn client_signals(
        &self,
        device: &DeviceConfig,
        announced: &DeviceOptions,
    ) -> Result<SignalWidths, ProtocolError> {
        let widths = Axi4Widths::resolve(&device.name, announced, &self.options)?;
        Ok(widths.table().driven_by(device.host))
    }

    fn wrap_up_configuration(&mut self, participants: &Participants) -> Result<(), ProtocolError> {
        let link = Link::find(participants)?;
        let master = participants
            .get(link.host)
            .ok_or(ProtocolError::MissingRole { role: "master" })?;
        let slave = participants
            .get(link.device)
            .ok_or(ProtocolError::MissingRole { role: "slave" })?;
        let master_widths = Axi4Widths::resolve(master.name(), master.options(), &self.options)?;
        let slave_widths = Axi4Widths::resolve(slave.name(), slave.options(), &self.options)?;

        let pairs = [
            (DATA_WIDTH, master_widths.data, slave_widths.data),
            (ADDR_WIDTH, master_widths.addr, slave_widths.addr),
            (ID_WIDTH, master_widths.id, slave_widths.id),
        ];
        for (key, left, right) in pairs {
            options::agree(key, (master.name(), left), (slave.name(), right))?;
        }
        debug!(
            "{}: axi4 data {} addr {} id {}",
            self.bus, master_widths.data, master_widths.addr, master_widths.id
        );
        self.wiring = Some((link, master_widths.table()));
        Ok(())
    }

    fn init(&mut self, context: &mut StepContext) {
        let Some((link, table)) = &self.wiring else {
            return;
        };
        context.tracer.declare_signal(ACLK, 1);
        table.declare(context.tracer);
        table.relay(context.participants, *link, context.tracer);
        context.broadcast(ACLK, SignalVector::bit(context.clock()));
    }

    fn step(&mut self, context: &mut StepContext) {
        let Some((link, table)) = &self.wiring else {
            return;
        };
        table.relay(context.participants, *link, context.tracer);
        context.broadcast(ACLK, SignalVector::bit(context.clock()));
    }
}
