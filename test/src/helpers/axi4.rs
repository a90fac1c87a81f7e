use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, Ordering},
};

use simbus_client::{shared::BitValue, Participant, SimbusClientError};

use super::Drive;

pub const ACLK: &str = "ACLK";

// Both models assume the default widths: 32-bit data and address, 4-bit ids.
const DATA_BITS: usize = 32;
const ADDR_BITS: usize = 32;
const ID_BITS: usize = 4;
const SIZE_4_BYTES: u64 = 0b010;
const BURST_INCR: u64 = 0b01;

fn value(participant: &Participant, name: &str) -> Result<u64, SimbusClientError> {
    Ok(participant.signal(name)?.to_u64().unwrap_or(0))
}

/// An AXI4 master issuing single-beat transfers
pub struct Axi4Master {
    participant: Participant,
    drive: Drive,
}

impl Axi4Master {
    pub fn new(participant: Participant) -> Self {
        let mut drive = Drive::new();
        drive.set_bit("ARESETn", BitValue::One);
        for name in ["AWVALID", "WVALID", "BREADY", "ARVALID", "RREADY"] {
            drive.set_bit(name, BitValue::Zero);
        }
        Self { participant, drive }
    }

    fn tick(&mut self) -> Result<(), SimbusClientError> {
        self.participant.wait_posedge(ACLK, self.drive.signals())
    }

    /// Writes one word; returns BRESP
    pub fn write(&mut self, address: u64, data: u32) -> Result<u64, SimbusClientError> {
        self.drive.set_bit("AWVALID", BitValue::One);
        self.drive.set_u64("AWADDR", address, ADDR_BITS);
        self.drive.set_u64("AWID", 0, ID_BITS);
        self.drive.set_u64("AWLEN", 0, 8);
        self.drive.set_u64("AWSIZE", SIZE_4_BYTES, 3);
        self.drive.set_u64("AWBURST", BURST_INCR, 2);
        self.drive.set_bit("WVALID", BitValue::One);
        self.drive.set_u64("WDATA", u64::from(data), DATA_BITS);
        self.drive.set_u64("WSTRB", 0xf, DATA_BITS / 8);
        self.drive.set_bit("WLAST", BitValue::One);
        self.drive.set_bit("BREADY", BitValue::One);

        let mut address_sent = false;
        let mut data_sent = false;
        loop {
            self.tick()?;
            if !address_sent && self.participant.bit("AWREADY") == BitValue::One {
                address_sent = true;
                self.drive.set_bit("AWVALID", BitValue::Zero);
            }
            if !data_sent && self.participant.bit("WREADY") == BitValue::One {
                data_sent = true;
                self.drive.set_bit("WVALID", BitValue::Zero);
            }
            if self.participant.bit("BVALID") == BitValue::One {
                self.drive.set_bit("BREADY", BitValue::Zero);
                return value(&self.participant, "BRESP");
            }
        }
    }

    /// Reads one word
    pub fn read(&mut self, address: u64) -> Result<u32, SimbusClientError> {
        self.drive.set_bit("ARVALID", BitValue::One);
        self.drive.set_u64("ARADDR", address, ADDR_BITS);
        self.drive.set_u64("ARID", 0, ID_BITS);
        self.drive.set_u64("ARLEN", 0, 8);
        self.drive.set_u64("ARSIZE", SIZE_4_BYTES, 3);
        self.drive.set_u64("ARBURST", BURST_INCR, 2);
        self.drive.set_bit("RREADY", BitValue::One);

        let mut address_sent = false;
        loop {
            self.tick()?;
            if !address_sent && self.participant.bit("ARREADY") == BitValue::One {
                address_sent = true;
                self.drive.set_bit("ARVALID", BitValue::Zero);
            }
            if self.participant.bit("RVALID") == BitValue::One {
                self.drive.set_bit("RREADY", BitValue::Zero);
                let data = value(&self.participant, "RDATA")?;
                return Ok(u32::try_from(data).unwrap_or(u32::MAX));
            }
        }
    }

    pub fn finish(self) -> Result<(), SimbusClientError> {
        self.participant.finish()
    }
}

/// A memory behind an AXI4 slave port, always ready to accept
pub struct Axi4MemorySlave {
    participant: Participant,
    drive: Drive,
    memory: BTreeMap<u64, u32>,
}

impl Axi4MemorySlave {
    pub fn new(participant: Participant) -> Self {
        let mut drive = Drive::new();
        for name in ["AWREADY", "WREADY", "ARREADY"] {
            drive.set_bit(name, BitValue::One);
        }
        for name in ["BVALID", "RVALID", "RLAST"] {
            drive.set_bit(name, BitValue::Zero);
        }
        Self {
            participant,
            drive,
            memory: BTreeMap::new(),
        }
    }

    /// Serves transfers until `stop` is set, then leaves the bus and
    /// returns the memory contents
    pub fn serve(mut self, stop: &AtomicBool) -> Result<BTreeMap<u64, u32>, SimbusClientError> {
        let mut write_address: Option<(u64, u64)> = None;
        let mut write_data: Option<u32> = None;
        let mut response_pending = false;
        let mut read_pending = false;

        while !stop.load(Ordering::SeqCst) {
            self.participant.wait_posedge(ACLK, self.drive.signals())?;
            let participant = &self.participant;

            if response_pending && participant.bit("BREADY") == BitValue::One {
                self.drive.set_bit("BVALID", BitValue::Zero);
                response_pending = false;
            }
            if read_pending && participant.bit("RREADY") == BitValue::One {
                self.drive.set_bit("RVALID", BitValue::Zero);
                self.drive.set_bit("RLAST", BitValue::Zero);
                read_pending = false;
            }

            if participant.bit("AWVALID") == BitValue::One {
                write_address = Some((value(participant, "AWADDR")?, value(participant, "AWID")?));
            }
            if participant.bit("WVALID") == BitValue::One {
                let data = value(participant, "WDATA")?;
                write_data = Some(u32::try_from(data).unwrap_or(u32::MAX));
            }
            if !response_pending {
                if let (Some((address, id)), Some(data)) = (write_address, write_data) {
                    self.memory.insert(address, data);
                    self.drive.set_bit("BVALID", BitValue::One);
                    self.drive.set_u64("BID", id, ID_BITS);
                    self.drive.set_u64("BRESP", 0, 2);
                    write_address = None;
                    write_data = None;
                    response_pending = true;
                }
            }

            if !read_pending && participant.bit("ARVALID") == BitValue::One {
                let address = value(participant, "ARADDR")?;
                let id = value(participant, "ARID")?;
                let data = self.memory.get(&address).copied().unwrap_or(0);
                self.drive.set_bit("RVALID", BitValue::One);
                self.drive.set_u64("RDATA", u64::from(data), DATA_BITS);
                self.drive.set_u64("RID", id, ID_BITS);
                self.drive.set_u64("RRESP", 0, 2);
                self.drive.set_bit("RLAST", BitValue::One);
                read_pending = true;
            }
        }
        self.participant.finish()?;
        Ok(self.memory)
    }
}
