use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use simbus_client::{
    shared::{BitValue, SignalVector},
    Participant, SimbusClientError,
};

use super::Drive;

pub const PCI_CLK: &str = "PCI_CLK";
const FRAME: &str = "FRAME#";
const IRDY: &str = "IRDY#";
const TRDY: &str = "TRDY#";
const DEVSEL: &str = "DEVSEL#";
const REQ: &str = "REQ#";
const GNT: &str = "GNT#";
const IDSEL: &str = "IDSEL";
const AD: &str = "AD";
const CBE: &str = "C/BE#";

const AD_WIDTH: usize = 64;
const CBE_WIDTH: usize = 8;
const CONFIG_READ: u64 = 0b1010;
const IDSEL_BASE: usize = 16;

/// Clocks a master waits for DEVSEL# before giving up
const DEVSEL_TIMEOUT: usize = 5;

/// What a configuration read returns when no target claims it
pub const MASTER_ABORT: u32 = 0xffff_ffff;

/// A 32-bit value on the low half of a wide bus, upper half released
fn low_half(value: u64, bits: usize, width: usize) -> SignalVector {
    let mut vector = SignalVector::from_u64(value, bits);
    vector.resize(width, BitValue::HiZ);
    vector
}

/// A bus master issuing single-dword configuration reads
pub struct PciMaster {
    participant: Participant,
    drive: Drive,
}

impl PciMaster {
    pub fn new(participant: Participant) -> Self {
        Self {
            participant,
            drive: Drive::new(),
        }
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn drive_mut(&mut self) -> &mut Drive {
        &mut self.drive
    }

    /// Runs until the next rising edge of PCI_CLK
    pub fn tick(&mut self) -> Result<(), SimbusClientError> {
        self.participant.wait_posedge(PCI_CLK, self.drive.signals())
    }

    /// Reads configuration register `register` of device `target`.
    /// Returns `MASTER_ABORT` when nobody claims the cycle.
    pub fn config_read(&mut self, target: u32, register: u8) -> Result<u32, SimbusClientError> {
        self.drive.set_bit(REQ, BitValue::Zero);
        loop {
            self.tick()?;
            let granted = self.participant.bit(GNT) == BitValue::Zero;
            let idle = self.participant.bit(FRAME) != BitValue::Zero
                && self.participant.bit(IRDY) != BitValue::Zero;
            if granted && idle {
                break;
            }
        }

        // address phase
        let address = (1u64 << (IDSEL_BASE + target as usize)) | (u64::from(register) << 2);
        self.drive.set(AD, low_half(address, 32, AD_WIDTH));
        self.drive.set(CBE, low_half(CONFIG_READ, 4, CBE_WIDTH));
        self.drive.set_bit(FRAME, BitValue::Zero);
        self.drive.set_bit(REQ, BitValue::One);
        self.tick()?;

        // single data phase
        self.drive.set_bit(FRAME, BitValue::One);
        self.drive.set_bit(IRDY, BitValue::Zero);
        self.drive.release(AD);
        self.drive.set(CBE, low_half(0, 4, CBE_WIDTH));
        let mut data = None;
        for _ in 0..DEVSEL_TIMEOUT {
            self.tick()?;
            if self.participant.bit(DEVSEL) == BitValue::Zero
                && self.participant.bit(TRDY) == BitValue::Zero
            {
                data = self
                    .participant
                    .signal(AD)?
                    .slice(0, 32)
                    .to_u64()
                    .and_then(|value| u32::try_from(value).ok());
                break;
            }
        }

        self.drive.set_bit(IRDY, BitValue::One);
        self.tick()?;
        for name in [FRAME, IRDY, AD, CBE, REQ] {
            self.drive.release(name);
        }

        match data {
            Some(value) => Ok(value),
            None => {
                debug!("config read of device {} aborted", target);
                Ok(MASTER_ABORT)
            }
        }
    }

    pub fn finish(self) -> Result<(), SimbusClientError> {
        self.participant.finish()
    }
}

/// A target that answers configuration reads of register 0 with its ID
/// and of every other register with 0
pub struct PciConfigTarget {
    participant: Participant,
    drive: Drive,
    id: u32,
}

impl PciConfigTarget {
    pub fn new(participant: Participant, id: u32) -> Self {
        Self {
            participant,
            drive: Drive::new(),
            id,
        }
    }

    fn claims(&self) -> bool {
        let command = self
            .participant
            .signal(CBE)
            .ok()
            .and_then(|cbe| cbe.slice(0, 4).to_u64());
        self.participant.bit(FRAME) == BitValue::Zero
            && self.participant.bit(IDSEL) == BitValue::One
            && command == Some(CONFIG_READ)
    }

    /// Serves cycles until `stop` is set, then leaves the bus. Returns the
    /// number of completed reads.
    pub fn serve(mut self, stop: &AtomicBool) -> Result<usize, SimbusClientError> {
        let mut claimed = false;
        let mut served = 0;
        while !stop.load(Ordering::SeqCst) {
            self.participant.wait_posedge(PCI_CLK, self.drive.signals())?;
            if claimed {
                if self.participant.bit(IRDY) == BitValue::Zero {
                    for name in [DEVSEL, TRDY, AD] {
                        self.drive.release(name);
                    }
                    claimed = false;
                    served += 1;
                }
            } else if self.claims() {
                let register = self
                    .participant
                    .signal(AD)?
                    .slice(2, 6)
                    .to_u64()
                    .unwrap_or(0);
                let value = if register == 0 { self.id } else { 0 };
                self.drive.set_bit(DEVSEL, BitValue::Zero);
                self.drive.set_bit(TRDY, BitValue::Zero);
                self.drive.set(AD, low_half(u64::from(value), 32, AD_WIDTH));
                claimed = true;
            }
        }
        self.participant.finish()?;
        Ok(served)
    }
}
