//! Software model of the TWI peripheral.
//!
//! [`SimulatedTwi`] implements [`TwiRegisters`] by reacting to TWCR writes the
//! way the hardware does in master mode, with a configurable set of targets on
//! the bus. Every operation completes instantly unless the model is told to hang
//! at some stage, in which case TWINT (or TWSTO) never changes and the driver's
//! timeouts come into play. It can also be told to report a given status code
//! at some stage, as the hardware does after a bus error or lost arbitration.
//!
//! Targets acknowledge both SLA+W and SLA+R. Reads return the byte sequence
//! 0, 1, 2, ... starting afresh with every SLA+R.

use bit_field::BitField;
use heapless::Vec;

use crate::i2c::Stage;
use crate::registers::{Register, TwiRegisters, status, twcr};
use crate::scan::AddressSet;

/// Number of written bytes kept in the log.
pub const LOG_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BusState {
    /// No transaction, or the peripheral was reset.
    Idle,
    /// START sent, waiting for SLA+R/W.
    Started,
    /// The target NACKed; only START or STOP make sense now.
    Rejected,
    /// Master transmitter to `address`, `count` bytes accepted so far.
    Transmitting { address: u8, count: usize },
    /// Master receiver from `address`, `next` is the byte it will send.
    Receiving { address: u8, next: u8 },
}

/// A simulated TWI peripheral with targets attached.
#[derive(Debug)]
pub struct SimulatedTwi {
    twbr: u8,
    twsr: u8,
    twdr: u8,
    twcr: u8,
    pullups: bool,
    devices: AddressSet,
    state: BusState,
    hang: Option<Stage>,
    fault: Option<(Stage, u8)>,
    data_limit: Option<usize>,
    written: Vec<(u8, u8), LOG_CAPACITY>,
    starts: usize,
    repeated_starts: usize,
    stops: usize,
    resets: usize,
    nacks_sent: usize,
}

impl SimulatedTwi {
    /// A bus with targets at the given 7-bit addresses.
    pub fn with_devices(addresses: &[u8]) -> Self {
        Self {
            twbr: 0,
            twsr: status::NO_INFO,
            twdr: 0xFF,
            twcr: 0,
            pullups: false,
            devices: addresses.iter().copied().collect(),
            state: BusState::Idle,
            hang: None,
            fault: None,
            data_limit: None,
            written: Vec::new(),
            starts: 0,
            repeated_starts: 0,
            stops: 0,
            resets: 0,
            nacks_sent: 0,
        }
    }

    /// Never complete the given stage, as if SCL or SDA were stuck.
    pub fn hang_at(mut self, stage: Stage) -> Self {
        self.hang = Some(stage);
        self
    }

    /// Complete the given stage with `status` in TWSR instead of the normal outcome,
    /// then release the bus.
    ///
    /// Applies to START, address and data (written or read) stages; STOP has no
    /// status to report.
    pub fn fault_at(mut self, stage: Stage, status: u8) -> Self {
        self.fault = Some((stage, status));
        self
    }

    /// Targets NACK every data byte after the first `count` of a transaction.
    pub fn nack_data_after(mut self, count: usize) -> Self {
        self.data_limit = Some(count);
        self
    }

    /// Bytes written to targets, as `(address, byte)`, oldest first.
    ///
    /// Only the first [`LOG_CAPACITY`] bytes are kept.
    pub fn written(&self) -> &[(u8, u8)] {
        &self.written
    }

    /// Number of START conditions, repeated STARTs included.
    pub fn starts(&self) -> usize {
        self.starts
    }

    /// Number of repeated START conditions.
    pub fn repeated_starts(&self) -> usize {
        self.repeated_starts
    }

    /// Number of STOP conditions.
    pub fn stops(&self) -> usize {
        self.stops
    }

    /// Number of times the peripheral was disabled (TWEN cleared).
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Number of received bytes the master answered with NACK.
    pub fn nacks_sent(&self) -> usize {
        self.nacks_sent
    }

    /// Whether the SDA/SCL pull-ups have been enabled.
    pub fn pullups_enabled(&self) -> bool {
        self.pullups
    }

    /// Value last written to TWBR.
    pub fn twbr(&self) -> u8 {
        self.twbr
    }

    fn write_control(&mut self, value: u8) {
        if !value.get_bit(twcr::TWEN) {
            self.twcr = value;
            self.state = BusState::Idle;
            self.twsr = status::NO_INFO | self.prescaler();
            self.resets += 1;
            return;
        }
        if !value.get_bit(twcr::TWINT) {
            // Writing zero to TWINT leaves the current operation alone.
            let mut control = value;
            control.set_bit(twcr::TWINT, self.twcr.get_bit(twcr::TWINT));
            self.twcr = control;
            return;
        }

        if value.get_bit(twcr::TWSTO) {
            self.stop(value);
            return;
        }

        let stage = if value.get_bit(twcr::TWSTA) {
            Stage::Start
        } else if self.state == BusState::Started {
            Stage::Address
        } else {
            Stage::Data
        };
        if self.hang == Some(stage) {
            let mut control = value;
            control.set_bit(twcr::TWINT, false);
            self.twcr = control;
            return;
        }

        let code = match (stage, self.fault) {
            (stage, Some((at, code))) if stage == at => {
                self.state = BusState::Idle;
                code
            }
            (Stage::Start, _) => self.start(),
            (Stage::Address, _) => self.address(),
            _ => self.data(value.get_bit(twcr::TWEA)),
        };
        self.twsr = code | self.prescaler();
        // TWINT reads back as set: the operation has completed.
        self.twcr = value;
    }

    fn start(&mut self) -> u8 {
        self.starts += 1;
        let code = if self.state == BusState::Idle {
            status::START
        } else {
            self.repeated_starts += 1;
            status::REP_START
        };
        self.state = BusState::Started;
        code
    }

    fn address(&mut self) -> u8 {
        let address = self.twdr >> 1;
        let read = self.twdr.get_bit(0);
        let present = self.devices.contains(address);
        self.state = match (present, read) {
            (true, false) => BusState::Transmitting { address, count: 0 },
            (true, true) => BusState::Receiving { address, next: 0 },
            (false, _) => BusState::Rejected,
        };
        match (present, read) {
            (true, false) => status::MT_SLA_ACK,
            (false, false) => status::MT_SLA_NACK,
            (true, true) => status::MR_SLA_ACK,
            (false, true) => status::MR_SLA_NACK,
        }
    }

    fn data(&mut self, ack: bool) -> u8 {
        match self.state {
            BusState::Transmitting { address, count } => {
                if self.data_limit.is_some_and(|limit| count >= limit) {
                    return status::MT_DATA_NACK;
                }
                // The log is for inspection only; drop bytes once it is full.
                let _ = self.written.push((address, self.twdr));
                self.state = BusState::Transmitting {
                    address,
                    count: count + 1,
                };
                status::MT_DATA_ACK
            }
            BusState::Receiving { address, next } => {
                self.twdr = next;
                self.state = BusState::Receiving {
                    address,
                    next: next.wrapping_add(1),
                };
                if ack {
                    status::MR_DATA_ACK
                } else {
                    self.nacks_sent += 1;
                    status::MR_DATA_NACK
                }
            }
            // Data with no target selected is an illegal bus condition.
            _ => status::BUS_ERROR,
        }
    }

    fn stop(&mut self, value: u8) {
        let mut control = value;
        control.set_bit(twcr::TWINT, false);
        if self.hang != Some(Stage::Stop) {
            self.stops += 1;
            self.state = BusState::Idle;
            self.twsr = status::NO_INFO | self.prescaler();
            control.set_bit(twcr::TWSTO, false);
        }
        self.twcr = control;
    }

    fn prescaler(&self) -> u8 {
        self.twsr.get_bits(0..2)
    }
}

impl TwiRegisters for SimulatedTwi {
    fn read(&mut self, register: Register) -> u8 {
        match register {
            Register::Twbr => self.twbr,
            Register::Twsr => self.twsr,
            Register::Twdr => self.twdr,
            Register::Twcr => self.twcr,
        }
    }

    fn write(&mut self, register: Register, value: u8) {
        match register {
            Register::Twbr => self.twbr = value,
            // Only the prescaler bits are writable.
            Register::Twsr => {
                self.twsr.set_bits(0..2, value.get_bits(0..2));
            }
            Register::Twdr => self.twdr = value,
            Register::Twcr => self.write_control(value),
        }
    }

    fn enable_pullups(&mut self) {
        self.pullups = true;
    }
}
