use bit_field::BitField;

use crate::clock::{Deadline, Millis};
use crate::error::Error;
use crate::i2c::{Config, I2cAddressing, Stage};
use crate::registers::{Register, TwiRegisters, status, twcr};
use crate::status::Status;

mod i2c;
mod i2c_eh;

/// Polling bus-master driver for the AVR TWI.
///
/// # Quick start
///
/// Create the driver with [`TwiMaster::new`], passing the peripheral registers
/// (usually [`Atmega`]), a millisecond counter and a [`Config`]. Then use
/// [`TwiMaster::probe`] or [`TwiMaster::scan`] to look for targets, or the
/// [`embedded_hal::i2c::I2c`] implementation to talk to them.
///
/// [`Atmega`]: crate::registers::Atmega
///
/// # Transaction steps
///
/// The master-transmitter sequence is exposed step by step:
///
/// 1. [`TwiMaster::start`]
/// 2. [`TwiMaster::write_address`] (SLA+W)
/// 3. [`TwiMaster::write_data`], as many times as needed
/// 4. [`TwiMaster::stop`]
///
/// Every step that waits on the hardware gives up after [`Config::timeout_ms`].
///
/// The first failure of a transaction is latched. Steps 2 and 3 do nothing while
/// an error is latched and return that error again, so the caller can issue the
/// whole sequence and look at the outcome once. [`TwiMaster::stop`] clears the
/// latch, resetting the peripheral instead of sending a STOP condition if the
/// transaction failed.
///
/// The most recent failure stays available from [`TwiMaster::last_error`] until
/// a transaction completes with a successful STOP.
#[derive(Debug)]
pub struct TwiMaster<R, C> {
    regs: R,
    clock: C,
    config: Config,
    /// Error latched by the current transaction.
    pending: Option<Error>,
    /// Most recent error, cleared by a successful STOP.
    last_error: Option<Error>,
}

impl<R: TwiRegisters, C: Millis> TwiMaster<R, C> {
    ////////////////////////////////////////////////////////////////////////////////
    // Constructor
    ////////////////////////////////////////////////////////////////////////////////

    /// Initialise the TWI as a bus master.
    ///
    /// Enables the SDA/SCL pull-ups (if configured), programs the bit rate and
    /// prescaler, and enables the peripheral.
    ///
    /// # Errors
    ///
    /// [`Error::BitRateTooHigh`] or [`Error::BitRateTooLow`] if the configured bus
    /// speed can't be produced from the CPU clock. The peripheral is left untouched.
    pub fn new(mut regs: R, clock: C, config: Config) -> Result<Self, Error> {
        let rate = config.bit_rate()?;
        if config.pullups {
            regs.enable_pullups();
        }
        regs.write(Register::Twbr, rate.twbr);
        regs.write(Register::Twcr, control(&[twcr::TWEN]));
        regs.write(Register::Twsr, rate.twps);
        debug!("TWI master enabled, TWBR={} TWPS={}", rate.twbr, rate.twps);

        Ok(Self {
            regs,
            clock,
            config,
            pending: None,
            last_error: None,
        })
    }

    /// Disable the peripheral and give back the registers and clock.
    pub fn release(mut self) -> (R, C) {
        self.regs.write(Register::Twcr, 0);
        (self.regs, self.clock)
    }

    /// Configuration the driver was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Most recent error, if the last transaction did not finish cleanly.
    pub fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    /// Error latched by the transaction in progress, if any.
    pub fn pending_error(&self) -> Option<Error> {
        self.pending
    }

    /// Read and decode TWSR.
    pub fn status(&mut self) -> Status {
        Status::from_twsr(self.regs.read(Register::Twsr))
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Transaction steps
    ////////////////////////////////////////////////////////////////////////////////

    /// Send a START condition.
    ///
    /// Also used to send a repeated START while the bus is held. A successful START
    /// clears any latched error.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] if TWINT is not set in time, [`Error::StartNotTransmitted`]
    /// if the hardware reports anything other than START or repeated START.
    pub fn start(&mut self) -> Result<(), Error> {
        self.regs.write(
            Register::Twcr,
            control(&[twcr::TWINT, twcr::TWSTA, twcr::TWEN]),
        );
        self.wait_for_twint(Stage::Start)?;

        let twsr = self.status();
        if !twsr.is_start() {
            return Err(self.fail(Error::StartNotTransmitted(twsr.code)));
        }
        self.pending = None;
        Ok(())
    }

    /// Send SLA+W for the given 7-bit address and check it was acknowledged.
    ///
    /// Does nothing and returns the latched error if an earlier step failed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] for addresses above 0x7F, [`Error::Timeout`],
    /// [`Error::AddressNotAcknowledged`] if no target answered, or
    /// [`Error::UnexpectedStatus`] for any other status (lost arbitration, bus
    /// error).
    pub fn write_address(&mut self, seven_bit_address: u8) -> Result<(), Error> {
        self.send_address(seven_bit_address, false)
    }

    /// Send SLA+R for the given 7-bit address and check it was acknowledged.
    ///
    /// This switches the peripheral into master-receiver mode; follow it with
    /// [`TwiMaster::read_byte`]. Errors as for [`TwiMaster::write_address`].
    pub fn write_address_read(&mut self, seven_bit_address: u8) -> Result<(), Error> {
        self.send_address(seven_bit_address, true)
    }

    fn send_address(&mut self, seven_bit_address: u8, read: bool) -> Result<(), Error> {
        self.check_latch()?;
        if seven_bit_address > 0x7F {
            return Err(self.fail(Error::InvalidAddress(seven_bit_address)));
        }
        let (sla, ack, nack) = if read {
            (
                seven_bit_address.into_read_address(),
                status::MR_SLA_ACK,
                status::MR_SLA_NACK,
            )
        } else {
            (
                seven_bit_address.into_write_address(),
                status::MT_SLA_ACK,
                status::MT_SLA_NACK,
            )
        };

        self.regs.write(Register::Twdr, sla);
        self.regs
            .write(Register::Twcr, control(&[twcr::TWINT, twcr::TWEN]));
        self.wait_for_twint(Stage::Address)?;

        match self.status().code {
            code if code == ack => Ok(()),
            code if code == nack => Err(self.fail(Error::AddressNotAcknowledged(code))),
            code => Err(self.fail(Error::UnexpectedStatus {
                stage: Stage::Address,
                status: code,
            })),
        }
    }

    /// Transmit one data byte and check it was acknowledged.
    ///
    /// Does nothing and returns the latched error if an earlier step failed.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`], [`Error::DataNotAcknowledged`] or
    /// [`Error::UnexpectedStatus`].
    pub fn write_data(&mut self, byte: u8) -> Result<(), Error> {
        self.check_latch()?;

        self.regs.write(Register::Twdr, byte);
        self.regs
            .write(Register::Twcr, control(&[twcr::TWINT, twcr::TWEN]));
        self.wait_for_twint(Stage::Data)?;

        match self.status().code {
            status::MT_DATA_ACK => Ok(()),
            code @ status::MT_DATA_NACK => Err(self.fail(Error::DataNotAcknowledged(code))),
            code => Err(self.fail(Error::UnexpectedStatus {
                stage: Stage::Data,
                status: code,
            })),
        }
    }

    /// Receive one data byte, answering with ACK (`ack == true`) or NACK.
    ///
    /// The last byte of a read must be answered with NACK so the target releases
    /// SDA before the STOP or repeated START.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] or [`Error::DataNotReceived`].
    pub fn read_byte(&mut self, ack: bool) -> Result<u8, Error> {
        self.check_latch()?;

        let (command, expected) = if ack {
            (
                control(&[twcr::TWINT, twcr::TWEA, twcr::TWEN]),
                status::MR_DATA_ACK,
            )
        } else {
            (control(&[twcr::TWINT, twcr::TWEN]), status::MR_DATA_NACK)
        };
        self.regs.write(Register::Twcr, command);
        self.wait_for_twint(Stage::Data)?;

        let twsr = self.status();
        if twsr.code != expected {
            return Err(self.fail(Error::DataNotReceived(twsr.code)));
        }
        Ok(self.regs.read(Register::Twdr))
    }

    /// Finish the transaction.
    ///
    /// If a step of this transaction failed, the latch is cleared and the peripheral
    /// is reset (disabled and re-enabled) instead of sending a STOP, which releases
    /// the bus lines. This counts as success: the failure itself has already been
    /// reported and stays in [`TwiMaster::last_error`].
    ///
    /// Otherwise a STOP condition is sent and the driver waits for the hardware to
    /// clear TWSTO.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] if TWSTO does not clear in time. The peripheral is reset
    /// in that case too.
    pub fn stop(&mut self) -> Result<(), Error> {
        if self.pending.take().is_some() {
            self.reset();
            return Ok(());
        }

        self.regs.write(
            Register::Twcr,
            control(&[twcr::TWINT, twcr::TWSTO, twcr::TWEN]),
        );
        let deadline = Deadline::start(&mut self.clock, self.config.timeout_ms);
        while self.regs.read(Register::Twcr).get_bit(twcr::TWSTO) {
            if deadline.expired(&mut self.clock) {
                let error = self.fail(Error::Timeout(Stage::Stop));
                self.pending = None;
                self.reset();
                return Err(error);
            }
        }

        self.last_error = None;
        Ok(())
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Internals
    ////////////////////////////////////////////////////////////////////////////////

    /// Poll TWINT until it is set or the timeout expires.
    fn wait_for_twint(&mut self, stage: Stage) -> Result<(), Error> {
        let deadline = Deadline::start(&mut self.clock, self.config.timeout_ms);
        while !self.regs.read(Register::Twcr).get_bit(twcr::TWINT) {
            if deadline.expired(&mut self.clock) {
                return Err(self.fail(Error::Timeout(stage)));
            }
        }
        Ok(())
    }

    fn check_latch(&self) -> Result<(), Error> {
        match self.pending {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Latch and record an error, returning it for the caller to propagate.
    fn fail(&mut self, error: Error) -> Error {
        warn!("TWI error {=u8:#x} latched", error.code());
        self.pending = Some(error);
        self.last_error = Some(error);
        error
    }

    /// Disable and re-enable the peripheral, abandoning the bus.
    fn reset(&mut self) {
        debug!("TWI reset");
        self.regs.write(Register::Twcr, 0);
        self.regs.write(Register::Twcr, control(&[twcr::TWEN]));
    }
}

/// Build a TWCR value with the given bits set.
fn control(bits: &[usize]) -> u8 {
    let mut value = 0u8;
    for &bit in bits {
        value.set_bit(bit, true);
    }
    value
}
