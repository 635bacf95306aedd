//! Whole-transaction helpers built from the individual steps.
use embedded_hal::i2c::Operation;

use super::TwiMaster;
use crate::Error;
use crate::clock::Millis;
use crate::registers::TwiRegisters;

impl<R: TwiRegisters, C: Millis> TwiMaster<R, C> {
    /// Write data to an I2C target.
    ///
    /// The address must be the 7-bit address, not an 8-bit read or write address.
    /// The transaction is START, SLA+W, one data byte at a time, STOP. An empty
    /// `write_buffer` is the same as [`TwiMaster::probe`], except that a NACK is
    /// reported as an error.
    ///
    /// # Errors
    ///
    /// The first error of the transaction. The STOP (or peripheral reset) has
    /// always been issued by the time this returns.
    pub fn i2c_write(&mut self, seven_bit_address: u8, write_buffer: &[u8]) -> Result<(), Error> {
        self.run_operations(seven_bit_address, &mut [Operation::Write(write_buffer)])
    }

    /// Read data from an I2C target.
    ///
    /// Every byte but the last is acknowledged; the last is answered with NACK.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyRead`] if `read_buffer` is empty, otherwise the first error of
    /// the transaction.
    pub fn i2c_read(&mut self, seven_bit_address: u8, read_buffer: &mut [u8]) -> Result<(), Error> {
        self.run_operations(seven_bit_address, &mut [Operation::Read(read_buffer)])
    }

    /// Perform an I2C write-read to the given target address.
    ///
    /// First the provided data buffer is written to the target without a STOP
    /// condition. Then a repeated START is issued and `read_buffer` is filled from
    /// the target, followed by a STOP.
    pub fn i2c_write_read(
        &mut self,
        seven_bit_address: u8,
        write_buffer: &[u8],
        read_buffer: &mut [u8],
    ) -> Result<(), Error> {
        self.run_operations(
            seven_bit_address,
            &mut [Operation::Write(write_buffer), Operation::Read(read_buffer)],
        )
    }

    /// Check if an I2C target acknowledges the given address.
    ///
    /// Sends START, SLA+W and STOP without writing any data. A target which doesn't
    /// acknowledge writes won't be found this way.
    ///
    /// # Errors
    ///
    /// Only for failures other than the address being NACKed: a timeout, a START
    /// which could not be sent, a bus fault such as lost arbitration, or an
    /// address above 0x7F.
    pub fn probe(&mut self, seven_bit_address: u8) -> Result<bool, Error> {
        match self.run_operations(seven_bit_address, &mut []) {
            Ok(()) => Ok(true),
            Err(Error::AddressNotAcknowledged(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Execute a sequence of operations as one bus transaction.
    ///
    /// Adjacent operations in the same direction share one address phase. A change
    /// of direction issues a repeated START and a new address phase. The last byte
    /// read before a change of direction (or the end) is answered with NACK. The
    /// transaction always ends with [`TwiMaster::stop`].
    ///
    /// An empty list of operations sends START, SLA+W and STOP. A read phase with
    /// no bytes to receive is refused with [`Error::EmptyRead`].
    pub(crate) fn run_operations(
        &mut self,
        seven_bit_address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        // Refuse bad requests before the bus is claimed.
        if seven_bit_address > 0x7F {
            return Err(Error::InvalidAddress(seven_bit_address));
        }
        if has_empty_read_phase(operations) {
            return Err(Error::EmptyRead);
        }

        let outcome = self.run_steps(seven_bit_address, operations);
        let stopped = self.stop();
        outcome.and(stopped)
    }

    fn run_steps(
        &mut self,
        seven_bit_address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        if operations.is_empty() {
            self.start()?;
            return self.write_address(seven_bit_address);
        }

        let mut reading: Option<bool> = None;
        for index in 0..operations.len() {
            let is_read = matches!(operations[index], Operation::Read(_));
            if reading != Some(is_read) {
                self.start()?;
                if is_read {
                    self.write_address_read(seven_bit_address)?;
                } else {
                    self.write_address(seven_bit_address)?;
                }
                reading = Some(is_read);
            }

            // Whether any more bytes will be read before the direction changes.
            let more_reads = operations[index + 1..]
                .iter()
                .take_while(|op| matches!(op, Operation::Read(_)) == is_read)
                .any(|op| matches!(op, Operation::Read(buf) if !buf.is_empty()));

            match &mut operations[index] {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        self.write_data(byte)?;
                    }
                }
                Operation::Read(buffer) => {
                    let last = buffer.len().saturating_sub(1);
                    for (position, slot) in buffer.iter_mut().enumerate() {
                        let ack = position < last || more_reads;
                        *slot = self.read_byte(ack)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Whether some run of adjacent reads has no bytes to receive in total.
fn has_empty_read_phase(operations: &[Operation<'_>]) -> bool {
    operations
        .chunk_by(|a, b| is_read(a) == is_read(b))
        .filter(|phase| is_read(&phase[0]))
        .any(|phase| {
            phase
                .iter()
                .all(|op| matches!(op, Operation::Read(buf) if buf.is_empty()))
        })
}

fn is_read(operation: &Operation<'_>) -> bool {
    matches!(operation, Operation::Read(_))
}

#[cfg(test)]
mod test {
    use crate::i2c::{Config, Stage};
    use crate::registers::status;
    use crate::sim::SimulatedTwi;
    use crate::{Error, TwiMaster};

    fn master(sim: &mut SimulatedTwi) -> TwiMaster<&mut SimulatedTwi, impl FnMut() -> u32> {
        let mut now = 0u32;
        let clock = move || {
            now = now.wrapping_add(1);
            now
        };
        TwiMaster::new(sim, clock, Config::default()).unwrap()
    }

    #[test]
    fn write_reaches_target() {
        let mut sim = SimulatedTwi::with_devices(&[0x26]);
        master(&mut sim).i2c_write(0x26, &[1, 2, 3]).unwrap();
        assert_eq!(sim.written(), &[(0x26, 1), (0x26, 2), (0x26, 3)]);
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn read_nacks_last_byte() {
        let mut sim = SimulatedTwi::with_devices(&[0x26]);
        let mut buf = [0u8; 4];
        master(&mut sim).i2c_read(0x26, &mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3]);
        assert_eq!(sim.nacks_sent(), 1);
    }

    #[test]
    fn write_read_uses_repeated_start() {
        let mut sim = SimulatedTwi::with_devices(&[0x26]);
        let mut buf = [0u8; 2];
        master(&mut sim)
            .i2c_write_read(0x26, &[0x20], &mut buf)
            .unwrap();
        assert_eq!(sim.starts(), 2);
        assert_eq!(sim.repeated_starts(), 1);
        assert_eq!(sim.stops(), 1);
        assert_eq!(buf, [0, 1]);
    }

    #[test]
    fn probe_reports_presence() {
        let mut sim = SimulatedTwi::with_devices(&[0x3C]);
        let mut twi = master(&mut sim);
        assert_eq!(twi.probe(0x3C), Ok(true));
        assert_eq!(twi.probe(0x3D), Ok(false));
        assert_eq!(twi.probe(0x80), Err(Error::InvalidAddress(0x80)));
    }

    #[test]
    fn failed_transaction_resets_instead_of_stopping() {
        let mut sim = SimulatedTwi::with_devices(&[]);
        let result = master(&mut sim).i2c_write(0x10, &[0xAA]);
        assert_eq!(result, Err(Error::AddressNotAcknowledged(0x20)));
        assert_eq!(sim.stops(), 0);
        assert_eq!(sim.resets(), 1);
        assert!(sim.written().is_empty());
    }

    #[test]
    fn data_nack_is_reported() {
        let mut sim = SimulatedTwi::with_devices(&[0x26]).nack_data_after(1);
        let result = master(&mut sim).i2c_write(0x26, &[1, 2, 3]);
        assert_eq!(result, Err(Error::DataNotAcknowledged(0x30)));
        assert_eq!(sim.written(), &[(0x26, 1)]);
    }

    #[test]
    fn hung_bus_times_out() {
        let mut sim = SimulatedTwi::with_devices(&[0x26]).hang_at(Stage::Data);
        let result = master(&mut sim).i2c_write(0x26, &[1]);
        assert_eq!(result, Err(Error::Timeout(Stage::Data)));
        assert_eq!(sim.resets(), 1);
    }

    #[test]
    fn start_fault_is_reported_with_its_status() {
        let mut sim = SimulatedTwi::with_devices(&[0x26]).fault_at(Stage::Start, status::BUS_ERROR);
        let error = master(&mut sim).i2c_write(0x26, &[1]).unwrap_err();
        assert_eq!(error, Error::StartNotTransmitted(0x00));
        assert_eq!(error.code(), 0x01);
        assert_eq!(sim.stops(), 0);
        assert_eq!(sim.resets(), 1);
        assert!(sim.written().is_empty());
    }

    #[test]
    fn lost_arbitration_is_not_a_nack() {
        let mut sim =
            SimulatedTwi::with_devices(&[0x26]).fault_at(Stage::Address, status::ARB_LOST);
        let mut twi = master(&mut sim);
        let lost = Error::UnexpectedStatus {
            stage: Stage::Address,
            status: 0x38,
        };
        assert_eq!(twi.i2c_write(0x26, &[1]), Err(lost));
        assert_eq!(twi.probe(0x26), Err(lost));
    }

    #[test]
    fn bus_error_after_data_is_not_a_nack() {
        let mut sim = SimulatedTwi::with_devices(&[0x26]).fault_at(Stage::Data, status::BUS_ERROR);
        let result = master(&mut sim).i2c_write(0x26, &[1, 2]);
        assert_eq!(
            result,
            Err(Error::UnexpectedStatus {
                stage: Stage::Data,
                status: 0x00
            })
        );
    }

    #[test]
    fn failed_read_is_reported() {
        let mut sim = SimulatedTwi::with_devices(&[0x26]).fault_at(Stage::Data, status::BUS_ERROR);
        let mut buf = [0u8; 2];
        let result = master(&mut sim).i2c_read(0x26, &mut buf);
        assert_eq!(result, Err(Error::DataNotReceived(0x00)));
        assert_eq!(result.unwrap_err().code(), 0x08);
        assert_eq!(sim.resets(), 1);
        assert_eq!(sim.stops(), 0);
    }

    #[test]
    fn empty_read_is_refused_before_start() {
        let mut sim = SimulatedTwi::with_devices(&[0x26]);
        let mut twi = master(&mut sim);
        assert_eq!(twi.i2c_read(0x26, &mut []), Err(Error::EmptyRead));
        assert_eq!(twi.i2c_write_read(0x26, &[0x01], &mut []), Err(Error::EmptyRead));
        drop(twi);
        assert_eq!(sim.starts(), 0);
        assert!(sim.written().is_empty());
    }
}
