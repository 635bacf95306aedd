//! embedded_hal I2C trait implementations for the TWI master.
use embedded_hal::i2c::{self, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};

use super::TwiMaster;
use crate::Error;
use crate::clock::Millis;
use crate::registers::TwiRegisters;
use crate::status::Status;

impl i2c::Error for Error {
    fn kind(&self) -> i2c::ErrorKind {
        match self {
            Error::AddressNotAcknowledged(_) => {
                i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            Error::DataNotAcknowledged(_) => {
                i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
            }
            _ => match self.status().map(Status::from_twsr) {
                Some(s) if s.is_arbitration_lost() => i2c::ErrorKind::ArbitrationLoss,
                Some(s) if s.is_bus_error() => i2c::ErrorKind::Bus,
                _ => i2c::ErrorKind::Other,
            },
        }
    }
}

impl<R: TwiRegisters, C: Millis> i2c::ErrorType for TwiMaster<R, C> {
    type Error = Error;
}

impl<R: TwiRegisters, C: Millis> I2c<SevenBitAddress> for TwiMaster<R, C> {
    /// Execute the provided operations on the I2C bus.
    ///
    /// Consecutive operations in the same direction are merged into one address
    /// phase. Each change of direction issues a repeated START. The last byte read
    /// before a write (or the end of the transaction) is answered with NACK, and the
    /// transaction ends with a STOP condition.
    ///
    /// Unlike some other drivers, an empty `operations` list is not a no-op: it
    /// addresses the target with SLA+W and then issues STOP, which is how
    /// [`TwiMaster::probe`] works. A read of zero bytes fails with
    /// [`Error::EmptyRead`] without touching the bus, as the master can't end a
    /// read phase before clocking in at least one byte.
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run_operations(address, operations)
    }

    fn read(&mut self, address: SevenBitAddress, read: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c_read(address, read)
    }

    fn write(&mut self, address: SevenBitAddress, write: &[u8]) -> Result<(), Self::Error> {
        self.i2c_write(address, write)
    }

    fn write_read(
        &mut self,
        address: SevenBitAddress,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.i2c_write_read(address, write, read)
    }
}

#[cfg(feature = "async")]
mod eh_async {
    use embedded_hal::i2c::{I2c as BlockingI2c, Operation};
    use embedded_hal_async::i2c::I2c as AsyncI2c;

    use crate::TwiMaster;
    use crate::clock::Millis;
    use crate::registers::TwiRegisters;

    /// The TWI is driven by polling, so these complete before returning `Ready`.
    impl<R: TwiRegisters, C: Millis> AsyncI2c for TwiMaster<R, C> {
        async fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            BlockingI2c::transaction(self, address, operations)
        }

        async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
            BlockingI2c::read(self, address, read)
        }

        async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
            BlockingI2c::write(self, address, write)
        }

        async fn write_read(
            &mut self,
            address: u8,
            write: &[u8],
            read: &mut [u8],
        ) -> Result<(), Self::Error> {
            BlockingI2c::write_read(self, address, write, read)
        }
    }
}
