use crate::i2c::Stage;

/// Wrapper for problems when driving the TWI peripheral.
///
/// Each failure of the master-transmitter sequence has a one-byte diagnostic code,
/// available through [`Error::code`], suitable for blinking out on an LED or
/// printing over a serial port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The START (or repeated START) condition was not transmitted.
    ///
    /// The enclosed `u8` is the TWSR status code (prescaler bits masked off) read
    /// in place of 0x08 or 0x10.
    StartNotTransmitted(u8),
    /// The addressed target did not acknowledge SLA+W or SLA+R.
    ///
    /// This is the normal outcome of probing an address with no device behind it.
    /// The enclosed `u8` is the TWSR status code, 0x20 (write) or 0x48 (read).
    AddressNotAcknowledged(u8),
    /// A data byte written to the target was not acknowledged (status 0x30).
    DataNotAcknowledged(u8),
    /// The hardware reported something other than ACK or NACK after SLA+R/W or
    /// a data byte, such as lost arbitration (0x38) or a bus error (0x00).
    ///
    /// Shares the diagnostic code of the NACK for the same stage.
    UnexpectedStatus {
        /// Step that was in progress.
        stage: Stage,
        /// TWSR status code with the prescaler bits masked off.
        status: u8,
    },
    /// A data byte could not be read from the target.
    ///
    /// The enclosed `u8` is the TWSR status code read in place of 0x50 or 0x58.
    DataNotReceived(u8),
    /// The hardware did not finish the given stage within the configured timeout.
    ///
    /// Without this the driver would spin forever on TWINT, for example when the bus
    /// lines are held low or no pull-ups are fitted.
    Timeout(Stage),
    /// Attempt to address a target outside the 7-bit range `0..=0x7F`.
    InvalidAddress(u8),
    /// A read phase with no bytes to receive.
    ///
    /// After SLA+R is acknowledged the master must clock at least one byte, so a
    /// read of zero bytes is refused before START.
    EmptyRead,
    /// The requested bus clock is too fast for the CPU clock.
    ///
    /// The TWI needs at least 16 CPU cycles per SCL period.
    BitRateTooHigh,
    /// The requested bus clock is too slow to be reached with TWBR and the largest
    /// prescaler (64).
    BitRateTooLow,
}

impl Error {
    /// Numeric diagnostic code for this error.
    ///
    /// | Code | Meaning                      |
    /// |------|------------------------------|
    /// | 0x01 | START not transmitted        |
    /// | 0x02 | address not acknowledged     |
    /// | 0x03 | data not acknowledged        |
    /// | 0x04 | START timed out              |
    /// | 0x05 | address timed out            |
    /// | 0x06 | data timed out               |
    /// | 0x07 | STOP timed out               |
    ///
    /// Errors which never reach the bus (configuration or argument errors) and
    /// master-receiver errors have codes above these.
    pub fn code(&self) -> u8 {
        match self {
            Error::StartNotTransmitted(_) => 0x01,
            Error::AddressNotAcknowledged(_) => 0x02,
            Error::DataNotAcknowledged(_) => 0x03,
            Error::UnexpectedStatus { stage, .. } => match stage {
                Stage::Start => 0x01,
                Stage::Address => 0x02,
                Stage::Data => 0x03,
                Stage::Stop => 0x07,
            },
            Error::Timeout(Stage::Start) => 0x04,
            Error::Timeout(Stage::Address) => 0x05,
            Error::Timeout(Stage::Data) => 0x06,
            Error::Timeout(Stage::Stop) => 0x07,
            Error::DataNotReceived(_) => 0x08,
            Error::InvalidAddress(_) => 0x10,
            Error::BitRateTooHigh => 0x11,
            Error::BitRateTooLow => 0x12,
            Error::EmptyRead => 0x13,
        }
    }

    /// TWSR status code that caused this error, if it came from the bus.
    pub fn status(&self) -> Option<u8> {
        match self {
            Error::StartNotTransmitted(s)
            | Error::AddressNotAcknowledged(s)
            | Error::DataNotAcknowledged(s)
            | Error::DataNotReceived(s)
            | Error::UnexpectedStatus { status: s, .. } => Some(*s),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::StartNotTransmitted(s) => write!(f, "START not transmitted (status {s:#04X})"),
            Error::AddressNotAcknowledged(s) => {
                write!(f, "address not acknowledged (status {s:#04X})")
            }
            Error::DataNotAcknowledged(s) => write!(f, "data not acknowledged (status {s:#04X})"),
            Error::DataNotReceived(s) => write!(f, "data not received (status {s:#04X})"),
            Error::UnexpectedStatus { stage, status } => {
                write!(f, "unexpected status {status:#04X} after {stage}")
            }
            Error::Timeout(stage) => write!(f, "timed out waiting for {stage}"),
            Error::InvalidAddress(a) => write!(f, "{a:#04X} is not a 7-bit address"),
            Error::BitRateTooHigh => f.write_str("bus clock too fast for the CPU clock"),
            Error::BitRateTooLow => f.write_str("bus clock too slow for the TWBR range"),
            Error::EmptyRead => f.write_str("read of zero bytes"),
        }
    }
}

impl core::error::Error for Error {}
