//! Decoded TWI status register.

use bit_field::BitField;

use crate::registers::status;

/// Contents of TWSR.
///
/// # Datasheet
///
/// See the "TWSR – TWI Status Register" description and the status code tables
/// for master transmitter and master receiver mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    /// Status code with the prescaler bits masked off (`TWSR & 0xF8`).
    pub code: u8,
    /// TWPS prescaler bits.
    pub prescaler: u8,
}

impl Status {
    pub(crate) fn from_twsr(twsr: u8) -> Self {
        Self {
            code: twsr & status::MASK,
            prescaler: twsr.get_bits(0..2),
        }
    }

    /// Whether this is the status after a START or repeated START.
    pub fn is_start(&self) -> bool {
        matches!(self.code, status::START | status::REP_START)
    }

    /// Whether arbitration was lost to another master.
    ///
    /// Multi-master operation isn't supported, but a lost arbitration can still be
    /// observed on a noisy bus and is reported as such.
    pub fn is_arbitration_lost(&self) -> bool {
        self.code == status::ARB_LOST
    }

    /// Whether the hardware detected an illegal START or STOP condition.
    pub fn is_bus_error(&self) -> bool {
        self.code == status::BUS_ERROR
    }
}
