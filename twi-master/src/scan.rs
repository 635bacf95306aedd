//! Probing every address on the bus.
use crate::Error;
use crate::clock::Millis;
use crate::driver::TwiMaster;
use crate::registers::TwiRegisters;

/// A set of 7-bit I2C addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressSet(u128);

impl AddressSet {
    /// The empty set.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Add an address. Addresses above 0x7F are ignored.
    pub fn insert(&mut self, address: u8) {
        if address <= 0x7F {
            self.0 |= 1u128 << address;
        }
    }

    /// Whether the set contains the address.
    pub fn contains(&self, address: u8) -> bool {
        address <= 0x7F && self.0 & (1u128 << address) != 0
    }

    /// Number of addresses in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=0x7Fu8).filter(|&a| self.contains(a))
    }
}

impl FromIterator<u8> for AddressSet {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        let mut set = Self::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}

/// Options for [`TwiMaster::scan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanOptions {
    /// Skip the reserved addresses 0x00..=0x07 and 0x78..=0x7F.
    ///
    /// By default every address is probed, including 0x00, the general call
    /// address.
    pub skip_reserved: bool,
}

impl ScanOptions {
    /// Whether an address is in one of the reserved ranges.
    pub fn is_reserved(address: u8) -> bool {
        matches!(address, 0x00..=0x07 | 0x78..=0x7F)
    }

    fn should_probe(&self, address: u8) -> bool {
        !(self.skip_reserved && Self::is_reserved(address))
    }
}

/// Outcome of a bus scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanReport {
    /// Addresses that acknowledged SLA+W.
    pub acknowledged: AddressSet,
    /// Addresses where probing failed for some reason other than a NACK.
    pub failed: AddressSet,
    /// Addresses that were skipped.
    pub skipped: AddressSet,
    /// The most recent of those failures.
    pub last_failure: Option<Error>,
}

impl<R: TwiRegisters, C: Millis> TwiMaster<R, C> {
    /// Probe every 7-bit address and report which ones answered.
    ///
    /// A failure at one address (a timeout, say) is recorded in the report and the
    /// scan carries on with the next address.
    pub fn scan(&mut self, options: ScanOptions) -> ScanReport {
        let mut report = ScanReport::default();
        for address in 0..=0x7Fu8 {
            if !options.should_probe(address) {
                report.skipped.insert(address);
                continue;
            }
            match self.probe(address) {
                Ok(true) => report.acknowledged.insert(address),
                Ok(false) => {}
                Err(e) => {
                    report.failed.insert(address);
                    report.last_failure = Some(e);
                }
            }
        }
        report
    }
}
