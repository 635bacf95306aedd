//! Bus configuration and bit-rate arithmetic.
use crate::Error;

/// Step of the master transaction sequence.
///
/// Used to report which step timed out or ended with an unexpected status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// START (or repeated START) condition.
    Start,
    /// SLA+W or SLA+R.
    Address,
    /// Data byte, transmitted or received.
    Data,
    /// STOP condition.
    Stop,
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Stage::Start => "START",
            Stage::Address => "address",
            Stage::Data => "data",
            Stage::Stop => "STOP",
        })
    }
}

/// SCL clock frequency.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusSpeed {
    /// I2C bus speed of 100kbps ("Standard-mode")
    Standard_100kbps,
    /// I2C bus speed of 400kbps ("Fast-mode")
    Fast_400kbps,
    /// Any other SCL frequency, in Hz.
    Custom(u32),
}

impl BusSpeed {
    /// SCL frequency in Hz.
    pub fn hz(&self) -> u32 {
        match self {
            BusSpeed::Standard_100kbps => 100_000,
            BusSpeed::Fast_400kbps => 400_000,
            BusSpeed::Custom(hz) => *hz,
        }
    }
}

/// Values for TWBR and the TWPS prescaler bits of TWSR.
///
/// The SCL frequency produced by the TWI is
///
/// ```text
/// SCL = CPU / (16 + 2 * TWBR * 4^TWPS)
/// ```
///
/// See the "Bit Rate Generator Unit" section of the datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitRate {
    /// Value for TWBR.
    pub twbr: u8,
    /// Value for the TWPS bits (0..=3, dividing by 1, 4, 16 or 64).
    pub twps: u8,
}

impl BitRate {
    /// Compute the register values for the given CPU and bus clocks.
    ///
    /// The smallest prescaler which lets TWBR fit in a byte is used, since it gives
    /// the finest resolution.
    ///
    /// ```
    /// use twi_master::i2c::BitRate;
    ///
    /// let rate = BitRate::for_bus(16_000_000, 100_000).unwrap();
    /// assert_eq!((rate.twbr, rate.twps), (72, 0));
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::BitRateTooHigh`] if the bus clock needs fewer than 16 CPU cycles per
    /// period (or either clock is zero), [`Error::BitRateTooLow`] if TWBR overflows
    /// even with the largest prescaler.
    pub fn for_bus(cpu_hz: u32, bus_hz: u32) -> Result<Self, Error> {
        if cpu_hz == 0 || bus_hz == 0 {
            return Err(Error::BitRateTooHigh);
        }
        let cycles = cpu_hz / bus_hz;
        let Some(spare) = cycles.checked_sub(16) else {
            return Err(Error::BitRateTooHigh);
        };
        for twps in 0..=3u8 {
            let divider = 2 * 4u32.pow(twps as u32);
            if let Ok(twbr) = u8::try_from(spare / divider) {
                return Ok(Self { twbr, twps });
            }
        }
        Err(Error::BitRateTooLow)
    }

    /// SCL frequency these register values produce.
    pub fn scl_hz(&self, cpu_hz: u32) -> u32 {
        let prescaler = 4u32.pow(self.twps as u32);
        cpu_hz / (16 + 2 * self.twbr as u32 * prescaler)
    }
}

/// Driver configuration.
///
/// The defaults match an Arduino Uno: a 16 MHz CPU clock, a 100 kHz bus, a 1 ms
/// timeout on every hardware wait, and the internal pull-ups enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// CPU clock in Hz (`F_CPU`).
    pub cpu_hz: u32,
    /// SCL clock.
    pub speed: BusSpeed,
    /// How long to wait on the hardware before giving up, in milliseconds.
    ///
    /// A wait only fails once strictly more than this many milliseconds have
    /// elapsed, so with a 1 ms counter the real limit lies between 1 and 2 ms.
    pub timeout_ms: u32,
    /// Enable the internal pull-ups on SDA and SCL during initialisation.
    pub pullups: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cpu_hz: 16_000_000,
            speed: BusSpeed::Standard_100kbps,
            timeout_ms: 1,
            pullups: true,
        }
    }
}

impl Config {
    /// Set the CPU clock.
    pub fn with_cpu_hz(mut self, cpu_hz: u32) -> Self {
        self.cpu_hz = cpu_hz;
        self
    }

    /// Set the bus speed.
    pub fn with_speed(mut self, speed: BusSpeed) -> Self {
        self.speed = speed;
        self
    }

    /// Set the hardware wait timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Enable or disable the internal pull-ups.
    pub fn with_pullups(mut self, pullups: bool) -> Self {
        self.pullups = pullups;
        self
    }

    /// Register values for this configuration.
    pub fn bit_rate(&self) -> Result<BitRate, Error> {
        BitRate::for_bus(self.cpu_hz, self.speed.hz())
    }
}

/// Helpers for converting 7-bit addresses into the byte sent after START.
pub(crate) trait I2cAddressing {
    /// SLA+W: address in the upper seven bits, R/W bit clear.
    fn into_write_address(self) -> u8;
    /// SLA+R: address in the upper seven bits, R/W bit set.
    fn into_read_address(self) -> u8;
}

impl I2cAddressing for u8 {
    fn into_write_address(self) -> u8 {
        self << 1
    }

    fn into_read_address(self) -> u8 {
        (self << 1) | 1
    }
}
