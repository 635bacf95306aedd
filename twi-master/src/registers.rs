//! TWI register map, bit positions and status codes.
//!
//! The values here come from the "2-wire Serial Interface" chapter of the
//! ATmega328P datasheet. The ATmega2560 places the TWI registers at the same
//! data-space addresses; only the SDA/SCL port pins differ.

/// TWI registers used by the master driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// TWI Bit Rate Register.
    Twbr,
    /// TWI Status Register (status in bits 7..3, prescaler in bits 1..0).
    Twsr,
    /// TWI Data Register.
    Twdr,
    /// TWI Control Register.
    Twcr,
}

impl Register {
    /// Data-space address of the register.
    pub const fn address(self) -> usize {
        match self {
            Register::Twbr => 0xB8,
            Register::Twsr => 0xB9,
            Register::Twdr => 0xBB,
            Register::Twcr => 0xBC,
        }
    }
}

/// TWCR bit positions.
pub mod twcr {
    /// TWI interrupt flag. Set by hardware when an operation completes, cleared by
    /// writing a one.
    pub const TWINT: usize = 7;
    /// Enable acknowledge.
    pub const TWEA: usize = 6;
    /// START condition.
    pub const TWSTA: usize = 5;
    /// STOP condition. Cleared by hardware once the STOP has been sent.
    pub const TWSTO: usize = 4;
    /// Write collision flag.
    pub const TWWC: usize = 3;
    /// TWI enable.
    pub const TWEN: usize = 2;
    /// TWI interrupt enable.
    pub const TWIE: usize = 0;
}

/// Status codes read from TWSR with the prescaler bits masked off.
pub mod status {
    /// Mask for the status bits of TWSR.
    pub const MASK: u8 = 0xF8;

    /// A START condition has been transmitted.
    pub const START: u8 = 0x08;
    /// A repeated START condition has been transmitted.
    pub const REP_START: u8 = 0x10;
    /// Arbitration lost in SLA+R/W or data bytes.
    pub const ARB_LOST: u8 = 0x38;

    /// Master transmitter: SLA+W transmitted, ACK received.
    pub const MT_SLA_ACK: u8 = 0x18;
    /// Master transmitter: SLA+W transmitted, NACK received.
    pub const MT_SLA_NACK: u8 = 0x20;
    /// Master transmitter: data byte transmitted, ACK received.
    pub const MT_DATA_ACK: u8 = 0x28;
    /// Master transmitter: data byte transmitted, NACK received.
    pub const MT_DATA_NACK: u8 = 0x30;

    /// Master receiver: SLA+R transmitted, ACK received.
    pub const MR_SLA_ACK: u8 = 0x40;
    /// Master receiver: SLA+R transmitted, NACK received.
    pub const MR_SLA_NACK: u8 = 0x48;
    /// Master receiver: data byte received, ACK returned.
    pub const MR_DATA_ACK: u8 = 0x50;
    /// Master receiver: data byte received, NACK returned.
    pub const MR_DATA_NACK: u8 = 0x58;

    /// No relevant state information available, TWINT is not set.
    pub const NO_INFO: u8 = 0xF8;
    /// Bus error due to an illegal START or STOP condition.
    pub const BUS_ERROR: u8 = 0x00;
}

/// Access to the TWI peripheral registers.
///
/// This is the seam between the master state sequence and the hardware. The driver
/// only ever touches the peripheral through this trait, so it can run against the
/// memory-mapped registers of a real AVR ([`Atmega`]) or against a software model
/// (`sim::SimulatedTwi`, with the `sim` feature).
pub trait TwiRegisters {
    /// Read the current value of a register.
    fn read(&mut self, register: Register) -> u8;

    /// Write a value to a register.
    fn write(&mut self, register: Register, value: u8);

    /// Enable the internal pull-up resistors on the SDA and SCL pins.
    ///
    /// The internal pull-ups are weak; an external resistor of a few kΩ on each
    /// line is preferable for anything but short buses.
    fn enable_pullups(&mut self);
}

impl<T: TwiRegisters + ?Sized> TwiRegisters for &mut T {
    fn read(&mut self, register: Register) -> u8 {
        T::read(self, register)
    }

    fn write(&mut self, register: Register, value: u8) {
        T::write(self, register, value)
    }

    fn enable_pullups(&mut self) {
        T::enable_pullups(self)
    }
}

/// Port carrying the SDA/SCL lines, used to enable the internal pull-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pins {
    /// ATmega328P (Arduino Uno): SDA = PC4, SCL = PC5.
    PortC,
    /// ATmega2560 (Arduino Mega): SDA = PD1 (pin 20), SCL = PD0 (pin 21).
    PortD,
}

impl Pins {
    /// Data-space address of the PORTx register.
    const fn port_address(self) -> usize {
        match self {
            Pins::PortC => 0x28,
            Pins::PortD => 0x2B,
        }
    }

    /// Bits to set in PORTx for the SDA and SCL pull-ups.
    const fn pullup_mask(self) -> u8 {
        match self {
            Pins::PortC => (1 << 4) | (1 << 5),
            Pins::PortD => (1 << 0) | (1 << 1),
        }
    }
}

/// Memory-mapped TWI registers of an ATmega328P or ATmega2560.
#[derive(Debug)]
pub struct Atmega {
    pins: Pins,
}

#[allow(unsafe_code)]
impl Atmega {
    /// Take the on-chip TWI peripheral.
    ///
    /// # Safety
    ///
    /// Must only be called on an ATmega328P or ATmega2560 (matching `pins`), and
    /// the caller must ensure nothing else accesses the TWI registers or the SDA/SCL
    /// port while the returned value is alive.
    pub unsafe fn steal(pins: Pins) -> Self {
        Self { pins }
    }
}

#[allow(unsafe_code)]
impl TwiRegisters for Atmega {
    fn read(&mut self, register: Register) -> u8 {
        // SAFETY: register addresses are valid I/O locations on the supported parts
        // and exclusive access is guaranteed by `Atmega::steal`.
        unsafe { core::ptr::read_volatile(register.address() as *const u8) }
    }

    fn write(&mut self, register: Register, value: u8) {
        // SAFETY: as for `read`.
        unsafe { core::ptr::write_volatile(register.address() as *mut u8, value) }
    }

    fn enable_pullups(&mut self) {
        let port = self.pins.port_address() as *mut u8;
        // SAFETY: PORTx is a valid I/O location and the SDA/SCL bits belong to us.
        unsafe {
            let value = core::ptr::read_volatile(port);
            core::ptr::write_volatile(port, value | self.pins.pullup_mask());
        }
    }
}
