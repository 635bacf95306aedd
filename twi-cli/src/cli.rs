use crate::i2c::{BusSpeed, I2cCommand};
use crate::util;

use clap::Parser;

/// CLI for the AVR TWI bus master
///
/// This drives the TWI master driver against a simulated bus, so scans and
/// transfers can be tried out without hardware. Place targets on the bus with
/// repeated --device options.
///
/// Only 7-bit I2C addresses are supported. Writes, reads and scans behave as
/// they would on an ATmega328P: each hardware wait gives up after the timeout,
/// and a failed transaction resets the peripheral instead of sending STOP.
#[derive(Debug, Parser)]
#[command(version, about)]
pub(crate) struct Cli {
    /// Address of a simulated target, in hexadecimal (repeatable)
    #[arg(short, long = "device", value_parser = util::u8_from_hex)]
    pub(crate) devices: Vec<u8>,
    /// CPU clock in Hz
    #[arg(long, default_value_t = 16_000_000)]
    pub(crate) cpu_hz: u32,
    /// I2C bus clock speed
    #[arg(short, long, value_enum, default_value_t = BusSpeed::Standard)]
    pub(crate) speed: BusSpeed,
    /// Timeout for each hardware wait, in milliseconds
    #[arg(short, long, default_value_t = 1)]
    pub(crate) timeout_ms: u32,
    #[command(subcommand)]
    pub(crate) command: I2cCommand,
}
