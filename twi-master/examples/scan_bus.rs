//! # I2C bus-scanning example
//!
//! This attempts to find out which devices are connected to the I2C bus
//! by sending each possible address as if it were the start of a write,
//! and then ending the write without having written anything.
//!
//! (I2C addresses are the upper 7 bits of a byte, and the lowest bit of
//! the byte is the Read/_Write (not-write) bit, 1 for reads and 0 for
//! writes.)
//!
//! The bus here is simulated, with targets at 0x26 and 0x68. On an AVR the
//! same code runs against `registers::Atmega` and the `millis()` counter.
use twi_master::i2c::Config;
use twi_master::sim::SimulatedTwi;
use twi_master::{ScanOptions, TwiMaster};

fn main() -> Result<(), twi_master::Error> {
    let mut now = 0u32;
    let millis = move || {
        now = now.wrapping_add(1);
        now
    };
    let bus = SimulatedTwi::with_devices(&[0x26, 0x68]);
    let mut twi = TwiMaster::new(bus, millis, Config::default())?;

    println!("Scanning the I2C bus...\n");
    let report = twi.scan(ScanOptions::default());
    for address in 0..128u8 {
        if start_line(address) {
            print!("{address:02X}:  ");
        }
        if report.acknowledged.contains(address) {
            print!("{address:02X} ");
        } else if report.failed.contains(address) {
            print!("!! ");
        } else {
            print!("-- ")
        }
        if end_line(address) {
            println!();
        }
    }
    if let Some(error) = report.last_failure {
        println!("\nLast failure: {error} (code {:#04X})", error.code());
    }

    Ok(())
}

fn start_line(n: u8) -> bool {
    n % 16 == 0
}

fn end_line(n: u8) -> bool {
    n % 16 == 15
}
