use anyhow::Context;
use twi_master::i2c::Config;
use twi_master::sim::SimulatedTwi;
use twi_master::{ScanOptions, ScanReport, TwiMaster};

use crate::cli::Cli;
use crate::util;

#[derive(Debug, clap::Parser)]
pub(crate) enum I2cCommand {
    /// Probe every address and print the ones that answered
    Scan {
        /// Skip the reserved addresses 0x00-0x07 and 0x78-0x7F
        #[arg(long)]
        skip_reserved: bool,
    },
    /// Write bytes to a target
    Write {
        /// 7-bit target address in hexadecimal
        #[arg(value_parser = util::u8_from_hex)]
        address: u8,
        /// Bytes to write, in hexadecimal
        #[arg(value_parser = util::u8_from_hex, required = true)]
        data: Vec<u8>,
    },
    /// Read bytes from a target
    Read {
        /// 7-bit target address in hexadecimal
        #[arg(value_parser = util::u8_from_hex)]
        address: u8,
        /// Number of bytes to read
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        length: u16,
    },
    /// Print the TWBR and TWPS values for the bus speed
    Bitrate,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub(crate) enum BusSpeed {
    /// 400kbps "fast" mode
    Fast,
    /// 100kbps "standard" mode
    Standard,
}

impl From<BusSpeed> for twi_master::i2c::BusSpeed {
    fn from(value: BusSpeed) -> twi_master::i2c::BusSpeed {
        match value {
            BusSpeed::Fast => twi_master::i2c::BusSpeed::Fast_400kbps,
            BusSpeed::Standard => twi_master::i2c::BusSpeed::Standard_100kbps,
        }
    }
}

pub(crate) fn action(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::default()
        .with_cpu_hz(cli.cpu_hz)
        .with_speed(cli.speed.into())
        .with_timeout_ms(cli.timeout_ms);

    if let I2cCommand::Bitrate = cli.command {
        let rate = config.bit_rate().context("Unusable bus speed")?;
        println!("TWBR = {}, TWPS = {}", rate.twbr, rate.twps);
        println!("SCL  = {} Hz", rate.scl_hz(config.cpu_hz));
        return Ok(());
    }

    let bus = SimulatedTwi::with_devices(&cli.devices);
    let started = std::time::Instant::now();
    let millis = move || started.elapsed().as_millis() as u32;
    let mut twi = TwiMaster::new(bus, millis, config).context("Unusable bus speed")?;

    match &cli.command {
        I2cCommand::Scan { skip_reserved } => {
            let report = twi.scan(ScanOptions {
                skip_reserved: *skip_reserved,
            });
            print_scan(&report);
        }
        I2cCommand::Write { address, data } => {
            twi.i2c_write(*address, data)
                .with_context(|| format!("Write to {address:#04X} failed"))?;
            println!("Wrote {} bytes to {address:#04X}", data.len());
        }
        I2cCommand::Read { address, length } => {
            let mut buffer = vec![0u8; *length as usize];
            twi.i2c_read(*address, &mut buffer)
                .with_context(|| format!("Read from {address:#04X} failed"))?;
            println!("{buffer:02X?}");
        }
        I2cCommand::Bitrate => unreachable!("Handled before the bus is created."),
    }
    Ok(())
}

fn print_scan(report: &ScanReport) {
    println!("     _0 _1 _2 _3 _4 _5 _6 _7 _8 _9 _A _B _C _D _E _F");
    for address in 0..128u8 {
        if address % 16 == 0 {
            print!("{:1X}_:  ", address >> 4);
        }
        if report.acknowledged.contains(address) {
            print!("{address:02X} ");
        } else if report.failed.contains(address) {
            print!("!! ");
        } else if report.skipped.contains(address) {
            print!("   ");
        } else {
            print!("-- ");
        }
        if address % 16 == 15 {
            println!();
        }
    }
    if let Some(error) = report.last_failure {
        println!("\nLast failure: {error} (code {:#04X})", error.code());
    }
    println!("{}", TRAILER);
}

const TRAILER: &str = r#"
A two-digit number is an address (in hex) that was acknowledged.
!! marks an address where the bus itself failed (a timeout, say).

00 is the general call address. If it appears, at least one
device on the bus responds to general calls."#;
