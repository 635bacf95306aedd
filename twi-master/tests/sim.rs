//! Test the embedded-hal implementation against the simulated TWI.
//!
//! The simulated targets acknowledge every write and answer reads with the
//! sequence 0, 1, 2, ... starting again after every SLA+R.
use twi_master::i2c::{Config, Stage};
use twi_master::registers::status;
use twi_master::sim::SimulatedTwi;
use twi_master::{Error, TwiMaster};

use embedded_hal::i2c::{self, ErrorKind, I2c, NoAcknowledgeSource, Operation};

const ADDRESS: u8 = 0x26;

/// Millisecond counter that advances by one on every call.
fn ticking() -> impl FnMut() -> u32 {
    let mut now = 0u32;
    move || {
        now = now.wrapping_add(1);
        now
    }
}

fn open(sim: &mut SimulatedTwi) -> TwiMaster<&mut SimulatedTwi, impl FnMut() -> u32> {
    TwiMaster::new(sim, ticking(), Config::default()).expect("default config is valid")
}

/// Initialisation programs the bit rate and enables the pull-ups.
#[test]
fn init_programs_peripheral() {
    let mut sim = SimulatedTwi::with_devices(&[]);
    drop(open(&mut sim));
    assert_eq!(sim.twbr(), 72);
    assert!(sim.pullups_enabled());
}

/// An impossible bus speed is refused before touching the hardware.
#[test]
fn init_rejects_bad_speed() {
    let mut sim = SimulatedTwi::with_devices(&[]);
    let config = Config::default().with_cpu_hz(1_000_000);
    let result = TwiMaster::new(&mut sim, ticking(), config);
    assert!(matches!(result, Err(Error::BitRateTooHigh)));
    assert!(!sim.pullups_enabled());
}

/// Reads 10 sequential bytes.
#[test]
fn eh_i2c_read() -> Result<(), Error> {
    let mut sim = SimulatedTwi::with_devices(&[ADDRESS]);
    let mut device = open(&mut sim);
    let mut buf = [0u8; 10];
    device.read(ADDRESS, &mut buf)?;
    assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    Ok(())
}

/// Reads 10 sequential bytes into 2 buffers in one address phase.
#[test]
fn eh_i2c_read_transaction() -> Result<(), Error> {
    let mut sim = SimulatedTwi::with_devices(&[ADDRESS]);
    let mut device = open(&mut sim);
    let mut buf_1 = [0u8; 5];
    let mut buf_2 = [0u8; 5];
    device.transaction(
        ADDRESS,
        &mut [Operation::Read(&mut buf_1), Operation::Read(&mut buf_2)],
    )?;
    assert_eq!(buf_1, [0, 1, 2, 3, 4]);
    assert_eq!(buf_2, [5, 6, 7, 8, 9]);
    drop(device);
    assert_eq!(sim.starts(), 1);
    assert_eq!(sim.nacks_sent(), 1);
    Ok(())
}

/// Writes [0x20, 0x0A], then reads with a repeated START.
#[test]
fn eh_i2c_writeread() -> Result<(), Error> {
    let mut sim = SimulatedTwi::with_devices(&[ADDRESS]);
    let mut device = open(&mut sim);
    let mut buf = [0u8; 3];
    device.write_read(ADDRESS, &[0x20, 10], &mut buf)?;
    assert_eq!(buf, [0, 1, 2]);
    drop(device);
    assert_eq!(sim.written(), &[(ADDRESS, 0x20), (ADDRESS, 10)]);
    assert_eq!(sim.repeated_starts(), 1);
    assert_eq!(sim.stops(), 1);
    Ok(())
}

/// Write, read, write: two changes of direction, two repeated STARTs.
#[test]
fn eh_i2c_mixed_transaction() -> Result<(), Error> {
    let mut sim = SimulatedTwi::with_devices(&[ADDRESS]);
    let mut device = open(&mut sim);
    let mut buf = [0u8; 2];
    device.transaction(
        ADDRESS,
        &mut [
            Operation::Write(&[0x30]),
            Operation::Read(&mut buf),
            Operation::Write(&[0x40, 0x41]),
        ],
    )?;
    assert_eq!(buf, [0, 1]);
    drop(device);
    assert_eq!(sim.repeated_starts(), 2);
    assert_eq!(sim.nacks_sent(), 1);
    assert_eq!(
        sim.written(),
        &[(ADDRESS, 0x30), (ADDRESS, 0x40), (ADDRESS, 0x41)]
    );
    Ok(())
}

/// Writes 6 bytes from three buffers in one address phase.
#[test]
fn eh_i2c_write_transaction() -> Result<(), Error> {
    let mut sim = SimulatedTwi::with_devices(&[ADDRESS]);
    let mut device = open(&mut sim);
    device.transaction(
        ADDRESS,
        &mut [
            Operation::Write(&[0x40, 0x41]),
            Operation::Write(&[0x50, 0x51]),
            Operation::Write(&[0x60, 0x61]),
        ],
    )?;
    drop(device);
    assert_eq!(sim.starts(), 1);
    assert_eq!(sim.written().len(), 6);
    Ok(())
}

/// A missing target is reported as an address NACK.
#[test]
fn eh_i2c_missing_target() {
    let mut sim = SimulatedTwi::with_devices(&[]);
    let mut device = open(&mut sim);
    let error = device.write(ADDRESS, &[1]).unwrap_err();
    assert_eq!(
        i2c::Error::kind(&error),
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    );
    assert_eq!(error.code(), 0x02);
}

/// A target refusing data is reported as a data NACK.
#[test]
fn eh_i2c_data_nack() {
    let mut sim = SimulatedTwi::with_devices(&[ADDRESS]).nack_data_after(2);
    let mut device = open(&mut sim);
    let error = device.write(ADDRESS, &[1, 2, 3]).unwrap_err();
    assert_eq!(
        i2c::Error::kind(&error),
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
    );
}

/// Lost arbitration during the address phase is not mistaken for a NACK.
#[test]
fn eh_i2c_arbitration_lost() {
    let mut sim =
        SimulatedTwi::with_devices(&[ADDRESS]).fault_at(Stage::Address, status::ARB_LOST);
    let mut device = open(&mut sim);
    let error = device.write(ADDRESS, &[1]).unwrap_err();
    assert_eq!(i2c::Error::kind(&error), ErrorKind::ArbitrationLoss);
    assert_eq!(error.code(), 0x02);
    assert!(device.probe(ADDRESS).is_err());
}

/// A bus error while reading is reported as such.
#[test]
fn eh_i2c_read_bus_error() {
    let mut sim =
        SimulatedTwi::with_devices(&[ADDRESS]).fault_at(Stage::Data, status::BUS_ERROR);
    let mut device = open(&mut sim);
    let mut buf = [0u8; 4];
    let error = device.read(ADDRESS, &mut buf).unwrap_err();
    assert_eq!(error, Error::DataNotReceived(0x00));
    assert_eq!(i2c::Error::kind(&error), ErrorKind::Bus);
}

/// A read phase of zero bytes is refused without touching the bus.
#[test]
fn eh_i2c_empty_read() {
    let mut sim = SimulatedTwi::with_devices(&[ADDRESS]);
    let mut device = open(&mut sim);
    let mut empty = [0u8; 0];
    let mut buf = [0u8; 2];
    let result = device.transaction(
        ADDRESS,
        &mut [Operation::Write(&[0x10]), Operation::Read(&mut empty)],
    );
    assert_eq!(result, Err(Error::EmptyRead));
    // An empty buffer next to a non-empty one is fine.
    device
        .transaction(ADDRESS, &mut [Operation::Read(&mut empty), Operation::Read(&mut buf)])
        .unwrap();
    assert_eq!(buf, [0, 1]);
    drop(device);
    assert_eq!(sim.starts(), 1);
}

/// A START which completes with the wrong status latches code 0x01; the later
/// steps are skipped and STOP resets the peripheral.
#[test]
fn manual_steps_after_start_fault() {
    let mut sim =
        SimulatedTwi::with_devices(&[ADDRESS]).fault_at(Stage::Start, status::BUS_ERROR);
    let mut device = open(&mut sim);
    let fault = Error::StartNotTransmitted(0x00);
    assert_eq!(device.start(), Err(fault));
    assert_eq!(fault.code(), 0x01);
    assert_eq!(device.write_address(ADDRESS), Err(fault));
    assert_eq!(device.write_data(0xAA), Err(fault));
    assert_eq!(device.stop(), Ok(()));
    assert_eq!(device.pending_error(), None);
    assert_eq!(device.last_error(), Some(fault));
    drop(device);
    assert!(sim.written().is_empty());
    assert_eq!(sim.stops(), 0);
    assert_eq!(sim.resets(), 1);
}

/// A STOP that never completes times out and resets the peripheral.
#[test]
fn stop_timeout() {
    let mut sim = SimulatedTwi::with_devices(&[ADDRESS]).hang_at(Stage::Stop);
    let mut device = open(&mut sim);
    assert_eq!(device.write(ADDRESS, &[1]), Err(Error::Timeout(Stage::Stop)));
    assert_eq!(device.last_error(), Some(Error::Timeout(Stage::Stop)));
    assert_eq!(device.pending_error(), None);
    drop(device);
    assert_eq!(sim.resets(), 1);
}

/// Driving the steps by hand: after a failure the later steps are skipped and
/// STOP clears the latch.
#[test]
fn manual_steps_latch_first_error() {
    let mut sim = SimulatedTwi::with_devices(&[]);
    let mut device = open(&mut sim);
    device.start().unwrap();
    let nack = Error::AddressNotAcknowledged(0x20);
    assert_eq!(device.write_address(0x50), Err(nack));
    assert_eq!(device.write_data(0xAA), Err(nack));
    assert_eq!(device.pending_error(), Some(nack));
    assert_eq!(device.stop(), Ok(()));
    assert_eq!(device.pending_error(), None);
    assert_eq!(device.last_error(), Some(nack));
    drop(device);
    assert!(sim.written().is_empty());
    assert_eq!(sim.stops(), 0);
    assert_eq!(sim.resets(), 1);
}

/// A clean transaction clears the record of an earlier failure.
#[test]
fn successful_stop_clears_last_error() {
    let mut sim = SimulatedTwi::with_devices(&[ADDRESS]);
    let mut device = open(&mut sim);
    assert_eq!(device.probe(0x27), Ok(false));
    assert!(device.last_error().is_some());
    assert_eq!(device.probe(ADDRESS), Ok(true));
    assert_eq!(device.last_error(), None);
}

/// A START which never completes is reported with its own code.
#[test]
fn start_timeout_code() {
    let mut sim = SimulatedTwi::with_devices(&[ADDRESS]).hang_at(Stage::Start);
    let mut device = open(&mut sim);
    let error = device.probe(ADDRESS).unwrap_err();
    assert_eq!(error, Error::Timeout(Stage::Start));
    assert_eq!(error.code(), 0x04);
}
