#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

mod clock;
mod driver;
mod error;
pub mod i2c;
pub mod registers;
pub mod scan;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod status;

pub use clock::Millis;
pub use driver::TwiMaster;
pub use error::Error;
pub use scan::{AddressSet, ScanOptions, ScanReport};
