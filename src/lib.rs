#![cfg_attr(not(test), no_std)]

//! Driver for the XinaBox SG33 air quality sensor (AMS CCS811).
//!
//! The sensor reports an equivalent CO2 level in ppm and a total VOC level
//! in ppb. Readings are pulled on access: every call to [`Sg33::co2`] or
//! [`Sg33::tvoc`] checks the data-ready flag and, if set, reads the result
//! block. When no new sample is ready the last known value is returned.
//!
//! [`Sg33`] works on any blocking `embedded-hal` I2C bus, [`Sg33Async`] on
//! an `embedded-hal-async` bus such as the Embassy HALs provide.

#[macro_use]
mod fmt;

mod registers;
mod sg33;
mod sg33_async;

pub use sg33::Sg33;
pub use sg33_async::Sg33Async;

/// I2C address of the sensor, selected by the ADDR pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceAddress {
    /// ADDR pin low.
    #[default]
    Primary = 0x5A,
    /// ADDR pin high.
    Secondary = 0x5B,
}

impl DeviceAddress {
    pub fn addr(self) -> u8 {
        self as u8
    }
}

/// Measurement cadence, bits [6:4] of the mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DriveMode {
    /// No measurements, lowest power.
    Idle = 0x00,
    Every1s = 0x10,
    Every10s = 0x20,
    Every60s = 0x30,
    /// Raw data only on the CCS811; the algorithm results are not updated.
    Every250ms = 0x40,
}

impl DriveMode {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decodes the drive mode bits of a mode register value.
    /// Returns `None` for the reserved codes.
    pub fn from_mode_register(value: u8) -> Option<Self> {
        match value & registers::MODE_DRIVE_MASK {
            0x00 => Some(DriveMode::Idle),
            0x10 => Some(DriveMode::Every1s),
            0x20 => Some(DriveMode::Every10s),
            0x30 => Some(DriveMode::Every60s),
            0x40 => Some(DriveMode::Every250ms),
            _ => None,
        }
    }
}

/// Last decoded reading. Both values always come from the same result block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Equivalent CO2 in ppm.
    pub co2_ppm: u16,
    /// Total volatile organic compounds in ppb.
    pub tvoc_ppb: u16,
}

/// Raw value of the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status(pub u8);

impl Status {
    /// The device has flagged an error (bit 0).
    pub fn has_error(&self) -> bool {
        self.0 & registers::STATUS_ERROR != 0
    }

    /// A new sample is waiting in the result block (bit 3).
    pub fn data_ready(&self) -> bool {
        self.0 & registers::STATUS_DATA_READY != 0
    }
}

/// Errors returned by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The I2C transaction failed. Never retried by the driver.
    I2c(E),
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
        }
    }
}
