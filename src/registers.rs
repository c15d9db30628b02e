//! Register map and bit arithmetic shared by the blocking and async drivers.

use crate::{DriveMode, Measurement};

/// Status register. Bit 0 is the error flag, bit 3 is data-ready.
pub const STATUS: u8 = 0x00;
/// Measurement mode register. Bits [6:4] are the drive mode, bit 3 enables
/// the data-ready interrupt.
pub const MEAS_MODE: u8 = 0x01;
/// First register of the algorithm result block.
pub const ALG_RESULT_DATA: u8 = 0x02;
/// Length of the algorithm result block.
pub const ALG_RESULT_LEN: usize = 8;

/// Application start command, sent as a bare byte.
pub const APP_START: u8 = 0xF4;
/// Milliseconds the firmware needs after `APP_START` before register access.
pub const APP_START_WAIT_MS: u32 = 1;

/// Magic reset sequence, written without a register prefix.
pub const SW_RESET_SEQUENCE: [u8; 5] = [0xFF, 0x11, 0xE5, 0x72, 0x8A];

pub const STATUS_ERROR: u8 = 1 << 0;
pub const STATUS_DATA_READY: u8 = 1 << 3;

pub const MODE_INT_DATARDY: u8 = 1 << 3;
/// Bits of the mode register that survive a drive mode change
/// (interrupt enable and threshold interrupt).
pub const MODE_PRESERVE_MASK: u8 = 0x0C;
pub const MODE_DRIVE_MASK: u8 = 0x70;

/// Mode register value after switching to `mode`, keeping only the
/// interrupt configuration bits of `current`.
#[inline]
pub fn with_drive_mode(current: u8, mode: DriveMode) -> u8 {
    (current & MODE_PRESERVE_MASK) | mode.code()
}

#[inline]
pub fn with_interrupt(current: u8, enabled: bool) -> u8 {
    if enabled {
        current | MODE_INT_DATARDY
    } else {
        current & !MODE_INT_DATARDY
    }
}

/// Decodes the result block. Bytes 4..8 (status, error id, raw data) are
/// not used.
#[inline]
pub fn decode_results(buf: &[u8; ALG_RESULT_LEN]) -> Measurement {
    Measurement {
        co2_ppm: u16::from_be_bytes([buf[0], buf[1]]),
        tvoc_ppb: u16::from_be_bytes([buf[2], buf[3]]),
    }
}
