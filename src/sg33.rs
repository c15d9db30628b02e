use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::registers;
use crate::{DeviceAddress, DriveMode, Error, Measurement, Status};

/// Blocking SG33 driver.
pub struct Sg33<I2C> {
    i2c: I2C,
    address: DeviceAddress,
    measurement: Measurement,
}

impl<I2C: I2c> Sg33<I2C> {
    /// Creates the driver without touching the bus. Call [`Sg33::init`]
    /// before reading.
    pub fn new(i2c: I2C, address: DeviceAddress) -> Self {
        Self {
            i2c,
            address,
            measurement: Measurement::default(),
        }
    }

    /// Starts the sensor application, disables the data-ready interrupt and
    /// selects one measurement per second.
    ///
    /// A device error flagged at this point is logged but does not stop
    /// initialization; use [`Sg33::check_for_status_error`] to poll it.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error<I2C::Error>> {
        debug!("SG33 init at {:#x}", self.address.addr());
        self.write_byte(registers::APP_START)?;
        delay.delay_ms(registers::APP_START_WAIT_MS);

        if self.check_for_status_error()? {
            warn!("SG33 reports an error after app start");
        }

        self.disable_interrupt()?;
        self.set_drive_mode(DriveMode::Every1s)
    }

    pub fn set_drive_mode(&mut self, mode: DriveMode) -> Result<(), Error<I2C::Error>> {
        let current = self.read_register(registers::MEAS_MODE)?;
        self.write_register(
            registers::MEAS_MODE,
            registers::with_drive_mode(current, mode),
        )?;
        debug!("SG33 drive mode {}", mode);
        Ok(())
    }

    /// Reads the drive mode back from the device.
    pub fn drive_mode(&mut self) -> Result<Option<DriveMode>, Error<I2C::Error>> {
        let value = self.read_register(registers::MEAS_MODE)?;
        Ok(DriveMode::from_mode_register(value))
    }

    pub fn status(&mut self) -> Result<Status, Error<I2C::Error>> {
        Ok(Status(self.read_register(registers::STATUS)?))
    }

    pub fn check_for_status_error(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.status()?.has_error())
    }

    pub fn data_available(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.status()?.data_ready())
    }

    /// Equivalent CO2 in ppm. Returns the previous value if no new sample
    /// is ready.
    pub fn co2(&mut self) -> Result<u16, Error<I2C::Error>> {
        self.refresh()?;
        Ok(self.measurement.co2_ppm)
    }

    /// Total VOC in ppb. Returns the previous value if no new sample is
    /// ready.
    pub fn tvoc(&mut self) -> Result<u16, Error<I2C::Error>> {
        self.refresh()?;
        Ok(self.measurement.tvoc_ppb)
    }

    /// Refreshes once and returns both values.
    pub fn measurement(&mut self) -> Result<Measurement, Error<I2C::Error>> {
        self.refresh()?;
        Ok(self.measurement)
    }

    /// Last decoded values, without bus traffic.
    pub fn last_measurement(&self) -> Measurement {
        self.measurement
    }

    pub fn enable_interrupt(&mut self) -> Result<(), Error<I2C::Error>> {
        self.update_interrupt(true)
    }

    pub fn disable_interrupt(&mut self) -> Result<(), Error<I2C::Error>> {
        self.update_interrupt(false)
    }

    /// Sends the reset sequence. The device returns to boot mode and needs
    /// [`Sg33::init`] again.
    pub fn software_reset(&mut self) -> Result<(), Error<I2C::Error>> {
        info!("SG33 software reset");
        self.write_raw(&registers::SW_RESET_SEQUENCE)
    }

    /// `true` targets [`DeviceAddress::Primary`] (0x5A), `false`
    /// [`DeviceAddress::Secondary`] (0x5B). Nothing is sent to the device.
    pub fn select_address(&mut self, primary: bool) {
        self.set_address(if primary {
            DeviceAddress::Primary
        } else {
            DeviceAddress::Secondary
        });
    }

    pub fn set_address(&mut self, address: DeviceAddress) {
        debug!("SG33 address {:#x}", address.addr());
        self.address = address;
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn refresh(&mut self) -> Result<(), Error<I2C::Error>> {
        if !self.data_available()? {
            trace!("SG33 no new data");
            return Ok(());
        }
        let buf = self.read_block::<{ registers::ALG_RESULT_LEN }>(registers::ALG_RESULT_DATA)?;
        self.measurement = registers::decode_results(&buf);
        debug!(
            "SG33 eCO2 {} ppm, TVOC {} ppb",
            self.measurement.co2_ppm,
            self.measurement.tvoc_ppb
        );
        Ok(())
    }

    fn update_interrupt(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        let current = self.read_register(registers::MEAS_MODE)?;
        self.write_register(
            registers::MEAS_MODE,
            registers::with_interrupt(current, enabled),
        )?;
        trace!("SG33 interrupt enabled: {}", enabled);
        Ok(())
    }

    fn write_byte(&mut self, value: u8) -> Result<(), Error<I2C::Error>> {
        self.write_raw(&[value])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.write_raw(&[register, value])
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(self.address.addr(), bytes)
            .map_err(Error::I2c)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Error<I2C::Error>> {
        let [value] = self.read_block::<1>(register)?;
        Ok(value)
    }

    fn read_block<const N: usize>(&mut self, register: u8) -> Result<[u8; N], Error<I2C::Error>> {
        let mut buf = [0u8; N];
        self.i2c
            .write_read(self.address.addr(), &[register], &mut buf)
            .map_err(Error::I2c)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    const ADDR: u8 = 0x5A;
    const ALT: u8 = 0x5B;

    fn sensor(expectations: &[Transaction]) -> Sg33<I2cMock> {
        Sg33::new(I2cMock::new(expectations), DeviceAddress::Primary)
    }

    fn finish(sensor: Sg33<I2cMock>) {
        let mut mock = sensor.release();
        mock.done();
    }

    #[test]
    fn new_does_not_touch_the_bus() {
        let sensor = sensor(&[]);
        assert_eq!(sensor.last_measurement(), Measurement::default());
        finish(sensor);
    }

    #[test]
    fn init_sequence() {
        let expectations = [
            Transaction::write(ADDR, vec![0xF4]),
            Transaction::write_read(ADDR, vec![0x00], vec![0x90]),
            Transaction::write_read(ADDR, vec![0x01], vec![0x0C]),
            Transaction::write(ADDR, vec![0x01, 0x04]),
            Transaction::write_read(ADDR, vec![0x01], vec![0x04]),
            Transaction::write(ADDR, vec![0x01, 0x14]),
        ];
        let mut sensor = sensor(&expectations);
        sensor.init(&mut NoopDelay::new()).unwrap();
        finish(sensor);
    }

    #[test]
    fn init_continues_past_device_error() {
        let expectations = [
            Transaction::write(ADDR, vec![0xF4]),
            Transaction::write_read(ADDR, vec![0x00], vec![0x01]),
            Transaction::write_read(ADDR, vec![0x01], vec![0x00]),
            Transaction::write(ADDR, vec![0x01, 0x00]),
            Transaction::write_read(ADDR, vec![0x01], vec![0x00]),
            Transaction::write(ADDR, vec![0x01, 0x10]),
        ];
        let mut sensor = sensor(&expectations);
        assert!(sensor.init(&mut NoopDelay::new()).is_ok());
        finish(sensor);
    }

    #[test]
    fn init_stops_on_bus_failure() {
        let expectations = [Transaction::write(ADDR, vec![0xF4]).with_error(ErrorKind::Other)];
        let mut sensor = sensor(&expectations);
        assert_eq!(
            sensor.init(&mut NoopDelay::new()),
            Err(Error::I2c(ErrorKind::Other))
        );
        finish(sensor);
    }

    #[test]
    fn set_drive_mode_for_every_mode() {
        let modes = [
            (DriveMode::Idle, 0x0C),
            (DriveMode::Every1s, 0x1C),
            (DriveMode::Every10s, 0x2C),
            (DriveMode::Every60s, 0x3C),
            (DriveMode::Every250ms, 0x4C),
        ];
        for (mode, expected) in modes {
            // previous mode, reserved bits and bit 7 are all dropped
            let expectations = [
                Transaction::write_read(ADDR, vec![0x01], vec![0xFF]),
                Transaction::write(ADDR, vec![0x01, expected]),
                Transaction::write_read(ADDR, vec![0x01], vec![expected]),
            ];
            let mut sensor = sensor(&expectations);
            sensor.set_drive_mode(mode).unwrap();
            assert_eq!(sensor.drive_mode().unwrap(), Some(mode));
            finish(sensor);
        }
    }

    #[test]
    fn interrupt_round_trip_restores_mode_register() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0x01], vec![0x10]),
            Transaction::write(ADDR, vec![0x01, 0x18]),
            Transaction::write_read(ADDR, vec![0x01], vec![0x18]),
            Transaction::write(ADDR, vec![0x01, 0x10]),
        ];
        let mut sensor = sensor(&expectations);
        sensor.enable_interrupt().unwrap();
        sensor.disable_interrupt().unwrap();
        finish(sensor);
    }

    #[test]
    fn check_for_status_error_every_status_value() {
        let expectations: Vec<_> = (0..=u8::MAX)
            .map(|status| Transaction::write_read(ADDR, vec![0x00], vec![status]))
            .collect();
        let mut sensor = sensor(&expectations);
        for status in 0..=u8::MAX {
            assert_eq!(sensor.check_for_status_error().unwrap(), status & 1 == 1);
        }
        finish(sensor);
    }

    #[test]
    fn data_available_reads_bit3() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0x00], vec![0x98]),
            Transaction::write_read(ADDR, vec![0x00], vec![0x91]),
        ];
        let mut sensor = sensor(&expectations);
        assert!(sensor.data_available().unwrap());
        assert!(!sensor.data_available().unwrap());
        finish(sensor);
    }

    #[test]
    fn read_decodes_result_block() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0x00], vec![0x98]),
            Transaction::write_read(
                ADDR,
                vec![0x02],
                vec![0x01, 0x2C, 0x00, 0x96, 0, 0, 0, 0],
            ),
            Transaction::write_read(ADDR, vec![0x00], vec![0x90]),
        ];
        let mut sensor = sensor(&expectations);
        assert_eq!(sensor.co2().unwrap(), 300);
        // no new data, cached value is kept
        assert_eq!(sensor.tvoc().unwrap(), 150);
        finish(sensor);
    }

    #[test]
    fn stale_read_keeps_previous_pair() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0x00], vec![0x00]),
            Transaction::write_read(ADDR, vec![0x00], vec![0x00]),
        ];
        let mut sensor = sensor(&expectations);
        sensor.measurement = Measurement {
            co2_ppm: 100,
            tvoc_ppb: 200,
        };
        assert_eq!(sensor.co2().unwrap(), 100);
        assert_eq!(sensor.tvoc().unwrap(), 200);
        assert_eq!(
            sensor.last_measurement(),
            Measurement {
                co2_ppm: 100,
                tvoc_ppb: 200
            }
        );
        finish(sensor);
    }

    #[test]
    fn failed_block_read_leaves_measurement_untouched() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0x00], vec![0x08]),
            Transaction::write_read(ADDR, vec![0x02], vec![0; 8]).with_error(ErrorKind::Other),
        ];
        let mut sensor = sensor(&expectations);
        sensor.measurement = Measurement {
            co2_ppm: 400,
            tvoc_ppb: 7,
        };
        assert_eq!(sensor.measurement(), Err(Error::I2c(ErrorKind::Other)));
        assert_eq!(sensor.last_measurement().co2_ppm, 400);
        assert_eq!(sensor.last_measurement().tvoc_ppb, 7);
        finish(sensor);
    }

    #[test]
    fn software_reset_sends_magic_sequence() {
        let expectations = [
            Transaction::write(ADDR, vec![0xFF, 0x11, 0xE5, 0x72, 0x8A]),
            Transaction::write(ALT, vec![0xFF, 0x11, 0xE5, 0x72, 0x8A]),
        ];
        let mut sensor = sensor(&expectations);
        sensor.software_reset().unwrap();
        sensor.measurement = Measurement {
            co2_ppm: 1,
            tvoc_ppb: 2,
        };
        sensor.select_address(false);
        sensor.software_reset().unwrap();
        finish(sensor);
    }

    #[test]
    fn select_address_true_targets_primary() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0x00], vec![0x00]),
            Transaction::write_read(ALT, vec![0x00], vec![0x00]),
        ];
        let mut sensor = sensor(&expectations);
        sensor.select_address(true);
        assert_eq!(sensor.address(), DeviceAddress::Primary);
        assert!(!sensor.check_for_status_error().unwrap());
        sensor.select_address(false);
        assert_eq!(sensor.address(), DeviceAddress::Secondary);
        assert!(!sensor.check_for_status_error().unwrap());
        assert_eq!(sensor.last_measurement(), Measurement::default());
        finish(sensor);
    }
}
