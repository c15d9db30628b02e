use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use crate::registers;
use crate::{DeviceAddress, DriveMode, Error, Measurement, Status};

/// Async SG33 driver for `embedded-hal-async` buses.
///
/// Same register protocol as [`crate::Sg33`]; each operation awaits its
/// bus transactions in order and never runs two at once.
pub struct Sg33Async<I2C> {
    i2c: I2C,
    address: DeviceAddress,
    measurement: Measurement,
}

impl<I2C: I2c> Sg33Async<I2C> {
    pub fn new(i2c: I2C, address: DeviceAddress) -> Self {
        Self {
            i2c,
            address,
            measurement: Measurement::default(),
        }
    }

    /// See [`crate::Sg33::init`].
    pub async fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error<I2C::Error>> {
        debug!("SG33 init at {:#x}", self.address.addr());
        self.i2c_write(&[registers::APP_START]).await?;
        delay.delay_ms(registers::APP_START_WAIT_MS).await;

        if self.check_for_status_error().await? {
            warn!("SG33 reports an error after app start");
        }

        self.disable_interrupt().await?;
        self.set_drive_mode(DriveMode::Every1s).await
    }

    pub async fn set_drive_mode(&mut self, mode: DriveMode) -> Result<(), Error<I2C::Error>> {
        let current = self.read_register(registers::MEAS_MODE).await?;
        let value = registers::with_drive_mode(current, mode);
        self.i2c_write(&[registers::MEAS_MODE, value]).await?;
        debug!("SG33 drive mode {}", mode);
        Ok(())
    }

    pub async fn drive_mode(&mut self) -> Result<Option<DriveMode>, Error<I2C::Error>> {
        let value = self.read_register(registers::MEAS_MODE).await?;
        Ok(DriveMode::from_mode_register(value))
    }

    pub async fn status(&mut self) -> Result<Status, Error<I2C::Error>> {
        Ok(Status(self.read_register(registers::STATUS).await?))
    }

    pub async fn check_for_status_error(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.status().await?.has_error())
    }

    pub async fn data_available(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.status().await?.data_ready())
    }

    pub async fn co2(&mut self) -> Result<u16, Error<I2C::Error>> {
        self.refresh().await?;
        Ok(self.measurement.co2_ppm)
    }

    pub async fn tvoc(&mut self) -> Result<u16, Error<I2C::Error>> {
        self.refresh().await?;
        Ok(self.measurement.tvoc_ppb)
    }

    pub async fn measurement(&mut self) -> Result<Measurement, Error<I2C::Error>> {
        self.refresh().await?;
        Ok(self.measurement)
    }

    pub fn last_measurement(&self) -> Measurement {
        self.measurement
    }

    pub async fn enable_interrupt(&mut self) -> Result<(), Error<I2C::Error>> {
        self.update_interrupt(true).await
    }

    pub async fn disable_interrupt(&mut self) -> Result<(), Error<I2C::Error>> {
        self.update_interrupt(false).await
    }

    pub async fn software_reset(&mut self) -> Result<(), Error<I2C::Error>> {
        info!("SG33 software reset");
        self.i2c_write(&registers::SW_RESET_SEQUENCE).await
    }

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

    pub fn release(self) -> I2C {
        self.i2c
    }

    async fn refresh(&mut self) -> Result<(), Error<I2C::Error>> {
        if !self.data_available().await? {
            trace!("SG33 no new data");
            return Ok(());
        }
        let mut buf = [0u8; registers::ALG_RESULT_LEN];
        self.i2c_write_read(&[registers::ALG_RESULT_DATA], &mut buf)
            .await?;
        self.measurement = registers::decode_results(&buf);
        debug!(
            "SG33 eCO2 {} ppm, TVOC {} ppb",
            self.measurement.co2_ppm,
            self.measurement.tvoc_ppb
        );
        Ok(())
    }

    async fn update_interrupt(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        let current = self.read_register(registers::MEAS_MODE).await?;
        let value = registers::with_interrupt(current, enabled);
        self.i2c_write(&[registers::MEAS_MODE, value]).await?;
        trace!("SG33 interrupt enabled: {}", enabled);
        Ok(())
    }

    async fn read_register(&mut self, register: u8) -> Result<u8, Error<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.i2c_write_read(&[register], &mut buf).await?;
        Ok(buf[0])
    }

    async fn i2c_write_read(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write_read(self.address.addr(), write, read)
            .await
            .map_err(Error::I2c)
    }

    async fn i2c_write(&mut self, write: &[u8]) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(self.address.addr(), write)
            .await
            .map_err(Error::I2c)
    }
}
