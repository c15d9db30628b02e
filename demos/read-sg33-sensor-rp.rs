#![no_std]
#![no_main]

use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::peripherals::I2C0;
use embassy_rp::{bind_interrupts, i2c};
use embassy_sg33_sensor::{DeviceAddress, Error, Sg33Async};
use embassy_time::{Delay, Duration, Timer};
use panic_probe as _;

bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    let sda = p.PIN_0;
    let scl = p.PIN_1;

    // Configure I2C
    let i2c = i2c::I2c::new_async(p.I2C0, scl, sda, Irqs, Default::default());

    // Create sensor instance
    let mut sensor = Sg33Async::new(i2c, DeviceAddress::Primary);
    if let Err(Error::I2c(e)) = sensor.init(&mut Delay).await {
        error!("SG33 init failed: {}", e);
    }

    // Read sensor data
    loop {
        match sensor.measurement().await {
            Ok(data) => {
                info!("eCO2: {} ppm, TVOC: {} ppb", data.co2_ppm, data.tvoc_ppb);
            }
            Err(Error::I2c(e)) => error!("I2C communication error: {}", e),
        }
        match sensor.check_for_status_error().await {
            Ok(true) => error!("Sensor reports an error"),
            Ok(false) => {}
            Err(Error::I2c(e)) => error!("I2C communication error: {}", e),
        }

        Timer::after(Duration::from_secs(1)).await;
    }
}
