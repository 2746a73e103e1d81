#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use {defmt_rtt as _, panic_probe as _};

use imu_telemetry::{
    drivers::{i2c_master::I2cMaster, imu::create_default_imu},
    tasks::{cdc_task, init_usb, telemetry_task, usb_device_task},
    Board,
};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting imu-telemetry");
    let board = Board::init();

    let (usb, class) = init_usb(board.usb);
    spawner.spawn(usb_device_task(usb)).unwrap();
    spawner.spawn(cdc_task(class)).unwrap();
    info!("USB CDC tasks spawned");

    let mut imu = create_default_imu(I2cMaster::new(board.i2c));
    let id = match imu.init() {
        Ok(id) => id,
        Err(never) => match never {},
    };
    info!("IMU ready (WHO_AM_I = {=u8:#04x})", id);

    spawner.spawn(telemetry_task(imu, board.led)).unwrap();
    info!("Telemetry task spawned");

    core::future::pending::<()>().await;
}
