use embassy_executor::task;
use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Instant, Ticker, TICK_HZ};

use crate::config::{period_ticks, TELEMETRY_PERIOD_MS, TELEMETRY_TICK_US};
use crate::drivers::heartbeat::Heartbeat;
use crate::drivers::imu::{Channel, Lsm6ds33};
use crate::board::BoardI2c;
use crate::ipc::CdcLink;
use crate::telemetry::{Session, State, TelemetryIo};

#[inline]
fn now_ticks() -> u32 {
    // truncation is fine, the session compares with wrapping arithmetic
    Instant::now().as_ticks() as u32
}

#[task]
pub async fn telemetry_task(imu: Lsm6ds33<BoardI2c>, led: Output<'static>) {
    let period = period_ticks(TELEMETRY_PERIOD_MS, TICK_HZ);
    info!(
        "Telemetry task started - {}ms write period ({} ticks)",
        TELEMETRY_PERIOD_MS, period
    );

    let mut session = Session::new(Channel::AccelZ, period, now_ticks());
    let mut io = TelemetryIo {
        transport: CdcLink::new(),
        imu,
        heartbeat: Heartbeat::new(led),
    };

    let mut ticker = Ticker::every(Duration::from_micros(TELEMETRY_TICK_US));
    loop {
        ticker.next().await;
        if session.tick(&mut io, now_ticks()) == State::Error {
            error!("Telemetry session halted");
            core::future::pending::<()>().await;
        }
    }
}
