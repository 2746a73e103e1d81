use embassy_stm32::{
    bind_interrupts,
    gpio::{Level, Output, OutputOpenDrain, Speed},
    peripherals, rcc, usb, Config,
};
use embassy_time::Delay;

use crate::config::I2C_FREQUENCY_HZ;
use crate::drivers::open_drain::OpenDrainController;

// ── IRQ table ─────────────────────────────────────────────
bind_interrupts!(pub struct Irqs {
    USB_UCPD1_2 => usb::InterruptHandler<peripherals::USB>;
});

pub type UsbDriver = usb::Driver<'static, peripherals::USB>;
pub type BoardI2c = OpenDrainController<OutputOpenDrain<'static>, OutputOpenDrain<'static>, Delay>;

// ── Board struct ──────────────────────────────────────────
pub struct Board {
    pub usb: UsbDriver,
    pub i2c: BoardI2c, // PB8 SCL, PB9 SDA
    pub led: Output<'static>,
}

impl Board {
    pub fn init() -> Self {
        let mut config = Config::default();

        // HSI16 -> PLL -> 64MHz system clock
        config.rcc.hsi = Some(rcc::Hsi {
            sys_div: rcc::HsiSysDiv::DIV1,
        });
        config.rcc.pll = Some(rcc::Pll {
            source: rcc::PllSource::HSI,
            prediv: rcc::PllPreDiv::DIV2,   // 16MHz / 2 = 8MHz
            mul: rcc::PllMul::MUL16,        // 8MHz * 16 = 128MHz
            divp: None,
            divq: None,
            divr: Some(rcc::PllRDiv::DIV2), // 128MHz / 2 = 64MHz
        });
        config.rcc.sys = rcc::Sysclk::PLL1_R;

        // USB runs from HSI48 trimmed by SOF
        config.rcc.hsi48 = Some(rcc::Hsi48Config {
            sync_from_usb: true,
        });
        config.rcc.mux.usbsel = rcc::mux::Usbsel::HSI48;

        let p = embassy_stm32::init(config);

        let usb = usb::Driver::new(p.USB, Irqs, p.PA12, p.PA11);

        let scl = OutputOpenDrain::new(p.PB8, Level::High, Speed::Low);
        let sda = OutputOpenDrain::new(p.PB9, Level::High, Speed::Low);
        let i2c = OpenDrainController::new(scl, sda, Delay, I2C_FREQUENCY_HZ);

        let led = Output::new(p.PA5, Level::Low, Speed::Low);

        Self { usb, i2c, led }
    }
}
