// Centralize all configuration constants

// I2C bus
pub const I2C_FREQUENCY_HZ: u32 = 400_000;
pub const IMU_ADDRESS: u8 = 0b110_1011;
pub const EXPANDER_ADDRESS: u8 = 0b010_0101;

// IMU control registers written by `configure`
pub const IMU_CTRL1_XL: u8 = 0b1000_0010; // 1.66 kHz, +-2 g, 100 Hz anti-aliasing
pub const IMU_CTRL2_G: u8 = 0b1000_1000; // 1.66 kHz, 1000 dps
pub const IMU_CTRL3_C: u8 = 0b0000_0100; // IF_INC: auto-increment on burst reads

// Capture / filtering
pub const CAPTURE_LEN: usize = 100;
pub const FIR_TAPS: usize = 6;
pub const FIR_WEIGHTS: [f32; FIR_TAPS] = [0.0264, 0.1405, 0.3331, 0.3331, 0.1405, 0.0264];
pub const IIR_PREVIOUS_WEIGHT: f32 = 0.9;
pub const IIR_CURRENT_WEIGHT: f32 = 0.1;
pub const OUTPUT_DECIMALS: usize = 3;

// Telemetry loop
pub const TELEMETRY_PERIOD_MS: u32 = 10;
pub const TELEMETRY_TICK_US: u64 = 250;
pub const COMMAND_READ_LEN: usize = 1;

// USB CDC
pub const USB_VID: u16 = 0xc0de;
pub const USB_PID: u16 = 0xcafe;
pub const USB_MANUFACTURER: &str = "K-Scale Labs";
pub const USB_PRODUCT: &str = "IMU telemetry";
pub const USB_MAX_PACKET_SIZE: u16 = 64;

/// Converts a period in milliseconds into cycle-counter ticks at `tick_hz`.
pub const fn period_ticks(period_ms: u32, tick_hz: u64) -> u32 {
    (tick_hz * period_ms as u64 / 1000) as u32
}
