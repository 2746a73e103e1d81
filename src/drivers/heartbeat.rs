use embedded_hal::digital::v2::OutputPin;

/// Diagnostic LED flipped once per telemetry write. Pin errors are ignored.
pub struct Heartbeat<P> {
    pin: P,
    lit: bool,
}

impl<P: OutputPin> Heartbeat<P> {
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_low();
        Self { pin, lit: false }
    }

    pub fn toggle(&mut self) {
        self.lit = !self.lit;
        let _ = if self.lit {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
