//! Host telemetry over a byte-stream transport.

pub mod protocol;
pub mod session;

pub use protocol::{Command, Frame};
pub use session::{Fault, Session, State, TelemetryIo};

/// Identifies one outstanding read or write on the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferHandle(pub u32);

/// Set on write handles so reads and writes share one id space.
const WRITE_FLAG: u32 = 1 << 31;

impl TransferHandle {
    pub fn is_write(self) -> bool {
        self.0 & WRITE_FLAG != 0
    }

    /// `done` is the id of the last transfer the link finished. Only an exact
    /// match counts, so ids stay valid across counter wrap.
    pub fn completed_by(self, done: u32) -> bool {
        self.0 == done
    }
}

/// Hands out transfer ids. Zero is never issued so a fresh `done` counter
/// matches nothing.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    #[cfg(test)]
    const fn starting_at(next: u32) -> Self {
        Self { next }
    }

    fn allocate(&mut self) -> u32 {
        self.next = self.next.wrapping_add(1) & !WRITE_FLAG;
        if self.next == 0 {
            self.next = 1;
        }
        self.next
    }

    pub fn read(&mut self) -> TransferHandle {
        TransferHandle(self.allocate())
    }

    pub fn write(&mut self) -> TransferHandle {
        TransferHandle(self.allocate() | WRITE_FLAG)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// The transport could not allocate a transfer.
    NoHandle,
    /// Payload larger than one transfer.
    TooLong,
}

/// Reliable, ordered byte stream to the host (USB CDC in the firmware).
///
/// Transfers are asynchronous: `read_available`/`write` only queue work and
/// return a handle that is polled with `is_complete`.
pub trait Transport {
    /// Brings the transport up. Called until it reports `true`.
    fn open(&mut self) -> bool {
        true
    }

    fn link_configured(&self) -> bool;

    /// Requests up to `max_len` inbound bytes.
    fn read_available(&mut self, max_len: usize) -> Result<TransferHandle, TransferError>;

    /// Copies the bytes delivered by a completed read into `buf`.
    fn received(&mut self, handle: TransferHandle, buf: &mut [u8]) -> usize;

    fn write(&mut self, data: &[u8]) -> Result<TransferHandle, TransferError>;

    fn is_complete(&self, handle: TransferHandle) -> bool;
}
