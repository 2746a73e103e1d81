//! Shared state between the telemetry task and the USB CDC tasks.
//!
//! Transfers are tracked by id: a request publishes its id and the USB side
//! stores the id of the last transfer it finished. Only one read and one
//! write are ever outstanding, so a handle is complete once the matching
//! `*_DONE` slot holds exactly its id.

use core::cell::RefCell;

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex as RawMutex, Mutex},
    channel::Channel,
    signal::Signal,
};
use heapless::Vec;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::USB_MAX_PACKET_SIZE;
use crate::telemetry::{HandleAllocator, TransferError, TransferHandle, Transport};

pub const PACKET_LEN: usize = USB_MAX_PACKET_SIZE as usize;
pub type Packet = Vec<u8, PACKET_LEN>;

/* link state, driven by the USB device handler */
pub static LINK_CONFIGURED: AtomicBool = AtomicBool::new(false);

/* host -> device */
pub static READ_REQUEST: Signal<RawMutex, u32> = Signal::new();
pub static READ_DONE: AtomicU32 = AtomicU32::new(0);
static RX_PACKET: Mutex<RawMutex, RefCell<Packet>> = Mutex::new(RefCell::new(Vec::new()));

/* device -> host */
pub static WRITE_CH: Channel<RawMutex, (u32, Packet), 1> = Channel::new();
pub static WRITE_DONE: AtomicU32 = AtomicU32::new(0);

/// Called by the CDC reader once a requested packet has landed.
pub fn complete_read(id: u32, data: &[u8]) {
    RX_PACKET.lock(|packet| {
        let mut packet = packet.borrow_mut();
        packet.clear();
        let n = data.len().min(PACKET_LEN);
        // cannot fail, n <= capacity
        let _ = packet.extend_from_slice(&data[..n]);
    });
    READ_DONE.store(id, Ordering::Release);
}

pub fn complete_write(id: u32) {
    WRITE_DONE.store(id, Ordering::Release);
}

/// [`Transport`] backed by the CDC tasks in `tasks::usb`.
pub struct CdcLink {
    ids: HandleAllocator,
}

impl CdcLink {
    pub const fn new() -> Self {
        Self {
            ids: HandleAllocator::new(),
        }
    }
}

impl Default for CdcLink {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for CdcLink {
    fn link_configured(&self) -> bool {
        LINK_CONFIGURED.load(Ordering::Acquire)
    }

    fn read_available(&mut self, _max_len: usize) -> Result<TransferHandle, TransferError> {
        let handle = self.ids.read();
        READ_REQUEST.signal(handle.0);
        Ok(handle)
    }

    fn received(&mut self, _handle: TransferHandle, buf: &mut [u8]) -> usize {
        RX_PACKET.lock(|packet| {
            let packet = packet.borrow();
            let n = packet.len().min(buf.len());
            buf[..n].copy_from_slice(&packet[..n]);
            n
        })
    }

    fn write(&mut self, data: &[u8]) -> Result<TransferHandle, TransferError> {
        let packet = Packet::from_slice(data).map_err(|_| TransferError::TooLong)?;
        let handle = self.ids.write();
        WRITE_CH
            .try_send((handle.0, packet))
            .map_err(|_| TransferError::NoHandle)?;
        Ok(handle)
    }

    fn is_complete(&self, handle: TransferHandle) -> bool {
        let done = if handle.is_write() {
            WRITE_DONE.load(Ordering::Acquire)
        } else {
            READ_DONE.load(Ordering::Acquire)
        };
        handle.completed_by(done)
    }
}

/// Tracks enumeration so the telemetry task can tell when the host is there.
pub struct LinkHandler;

impl embassy_usb::Handler for LinkHandler {
    fn enabled(&mut self, enabled: bool) {
        if !enabled {
            LINK_CONFIGURED.store(false, Ordering::Release);
        }
    }

    fn reset(&mut self) {
        info!("USB reset");
        LINK_CONFIGURED.store(false, Ordering::Release);
    }

    fn configured(&mut self, configured: bool) {
        info!("USB configured: {}", configured);
        LINK_CONFIGURED.store(configured, Ordering::Release);
    }
}
