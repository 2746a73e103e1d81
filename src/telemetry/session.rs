//! Telemetry state machine
//! ===========================================================
//!
//! Driven by [`Session::tick`] from a single cooperative loop. Each write
//! cycle samples the IMU once; while a capture window is armed the sample is
//! filtered and sent as a text line, otherwise a single null byte keeps the
//! host-side stream moving.

use super::protocol::{Command, Frame};
use super::{TransferError, TransferHandle, Transport};
use crate::capture::CaptureWindow;
use crate::config::COMMAND_READ_LEN;
use crate::drivers::heartbeat::Heartbeat;
use crate::drivers::imu::{Channel, ImuSource};
use embedded_hal::digital::v2::OutputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Init,
    WaitForLink,
    ScheduleRead,
    WaitForRead,
    ScheduleWrite,
    WaitForWrite,
    Error,
}

/// Why a session stopped in [`State::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    ImuRead,
    ReadRequest(TransferError),
    WriteRequest(TransferError),
}

/// Everything the session drives but does not own.
pub struct TelemetryIo<T, I, P> {
    pub transport: T,
    pub imu: I,
    pub heartbeat: Heartbeat<P>,
}

pub struct Session {
    state: State,
    fault: Option<Fault>,
    read_handle: Option<TransferHandle>,
    write_handle: Option<TransferHandle>,
    capture: CaptureWindow,
    channel: Channel,
    period_ticks: u32,
    last_write: u32,
}

impl Session {
    /// `period_ticks` bounds the wait for host input between writes; `now` is
    /// the current free-running cycle count.
    pub fn new(channel: Channel, period_ticks: u32, now: u32) -> Self {
        Self {
            state: State::Init,
            fault: None,
            read_handle: None,
            write_handle: None,
            capture: CaptureWindow::new(),
            channel,
            period_ticks,
            last_write: now,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn capture(&self) -> &CaptureWindow {
        &self.capture
    }

    /// Runs one step of the state machine and returns the new state.
    pub fn tick<T, I, P>(&mut self, io: &mut TelemetryIo<T, I, P>, now: u32) -> State
    where
        T: Transport,
        I: ImuSource,
        P: OutputPin,
    {
        let prev = self.state;

        match self.state {
            State::Init => {
                if io.transport.open() {
                    self.state = State::WaitForLink;
                }
            }

            State::WaitForLink => {
                if io.transport.link_configured() {
                    info!("USB link configured");
                    self.state = State::ScheduleRead;
                }
            }

            State::ScheduleRead => {
                if self.link_lost(&io.transport) {
                    return self.state;
                }

                self.state = State::WaitForRead;
                if self.read_finished(&io.transport) {
                    if let Some(handle) = self.read_handle.take() {
                        let mut cmd = [0u8; COMMAND_READ_LEN];
                        let len = io.transport.received(handle, &mut cmd);
                        if Command::parse(&cmd[..len]) == Some(Command::StartCapture) {
                            if self.capture.is_armed() {
                                info!(
                                    "Capture restarted, dropping {} samples",
                                    self.capture.index()
                                );
                            }
                            self.capture.start();
                            info!("Capture armed");
                        }
                    }

                    match io.transport.read_available(COMMAND_READ_LEN) {
                        Ok(handle) => self.read_handle = Some(handle),
                        Err(e) => {
                            error!("Read transfer failed: {:?}", e);
                            self.fail(Fault::ReadRequest(e));
                        }
                    }
                }
            }

            State::WaitForRead => {
                if self.link_lost(&io.transport) {
                    return self.state;
                }

                let elapsed = now.wrapping_sub(self.last_write);
                if self.read_finished(&io.transport) || elapsed > self.period_ticks {
                    self.state = State::ScheduleWrite;
                }
            }

            State::ScheduleWrite => {
                if self.link_lost(&io.transport) {
                    return self.state;
                }

                io.heartbeat.toggle();

                let sample = match io.imu.read_sample() {
                    Ok(sample) => sample,
                    Err(e) => {
                        error!("IMU read failed: {:?}", e);
                        self.fail(Fault::ImuRead);
                        return self.state;
                    }
                };

                let frame = match self.capture.push(sample.channel(self.channel)) {
                    Some((index, slot)) => Frame::line(index, &slot),
                    None => Frame::Idle,
                };

                self.last_write = now;
                match io.transport.write(frame.as_bytes()) {
                    Ok(handle) => {
                        self.write_handle = Some(handle);
                        self.state = State::WaitForWrite;
                    }
                    Err(e) => {
                        error!("Write transfer failed: {:?}", e);
                        self.fail(Fault::WriteRequest(e));
                    }
                }
            }

            State::WaitForWrite => {
                if self.link_lost(&io.transport) {
                    return self.state;
                }

                let done = self
                    .write_handle
                    .map_or(true, |h| io.transport.is_complete(h));
                if done {
                    self.write_handle = None;
                    self.state = State::ScheduleRead;
                }
            }

            State::Error => {}
        }

        if self.state != prev {
            debug!("telemetry: {:?} -> {:?}", prev, self.state);
        }
        self.state
    }

    fn fail(&mut self, fault: Fault) {
        self.fault = Some(fault);
        self.state = State::Error;
    }

    fn read_finished<T: Transport>(&self, transport: &T) -> bool {
        self.read_handle.map_or(true, |h| transport.is_complete(h))
    }

    /// Falls back to `WaitForLink` when the host went away, forgetting any
    /// outstanding transfers and the capture in progress.
    fn link_lost<T: Transport>(&mut self, transport: &T) -> bool {
        if transport.link_configured() {
            return false;
        }

        if self.capture.is_armed() {
            warn!(
                "USB link lost mid-capture at sample {}",
                self.capture.index()
            );
        } else {
            info!("USB link lost");
        }
        self.state = State::WaitForLink;
        self.read_handle = None;
        self.write_handle = None;
        self.capture.discard();
        true
    }
}
