use embassy_executor::task;
use embassy_futures::join::join;
use embassy_usb::class::cdc_acm::{CdcAcmClass, Receiver, Sender, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, UsbDevice};
use static_cell::StaticCell;

use crate::board::UsbDriver;
use crate::config::{USB_MANUFACTURER, USB_MAX_PACKET_SIZE, USB_PID, USB_PRODUCT, USB_VID};
use crate::ipc::{complete_read, complete_write, LinkHandler, PACKET_LEN, READ_REQUEST, WRITE_CH};

/// Builds the CDC-ACM device. Descriptor buffers live in statics.
pub fn init_usb(
    driver: UsbDriver,
) -> (UsbDevice<'static, UsbDriver>, CdcAcmClass<'static, UsbDriver>) {
    let mut config = embassy_usb::Config::new(USB_VID, USB_PID);
    config.manufacturer = Some(USB_MANUFACTURER);
    config.product = Some(USB_PRODUCT);
    config.serial_number = Some("0001");
    config.max_power = 100;
    config.max_packet_size_0 = 64;

    static CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
    static CDC_STATE: StaticCell<State> = StaticCell::new();
    static HANDLER: StaticCell<LinkHandler> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESC.init([0; 256]),
        BOS_DESC.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUF.init([0; 64]),
    );
    builder.handler(HANDLER.init(LinkHandler));

    let class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), USB_MAX_PACKET_SIZE);
    (builder.build(), class)
}

#[task]
pub async fn usb_device_task(mut usb: UsbDevice<'static, UsbDriver>) {
    usb.run().await
}

#[task]
pub async fn cdc_task(class: CdcAcmClass<'static, UsbDriver>) {
    info!("CDC task started");
    let (tx, rx) = class.split();
    join(rx_loop(rx), tx_loop(tx)).await;
}

async fn rx_loop(mut rx: Receiver<'static, UsbDriver>) {
    let mut buf = [0u8; PACKET_LEN];
    loop {
        rx.wait_connection().await;
        debug!("CDC rx connected");
        loop {
            let id = READ_REQUEST.wait().await;
            match rx.read_packet(&mut buf).await {
                Ok(n) => complete_read(id, &buf[..n]),
                Err(EndpointError::BufferOverflow) => warn!("CDC rx overflow"),
                Err(EndpointError::Disabled) => break,
            }
        }
    }
}

async fn tx_loop(mut tx: Sender<'static, UsbDriver>) {
    loop {
        // frames queued while the link was down belong to a dead session
        while let Ok((id, _)) = WRITE_CH.try_receive() {
            complete_write(id);
        }
        tx.wait_connection().await;
        debug!("CDC tx connected");
        loop {
            let (id, packet) = WRITE_CH.receive().await;
            let result = tx.write_packet(&packet).await;
            complete_write(id);
            match result {
                Ok(()) => {}
                Err(EndpointError::BufferOverflow) => warn!("CDC tx frame too long"),
                Err(EndpointError::Disabled) => break,
            }
        }
    }
}
