//! Kinect v2 discovery on the USB bus.

use std::fmt::{self, Debug};

use crate::Error;

pub const VENDOR_ID: u16 = 0x045E;
pub const PRODUCT_ID: u16 = 0x02D8;
pub const PRODUCT_ID_PREVIEW: u16 = 0x02C4;

pub trait DeviceInfo: Debug {
    fn id(&self) -> nusb::DeviceId;

    fn serial_number(&self) -> Option<&str>;
}

pub const fn is_kinect(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == VENDOR_ID && (product_id == PRODUCT_ID || product_id == PRODUCT_ID_PREVIEW)
}

/// A connected Kinect v2.
#[derive(Clone)]
pub struct UsbDevice {
    device_info: nusb::DeviceInfo,
}

impl UsbDevice {
    /// Developer preview hardware.
    pub fn is_preview(&self) -> bool {
        self.device_info.product_id() == PRODUCT_ID_PREVIEW
    }

    pub fn device_address(&self) -> u8 {
        self.device_info.device_address()
    }
}

impl DeviceInfo for UsbDevice {
    fn id(&self) -> nusb::DeviceId {
        self.device_info.id()
    }

    fn serial_number(&self) -> Option<&str> {
        self.device_info.serial_number()
    }
}

impl Debug for UsbDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.device_info.fmt(f)
    }
}

pub async fn enumerate_devices() -> Result<Vec<UsbDevice>, Error> {
    Ok(nusb::list_devices()
        .await?
        .filter(|device_info| is_kinect(device_info.vendor_id(), device_info.product_id()))
        .map(|device_info| UsbDevice { device_info })
        .collect())
}

/// First Kinect found on the bus.
pub async fn find_default() -> Result<UsbDevice, Error> {
    enumerate_devices()
        .await?
        .into_iter()
        .next()
        .ok_or(Error::NoDevice)
}
