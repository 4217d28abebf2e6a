pub mod backend;
mod device;
mod matrix;
pub mod processor;
pub mod sensor;

use thiserror::Error;

pub use device::{Closed, Device, FrameStatus, Opened};
pub use matrix::ImageMatrix;
pub use sensor::{
    ColorFrame, ColorImageFormat, DepthFrame, FrameDescription, FrameReader, FrameSource, Sensor,
};

pub const COLOR_WIDTH: usize = 1920;
pub const COLOR_HEIGHT: usize = 1080;
pub const COLOR_FRAME_SIZE: usize = COLOR_WIDTH * COLOR_HEIGHT;

pub const DEPTH_WIDTH: usize = 512;
pub const DEPTH_HEIGHT: usize = 424;
pub const DEPTH_FRAME_SIZE: usize = DEPTH_WIDTH * DEPTH_HEIGHT;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Usb(#[from] nusb::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    #[error("No Kinect connected")]
    NoDevice,
    #[error("Sensor driver error: {0}")]
    Driver(String),
    #[error("Sensor is closed")]
    SensorClosed,
    #[error("{0} sensor has not been initialized")]
    NotInitialized(&'static str),
    #[error("Unsupported color format {0:?}")]
    UnsupportedFormat(ColorImageFormat),
    #[error("Buffer too small: {actual} bytes, expected at least {expected}")]
    BufferSize { actual: usize, expected: usize },
    #[error("Frame is {actual:?}, expected {expected:?}")]
    FrameSize {
        actual: FrameDescription,
        expected: FrameDescription,
    },
    #[error("YUY2 frame width must be even, got {0}")]
    OddWidth(usize),
    #[error("Failed to decode frame: {0}")]
    Decode(String),
}

/// Depth values accepted by the intensity remap, starting at the frame's
/// minimum reliable distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DepthRange {
    /// Up to `u16::MAX`, keeps the less reliable far field visible.
    #[default]
    Full,
    /// Up to the frame's maximum reliable distance.
    Reliable,
}

impl DepthRange {
    pub fn bounds(&self, frame: &DepthFrame) -> (u16, u16) {
        match self {
            DepthRange::Full => (frame.min_reliable_distance, u16::MAX),
            DepthRange::Reliable => (frame.min_reliable_distance, frame.max_reliable_distance),
        }
    }
}

/// Configuration of frame conversion.
#[derive(Debug, Clone)]
pub struct Config {
    pub depth_range: DepthRange,
    // Reject frames that don't match the size reported by their source
    pub check_frame_size: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            depth_range: DepthRange::Full,
            check_frame_size: true,
        }
    }
}
