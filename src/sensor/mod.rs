//! Seam between the agent and the sensor driver that owns device access,
//! frame acquisition and raw buffer layout.

use std::{
    fmt::{self, Debug},
    time::Duration,
};

use crate::Error;

/// Raw pixel layout of a color frame as delivered by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorImageFormat {
    Bgra,
    Rgba,
    Yuy2,
    Jpeg,
    Bayer,
}

impl ColorImageFormat {
    /// Bytes per pixel of the raw buffer, 0 for compressed formats.
    pub const fn bytes_per_pixel(&self) -> usize {
        match self {
            ColorImageFormat::Bgra | ColorImageFormat::Rgba => 4,
            ColorImageFormat::Yuy2 => 2,
            ColorImageFormat::Bayer => 1,
            ColorImageFormat::Jpeg => 0,
        }
    }

    pub const fn is_compressed(&self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescription {
    pub width: usize,
    pub height: usize,
}

impl FrameDescription {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub const fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

#[derive(Clone)]
pub struct ColorFrame {
    pub format: ColorImageFormat,
    pub width: usize,
    pub height: usize,
    pub buffer: Vec<u8>,
    /// Time since the stream started.
    pub relative_time: Duration,
}

impl ColorFrame {
    pub const fn description(&self) -> FrameDescription {
        FrameDescription::new(self.width, self.height)
    }
}

impl Debug for ColorFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorFrame")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("buffer_length", &self.buffer.len())
            .field("relative_time", &self.relative_time)
            .finish()
    }
}

/// Depth frame with one distance sample (millimeter) per pixel.
#[derive(Clone)]
pub struct DepthFrame {
    pub width: usize,
    pub height: usize,
    pub buffer: Vec<u16>,
    pub min_reliable_distance: u16,
    pub max_reliable_distance: u16,
    /// Time since the stream started.
    pub relative_time: Duration,
}

impl DepthFrame {
    pub const fn description(&self) -> FrameDescription {
        FrameDescription::new(self.width, self.height)
    }
}

impl Debug for DepthFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepthFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("buffer_length", &self.buffer.len())
            .field("min_reliable_distance", &self.min_reliable_distance)
            .field("max_reliable_distance", &self.max_reliable_distance)
            .field("relative_time", &self.relative_time)
            .finish()
    }
}

/// Handle polling a single stream for its most recent frame.
pub trait FrameReader {
    type Frame;

    /// Never blocks. `Ok(None)` means nothing newer than the last frame handed out.
    fn acquire_latest_frame(&mut self) -> Result<Option<Self::Frame>, Error>;
}

/// One sensor stream.
pub trait FrameSource {
    type Frame;
    type Reader: FrameReader<Frame = Self::Frame>;

    fn frame_description(&self) -> FrameDescription;

    fn open_reader(&mut self) -> Result<Self::Reader, Error>;
}

pub trait Sensor {
    type ColorSource: FrameSource<Frame = ColorFrame>;
    type DepthSource: FrameSource<Frame = DepthFrame>;

    fn open(&mut self) -> Result<(), Error>;

    fn is_open(&self) -> bool;

    /// Stops every stream. Readers opened before will fail afterwards.
    fn close(&mut self) -> Result<(), Error>;

    fn color_frame_source(&mut self) -> Result<Self::ColorSource, Error>;

    fn depth_frame_source(&mut self) -> Result<Self::DepthSource, Error>;
}
