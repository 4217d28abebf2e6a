//! Driver producing moving test patterns at a fixed frame rate.

use std::{
    io::Cursor,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};
use log::debug;

use crate::{
    processor::color::bgra_to_yuy2,
    sensor::{
        ColorFrame, ColorImageFormat, DepthFrame, FrameDescription, FrameReader, FrameSource,
        Sensor,
    },
    Error, COLOR_HEIGHT, COLOR_WIDTH, DEPTH_HEIGHT, DEPTH_WIDTH,
};

pub const MIN_RELIABLE_DISTANCE: u16 = 500;
pub const MAX_RELIABLE_DISTANCE: u16 = 4500;

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub color_format: ColorImageFormat,
    pub color: FrameDescription,
    pub depth: FrameDescription,
    /// Zero hands out a new frame on every acquisition.
    pub frame_interval: Duration,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            color_format: ColorImageFormat::Bgra,
            color: FrameDescription::new(COLOR_WIDTH, COLOR_HEIGHT),
            depth: FrameDescription::new(DEPTH_WIDTH, DEPTH_HEIGHT),
            frame_interval: Duration::from_secs(1) / 30,
        }
    }
}

fn color_pattern(description: FrameDescription, index: u64) -> Vec<u8> {
    let shift = index as usize;
    let mut bgra = Vec::with_capacity(description.pixel_count() * 4);

    for y in 0..description.height {
        for x in 0..description.width {
            bgra.extend([
                (x + shift * 8) as u8,
                (y + shift * 4) as u8,
                ((x + y) / 2) as u8,
                u8::MAX,
            ]);
        }
    }

    bgra
}

fn encode_jpeg(bgra: &[u8], description: FrameDescription) -> Result<Vec<u8>, Error> {
    let rgb: Vec<u8> = bgra
        .chunks_exact(4)
        .flat_map(|pixel| [pixel[2], pixel[1], pixel[0]])
        .collect();
    let mut jpeg = Cursor::new(Vec::new());

    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode(
        &rgb,
        description.width as u32,
        description.height as u32,
        ExtendedColorType::Rgb8,
    )?;

    Ok(jpeg.into_inner())
}

fn color_frame(config: &SyntheticConfig, index: u64) -> Result<ColorFrame, Error> {
    let description = config.color;
    let mut buffer = color_pattern(description, index);

    buffer = match config.color_format {
        ColorImageFormat::Bgra => buffer,
        ColorImageFormat::Rgba => {
            for pixel in buffer.chunks_exact_mut(4) {
                pixel.swap(0, 2);
            }
            buffer
        }
        ColorImageFormat::Yuy2 => bgra_to_yuy2(&buffer, description.width, description.height)?,
        ColorImageFormat::Jpeg => encode_jpeg(&buffer, description)?,
        format => return Err(Error::UnsupportedFormat(format)),
    };

    Ok(ColorFrame {
        format: config.color_format,
        width: description.width,
        height: description.height,
        buffer,
        relative_time: config.frame_interval * index as u32,
    })
}

/// Concentric rings around a drifting center, with a band of missing samples
/// on the left edge.
fn depth_frame(config: &SyntheticConfig, index: u64) -> Result<DepthFrame, Error> {
    let description = config.depth;
    let center_x = (description.width / 2 + index as usize) % description.width.max(1);
    let center_y = description.height / 2;
    let shadow = description.width / 16;
    let mut buffer = Vec::with_capacity(description.pixel_count());

    for y in 0..description.height {
        for x in 0..description.width {
            if x < shadow {
                buffer.push(0);
                continue;
            }

            let dx = x.abs_diff(center_x) as f32;
            let dy = y.abs_diff(center_y) as f32;
            let radius = (dx * dx + dy * dy).sqrt();

            buffer.push(300 + (radius * 16.0) as u16 % 6000);
        }
    }

    Ok(DepthFrame {
        width: description.width,
        height: description.height,
        buffer,
        min_reliable_distance: MIN_RELIABLE_DISTANCE,
        max_reliable_distance: MAX_RELIABLE_DISTANCE,
        relative_time: config.frame_interval * index as u32,
    })
}

type Generator<F> = fn(&SyntheticConfig, u64) -> Result<F, Error>;

pub struct SyntheticReader<F> {
    config: SyntheticConfig,
    generate: Generator<F>,
    open: Arc<AtomicBool>,
    started: Instant,
    last_index: Option<u64>,
}

impl<F> SyntheticReader<F> {
    fn current_index(&self) -> u64 {
        if self.config.frame_interval.is_zero() {
            return self.last_index.map_or(0, |index| index + 1);
        }

        (self.started.elapsed().as_nanos() / self.config.frame_interval.as_nanos()) as u64
    }
}

impl<F> FrameReader for SyntheticReader<F> {
    type Frame = F;

    fn acquire_latest_frame(&mut self) -> Result<Option<F>, Error> {
        if !self.open.load(Ordering::Acquire) {
            return Err(Error::SensorClosed);
        }

        let index = self.current_index();

        if self.last_index == Some(index) {
            return Ok(None);
        }

        if let Some(last_index) = self.last_index {
            if index > last_index + 1 {
                debug!("Skipped {} synthetic frames", index - last_index - 1);
            }
        }

        self.last_index = Some(index);

        (self.generate)(&self.config, index).map(Some)
    }
}

pub struct SyntheticSource<F> {
    config: SyntheticConfig,
    description: FrameDescription,
    generate: Generator<F>,
    open: Arc<AtomicBool>,
    started: Instant,
}

impl<F> FrameSource for SyntheticSource<F> {
    type Frame = F;
    type Reader = SyntheticReader<F>;

    fn frame_description(&self) -> FrameDescription {
        self.description
    }

    fn open_reader(&mut self) -> Result<SyntheticReader<F>, Error> {
        Ok(SyntheticReader {
            config: self.config.clone(),
            generate: self.generate,
            open: self.open.clone(),
            started: self.started,
            last_index: None,
        })
    }
}

pub struct SyntheticSensor {
    config: SyntheticConfig,
    open: Arc<AtomicBool>,
    started: Instant,
}

impl SyntheticSensor {
    pub fn new(config: SyntheticConfig) -> Result<Self, Error> {
        match config.color_format {
            ColorImageFormat::Bayer => {
                return Err(Error::UnsupportedFormat(config.color_format))
            }
            ColorImageFormat::Yuy2 if config.color.width % 2 != 0 => {
                return Err(Error::OddWidth(config.color.width))
            }
            _ => {}
        }

        Ok(Self {
            config,
            open: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
        })
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    fn source<F>(
        &self,
        description: FrameDescription,
        generate: Generator<F>,
    ) -> Result<SyntheticSource<F>, Error> {
        if !self.is_open() {
            return Err(Error::SensorClosed);
        }

        Ok(SyntheticSource {
            config: self.config.clone(),
            description,
            generate,
            open: self.open.clone(),
            started: self.started,
        })
    }
}

impl Sensor for SyntheticSensor {
    type ColorSource = SyntheticSource<ColorFrame>;
    type DepthSource = SyntheticSource<DepthFrame>;

    fn open(&mut self) -> Result<(), Error> {
        self.started = Instant::now();
        self.open.store(true, Ordering::Release);

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&mut self) -> Result<(), Error> {
        self.open.store(false, Ordering::Release);

        Ok(())
    }

    fn color_frame_source(&mut self) -> Result<SyntheticSource<ColorFrame>, Error> {
        self.source(self.config.color, color_frame)
    }

    fn depth_frame_source(&mut self) -> Result<SyntheticSource<DepthFrame>, Error> {
        self.source(self.config.depth, depth_frame)
    }
}

impl Drop for SyntheticSensor {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(color_format: ColorImageFormat) -> SyntheticConfig {
        SyntheticConfig {
            color_format,
            color: FrameDescription::new(8, 4),
            depth: FrameDescription::new(32, 8),
            frame_interval: Duration::ZERO,
        }
    }

    fn opened(color_format: ColorImageFormat) -> SyntheticSensor {
        let mut sensor = SyntheticSensor::new(config(color_format)).unwrap();
        sensor.open().unwrap();
        sensor
    }

    #[test]
    fn every_acquisition_is_fresh_without_interval() {
        let mut sensor = opened(ColorImageFormat::Bgra);
        let mut reader = sensor
            .color_frame_source()
            .unwrap()
            .open_reader()
            .unwrap();

        let first = reader.acquire_latest_frame().unwrap().unwrap();
        let second = reader.acquire_latest_frame().unwrap().unwrap();

        assert_eq!(first.buffer.len(), 8 * 4 * 4);
        assert_ne!(first.buffer, second.buffer);
    }

    #[test]
    fn long_interval_yields_one_frame() {
        let mut sensor = SyntheticSensor::new(SyntheticConfig {
            frame_interval: Duration::from_secs(3600),
            ..config(ColorImageFormat::Bgra)
        })
        .unwrap();
        sensor.open().unwrap();

        let mut reader = sensor
            .depth_frame_source()
            .unwrap()
            .open_reader()
            .unwrap();

        assert!(reader.acquire_latest_frame().unwrap().is_some());
        assert!(reader.acquire_latest_frame().unwrap().is_none());
    }

    #[test]
    fn color_buffers_match_format() {
        for (format, bytes) in [
            (ColorImageFormat::Bgra, 4),
            (ColorImageFormat::Rgba, 4),
            (ColorImageFormat::Yuy2, 2),
        ] {
            let mut sensor = opened(format);
            let frame = sensor
                .color_frame_source()
                .unwrap()
                .open_reader()
                .unwrap()
                .acquire_latest_frame()
                .unwrap()
                .unwrap();

            assert_eq!(frame.format, format);
            assert_eq!(frame.buffer.len(), 8 * 4 * bytes);
        }
    }

    #[test]
    fn depth_has_shadow_and_reliable_range() {
        let mut sensor = opened(ColorImageFormat::Bgra);
        let frame = sensor
            .depth_frame_source()
            .unwrap()
            .open_reader()
            .unwrap()
            .acquire_latest_frame()
            .unwrap()
            .unwrap();

        assert_eq!(frame.buffer.len(), 32 * 8);
        assert_eq!(frame.buffer[0], 0);
        assert!(frame.buffer[2] >= 300);
        assert_eq!(frame.min_reliable_distance, MIN_RELIABLE_DISTANCE);
        assert_eq!(frame.max_reliable_distance, MAX_RELIABLE_DISTANCE);
    }

    #[test]
    fn odd_width_yuy2_is_rejected() {
        let result = SyntheticSensor::new(SyntheticConfig {
            color: FrameDescription::new(7, 4),
            ..config(ColorImageFormat::Yuy2)
        });

        assert!(matches!(result, Err(Error::OddWidth(7))));
    }

    #[test]
    fn closed_sensor_has_no_sources() {
        let mut sensor = SyntheticSensor::new(config(ColorImageFormat::Bgra)).unwrap();

        assert!(matches!(
            sensor.color_frame_source(),
            Err(Error::SensorClosed)
        ));
    }
}
