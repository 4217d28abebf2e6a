use std::fmt::{self, Debug};

use log::{debug, error, info, warn};

use crate::{
    processor::{
        color::{BgraProcessor, BgrMatrixProcessor},
        depth::DepthProcessor,
        ProcessTrait, ProcessorTrait,
    },
    sensor::{FrameDescription, FrameReader, FrameSource, Sensor},
    Config, Error, ImageMatrix, COLOR_HEIGHT, COLOR_WIDTH, DEPTH_HEIGHT, DEPTH_WIDTH,
};

use super::{Closed, Device};

type ColorReader<S> = <<S as Sensor>::ColorSource as FrameSource>::Reader;
type DepthReader<S> = <<S as Sensor>::DepthSource as FrameSource>::Reader;

/// Outcome of polling a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A new frame replaced the image.
    Fresh,
    /// The image is the one from a previous poll.
    Stale,
}

struct Stream<R> {
    reader: Option<R>,
    description: FrameDescription,
    matrix: ImageMatrix,
}

impl<R: FrameReader> Stream<R> {
    fn new(description: FrameDescription) -> Self {
        Self {
            reader: None,
            description,
            matrix: ImageMatrix::zeros(description.height, description.width),
        }
    }

    fn poll<P: ProcessorTrait<R::Frame, ImageMatrix>>(
        &mut self,
        name: &'static str,
        processor: &P,
    ) -> Result<FrameStatus, Error>
    where
        R::Frame: ProcessTrait,
    {
        let reader = self.reader.as_mut().ok_or(Error::NotInitialized(name))?;

        let frame = match reader.acquire_latest_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("No new {name} frame");
                return Ok(FrameStatus::Stale);
            }
            Err(error) => {
                warn!("Acquiring {name} frame failed: {error}");
                return Ok(FrameStatus::Stale);
            }
        };

        match frame.process(processor) {
            Ok(matrix) => {
                self.matrix = matrix;
                Ok(FrameStatus::Fresh)
            }
            Err(error) => {
                warn!("Converting {name} frame failed: {error}");
                Ok(FrameStatus::Stale)
            }
        }
    }
}

pub struct Opened<S: Sensor> {
    color: Option<Stream<ColorReader<S>>>,
    depth: Option<Stream<DepthReader<S>>>,
    bgra_processor: BgraProcessor,
    config: Config,
    // Taken once, by `close` or on drop
    sensor: Option<S>,
}

impl<S: Sensor> Opened<S> {
    pub(super) fn new(sensor: S, config: Config) -> Self {
        Self {
            color: None,
            depth: None,
            bgra_processor: BgraProcessor::new(),
            config,
            sensor: Some(sensor),
        }
    }

    fn sensor_mut(&mut self) -> Result<&mut S, Error> {
        self.sensor.as_mut().ok_or(Error::SensorClosed)
    }

    /// Release both readers, then close the sensor.
    fn shut_down(&mut self) -> Option<(S, Result<(), Error>)> {
        let mut sensor = self.sensor.take()?;

        info!("Shutting down sensor.");

        self.color = None;
        self.depth = None;

        let result = sensor.close();

        match &result {
            Ok(()) => info!("Sensor closed."),
            Err(error) => error!("Closing sensor failed: {error}"),
        }

        Some((sensor, result))
    }
}

impl<S: Sensor> Drop for Opened<S> {
    fn drop(&mut self) {
        self.shut_down();
    }
}

impl<S: Sensor> Device<Opened<S>> {
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn sensor(&self) -> Option<&S> {
        self.inner.sensor.as_ref()
    }

    /// Open the color stream reader. The color image is reset to black even
    /// if opening fails.
    pub fn init_color_sensor(&mut self) -> Result<(), Error> {
        let source = self
            .inner
            .sensor_mut()
            .and_then(|sensor| sensor.color_frame_source());

        let mut source = match source {
            Ok(source) => source,
            Err(error) => {
                self.inner.color = Some(Stream::new(FrameDescription::new(
                    COLOR_WIDTH,
                    COLOR_HEIGHT,
                )));
                error!("Open color sensor failed: {error}");
                return Err(error);
            }
        };

        let stream = self
            .inner
            .color
            .insert(Stream::new(source.frame_description()));

        match source.open_reader() {
            Ok(reader) => {
                stream.reader = Some(reader);
                info!("Color sensor opened.");
                Ok(())
            }
            Err(error) => {
                error!("Open color sensor failed: {error}");
                Err(error)
            }
        }
    }

    /// Open the depth stream reader. The depth image is reset to black even
    /// if opening fails.
    pub fn init_depth_sensor(&mut self) -> Result<(), Error> {
        let source = self
            .inner
            .sensor_mut()
            .and_then(|sensor| sensor.depth_frame_source());

        let mut source = match source {
            Ok(source) => source,
            Err(error) => {
                self.inner.depth = Some(Stream::new(FrameDescription::new(
                    DEPTH_WIDTH,
                    DEPTH_HEIGHT,
                )));
                error!("Open depth sensor failed: {error}");
                return Err(error);
            }
        };

        let stream = self
            .inner
            .depth
            .insert(Stream::new(source.frame_description()));

        match source.open_reader() {
            Ok(reader) => {
                stream.reader = Some(reader);
                info!("Depth sensor opened.");
                Ok(())
            }
            Err(error) => {
                error!("Open depth sensor failed: {error}");
                Err(error)
            }
        }
    }

    /// Convert the latest color frame, if the driver has a new one.
    /// Acquisition and conversion failures are logged and leave the previous
    /// image in place.
    pub fn poll_color_frame(&mut self) -> Result<FrameStatus, Error> {
        let stream = self
            .inner
            .color
            .as_mut()
            .ok_or(Error::NotInitialized("Color"))?;
        let matrix_processor = if self.inner.config.check_frame_size {
            BgrMatrixProcessor::with_expected(stream.description)
        } else {
            BgrMatrixProcessor::new()
        };

        stream.poll(
            "Color",
            &self.inner.bgra_processor.pipe(&matrix_processor),
        )
    }

    /// Convert the latest depth frame, if the driver has a new one.
    /// Acquisition and conversion failures are logged and leave the previous
    /// image in place.
    pub fn poll_depth_frame(&mut self) -> Result<FrameStatus, Error> {
        let stream = self
            .inner
            .depth
            .as_mut()
            .ok_or(Error::NotInitialized("Depth"))?;
        let mut processor = DepthProcessor::new(self.inner.config.depth_range);

        if self.inner.config.check_frame_size {
            processor = processor.with_expected(stream.description);
        }

        stream.poll("Depth", &processor)
    }

    /// Poll the color stream and return the current, possibly stale, image.
    pub fn get_color_image(&mut self) -> Result<&ImageMatrix, Error> {
        self.poll_color_frame()?;

        self.color_image().ok_or(Error::NotInitialized("Color"))
    }

    /// Poll the depth stream and return the current, possibly stale, image.
    pub fn get_depth_image(&mut self) -> Result<&ImageMatrix, Error> {
        self.poll_depth_frame()?;

        self.depth_image().ok_or(Error::NotInitialized("Depth"))
    }

    /// Last converted color image without polling.
    pub fn color_image(&self) -> Option<&ImageMatrix> {
        self.inner.color.as_ref().map(|stream| &stream.matrix)
    }

    /// Last converted depth image without polling.
    pub fn depth_image(&self) -> Option<&ImageMatrix> {
        self.inner.depth.as_ref().map(|stream| &stream.matrix)
    }

    pub fn color_description(&self) -> Option<FrameDescription> {
        self.inner.color.as_ref().map(|stream| stream.description)
    }

    pub fn depth_description(&self) -> Option<FrameDescription> {
        self.inner.depth.as_ref().map(|stream| stream.description)
    }

    /// Release both readers and shut down the sensor.
    pub fn close(self) -> Result<Device<Closed<S>>, Error> {
        let mut inner = self.inner;
        let (sensor, result) = inner.shut_down().ok_or(Error::SensorClosed)?;

        result?;

        Ok(Device {
            inner: Closed { sensor },
        })
    }
}

impl<S: Sensor> Debug for Device<Opened<S>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device<Opened>")
            .field("config", &self.inner.config)
            .field("color", &self.color_description())
            .field("depth", &self.depth_description())
            .finish_non_exhaustive()
    }
}
