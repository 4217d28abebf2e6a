use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use kinect_agent::{
    backend::{memory::MemorySource, MemorySensor, SyntheticConfig, SyntheticSensor},
    ColorFrame, ColorImageFormat, Config, DepthFrame, DepthRange, Device, Error,
    FrameDescription, FrameStatus, ImageMatrix, Sensor,
};

const COLOR: FrameDescription = FrameDescription::new(4, 2);
const DEPTH: FrameDescription = FrameDescription::new(3, 2);

fn color_frame(fill: [u8; 4]) -> ColorFrame {
    ColorFrame {
        format: ColorImageFormat::Bgra,
        width: COLOR.width,
        height: COLOR.height,
        buffer: fill.repeat(COLOR.pixel_count()),
        relative_time: Duration::ZERO,
    }
}

fn depth_frame(buffer: Vec<u16>) -> DepthFrame {
    DepthFrame {
        width: DEPTH.width,
        height: DEPTH.height,
        buffer,
        min_reliable_distance: 500,
        max_reliable_distance: 4500,
        relative_time: Duration::ZERO,
    }
}

fn uniform(matrix: &ImageMatrix, bgr: [u8; 3]) -> bool {
    matrix.as_bytes().chunks_exact(3).all(|pixel| pixel == bgr)
}

#[test]
fn images_start_black_with_source_size() {
    let mut device = Device::new(MemorySensor::new(COLOR, DEPTH))
        .open(Config::default())
        .unwrap();

    assert!(device.color_image().is_none());

    device.init_color_sensor().unwrap();
    device.init_depth_sensor().unwrap();

    let color = device.color_image().unwrap();
    assert_eq!((color.rows(), color.cols()), (2, 4));
    assert!(uniform(color, [0, 0, 0]));

    let depth = device.depth_image().unwrap();
    assert_eq!((depth.rows(), depth.cols()), (2, 3));
}

#[test]
fn latest_color_frame_is_converted() {
    let sensor = MemorySensor::new(COLOR, DEPTH);
    let feed = sensor.color_feed();
    let mut device = Device::new(sensor).open(Config::default()).unwrap();
    device.init_color_sensor().unwrap();

    feed.push_frame(color_frame([1, 2, 3, 255]));
    feed.push_frame(color_frame([10, 20, 30, 255]));

    let image = device.get_color_image().unwrap();

    assert!(uniform(image, [10, 20, 30]));
    assert_eq!(feed.pending(), 0);
}

#[test]
fn missing_frame_keeps_previous_image() {
    let sensor = MemorySensor::new(COLOR, DEPTH);
    let feed = sensor.color_feed();
    let mut device = Device::new(sensor).open(Config::default()).unwrap();
    device.init_color_sensor().unwrap();

    feed.push_frame(color_frame([10, 20, 30, 255]));
    assert_eq!(device.poll_color_frame().unwrap(), FrameStatus::Fresh);

    assert_eq!(device.poll_color_frame().unwrap(), FrameStatus::Stale);
    assert!(uniform(device.get_color_image().unwrap(), [10, 20, 30]));
}

#[test]
fn driver_failure_keeps_previous_image() {
    let sensor = MemorySensor::new(COLOR, DEPTH);
    let feed = sensor.color_feed();
    let mut device = Device::new(sensor).open(Config::default()).unwrap();
    device.init_color_sensor().unwrap();

    feed.push_frame(color_frame([10, 20, 30, 255]));
    device.poll_color_frame().unwrap();

    feed.push_failure("transfer timed out");

    assert_eq!(device.poll_color_frame().unwrap(), FrameStatus::Stale);
    assert!(uniform(device.color_image().unwrap(), [10, 20, 30]));
}

#[test]
fn bad_frame_keeps_previous_image() {
    let sensor = MemorySensor::new(COLOR, DEPTH);
    let feed = sensor.color_feed();
    let mut device = Device::new(sensor).open(Config::default()).unwrap();
    device.init_color_sensor().unwrap();

    feed.push_frame(color_frame([10, 20, 30, 255]));
    device.poll_color_frame().unwrap();

    let mut truncated = color_frame([0, 0, 0, 255]);
    truncated.buffer.truncate(5);
    feed.push_frame(truncated);

    assert_eq!(device.poll_color_frame().unwrap(), FrameStatus::Stale);

    feed.push_frame(ColorFrame {
        format: ColorImageFormat::Bayer,
        ..color_frame([0, 0, 0, 0])
    });

    assert_eq!(device.poll_color_frame().unwrap(), FrameStatus::Stale);
    assert!(uniform(device.color_image().unwrap(), [10, 20, 30]));
}

#[test]
fn frame_size_check_can_be_disabled() {
    let resized = ColorFrame {
        format: ColorImageFormat::Bgra,
        width: 2,
        height: 2,
        buffer: [5, 6, 7, 255].repeat(4),
        relative_time: Duration::ZERO,
    };

    let sensor = MemorySensor::new(COLOR, DEPTH);
    let feed = sensor.color_feed();
    let mut device = Device::new(sensor).open(Config::default()).unwrap();
    device.init_color_sensor().unwrap();

    feed.push_frame(resized.clone());
    assert_eq!(device.poll_color_frame().unwrap(), FrameStatus::Stale);
    assert_eq!(device.color_image().unwrap().cols(), 4);

    let sensor = MemorySensor::new(COLOR, DEPTH);
    let feed = sensor.color_feed();
    let config = Config {
        check_frame_size: false,
        ..Config::default()
    };
    let mut device = Device::new(sensor).open(config).unwrap();
    device.init_color_sensor().unwrap();

    feed.push_frame(resized);
    assert_eq!(device.poll_color_frame().unwrap(), FrameStatus::Fresh);
    assert_eq!(device.color_image().unwrap().cols(), 2);
}

#[test]
fn depth_is_remapped_to_gray() {
    let sensor = MemorySensor::new(COLOR, DEPTH);
    let feed = sensor.depth_feed();
    let mut device = Device::new(sensor).open(Config::default()).unwrap();
    device.init_depth_sensor().unwrap();

    feed.push_frame(depth_frame(vec![0, 499, 500, 767, 768, 8000]));

    let image = device.get_depth_image().unwrap();
    let intensities: Vec<u8> = image
        .as_bytes()
        .chunks_exact(3)
        .map(|pixel| {
            assert!(pixel[0] == pixel[1] && pixel[1] == pixel[2]);
            pixel[0]
        })
        .collect();

    assert_eq!(
        intensities,
        vec![0, 0, (500 % 256) as u8, 255, 0, (8000 % 256) as u8]
    );
}

#[test]
fn reliable_range_drops_far_depth() {
    let sensor = MemorySensor::new(COLOR, DEPTH);
    let feed = sensor.depth_feed();
    let config = Config {
        depth_range: DepthRange::Reliable,
        ..Config::default()
    };
    let mut device = Device::new(sensor).open(config).unwrap();
    device.init_depth_sensor().unwrap();

    feed.push_frame(depth_frame(vec![8000; 6]));

    assert!(uniform(device.get_depth_image().unwrap(), [0, 0, 0]));
}

#[test]
fn polling_needs_initialized_stream() {
    let mut device = Device::new(MemorySensor::new(COLOR, DEPTH))
        .open(Config::default())
        .unwrap();

    assert!(matches!(
        device.poll_color_frame(),
        Err(Error::NotInitialized("Color"))
    ));
    assert!(matches!(
        device.get_depth_image(),
        Err(Error::NotInitialized("Depth"))
    ));
}

#[test]
fn open_failure_is_reported() {
    let sensor = MemorySensor::new(COLOR, DEPTH).with_open_failure("no sensor");

    assert!(matches!(
        Device::new(sensor).open(Config::default()),
        Err(Error::Driver(message)) if message == "no sensor"
    ));
}

#[test]
fn reader_failure_still_allocates_image() {
    let sensor = MemorySensor::new(COLOR, DEPTH).with_reader_failure("busy");
    let mut device = Device::new(sensor).open(Config::default()).unwrap();

    assert!(device.init_depth_sensor().is_err());

    let depth = device.depth_image().unwrap();
    assert_eq!((depth.rows(), depth.cols()), (2, 3));
    assert!(matches!(
        device.poll_depth_frame(),
        Err(Error::NotInitialized("Depth"))
    ));
}

#[test]
fn close_stops_streaming_and_allows_reopen() {
    let sensor = MemorySensor::new(COLOR, DEPTH);
    let feed = sensor.color_feed();
    let mut device = Device::new(sensor).open(Config::default()).unwrap();
    device.init_color_sensor().unwrap();

    assert!(feed.is_streaming());

    let closed = device.close().unwrap();

    assert!(!feed.is_streaming());

    let mut device = closed.open(Config::default()).unwrap();
    device.init_color_sensor().unwrap();
    feed.push_frame(color_frame([1, 1, 1, 1]));

    assert_eq!(device.poll_color_frame().unwrap(), FrameStatus::Fresh);
}

#[test]
fn dropping_opened_device_closes_sensor() {
    let sensor = MemorySensor::new(COLOR, DEPTH);
    let feed = sensor.depth_feed();
    let device = Device::new(sensor).open(Config::default()).unwrap();

    drop(device);

    assert!(!feed.is_streaming());
}

/// Driver that only shuts down through `close`, with no cleanup of its own
/// on drop.
struct FlagSensor {
    inner: MemorySensor,
    open: Arc<AtomicBool>,
}

impl Sensor for FlagSensor {
    type ColorSource = MemorySource<ColorFrame>;
    type DepthSource = MemorySource<DepthFrame>;

    fn open(&mut self) -> Result<(), Error> {
        self.inner.open()?;
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&mut self) -> Result<(), Error> {
        self.open.store(false, Ordering::SeqCst);
        self.inner.close()
    }

    fn color_frame_source(&mut self) -> Result<Self::ColorSource, Error> {
        self.inner.color_frame_source()
    }

    fn depth_frame_source(&mut self) -> Result<Self::DepthSource, Error> {
        self.inner.depth_frame_source()
    }
}

#[test]
fn dropping_opened_device_closes_driver_without_drop() {
    let open = Arc::new(AtomicBool::new(false));
    let sensor = FlagSensor {
        inner: MemorySensor::new(COLOR, DEPTH),
        open: open.clone(),
    };
    let mut device = Device::new(sensor).open(Config::default()).unwrap();
    device.init_color_sensor().unwrap();
    device.init_depth_sensor().unwrap();

    assert!(open.load(Ordering::SeqCst));
    assert!(device.sensor().is_some_and(Sensor::is_open));

    drop(device);

    assert!(!open.load(Ordering::SeqCst));
}

#[test]
fn close_hands_back_closed_driver() {
    let open = Arc::new(AtomicBool::new(false));
    let sensor = FlagSensor {
        inner: MemorySensor::new(COLOR, DEPTH),
        open: open.clone(),
    };
    let device = Device::new(sensor).open(Config::default()).unwrap();

    let closed = device.close().unwrap();
    assert!(!open.load(Ordering::SeqCst));

    assert!(!closed.sensor().is_open());
}

#[test]
fn large_jpeg_frames_are_decoded() {
    let sensor = SyntheticSensor::new(SyntheticConfig {
        color_format: ColorImageFormat::Jpeg,
        color: FrameDescription::new(2560, 1440),
        frame_interval: Duration::ZERO,
        ..SyntheticConfig::default()
    })
    .unwrap();
    let mut device = Device::new(sensor).open(Config::default()).unwrap();

    device.init_color_sensor().unwrap();

    assert_eq!(device.poll_color_frame().unwrap(), FrameStatus::Fresh);

    let color = device.color_image().unwrap();
    assert_eq!((color.rows(), color.cols()), (1440, 2560));
}

#[test]
fn synthetic_sensor_runs_end_to_end() {
    for color_format in [
        ColorImageFormat::Bgra,
        ColorImageFormat::Rgba,
        ColorImageFormat::Yuy2,
        ColorImageFormat::Jpeg,
    ] {
        let sensor = SyntheticSensor::new(SyntheticConfig {
            color_format,
            color: FrameDescription::new(64, 48),
            depth: FrameDescription::new(32, 24),
            frame_interval: Duration::ZERO,
        })
        .unwrap();
        let mut device = Device::new(sensor).open(Config::default()).unwrap();

        device.init_color_sensor().unwrap();
        device.init_depth_sensor().unwrap();

        assert_eq!(
            device.poll_color_frame().unwrap(),
            FrameStatus::Fresh,
            "{color_format:?}"
        );
        assert_eq!(device.poll_depth_frame().unwrap(), FrameStatus::Fresh);

        let color = device.color_image().unwrap();
        assert_eq!((color.rows(), color.cols()), (48, 64));

        let depth = device.depth_image().unwrap();
        assert_eq!((depth.rows(), depth.cols()), (24, 32));
        // left edge carries no depth
        assert_eq!(depth.pixel(0, 0), Some([0, 0, 0]));

        device.close().unwrap();
    }
}
