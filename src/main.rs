use std::{fs, path::PathBuf, str::FromStr, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use kinect_agent::{
    backend::{enumerate_devices, DeviceInfo, SyntheticConfig, SyntheticSensor},
    ColorImageFormat, Config, DepthRange, Device, Error, FrameDescription, FrameStatus,
};
use log::info;

#[derive(Parser)]
#[command(name = "kinect-agent", version, about = "Kinect color and depth frame grabber")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List Kinect v2 devices connected over USB
    List,
    /// Grab frames from the synthetic sensor and save them as PNG
    Capture(CaptureArgs),
}

#[derive(clap::Args)]
struct CaptureArgs {
    /// Number of polls per stream
    #[arg(short, long, default_value_t = 30)]
    frames: u32,
    #[arg(short, long, default_value = "captures")]
    output: PathBuf,
    /// Frames per second, between 1 and 1000
    #[arg(long, default_value_t = 30.0, value_parser = parse_fps)]
    fps: f64,
    #[arg(long, value_enum, default_value_t = ColorFormat::Bgra)]
    color_format: ColorFormat,
    #[arg(long, value_enum, default_value_t = Range::Full)]
    depth_range: Range,
    #[arg(long, default_value = "1920x1080")]
    color_size: Size,
    #[arg(long, default_value = "512x424")]
    depth_size: Size,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorFormat {
    Bgra,
    Rgba,
    Yuy2,
    Jpeg,
}

impl From<ColorFormat> for ColorImageFormat {
    fn from(value: ColorFormat) -> Self {
        match value {
            ColorFormat::Bgra => ColorImageFormat::Bgra,
            ColorFormat::Rgba => ColorImageFormat::Rgba,
            ColorFormat::Yuy2 => ColorImageFormat::Yuy2,
            ColorFormat::Jpeg => ColorImageFormat::Jpeg,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Range {
    Full,
    Reliable,
}

impl From<Range> for DepthRange {
    fn from(value: Range) -> Self {
        match value {
            Range::Full => DepthRange::Full,
            Range::Reliable => DepthRange::Reliable,
        }
    }
}

#[derive(Clone, Copy)]
struct Size(FrameDescription);

impl FromStr for Size {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (width, height) = value
            .split_once('x')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value}"))?;
        let width = width.parse::<usize>().map_err(|error| format!("width: {error}"))?;
        let height = height.parse::<usize>().map_err(|error| format!("height: {error}"))?;

        Ok(Size(FrameDescription::new(width, height)))
    }
}

fn parse_fps(value: &str) -> Result<f64, String> {
    let fps = value.parse::<f64>().map_err(|error| format!("fps: {error}"))?;

    if !fps.is_finite() || fps <= 0.0 {
        return Err(format!("fps must be a positive number, got {value}"));
    }

    Ok(fps.clamp(1.0, 1000.0))
}

async fn list() -> Result<(), Error> {
    let devices = enumerate_devices().await?;

    if devices.is_empty() {
        println!("No Kinect connected");
    }

    for device in devices {
        println!(
            "{:?} address {} serial {}{}",
            device.id(),
            device.device_address(),
            device.serial_number().unwrap_or("unknown"),
            if device.is_preview() { " (preview)" } else { "" }
        );
    }

    Ok(())
}

async fn capture(args: CaptureArgs) -> Result<(), Error> {
    fs::create_dir_all(&args.output)?;

    let frame_interval = Duration::from_secs_f64(1.0 / args.fps);
    let sensor = SyntheticSensor::new(SyntheticConfig {
        color_format: args.color_format.into(),
        color: args.color_size.0,
        depth: args.depth_size.0,
        frame_interval,
    })?;
    let config = Config {
        depth_range: args.depth_range.into(),
        ..Config::default()
    };

    let mut device = Device::new(sensor).open(config)?;

    device.init_color_sensor()?;
    device.init_depth_sensor()?;

    let mut interval = tokio::time::interval(frame_interval);
    let mut saved = 0;

    for index in 0..args.frames {
        interval.tick().await;

        if device.poll_color_frame()? == FrameStatus::Fresh {
            if let Some(image) = device.color_image() {
                image.save(args.output.join(format!("color_{index:04}.png")))?;
                saved += 1;
            }
        }

        if device.poll_depth_frame()? == FrameStatus::Fresh {
            if let Some(image) = device.depth_image() {
                image.save(args.output.join(format!("depth_{index:04}.png")))?;
                saved += 1;
            }
        }
    }

    info!("Saved {saved} images to {}", args.output.display());

    device.close()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    match Cli::parse().command {
        Command::List => list().await,
        Command::Capture(args) => capture(args).await,
    }
}
