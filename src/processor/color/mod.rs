mod yuy2;
#[cfg(feature = "zune_color")]
mod zune;

use std::fmt::{self, Debug};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub(crate) use yuy2::{bgra_to_yuy2, yuy2_to_bgra};
#[cfg(feature = "zune_color")]
pub use zune::ZuneColorProcessor;

use crate::{
    processor::{ProcessTrait, ProcessorTrait},
    sensor::{ColorFrame, ColorImageFormat, FrameDescription},
    Error, ImageMatrix,
};

const BGRA_BYTES: usize = 4;

impl ProcessTrait for ColorFrame {}

/// Packed BGRA pixels, the layout every color format is normalized to.
#[derive(Clone)]
pub struct BgraImage {
    pub width: usize,
    pub height: usize,
    pub buffer: Vec<u8>,
}

impl BgraImage {
    pub const fn description(&self) -> FrameDescription {
        FrameDescription::new(self.width, self.height)
    }
}

impl ProcessTrait for BgraImage {}

impl Debug for BgraImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BgraImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("buffer_length", &self.buffer.len())
            .finish()
    }
}

fn check_length(buffer: &[u8], expected: usize) -> Result<(), Error> {
    if buffer.len() < expected {
        return Err(Error::BufferSize {
            actual: buffer.len(),
            expected,
        });
    }

    Ok(())
}

/// Brings a raw color frame to BGRA. Frames already in BGRA are moved through
/// without copying.
#[derive(Default)]
pub struct BgraProcessor {
    #[cfg(feature = "zune_color")]
    jpeg: ZuneColorProcessor,
}

impl BgraProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessorTrait<ColorFrame, BgraImage> for BgraProcessor {
    fn process(&self, input: ColorFrame) -> Result<BgraImage, Error> {
        if input.format.is_compressed() && input.buffer.is_empty() {
            return Err(Error::Decode(format!("empty {:?} frame", input.format)));
        }

        let expected = input.description().pixel_count() * input.format.bytes_per_pixel();

        match input.format {
            ColorImageFormat::Bgra => {
                let mut buffer = input.buffer;

                check_length(&buffer, expected)?;
                buffer.truncate(expected);

                Ok(BgraImage {
                    width: input.width,
                    height: input.height,
                    buffer,
                })
            }
            ColorImageFormat::Rgba => {
                let mut buffer = input.buffer;

                check_length(&buffer, expected)?;
                buffer.truncate(expected);

                for pixel in buffer.chunks_exact_mut(BGRA_BYTES) {
                    pixel.swap(0, 2);
                }

                Ok(BgraImage {
                    width: input.width,
                    height: input.height,
                    buffer,
                })
            }
            ColorImageFormat::Yuy2 => Ok(BgraImage {
                width: input.width,
                height: input.height,
                buffer: yuy2_to_bgra(&input.buffer, input.width, input.height)?,
            }),
            #[cfg(feature = "zune_color")]
            ColorImageFormat::Jpeg => self.jpeg.process(input),
            format => Err(Error::UnsupportedFormat(format)),
        }
    }
}

/// Copies BGRA pixels into a 3 channel matrix, dropping alpha.
#[derive(Debug, Default, Clone)]
pub struct BgrMatrixProcessor {
    expected: Option<FrameDescription>,
}

impl BgrMatrixProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects images whose size differs from `description`.
    pub fn with_expected(description: FrameDescription) -> Self {
        Self {
            expected: Some(description),
        }
    }
}

impl ProcessorTrait<BgraImage, ImageMatrix> for BgrMatrixProcessor {
    fn process(&self, input: BgraImage) -> Result<ImageMatrix, Error> {
        let description = input.description();

        if let Some(expected) = self.expected {
            if description != expected {
                return Err(Error::FrameSize {
                    actual: description,
                    expected,
                });
            }
        }

        let pixels = description.pixel_count();

        check_length(&input.buffer, pixels * BGRA_BYTES)?;

        let mut buffer = vec![0u8; pixels * ImageMatrix::CHANNELS];

        if pixels > 0 {
            bgra_to_bgr(
                &input.buffer[..pixels * BGRA_BYTES],
                &mut buffer,
                input.width,
            );
        }

        ImageMatrix::from_bgr(input.height, input.width, buffer)
    }
}

fn bgra_row_to_bgr(source: &[u8], destination: &mut [u8]) {
    for (bgr, bgra) in destination
        .chunks_exact_mut(ImageMatrix::CHANNELS)
        .zip(source.chunks_exact(BGRA_BYTES))
    {
        bgr.copy_from_slice(&bgra[..ImageMatrix::CHANNELS]);
    }
}

#[cfg(feature = "parallel")]
fn bgra_to_bgr(source: &[u8], destination: &mut [u8], width: usize) {
    destination
        .par_chunks_exact_mut(width * ImageMatrix::CHANNELS)
        .zip(source.par_chunks_exact(width * BGRA_BYTES))
        .for_each(|(destination, source)| bgra_row_to_bgr(source, destination));
}

#[cfg(not(feature = "parallel"))]
fn bgra_to_bgr(source: &[u8], destination: &mut [u8], width: usize) {
    destination
        .chunks_exact_mut(width * ImageMatrix::CHANNELS)
        .zip(source.chunks_exact(width * BGRA_BYTES))
        .for_each(|(destination, source)| bgra_row_to_bgr(source, destination));
}
