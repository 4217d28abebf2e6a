#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    processor::{ProcessTrait, ProcessorTrait},
    sensor::{DepthFrame, FrameDescription},
    DepthRange, Error, ImageMatrix,
};

impl ProcessTrait for DepthFrame {}

/// Maps depth to a gray BGR matrix.
///
/// The most significant bits are discarded rather than the least significant
/// ones, so detail is preserved while the intensity wraps every 256 units.
/// Samples outside the accepted range are black.
#[derive(Debug, Default, Clone)]
pub struct DepthProcessor {
    range: DepthRange,
    expected: Option<FrameDescription>,
}

impl DepthProcessor {
    pub fn new(range: DepthRange) -> Self {
        Self {
            range,
            expected: None,
        }
    }

    /// Rejects frames whose size differs from `description`.
    pub fn with_expected(mut self, description: FrameDescription) -> Self {
        self.expected = Some(description);
        self
    }
}

#[inline]
pub fn intensity(depth: u16, min: u16, max: u16) -> u8 {
    if (min..=max).contains(&depth) {
        (depth % 256) as u8
    } else {
        0
    }
}

impl ProcessorTrait<DepthFrame, ImageMatrix> for DepthProcessor {
    fn process(&self, input: DepthFrame) -> Result<ImageMatrix, Error> {
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

        if input.buffer.len() < pixels {
            return Err(Error::BufferSize {
                actual: input.buffer.len() * size_of::<u16>(),
                expected: pixels * size_of::<u16>(),
            });
        }

        let (min, max) = self.range.bounds(&input);
        let mut buffer = vec![0u8; pixels * ImageMatrix::CHANNELS];

        #[cfg(feature = "parallel")]
        buffer
            .par_chunks_exact_mut(ImageMatrix::CHANNELS)
            .zip(input.buffer[..pixels].par_iter())
            .for_each(|(bgr, &depth)| bgr.fill(intensity(depth, min, max)));

        #[cfg(not(feature = "parallel"))]
        buffer
            .chunks_exact_mut(ImageMatrix::CHANNELS)
            .zip(&input.buffer[..pixels])
            .for_each(|(bgr, &depth)| bgr.fill(intensity(depth, min, max)));

        ImageMatrix::from_bgr(input.height, input.width, buffer)
    }
}
