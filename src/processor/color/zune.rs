use zune_jpeg::{
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
    JpegDecoder,
};

use crate::{processor::ProcessorTrait, sensor::ColorFrame, Error, COLOR_HEIGHT, COLOR_WIDTH};

use super::{BgraImage, BGRA_BYTES};

/// ZuneJpeg color processor
#[derive(Debug, Clone, Copy, Default)]
pub struct ZuneColorProcessor;

impl ProcessorTrait<ColorFrame, BgraImage> for ZuneColorProcessor {
    fn process(&self, input: ColorFrame) -> Result<BgraImage, Error> {
        // Frames may be larger than the Kinect color resolution
        let options = DecoderOptions::new_fast()
            .set_max_height(input.height.max(COLOR_HEIGHT))
            .set_max_width(input.width.max(COLOR_WIDTH))
            .jpeg_set_out_colorspace(ColorSpace::BGRA);
        let mut decoder = JpegDecoder::new_with_options(ZCursor::new(&input.buffer), options);

        let buffer = decoder
            .decode()
            .map_err(|error| Error::Decode(format!("{error:?}")))?;
        let (width, height) = decoder
            .dimensions()
            .ok_or_else(|| Error::Decode("missing JPEG dimensions".to_owned()))?;

        if buffer.len() != width * height * BGRA_BYTES {
            return Err(Error::Decode(format!(
                "decoded {} bytes for a {width}x{height} BGRA image",
                buffer.len()
            )));
        }

        Ok(BgraImage {
            width,
            height,
            buffer,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, time::Duration};

    use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};

    use crate::{processor::ProcessTrait, sensor::ColorImageFormat};

    use super::*;

    fn jpeg_frame(width: u32, height: u32, rgb: [u8; 3]) -> ColorFrame {
        let pixels: Vec<u8> = (0..width * height).flat_map(|_| rgb).collect();
        let mut jpeg = Cursor::new(Vec::new());

        JpegEncoder::new_with_quality(&mut jpeg, 95)
            .encode(&pixels, width, height, ExtendedColorType::Rgb8)
            .unwrap();

        ColorFrame {
            format: ColorImageFormat::Jpeg,
            width: width as usize,
            height: height as usize,
            buffer: jpeg.into_inner(),
            relative_time: Duration::ZERO,
        }
    }

    #[test]
    fn decodes_to_bgra() {
        let image = jpeg_frame(16, 8, [200, 100, 50])
            .process(&ZuneColorProcessor)
            .unwrap();

        assert_eq!((image.width, image.height), (16, 8));

        let pixel = &image.buffer[..4];

        assert!(pixel[0].abs_diff(50) <= 8, "blue {}", pixel[0]);
        assert!(pixel[1].abs_diff(100) <= 8, "green {}", pixel[1]);
        assert!(pixel[2].abs_diff(200) <= 8, "red {}", pixel[2]);
    }

    #[test]
    fn decodes_frames_above_kinect_resolution() {
        let image = jpeg_frame(2560, 1440, [10, 200, 10])
            .process(&ZuneColorProcessor)
            .unwrap();

        assert_eq!((image.width, image.height), (2560, 1440));
        assert_eq!(image.buffer.len(), 2560 * 1440 * BGRA_BYTES);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let frame = ColorFrame {
            format: ColorImageFormat::Jpeg,
            width: 4,
            height: 4,
            buffer: vec![0x13; 64],
            relative_time: Duration::ZERO,
        };

        assert!(matches!(
            frame.process(&ZuneColorProcessor),
            Err(Error::Decode(_))
        ));
    }
}
