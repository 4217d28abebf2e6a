use std::{
    fmt::{self, Debug},
    path::Path,
};

use ndarray::Array3;

use crate::Error;

/// Row-major, 3 channel BGR image.
#[derive(Clone, PartialEq)]
pub struct ImageMatrix(Array3<u8>);

impl ImageMatrix {
    pub const CHANNELS: usize = 3;

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self(Array3::zeros((rows, cols, Self::CHANNELS)))
    }

    /// Wraps a packed BGR buffer of exactly `rows * cols * 3` bytes.
    pub fn from_bgr(rows: usize, cols: usize, buffer: Vec<u8>) -> Result<Self, Error> {
        Ok(Self(Array3::from_shape_vec(
            (rows, cols, Self::CHANNELS),
            buffer,
        )?))
    }

    pub fn rows(&self) -> usize {
        self.0.dim().0
    }

    pub fn cols(&self) -> usize {
        self.0.dim().1
    }

    pub fn channels(&self) -> usize {
        self.0.dim().2
    }

    /// BGR value at the given position.
    pub fn pixel(&self, row: usize, col: usize) -> Option<[u8; 3]> {
        Some([
            *self.0.get((row, col, 0))?,
            *self.0.get((row, col, 1))?,
            *self.0.get((row, col, 2))?,
        ])
    }

    pub fn as_bytes(&self) -> &[u8] {
        // Only ever built in standard layout
        self.0.as_slice().unwrap_or_default()
    }

    pub fn as_array(&self) -> &Array3<u8> {
        &self.0
    }

    pub fn into_array(self) -> Array3<u8> {
        self.0
    }

    pub fn to_rgb_image(&self) -> Result<image::RgbImage, Error> {
        let mut buffer = self.as_bytes().to_vec();

        for pixel in buffer.chunks_exact_mut(Self::CHANNELS) {
            pixel.swap(0, 2);
        }

        image::RgbImage::from_raw(self.cols() as u32, self.rows() as u32, buffer).ok_or(
            Error::BufferSize {
                actual: self.as_bytes().len(),
                expected: self.rows() * self.cols() * Self::CHANNELS,
            },
        )
    }

    /// Writes the matrix to disk, the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        Ok(self.to_rgb_image()?.save(path)?)
    }
}

impl Debug for ImageMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageMatrix")
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .field("channels", &self.channels())
            .finish()
    }
}
