//! Packed 4:2:2 YUV, two pixels stored as `Y0 U Y1 V`.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::Error;

const YUY2_BYTES: usize = 2;
const BGRA_BYTES: usize = 4;

// BT.601, full range
#[inline]
fn yuv_to_bgr(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).round().clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).round().clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).round().clamp(0.0, 255.0) as u8;

    [b, g, r]
}

#[inline]
fn bgr_to_yuv(b: u8, g: u8, r: u8) -> [f32; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);

    [
        0.299 * r + 0.587 * g + 0.114 * b,
        -0.168736 * r - 0.331264 * g + 0.5 * b + 128.0,
        0.5 * r - 0.418688 * g - 0.081312 * b + 128.0,
    ]
}

fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn check(buffer: &[u8], width: usize, height: usize, bytes_per_pixel: usize) -> Result<(), Error> {
    if width % 2 != 0 {
        return Err(Error::OddWidth(width));
    }

    let expected = width * height * bytes_per_pixel;

    if buffer.len() < expected {
        return Err(Error::BufferSize {
            actual: buffer.len(),
            expected,
        });
    }

    Ok(())
}

fn yuy2_row_to_bgra(source: &[u8], destination: &mut [u8]) {
    for (bgra, yuy2) in destination
        .chunks_exact_mut(2 * BGRA_BYTES)
        .zip(source.chunks_exact(2 * YUY2_BYTES))
    {
        let [y0, u, y1, v] = [yuy2[0], yuy2[1], yuy2[2], yuy2[3]];

        bgra[..3].copy_from_slice(&yuv_to_bgr(y0, u, v));
        bgra[3] = u8::MAX;
        bgra[4..7].copy_from_slice(&yuv_to_bgr(y1, u, v));
        bgra[7] = u8::MAX;
    }
}

fn bgra_row_to_yuy2(source: &[u8], destination: &mut [u8]) {
    for (yuy2, bgra) in destination
        .chunks_exact_mut(2 * YUY2_BYTES)
        .zip(source.chunks_exact(2 * BGRA_BYTES))
    {
        let [y0, u0, v0] = bgr_to_yuv(bgra[0], bgra[1], bgra[2]);
        let [y1, u1, v1] = bgr_to_yuv(bgra[4], bgra[5], bgra[6]);

        yuy2[0] = to_byte(y0);
        yuy2[1] = to_byte((u0 + u1) / 2.0);
        yuy2[2] = to_byte(y1);
        yuy2[3] = to_byte((v0 + v1) / 2.0);
    }
}

pub(crate) fn yuy2_to_bgra(buffer: &[u8], width: usize, height: usize) -> Result<Vec<u8>, Error> {
    check(buffer, width, height, YUY2_BYTES)?;

    let mut bgra = vec![0u8; width * height * BGRA_BYTES];

    if width == 0 {
        return Ok(bgra);
    }

    let source = &buffer[..width * height * YUY2_BYTES];

    #[cfg(feature = "parallel")]
    bgra.par_chunks_exact_mut(width * BGRA_BYTES)
        .zip(source.par_chunks_exact(width * YUY2_BYTES))
        .for_each(|(destination, source)| yuy2_row_to_bgra(source, destination));

    #[cfg(not(feature = "parallel"))]
    bgra.chunks_exact_mut(width * BGRA_BYTES)
        .zip(source.chunks_exact(width * YUY2_BYTES))
        .for_each(|(destination, source)| yuy2_row_to_bgra(source, destination));

    Ok(bgra)
}

/// Chroma of each pixel pair is averaged.
pub(crate) fn bgra_to_yuy2(buffer: &[u8], width: usize, height: usize) -> Result<Vec<u8>, Error> {
    check(buffer, width, height, BGRA_BYTES)?;

    let mut yuy2 = vec![0u8; width * height * YUY2_BYTES];

    if width == 0 {
        return Ok(yuy2);
    }

    yuy2.chunks_exact_mut(width * YUY2_BYTES)
        .zip(buffer.chunks_exact(width * BGRA_BYTES))
        .for_each(|(destination, source)| bgra_row_to_yuy2(source, destination));

    Ok(yuy2)
}
