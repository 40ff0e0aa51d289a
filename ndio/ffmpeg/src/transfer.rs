/*!
    Copying frames between packed pixel buffers and strided arrays.
*/

use ndio_types::{Error, Result};

/**
    Byte strides of one frame inside an array.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PlaneStrides {
    /// Between horizontally adjacent pixels.
    pub x: usize,
    /// Between lines.
    pub y: usize,
    /// Between color channels of one pixel.
    pub channel: usize,
}

/**
    Geometry of a packed frame: `channels` interleaved components of
    `element_size` bytes per pixel.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PackedGeometry {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub element_size: usize,
}

impl PackedGeometry {
    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.channels == 0 || self.element_size == 0
    }

    fn row_bytes(&self) -> usize {
        self.width * self.channels * self.element_size
    }

    /**
        Bytes a packed buffer with the given line size must hold.
    */
    fn packed_len(&self, linesize: usize) -> usize {
        (self.height - 1) * linesize + self.row_bytes()
    }

    /**
        End of the last byte addressed in a strided buffer.
    */
    fn strided_end(&self, offset: usize, strides: PlaneStrides) -> usize {
        offset
            + (self.width - 1) * strides.x
            + (self.height - 1) * strides.y
            + (self.channels - 1) * strides.channel
            + self.element_size
    }

    fn is_interleaved(&self, strides: PlaneStrides) -> bool {
        (self.channels == 1 || strides.channel == self.element_size)
            && strides.x == self.channels * self.element_size
    }
}

/**
    Copy a packed frame into a strided array buffer starting at `offset`.
*/
pub(crate) fn scatter_packed(
    frame: &[u8],
    linesize: usize,
    geometry: PackedGeometry,
    dest: &mut [u8],
    offset: usize,
    strides: PlaneStrides,
) -> Result<()> {
    if geometry.is_empty() {
        return Ok(());
    }
    check_bounds(frame.len(), linesize, geometry, dest.len(), offset, strides)?;

    let es = geometry.element_size;
    if geometry.is_interleaved(strides) {
        let row = geometry.row_bytes();
        for y in 0..geometry.height {
            let src = y * linesize;
            let dst = offset + y * strides.y;
            dest[dst..dst + row].copy_from_slice(&frame[src..src + row]);
        }
        return Ok(());
    }

    for y in 0..geometry.height {
        for x in 0..geometry.width {
            for c in 0..geometry.channels {
                let src = y * linesize + (x * geometry.channels + c) * es;
                let dst = offset + y * strides.y + x * strides.x + c * strides.channel;
                dest[dst..dst + es].copy_from_slice(&frame[src..src + es]);
            }
        }
    }
    Ok(())
}

/**
    Copy one frame of a strided array buffer starting at `offset` into a
    packed frame.
*/
pub(crate) fn gather_packed(
    src: &[u8],
    offset: usize,
    strides: PlaneStrides,
    geometry: PackedGeometry,
    frame: &mut [u8],
    linesize: usize,
) -> Result<()> {
    if geometry.is_empty() {
        return Ok(());
    }
    check_bounds(frame.len(), linesize, geometry, src.len(), offset, strides)?;

    let es = geometry.element_size;
    if geometry.is_interleaved(strides) {
        let row = geometry.row_bytes();
        for y in 0..geometry.height {
            let s = offset + y * strides.y;
            let d = y * linesize;
            frame[d..d + row].copy_from_slice(&src[s..s + row]);
        }
        return Ok(());
    }

    for y in 0..geometry.height {
        for x in 0..geometry.width {
            for c in 0..geometry.channels {
                let s = offset + y * strides.y + x * strides.x + c * strides.channel;
                let d = y * linesize + (x * geometry.channels + c) * es;
                frame[d..d + es].copy_from_slice(&src[s..s + es]);
            }
        }
    }
    Ok(())
}

fn check_bounds(
    packed_len: usize,
    linesize: usize,
    geometry: PackedGeometry,
    strided_len: usize,
    offset: usize,
    strides: PlaneStrides,
) -> Result<()> {
    if linesize < geometry.row_bytes() || packed_len < geometry.packed_len(linesize) {
        return Err(Error::shape_mismatch(format!(
            "frame buffer of {packed_len} bytes with line size {linesize} is too small for {}x{}x{}",
            geometry.width, geometry.height, geometry.channels
        )));
    }
    let end = geometry.strided_end(offset, strides);
    if end > strided_len {
        return Err(Error::shape_mismatch(format!(
            "frame at offset {offset} needs {end} bytes but the array has {strided_len}"
        )));
    }
    Ok(())
}
