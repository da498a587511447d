//! Borrowed pixel buffer views.
//!
//! The execution engine never owns pixel memory; callers hand in raw
//! row-major bytes together with a [`PixelLayout`] and a row geometry.
//! `row_scalars` counts scalar samples per row (pixels times total
//! channels), matching how the surrounding image pipeline sizes its rows.

use crate::{Error, PixelLayout, Result};

/// Read-only view over caller-owned pixel rows.
#[derive(Debug)]
pub struct PixelBuffer<'a> {
    data: &'a [u8],
    /// Pixel encoding of the data.
    pub layout: PixelLayout,
    /// Number of rows.
    pub rows: usize,
    /// Scalar samples per row.
    pub row_scalars: usize,
}

/// Mutable view over caller-owned pixel rows.
#[derive(Debug)]
pub struct PixelBufferMut<'a> {
    data: &'a mut [u8],
    /// Pixel encoding of the data.
    pub layout: PixelLayout,
    /// Number of rows.
    pub rows: usize,
    /// Scalar samples per row.
    pub row_scalars: usize,
}

fn check_size(len: usize, layout: &PixelLayout, rows: usize, row_scalars: usize) -> Result<usize> {
    layout.validate()?;
    let row_bytes = row_scalars * layout.bytes_per_sample();
    let need = rows * row_bytes;
    if len < need {
        return Err(Error::UndersizedBuffer {
            rows,
            row_bytes,
            got: len,
        });
    }
    Ok(row_bytes)
}

impl<'a> PixelBuffer<'a> {
    /// Wraps caller memory, validating it can hold the declared geometry.
    pub fn new(data: &'a [u8], layout: PixelLayout, rows: usize, row_scalars: usize) -> Result<Self> {
        check_size(data.len(), &layout, rows, row_scalars)?;
        Ok(Self {
            data,
            layout,
            rows,
            row_scalars,
        })
    }

    /// Bytes per row implied by the layout.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.row_scalars * self.layout.bytes_per_sample()
    }

    /// Whole pixels per row.
    #[inline]
    pub fn pixels_per_row(&self) -> usize {
        self.row_scalars / self.layout.total_channels()
    }

    /// Returns row `i` as a byte slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[u8] {
        let rb = self.row_bytes();
        &self.data[i * rb..(i + 1) * rb]
    }
}

impl<'a> PixelBufferMut<'a> {
    /// Wraps caller memory, validating it can hold the declared geometry.
    pub fn new(
        data: &'a mut [u8],
        layout: PixelLayout,
        rows: usize,
        row_scalars: usize,
    ) -> Result<Self> {
        check_size(data.len(), &layout, rows, row_scalars)?;
        Ok(Self {
            data,
            layout,
            rows,
            row_scalars,
        })
    }

    /// Bytes per row implied by the layout.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.row_scalars * self.layout.bytes_per_sample()
    }

    /// Whole pixels per row.
    #[inline]
    pub fn pixels_per_row(&self) -> usize {
        self.row_scalars / self.layout.total_channels()
    }

    /// The underlying bytes, mutable.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }
}
