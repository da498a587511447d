//! Row-parallel pixel execution.
//!
//! A compiled transform runs over caller-owned buffers one row at a time.
//! Rows are independent, so the loop fans out over rayon once the row
//! count is comfortably larger than the worker count; tiny images stay on
//! the calling thread where fork overhead would dominate.
//!
//! Floating point XYZ needs a numeric detour: the engine encodes XYZ
//! floats over an extended range, so samples are divided by
//! [`XYZ_SCALE`] on the way in and multiplied back on the way out.

use crate::{CompiledTransform, RunError};
use cmlink_core::{ColorSpace, PixelBuffer, PixelBufferMut, PixelLayout};
use cmlink_engine::EngineError;
use rayon::prelude::*;
use tracing::trace;

/// Encoding scale of floating point XYZ samples.
pub const XYZ_SCALE: f64 = 1.0 + 32767.0 / 32768.0;

/// Rows must exceed this many per worker before the loop parallelizes.
const PARALLEL_ROW_FACTOR: usize = 10;

/// Executes `transform` over `src` into `dst`.
///
/// Both buffers must carry the layouts the transform was compiled for.
/// Per row, the pixel count is the smaller of the two buffers' widths,
/// and the row count is the smaller of the two buffers' heights; the
/// excess on the wider side is left untouched. A failing row aborts the
/// run; rows before it are complete in `dst`.
pub fn run(
    transform: &CompiledTransform,
    src: &PixelBuffer<'_>,
    dst: &mut PixelBufferMut<'_>,
) -> Result<(), RunError> {
    if src.layout != transform.input_layout() {
        return Err(RunError::LayoutMismatch {
            expected: transform.input_layout().to_string(),
            got: src.layout.to_string(),
        });
    }
    if dst.layout != transform.output_layout() {
        return Err(RunError::LayoutMismatch {
            expected: transform.output_layout().to_string(),
            got: dst.layout.to_string(),
        });
    }

    let src_rescale = xyz_rescale(&src.layout)?;
    let dst_rescale = xyz_rescale(&dst.layout)?;

    let pixels = src.pixels_per_row().min(dst.pixels_per_row());
    let rows = src.rows.min(dst.rows);
    if pixels == 0 || rows == 0 {
        return Ok(());
    }
    let src_scalars = pixels * src.layout.total_channels();
    let dst_scalars = pixels * dst.layout.total_channels();
    let dst_row_bytes = dst.row_bytes();
    let engine_transform = transform.transform();

    let workers = rayon::current_num_threads();
    let parallel = rows > workers * PARALLEL_ROW_FACTOR;
    trace!(rows, pixels, parallel, "running transform");

    let convert_row = |scratch: &mut Vec<u8>, row: usize, dst_row: &mut [u8]| -> Result<(), RunError> {
        let src_row = src.row(row);
        let result = match src_rescale {
            Some(width) => {
                scratch.clear();
                scratch.extend_from_slice(src_row);
                scale_samples(scratch, src_scalars, width, 1.0 / XYZ_SCALE);
                engine_transform.run_bytes(scratch, dst_row, pixels)
            }
            None => engine_transform.run_bytes(src_row, dst_row, pixels),
        };
        result.map_err(|source| engine_row_error(row, source))?;
        if let Some(width) = dst_rescale {
            scale_samples(dst_row, dst_scalars, width, XYZ_SCALE);
        }
        Ok(())
    };

    if parallel {
        dst.data_mut()
            .par_chunks_mut(dst_row_bytes)
            .take(rows)
            .enumerate()
            .try_for_each_init(Vec::new, |scratch, (row, dst_row)| {
                convert_row(scratch, row, dst_row)
            })
    } else {
        let mut scratch = Vec::new();
        let data = dst.data_mut();
        for row in 0..rows {
            let dst_row = &mut data[row * dst_row_bytes..(row + 1) * dst_row_bytes];
            convert_row(&mut scratch, row, dst_row)?;
        }
        Ok(())
    }
}

fn engine_row_error(row: usize, source: EngineError) -> RunError {
    RunError::Engine { row, source }
}

/// Sample byte width of a layout needing the XYZ rescale, or `None`.
///
/// Half floats have no cheap in-place arithmetic here, so XYZ half
/// buffers are rejected rather than silently miscoded.
fn xyz_rescale(layout: &PixelLayout) -> Result<Option<usize>, RunError> {
    if layout.color_space != ColorSpace::Xyz || !layout.is_float {
        return Ok(None);
    }
    match layout.bytes_per_sample() {
        4 | 8 => Ok(Some(layout.bytes_per_sample())),
        _ => Err(RunError::UnsupportedDataType {
            layout: layout.to_string(),
        }),
    }
}

fn scale_samples(bytes: &mut [u8], count: usize, width: usize, factor: f64) {
    match width {
        4 => {
            for chunk in bytes.chunks_exact_mut(4).take(count) {
                let v = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                chunk.copy_from_slice(&((v as f64 * factor) as f32).to_ne_bytes());
            }
        }
        8 => {
            for chunk in bytes.chunks_exact_mut(8).take(count) {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                let v = f64::from_ne_bytes(raw) * factor;
                chunk.copy_from_slice(&v.to_ne_bytes());
            }
        }
        _ => {}
    }
}
