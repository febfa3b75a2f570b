//! Fully-transparent raster detection.
//!
//! Tiles at the edge of a dataset are often all transparent. Visiting pixels
//! on a coarse lattice first finds the usual non-blank pixel early, while
//! the lattice offsets still cover every pixel exactly once.

use super::PixelLayout;

/// Lattice step for a dimension: 16 if it divides evenly, else 4, else 1.
pub(crate) fn lattice_stride(dim: usize) -> usize {
    if dim % 16 == 0 {
        16
    } else if dim % 4 == 0 {
        4
    } else {
        1
    }
}

/// Whether every alpha byte of a leading-alpha raster is zero.
///
/// Returns `false` for layouts without a leading alpha byte.
pub fn is_fully_transparent(data: &[u8], width: usize, height: usize, layout: PixelLayout) -> bool {
    if !layout.has_leading_alpha() {
        return false;
    }
    let bpp = layout.bytes_per_pixel();
    if data.len() < width * height * bpp {
        return false;
    }

    let row_stride = lattice_stride(height);
    let col_stride = lattice_stride(width);

    for row_offset in 0..row_stride {
        for col_offset in 0..col_stride {
            for y in (row_offset..height).step_by(row_stride) {
                let row = y * width;
                for x in (col_offset..width).step_by(col_stride) {
                    if data[(row + x) * bpp] != 0 {
                        return false;
                    }
                }
            }
        }
    }
    true
}
