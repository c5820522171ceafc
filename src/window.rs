//! Zero-copy sliding-window view over a padded array.
//!
//! A [`WindowView`] reinterprets a standard-layout buffer of shape
//! `leading ++ padded_spatial` as a logical array of shape
//! `leading ++ out_extents ++ kernel`, where each logical element resolves to
//! one physical cell through
//!
//! ```text
//! physical_offset(coords) = sum(coords[i] * strides[i])
//! ```
//!
//! Output-position axes step by `stride * physical_stride` and kernel axes by
//! `dilation * physical_stride`; an axis with a single position gets stride 0.
//! Windows overlap freely, nothing is copied and the view never hands out
//! mutable access.

use ndarray::ArrayViewD;

use crate::error::{PoolError, PoolResult};
use crate::params::PoolGeometry;

#[derive(Clone, Debug)]
pub struct WindowView<'a, T> {
    data: &'a [T],
    shape: Vec<usize>,
    strides: Vec<usize>,
    outer_ndim: usize,
    /// Physical offset of every kernel cell relative to its window origin, in
    /// row-major kernel order.
    kernel_offsets: Vec<usize>,
}

impl<'a, T: Copy> WindowView<'a, T> {
    /// Builds the view. `out_extents` must come from
    /// [`PoolGeometry::output_extents`] for this padded array; any disagreement
    /// is reported as [`PoolError::InvariantViolation`].
    pub fn new<const N: usize>(
        padded: ArrayViewD<'a, T>,
        geometry: &PoolGeometry<N>,
        out_extents: &[usize; N],
    ) -> PoolResult<Self> {
        let leading = padded.ndim().checked_sub(N).ok_or_else(|| {
            PoolError::InvariantViolation(format!(
                "window over {N} spatial axes built on rank {}",
                padded.ndim()
            ))
        })?;
        geometry.validate()?;
        let physical = physical_strides(&padded)?;
        let data = padded.to_slice().ok_or_else(|| {
            PoolError::InvariantViolation("padded array is not contiguous".to_string())
        })?;

        let mut shape = Vec::with_capacity(leading + 2 * N);
        let mut strides = Vec::with_capacity(leading + 2 * N);
        shape.extend_from_slice(&padded.shape()[..leading]);
        strides.extend_from_slice(&physical[..leading]);
        for axis in 0..N {
            shape.push(out_extents[axis]);
            strides.push(step(
                out_extents[axis],
                geometry.stride[axis],
                physical[leading + axis],
            )?);
        }
        for axis in 0..N {
            shape.push(geometry.kernel[axis]);
            strides.push(step(
                geometry.kernel[axis],
                geometry.dilation[axis],
                physical[leading + axis],
            )?);
        }

        for axis in 0..N {
            let effective_kernel = geometry.effective_kernel(axis)?;
            let reach = out_extents[axis]
                .saturating_sub(1)
                .checked_mul(geometry.stride[axis])
                .and_then(|start| start.checked_add(effective_kernel));
            let extent = padded.shape()[leading + axis];
            if out_extents[axis] == 0 || reach.map_or(true, |reach| reach > extent) {
                return Err(PoolError::InvariantViolation(format!(
                    "axis {axis}: {} windows overrun an extent of {extent}",
                    out_extents[axis]
                )));
            }
        }

        let kernel_offsets = row_major_offsets(&shape[leading + N..], &strides[leading + N..]);
        Ok(Self {
            data,
            shape,
            strides,
            outer_ndim: leading + N,
            kernel_offsets,
        })
    }

    /// Logical shape: `leading ++ out_extents ++ kernel`.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Logical strides, in elements of the padded buffer.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// `leading ++ out_extents`: one entry per window.
    pub fn outer_shape(&self) -> &[usize] {
        &self.shape[..self.outer_ndim]
    }

    pub fn kernel_shape(&self) -> &[usize] {
        &self.shape[self.outer_ndim..]
    }

    /// Number of windows.
    pub fn num_windows(&self) -> usize {
        self.outer_shape().iter().product()
    }

    /// Number of cells per window.
    pub fn window_len(&self) -> usize {
        self.kernel_offsets.len()
    }

    /// Physical offset of a logical coordinate, or `None` when out of range.
    pub fn offset(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for ((&coord, &extent), &stride) in coords.iter().zip(&self.shape).zip(&self.strides) {
            if coord >= extent {
                return None;
            }
            offset += coord * stride;
        }
        Some(offset)
    }

    pub fn get(&self, coords: &[usize]) -> Option<T> {
        self.offset(coords).map(|offset| self.data[offset])
    }

    /// Cells of the window at row-major position `window` in the outer shape,
    /// in row-major kernel order (last kernel axis fastest).
    pub fn window(&self, window: usize) -> impl Iterator<Item = T> + '_ {
        let origin = self.window_origin(window);
        self.kernel_offsets
            .iter()
            .map(move |&offset| self.data[origin + offset])
    }

    fn window_origin(&self, mut window: usize) -> usize {
        let mut origin = 0;
        for (&extent, &stride) in self.outer_shape().iter().zip(&self.strides).rev() {
            origin += (window % extent) * stride;
            window /= extent;
        }
        origin
    }
}

fn physical_strides<T>(padded: &ArrayViewD<'_, T>) -> PoolResult<Vec<usize>> {
    padded
        .strides()
        .iter()
        .map(|&stride| {
            usize::try_from(stride).map_err(|_| {
                PoolError::InvariantViolation(format!("negative physical stride {stride}"))
            })
        })
        .collect()
}

/// Logical stride of an axis of `extent` positions spaced `spacing` cells
/// apart. A single position never moves, so its stride is zero.
fn step(extent: usize, spacing: usize, physical: usize) -> PoolResult<usize> {
    if extent <= 1 {
        return Ok(0);
    }
    spacing
        .checked_mul(physical)
        .ok_or(PoolError::ResourceExhausted {
            elements: usize::MAX,
        })
}

fn row_major_offsets(shape: &[usize], strides: &[usize]) -> Vec<usize> {
    let mut offsets = vec![0usize];
    for (&extent, &stride) in shape.iter().zip(strides) {
        offsets = offsets
            .iter()
            .flat_map(|&base| (0..extent).map(move |k| base + k * stride))
            .collect();
    }
    offsets
}
