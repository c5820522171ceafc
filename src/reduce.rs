use ndarray::{ArrayD, ArrayView1, ArrayViewD, Axis, IxDyn};
use rayon::prelude::*;
use tracing::trace;

use crate::element::PoolElement;
use crate::error::{checked_volume, try_buffer, PoolError, PoolResult};
use crate::window::WindowView;

/// Window count from which the reduction is spread over the rayon pool.
pub const PARALLEL_THRESHOLD: usize = 4096;

/// Max and flat argmax of a non-empty sequence given as `first` plus `rest`.
///
/// Ties keep the earliest cell. A NaN wins over every number and the first NaN
/// is reported, matching `max`/`argmax` in array libraries that propagate NaN.
pub fn select_max<T: PoolElement>(first: T, rest: impl Iterator<Item = T>) -> (T, usize) {
    let mut best = first;
    let mut best_idx = 0;
    if best.is_nan() {
        return (best, best_idx);
    }
    for (idx, value) in rest.enumerate() {
        if value > best || value.is_nan() {
            best = value;
            best_idx = idx + 1;
            if value.is_nan() {
                break;
            }
        }
    }
    (best, best_idx)
}

/// Per-window maxima, shaped like the view's outer shape.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowMax<T> {
    pub values: ArrayD<T>,
    /// Flat in-window index of the winning cell, when requested.
    pub argmax: Option<ArrayD<usize>>,
}

/// Reduces every window of `view` by max.
pub fn reduce_windows<T: PoolElement>(
    view: &WindowView<'_, T>,
    with_argmax: bool,
) -> PoolResult<WindowMax<T>> {
    let outer_shape = IxDyn(view.outer_shape());
    let count = view.num_windows();
    let window_max = |window: usize| {
        let mut cells = view.window(window);
        match cells.next() {
            Some(first) => select_max(first, cells),
            None => (T::lowest(), 0),
        }
    };

    if !with_argmax {
        let values = collect_windows(count, |window| window_max(window).0)?;
        let values = ArrayD::from_shape_vec(outer_shape, values)
            .map_err(|err| PoolError::InvariantViolation(err.to_string()))?;
        return Ok(WindowMax {
            values,
            argmax: None,
        });
    }

    let pairs = collect_windows(count, window_max)?;
    let mut values = try_buffer(count)?;
    let mut argmax = try_buffer(count)?;
    for (value, idx) in pairs {
        values.push(value);
        argmax.push(idx);
    }
    let values = ArrayD::from_shape_vec(outer_shape.clone(), values)
        .map_err(|err| PoolError::InvariantViolation(err.to_string()))?;
    let argmax = ArrayD::from_shape_vec(outer_shape, argmax)
        .map_err(|err| PoolError::InvariantViolation(err.to_string()))?;
    Ok(WindowMax {
        values,
        argmax: Some(argmax),
    })
}

fn collect_windows<R, F>(count: usize, f: F) -> PoolResult<Vec<R>>
where
    R: Send,
    F: Fn(usize) -> R + Send + Sync,
{
    let mut out = try_buffer(count)?;
    if count >= PARALLEL_THRESHOLD {
        trace!(windows = count, "parallel window reduction");
        out.par_extend((0..count).into_par_iter().map(f));
    } else {
        trace!(windows = count, "sequential window reduction");
        out.extend((0..count).map(f));
    }
    Ok(out)
}

/// Splits a flat in-window index into per-axis kernel offsets.
pub fn unravel_kernel_index<const N: usize>(mut flat: usize, kernel: &[usize; N]) -> [usize; N] {
    let mut offsets = [0usize; N];
    for axis in (0..N).rev() {
        offsets[axis] = flat % kernel[axis];
        flat /= kernel[axis];
    }
    offsets
}

/// Inverse of [`unravel_kernel_index`].
pub fn ravel_kernel_offsets<const N: usize>(offsets: &[usize; N], kernel: &[usize; N]) -> usize {
    offsets
        .iter()
        .zip(kernel)
        .fold(0, |flat, (&offset, &extent)| flat * extent + offset)
}

/// Decodes a whole argmax array, appending a trailing axis of length `N`.
pub fn decode_argmax<const N: usize>(
    argmax: &ArrayD<usize>,
    kernel: &[usize; N],
) -> PoolResult<ArrayD<usize>> {
    let mut shape = argmax.shape().to_vec();
    shape.push(N);
    let mut decoded = try_buffer(checked_volume(&shape)?)?;
    for &flat in argmax.iter() {
        decoded.extend_from_slice(&unravel_kernel_index(flat, kernel));
    }
    ArrayD::from_shape_vec(IxDyn(&shape), decoded)
        .map_err(|err| PoolError::InvariantViolation(err.to_string()))
}

/// Max over each of `axes`, removing them. `axes` must be in range, distinct
/// and of non-zero length.
pub fn max_over_axes<T: PoolElement>(x: ArrayViewD<'_, T>, axes: &[usize]) -> ArrayD<T> {
    let mut sorted = axes.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let Some((&first, rest)) = sorted.split_first() else {
        return x.to_owned();
    };
    let mut reduced = x.map_axis(Axis(first), lane_max::<T>);
    for &axis in rest {
        reduced = reduced.map_axis(Axis(axis), lane_max::<T>);
    }
    reduced
}

fn lane_max<T: PoolElement>(lane: ArrayView1<'_, T>) -> T {
    let mut cells = lane.iter().copied();
    match cells.next() {
        Some(first) => select_max(first, cells).0,
        None => T::lowest(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PoolOptions;
    use ndarray::array;

    #[test]
    fn ties_keep_the_first_cell() {
        assert_eq!(select_max(1, [5, 5, 2].into_iter()), (5, 1));
        assert_eq!(select_max(3.0, [3.0, 3.0].into_iter()), (3.0, 0));
    }

    #[test]
    fn nan_propagates_from_its_first_position() {
        let (value, idx) = select_max(1.0f32, [f32::NAN, 9.0, f32::NAN].into_iter());
        assert!(value.is_nan());
        assert_eq!(idx, 1);
        let (value, idx) = select_max(f64::NAN, [2.0].into_iter());
        assert!(value.is_nan());
        assert_eq!(idx, 0);
    }

    #[test]
    fn neg_infinity_never_beats_data() {
        let inf = f32::NEG_INFINITY;
        assert_eq!(select_max(inf, [inf, -1e30, inf].into_iter()), (-1e30, 2));
    }

    #[test]
    fn unravel_matches_row_major_order() {
        assert_eq!(unravel_kernel_index(5, &[2, 3]), [1, 2]);
        assert_eq!(unravel_kernel_index(0, &[2, 3]), [0, 0]);
        assert_eq!(unravel_kernel_index(17, &[2, 3, 3]), [1, 2, 2]);
        assert_eq!(unravel_kernel_index(3, &[4]), [3]);
    }

    #[test]
    fn ravel_inverts_unravel() {
        let kernel = [3, 1, 4];
        for flat in 0..12 {
            let offsets = unravel_kernel_index(flat, &kernel);
            assert_eq!(ravel_kernel_offsets(&offsets, &kernel), flat);
        }
    }

    #[test]
    fn reduces_every_window_with_argmax() {
        let x = array![[[1.0f32, 4.0, 2.0], [3.0, 0.0, 4.0]]]
            .into_shape(&[1, 1, 2, 3][..])
            .unwrap();
        let geometry = PoolOptions::new((2, 2)).stride(1).resolve::<2>().unwrap();
        let out = geometry.output_extents(&[2, 3]).unwrap();
        let view = WindowView::new(x.view(), &geometry, &out).unwrap();
        let reduced = reduce_windows(&view, true).unwrap();
        assert_eq!(reduced.values.shape(), &[1, 1, 1, 2]);
        assert_eq!(reduced.values.iter().copied().collect::<Vec<_>>(), vec![4.0f32, 4.0]);
        let argmax = reduced.argmax.unwrap();
        assert_eq!(argmax.shape(), &[1, 1, 1, 2]);
        assert_eq!(argmax.iter().copied().collect::<Vec<_>>(), vec![1usize, 0]);
    }

    #[test]
    fn parallel_and_sequential_paths_agree() {
        let side = 80;
        let x = ArrayD::from_shape_fn(IxDyn(&[1, 1, side, side]), |idx| {
            ((idx[2] * 31 + idx[3] * 17) % 23) as f32
        });
        let geometry = PoolOptions::new(2).stride(1).resolve::<2>().unwrap();
        let out = geometry.output_extents(&[side, side]).unwrap();
        let view = WindowView::new(x.view(), &geometry, &out).unwrap();
        assert!(view.num_windows() >= PARALLEL_THRESHOLD);
        let reduced = reduce_windows(&view, true).unwrap();
        let argmax = reduced.argmax.unwrap();
        for window in [0, 1, 79, 4000, view.num_windows() - 1] {
            let mut cells = view.window(window);
            let first = cells.next().unwrap();
            let (value, idx) = select_max(first, cells);
            assert_eq!(reduced.values.as_slice().unwrap()[window], value);
            assert_eq!(argmax.as_slice().unwrap()[window], idx);
        }
    }

    #[test]
    fn decode_appends_offset_axis() {
        let argmax = array![[0usize, 3], [5, 2]].into_dyn();
        let decoded = decode_argmax(&argmax, &[2, 3]).unwrap();
        assert_eq!(decoded.shape(), &[2, 2, 2]);
        assert_eq!(
            decoded,
            array![[[0usize, 0], [1, 0]], [[1, 2], [0, 2]]].into_dyn()
        );
    }

    #[test]
    fn max_over_axes_drops_reduced_axes() {
        let x = array![[[1, 9], [4, 2]], [[-3, -1], [-8, -2]]].into_dyn();
        let reduced = max_over_axes(x.view(), &[2, 1]);
        assert_eq!(reduced, array![9, -1].into_dyn());
        let reduced = max_over_axes(x.view(), &[0]);
        assert_eq!(reduced, array![[1, 9], [4, 2]].into_dyn());
    }
}
