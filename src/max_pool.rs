use ndarray::{ArrayBase, ArrayD, ArrayViewD, Axis, Data, Dimension};
use tracing::debug;

use crate::element::PoolElement;
use crate::error::{PoolError, PoolResult, Rank};
use crate::padding::pad_spatial;
use crate::params::PoolOptions;
use crate::reduce::{decode_argmax, max_over_axes, reduce_windows};
use crate::window::WindowView;

/// Leading (batch, channel) axes that are never pooled.
pub const LEADING_AXES: usize = 2;

/// Result of a windowed max pool.
#[derive(Clone, Debug, PartialEq)]
pub struct Pooled<T> {
    /// Shape `(batch, channels, *out_extents)`.
    pub values: ArrayD<T>,
    /// Shape `(batch, channels, *out_extents, spatial_ndim)`: per-axis offset of
    /// the winning cell inside its window. Present only when requested.
    pub indices: Option<ArrayD<usize>>,
}

impl<T> Pooled<T> {
    pub fn into_parts(self) -> (ArrayD<T>, Option<ArrayD<usize>>) {
        (self.values, self.indices)
    }
}

/// Max pooling layer over `N` spatial axes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaxPool<const N: usize> {
    pub options: PoolOptions,
}

pub type MaxPool1D = MaxPool<1>;
pub type MaxPool2D = MaxPool<2>;
pub type MaxPool3D = MaxPool<3>;

impl<const N: usize> MaxPool<N> {
    pub fn new(options: PoolOptions) -> Self {
        Self { options }
    }

    pub fn forward<S, D, T>(&self, input: &ArrayBase<S, D>) -> PoolResult<Pooled<T>>
    where
        S: Data<Elem = T>,
        D: Dimension,
        T: PoolElement,
    {
        max_pool_nd::<T, N>(input.view().into_dyn(), &self.options)
    }
}

/// 1D max pooling over `(N, C, L)`.
pub fn max_pool1d<S, D, T>(x: &ArrayBase<S, D>, options: &PoolOptions) -> PoolResult<Pooled<T>>
where
    S: Data<Elem = T>,
    D: Dimension,
    T: PoolElement,
{
    max_pool_nd::<T, 1>(x.view().into_dyn(), options)
}

/// 2D max pooling over `(N, C, H, W)`.
///
/// ```
/// use ndarray::Array4;
/// use ndpool::{max_pool2d, PoolOptions};
///
/// let x = Array4::from_shape_fn((1, 1, 4, 4), |(_, _, h, w)| (h * 4 + w) as f32);
/// let pooled = max_pool2d(&x, &PoolOptions::new(2)).unwrap();
/// assert_eq!(pooled.values.shape(), &[1, 1, 2, 2]);
/// assert_eq!(pooled.values[[0, 0, 1, 1]], 15.0);
/// ```
pub fn max_pool2d<S, D, T>(x: &ArrayBase<S, D>, options: &PoolOptions) -> PoolResult<Pooled<T>>
where
    S: Data<Elem = T>,
    D: Dimension,
    T: PoolElement,
{
    max_pool_nd::<T, 2>(x.view().into_dyn(), options)
}

/// 3D max pooling over `(N, C, D, H, W)`.
pub fn max_pool3d<S, D, T>(x: &ArrayBase<S, D>, options: &PoolOptions) -> PoolResult<Pooled<T>>
where
    S: Data<Elem = T>,
    D: Dimension,
    T: PoolElement,
{
    max_pool_nd::<T, 3>(x.view().into_dyn(), options)
}

fn max_pool_nd<T: PoolElement, const N: usize>(
    x: ArrayViewD<'_, T>,
    options: &PoolOptions,
) -> PoolResult<Pooled<T>> {
    if x.ndim() != LEADING_AXES + N {
        return Err(PoolError::RankMismatch {
            expected: Rank::Exactly(LEADING_AXES + N),
            got: x.ndim(),
        });
    }

    let geometry = options.resolve::<N>()?;
    let mut spatial = [0usize; N];
    spatial.copy_from_slice(&x.shape()[LEADING_AXES..]);
    let padded_extents = geometry.padded_extents(&spatial)?;
    let out_extents = geometry.output_extents(&padded_extents)?;
    debug!(
        input = ?x.shape(),
        kernel = ?geometry.kernel,
        stride = ?geometry.stride,
        padding = ?geometry.padding,
        dilation = ?geometry.dilation,
        output = ?out_extents,
        "max pool"
    );

    let padded = pad_spatial(x, &geometry.padding)?;
    let view = WindowView::new(padded.view(), &geometry, &out_extents)?;
    let reduced = reduce_windows(&view, options.return_indices)?;
    let indices = match reduced.argmax {
        Some(argmax) => Some(decode_argmax(&argmax, &geometry.kernel)?),
        None => None,
    };
    Ok(Pooled {
        values: reduced.values,
        indices,
    })
}

/// Max over whole axes with no windowing.
///
/// `axes` defaults to every axis from 2 onward; negative entries count from the
/// end. The reduced axes are removed from the result.
pub fn global_max_pool<S, D, T>(
    x: &ArrayBase<S, D>,
    axes: Option<&[isize]>,
) -> PoolResult<ArrayD<T>>
where
    S: Data<Elem = T>,
    D: Dimension,
    T: PoolElement,
{
    let x = x.view().into_dyn();
    let ndim = x.ndim();
    if ndim < LEADING_AXES + 1 {
        return Err(PoolError::RankMismatch {
            expected: Rank::AtLeast(LEADING_AXES + 1),
            got: ndim,
        });
    }

    let axes = match axes {
        Some(axes) => normalize_axes(axes, ndim)?,
        None => (LEADING_AXES..ndim).collect(),
    };
    if let Some(&axis) = axes.iter().find(|&&axis| x.len_of(Axis(axis)) == 0) {
        return Err(PoolError::EmptyReduction { axis });
    }
    debug!(input = ?x.shape(), axes = ?axes, "global max pool");
    Ok(max_over_axes(x, &axes))
}

fn normalize_axes(axes: &[isize], ndim: usize) -> PoolResult<Vec<usize>> {
    let mut normalized: Vec<usize> = Vec::with_capacity(axes.len());
    for &axis in axes {
        let resolved = if axis < 0 {
            axis.checked_add(ndim as isize)
        } else {
            Some(axis)
        };
        let resolved = match resolved {
            Some(value) if value >= 0 && (value as usize) < ndim => value as usize,
            _ => return Err(PoolError::InvalidAxis { axis, ndim }),
        };
        if normalized.contains(&resolved) {
            return Err(PoolError::DuplicateAxis { axis: resolved });
        }
        normalized.push(resolved);
    }
    Ok(normalized)
}
