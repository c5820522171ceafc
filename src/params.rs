//! Pooling parameters: scalar-or-per-axis values, per-call options and the
//! resolved per-axis geometry used by the rest of the pipeline.

use std::fmt;
use std::str::FromStr;

use crate::error::{PoolError, PoolResult};

/// A kernel size, stride, padding or dilation given either as one value for
/// every spatial axis or as one value per axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolParam {
    Scalar(usize),
    PerAxis(Vec<usize>),
}

impl PoolParam {
    /// Expands the parameter to exactly `N` per-axis values.
    pub fn normalize<const N: usize>(&self, name: &'static str) -> PoolResult<[usize; N]> {
        match self {
            PoolParam::Scalar(value) => Ok([*value; N]),
            PoolParam::PerAxis(values) => {
                <[usize; N]>::try_from(values.as_slice()).map_err(|_| {
                    PoolError::InvalidParameterShape {
                        name,
                        expected: N,
                        got: values.len(),
                    }
                })
            }
        }
    }
}

impl From<usize> for PoolParam {
    fn from(value: usize) -> Self {
        PoolParam::Scalar(value)
    }
}

impl<const K: usize> From<[usize; K]> for PoolParam {
    fn from(values: [usize; K]) -> Self {
        PoolParam::PerAxis(values.to_vec())
    }
}

impl From<(usize, usize)> for PoolParam {
    fn from((a, b): (usize, usize)) -> Self {
        PoolParam::PerAxis(vec![a, b])
    }
}

impl From<(usize, usize, usize)> for PoolParam {
    fn from((a, b, c): (usize, usize, usize)) -> Self {
        PoolParam::PerAxis(vec![a, b, c])
    }
}

impl From<Vec<usize>> for PoolParam {
    fn from(values: Vec<usize>) -> Self {
        PoolParam::PerAxis(values)
    }
}

impl From<&[usize]> for PoolParam {
    fn from(values: &[usize]) -> Self {
        PoolParam::PerAxis(values.to_vec())
    }
}

/// Parses `"3"` as a scalar and `"2,3"`, `"(2, 3)"`, `"[2,3]"` or `"(3,)"` as
/// per-axis values.
impl FromStr for PoolParam {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PoolError::InvalidParameterType {
            name: "pool parameter",
            value: s.to_string(),
        };
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .or_else(|| {
                trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
            });

        if inner.is_none() && !trimmed.contains(',') {
            return trimmed
                .parse::<usize>()
                .map(PoolParam::Scalar)
                .map_err(|_| invalid());
        }

        let body = inner.unwrap_or(trimmed);
        let mut tokens: Vec<&str> = body.split(',').map(str::trim).collect();
        // "(3,)" is a one-element tuple
        if tokens.len() > 1 && tokens.last() == Some(&"") {
            tokens.pop();
        }
        let values = tokens
            .into_iter()
            .map(|token| token.parse::<usize>().map_err(|_| invalid()))
            .collect::<PoolResult<Vec<_>>>()?;
        Ok(PoolParam::PerAxis(values))
    }
}

impl fmt::Display for PoolParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolParam::Scalar(value) => write!(f, "{value}"),
            PoolParam::PerAxis(values) => {
                let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "({})", joined.join(", "))
            }
        }
    }
}

/// Per-call pooling configuration.
///
/// ```
/// use ndpool::PoolOptions;
///
/// let options = PoolOptions::new((3, 3)).stride(1).padding(1).return_indices(true);
/// assert!(options.return_indices);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolOptions {
    pub kernel_size: PoolParam,
    /// Defaults to the kernel size when `None`.
    pub stride: Option<PoolParam>,
    pub padding: PoolParam,
    pub dilation: PoolParam,
    pub return_indices: bool,
}

impl PoolOptions {
    pub fn new(kernel_size: impl Into<PoolParam>) -> Self {
        Self {
            kernel_size: kernel_size.into(),
            stride: None,
            padding: PoolParam::Scalar(0),
            dilation: PoolParam::Scalar(1),
            return_indices: false,
        }
    }

    pub fn stride(mut self, stride: impl Into<PoolParam>) -> Self {
        self.stride = Some(stride.into());
        self
    }

    pub fn padding(mut self, padding: impl Into<PoolParam>) -> Self {
        self.padding = padding.into();
        self
    }

    pub fn dilation(mut self, dilation: impl Into<PoolParam>) -> Self {
        self.dilation = dilation.into();
        self
    }

    pub fn return_indices(mut self, return_indices: bool) -> Self {
        self.return_indices = return_indices;
        self
    }

    /// Normalizes every parameter to `N` spatial axes and checks that kernel,
    /// stride and dilation entries are positive.
    pub fn resolve<const N: usize>(&self) -> PoolResult<PoolGeometry<N>> {
        let kernel = self.kernel_size.normalize::<N>("kernel_size")?;
        let stride = match &self.stride {
            Some(stride) => stride.normalize::<N>("stride")?,
            None => kernel,
        };
        let padding = self.padding.normalize::<N>("padding")?;
        let dilation = self.dilation.normalize::<N>("dilation")?;

        let geometry = PoolGeometry {
            kernel,
            stride,
            padding,
            dilation,
        };
        geometry.validate()?;
        Ok(geometry)
    }
}

fn require_positive(name: &'static str, values: &[usize]) -> PoolResult<()> {
    match values.iter().position(|&value| value == 0) {
        Some(axis) => Err(PoolError::InvalidParameterValue {
            name,
            axis,
            value: 0,
            min: 1,
        }),
        None => Ok(()),
    }
}

/// Fully resolved per-axis pooling parameters for `N` spatial axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolGeometry<const N: usize> {
    pub kernel: [usize; N],
    pub stride: [usize; N],
    pub padding: [usize; N],
    pub dilation: [usize; N],
}

impl<const N: usize> PoolGeometry<N> {
    /// Checks that kernel, stride and dilation entries are positive. The fields
    /// are public, so hand-built geometries go through this too.
    pub fn validate(&self) -> PoolResult<()> {
        require_positive("kernel_size", &self.kernel)?;
        require_positive("stride", &self.stride)?;
        require_positive("dilation", &self.dilation)
    }

    /// Kernel extent along `axis` once dilation gaps are included.
    pub fn effective_kernel(&self, axis: usize) -> PoolResult<usize> {
        let gaps = self.kernel[axis]
            .checked_sub(1)
            .ok_or(PoolError::InvalidParameterValue {
                name: "kernel_size",
                axis,
                value: 0,
                min: 1,
            })?;
        gaps.checked_mul(self.dilation[axis])
            .and_then(|span| span.checked_add(1))
            .ok_or(PoolError::ResourceExhausted {
                elements: usize::MAX,
            })
    }

    /// Number of cells in one window.
    pub fn window_len(&self) -> usize {
        self.kernel.iter().product()
    }

    /// Spatial extents after symmetric padding.
    pub fn padded_extents(&self, spatial: &[usize; N]) -> PoolResult<[usize; N]> {
        let mut padded = [0usize; N];
        for axis in 0..N {
            padded[axis] = self.padding[axis]
                .checked_mul(2)
                .and_then(|pad| pad.checked_add(spatial[axis]))
                .ok_or(PoolError::ResourceExhausted {
                    elements: usize::MAX,
                })?;
        }
        Ok(padded)
    }

    /// Number of window positions per axis given padded extents.
    ///
    /// Only windows lying fully inside the padded input are counted (floor
    /// division, no ceil mode).
    pub fn output_extents(&self, padded: &[usize; N]) -> PoolResult<[usize; N]> {
        self.validate()?;
        let mut out = [0usize; N];
        for axis in 0..N {
            let effective_kernel = self.effective_kernel(axis)?;
            let degenerate = PoolError::DegenerateOutputShape {
                axis,
                padded_size: padded[axis],
                effective_kernel,
                stride: self.stride[axis],
            };
            let span = padded[axis]
                .checked_sub(effective_kernel)
                .ok_or(degenerate)?;
            out[axis] = span / self.stride[axis] + 1;
        }
        Ok(out)
    }
}
