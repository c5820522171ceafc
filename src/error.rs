use std::fmt;

use thiserror::Error;

/// Rank requirement reported by [`PoolError::RankMismatch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rank {
    Exactly(usize),
    AtLeast(usize),
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Exactly(n) => write!(f, "{n}"),
            Rank::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Errors raised by the pooling pipeline.
///
/// Every variant is detected before any padded copy or window view is built,
/// so a failed call never produces a partial result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A parameter could not be read as an integer or a sequence of integers.
    #[error("{name} must be an integer or a sequence of integers, got `{value}`")]
    InvalidParameterType { name: &'static str, value: String },
    /// A per-axis parameter has the wrong number of entries.
    #[error("{name} expects {expected} per-axis values, got {got}")]
    InvalidParameterShape {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    /// A per-axis entry is below its allowed minimum.
    #[error("{name}[{axis}] must be >= {min}, got {value}")]
    InvalidParameterValue {
        name: &'static str,
        axis: usize,
        value: usize,
        min: usize,
    },
    /// The input array does not have the rank the entry point requires.
    #[error("expected an input of rank {expected}, got rank {got}")]
    RankMismatch { expected: Rank, got: usize },
    /// The dilated kernel does not fit in the padded input even once.
    #[error(
        "axis {axis}: effective kernel {effective_kernel} with stride {stride} \
         leaves no window inside padded extent {padded_size}"
    )]
    DegenerateOutputShape {
        axis: usize,
        padded_size: usize,
        effective_kernel: usize,
        stride: usize,
    },
    /// A reduction axis is outside `-ndim..ndim`.
    #[error("axis {axis} is out of range for an array of rank {ndim}")]
    InvalidAxis { axis: isize, ndim: usize },
    /// The same axis was listed twice for a reduction.
    #[error("axis {axis} listed more than once")]
    DuplicateAxis { axis: usize },
    /// Max over an axis of length zero has no value.
    #[error("cannot take the max over empty axis {axis}")]
    EmptyReduction { axis: usize },
    /// A buffer of the requested size could not be allocated.
    #[error("unable to allocate {elements} elements")]
    ResourceExhausted { elements: usize },
    /// The external tensor framework is not present.
    #[error("backend `{backend}` is not available")]
    BackendUnavailable { backend: &'static str },
    /// The external tensor framework reported a failure.
    #[error("backend `{backend}` failed: {message}")]
    BackendFailure {
        backend: &'static str,
        message: String,
    },
    /// Internal shape/stride arithmetic disagreed with itself. This is a bug.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

pub type PoolResult<T> = Result<T, PoolError>;

/// Product of `dims`, failing with `ResourceExhausted` on overflow.
pub(crate) fn checked_volume(dims: &[usize]) -> PoolResult<usize> {
    dims.iter().try_fold(1usize, |acc, &d| {
        acc.checked_mul(d)
            .ok_or(PoolError::ResourceExhausted { elements: usize::MAX })
    })
}

/// Allocates an empty vector able to hold `len` elements without reallocating.
pub(crate) fn try_buffer<T>(len: usize) -> PoolResult<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| PoolError::ResourceExhausted { elements: len })?;
    Ok(buffer)
}
