//! Adapter for delegating 2D max pooling to an external tensor framework.
//!
//! The host framework is an alternate backend, never a fallback: when it is
//! absent every call fails with [`PoolError::BackendUnavailable`] and the
//! native pipeline is not consulted.

use ndarray::{ArrayD, ArrayViewD};
use tracing::debug;

use crate::error::{PoolError, PoolResult};
use crate::params::{PoolGeometry, PoolOptions};

/// A tensor framework that provides its own 2D max pooling primitive.
///
/// Failures inside the framework should surface as
/// [`PoolError::BackendFailure`].
pub trait HostPooling {
    /// The framework's tensor type.
    type Tensor;

    fn from_array(&self, x: ArrayViewD<'_, f32>) -> PoolResult<Self::Tensor>;

    fn to_array(&self, tensor: &Self::Tensor) -> PoolResult<ArrayD<f32>>;

    /// Converts an indices tensor produced by [`HostPooling::max_pool2d`].
    fn indices_to_array(&self, tensor: &Self::Tensor) -> PoolResult<ArrayD<i64>>;

    /// Pools with the framework's own semantics for kernel, stride, padding
    /// and dilation. Indices follow whatever convention the framework uses.
    fn max_pool2d(
        &self,
        input: &Self::Tensor,
        geometry: &PoolGeometry<2>,
        return_indices: bool,
    ) -> PoolResult<(Self::Tensor, Option<Self::Tensor>)>;
}

/// Input to the adapter, in either representation.
pub enum HostInput<'a, H: HostPooling> {
    Native(ArrayViewD<'a, f32>),
    Host(&'a H::Tensor),
}

/// Output of the adapter, in the representation the input arrived in.
pub enum HostOutput<H: HostPooling> {
    Native {
        values: ArrayD<f32>,
        indices: Option<ArrayD<i64>>,
    },
    Host {
        values: H::Tensor,
        indices: Option<H::Tensor>,
    },
}

/// Capability-checked handle to a host framework.
pub struct HostAdapter<H> {
    backend: &'static str,
    host: Option<H>,
}

impl<H: HostPooling> HostAdapter<H> {
    /// Runs `probe` once; its result decides availability for the adapter's
    /// lifetime.
    pub fn detect(backend: &'static str, probe: impl FnOnce() -> Option<H>) -> Self {
        let host = probe();
        debug!(backend, available = host.is_some(), "probed pooling backend");
        Self { backend, host }
    }

    pub fn is_available(&self) -> bool {
        self.host.is_some()
    }

    pub fn max_pool2d(
        &self,
        input: HostInput<'_, H>,
        options: &PoolOptions,
    ) -> PoolResult<HostOutput<H>> {
        let host = self.host.as_ref().ok_or(PoolError::BackendUnavailable {
            backend: self.backend,
        })?;
        let geometry = options.resolve::<2>()?;

        match input {
            HostInput::Native(x) => {
                let tensor = host.from_array(x)?;
                let (values, indices) =
                    host.max_pool2d(&tensor, &geometry, options.return_indices)?;
                let indices = match indices {
                    Some(indices) => Some(host.indices_to_array(&indices)?),
                    None => None,
                };
                Ok(HostOutput::Native {
                    values: host.to_array(&values)?,
                    indices,
                })
            }
            HostInput::Host(tensor) => {
                let (values, indices) =
                    host.max_pool2d(tensor, &geometry, options.return_indices)?;
                Ok(HostOutput::Host { values, indices })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct NoHost;

    impl HostPooling for NoHost {
        type Tensor = ();

        fn from_array(&self, _x: ArrayViewD<'_, f32>) -> PoolResult<()> {
            panic!("absent backend must not be called")
        }

        fn to_array(&self, _tensor: &()) -> PoolResult<ArrayD<f32>> {
            panic!("absent backend must not be called")
        }

        fn indices_to_array(&self, _tensor: &()) -> PoolResult<ArrayD<i64>> {
            panic!("absent backend must not be called")
        }

        fn max_pool2d(
            &self,
            _input: &(),
            _geometry: &PoolGeometry<2>,
            _return_indices: bool,
        ) -> PoolResult<((), Option<()>)> {
            panic!("absent backend must not be called")
        }
    }

    #[test]
    fn absent_host_is_unavailable_not_fallback() {
        let probes = Cell::new(0);
        let adapter = HostAdapter::<NoHost>::detect("torch", || {
            probes.set(probes.get() + 1);
            None
        });
        assert!(!adapter.is_available());
        let x = ArrayD::<f32>::zeros(ndarray::IxDyn(&[1, 1, 4, 4]));
        for _ in 0..2 {
            let err = adapter
                .max_pool2d(HostInput::Native(x.view()), &PoolOptions::new(2))
                .err()
                .unwrap();
            assert_eq!(err, PoolError::BackendUnavailable { backend: "torch" });
        }
        assert_eq!(probes.get(), 1);
    }
}
