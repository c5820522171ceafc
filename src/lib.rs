//! Max pooling over dense `ndarray` arrays shaped `(batch, channels, *spatial)`.
//!
//! 1, 2 and 3 spatial axes are supported with per-axis kernel size, stride,
//! padding and dilation. Padded cells hold a sentinel that never wins a max
//! comparison, windows are read through a zero-copy strided view, and the
//! winning cell of each window can be reported as per-axis offsets.
//!
//! ```
//! use ndarray::Array4;
//! use ndpool::{max_pool2d, PoolOptions};
//!
//! let x = Array4::from_shape_fn((1, 1, 6, 6), |(_, _, h, w)| (h * 6 + w) as f32);
//! let options = PoolOptions::new((3, 3)).stride(1).padding(1).return_indices(true);
//! let pooled = max_pool2d(&x, &options).unwrap();
//! assert_eq!(pooled.values.shape(), &[1, 1, 6, 6]);
//! assert_eq!(pooled.indices.unwrap().shape(), &[1, 1, 6, 6, 2]);
//! ```

pub mod backend;
pub mod element;
pub mod error;
pub mod max_pool;
pub mod padding;
pub mod params;
pub mod reduce;
pub mod window;

pub use backend::{HostAdapter, HostInput, HostOutput, HostPooling};
pub use element::PoolElement;
pub use error::{PoolError, PoolResult, Rank};
pub use max_pool::{
    global_max_pool, max_pool1d, max_pool2d, max_pool3d, MaxPool, MaxPool1D, MaxPool2D,
    MaxPool3D, Pooled,
};
pub use params::{PoolGeometry, PoolOptions, PoolParam};
pub use reduce::{ravel_kernel_offsets, unravel_kernel_index};
pub use window::WindowView;
