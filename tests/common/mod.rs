#![allow(dead_code)]

use ndarray::{ArrayD, Dimension, IxDyn};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub fn seeded_input(shape: &[usize], seed: u64) -> ArrayD<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    ArrayD::random_using(IxDyn(shape), Uniform::new(-10.0f32, 10.0), &mut rng)
}

/// Row-major array of any rank; `array!` stops at three axes.
pub fn tensor<T>(shape: &[usize], data: Vec<T>) -> ArrayD<T> {
    ArrayD::from_shape_vec(IxDyn(shape), data).unwrap()
}

/// Direct loop over every output position and every kernel cell, reading the
/// unpadded input and skipping cells that fall into the padding.
///
/// Returns the maxima and the flat row-major kernel index of the first
/// winning cell. Windows with no in-bounds cell yield `-inf` at index 0.
pub fn brute_force_max_pool(
    x: &ArrayD<f32>,
    kernel: &[usize],
    stride: &[usize],
    padding: &[usize],
    dilation: &[usize],
) -> (ArrayD<f32>, ArrayD<usize>) {
    let spatial = kernel.len();
    let leading = x.ndim() - spatial;
    let mut out_shape = x.shape()[..leading].to_vec();
    for axis in 0..spatial {
        let padded = x.shape()[leading + axis] + 2 * padding[axis];
        let effective = (kernel[axis] - 1) * dilation[axis] + 1;
        out_shape.push((padded - effective) / stride[axis] + 1);
    }
    let window_len: usize = kernel.iter().product();

    let mut values = ArrayD::from_elem(IxDyn(&out_shape), f32::NEG_INFINITY);
    let mut argmax = ArrayD::zeros(IxDyn(&out_shape));
    for out_idx in ndarray::indices(IxDyn(&out_shape)) {
        let mut best = f32::NEG_INFINITY;
        let mut best_flat = 0;
        for flat in 0..window_len {
            let mut rem = flat;
            let mut offsets = vec![0; spatial];
            for axis in (0..spatial).rev() {
                offsets[axis] = rem % kernel[axis];
                rem /= kernel[axis];
            }

            let mut coords: Vec<usize> = (0..leading).map(|i| out_idx[i]).collect();
            let mut in_bounds = true;
            for axis in 0..spatial {
                let pos = (out_idx[leading + axis] * stride[axis]
                    + offsets[axis] * dilation[axis]) as isize
                    - padding[axis] as isize;
                if pos < 0 || pos as usize >= x.shape()[leading + axis] {
                    in_bounds = false;
                    break;
                }
                coords.push(pos as usize);
            }
            if !in_bounds {
                continue;
            }
            let value = x[coords.as_slice()];
            if value > best {
                best = value;
                best_flat = flat;
            }
        }
        values[out_idx.slice()] = best;
        argmax[out_idx.slice()] = best_flat;
    }
    (values, argmax)
}
