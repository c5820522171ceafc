use ndarray::{ArrayD, ArrayViewD, Axis, CowArray, IxDyn, Slice};
use tracing::debug;

use crate::element::PoolElement;
use crate::error::{checked_volume, try_buffer, PoolError, PoolResult};

/// Pads the trailing `padding.len()` axes of `x` symmetrically with
/// [`PoolElement::lowest`]. Leading axes are never padded.
///
/// The result is always in standard layout. An unpadded, already standard
/// layout input is borrowed instead of copied.
pub fn pad_spatial<'a, T: PoolElement>(
    x: ArrayViewD<'a, T>,
    padding: &[usize],
) -> PoolResult<CowArray<'a, T, IxDyn>> {
    let leading = x.ndim().checked_sub(padding.len()).ok_or_else(|| {
        PoolError::InvariantViolation(format!(
            "{} padding entries for an array of rank {}",
            padding.len(),
            x.ndim()
        ))
    })?;

    if padding.iter().all(|&p| p == 0) && x.is_standard_layout() {
        return Ok(CowArray::from(x));
    }

    let mut shape = x.shape().to_vec();
    for (extent, &pad) in shape[leading..].iter_mut().zip(padding) {
        *extent = pad
            .checked_mul(2)
            .and_then(|both| both.checked_add(*extent))
            .ok_or(PoolError::ResourceExhausted {
                elements: usize::MAX,
            })?;
    }
    let len = checked_volume(&shape)?;
    let mut buffer = try_buffer(len)?;
    buffer.resize(len, T::lowest());
    debug!(input = ?x.shape(), padded = ?shape, "padding spatial axes");

    let mut padded = ArrayD::from_shape_vec(IxDyn(&shape), buffer)
        .map_err(|err| PoolError::InvariantViolation(err.to_string()))?;
    {
        let mut interior = padded.view_mut();
        for (i, &pad) in padding.iter().enumerate() {
            let axis = Axis(leading + i);
            let extent = x.len_of(axis);
            interior.slice_axis_inplace(axis, Slice::from(pad..pad + extent));
        }
        interior.assign(&x);
    }
    Ok(CowArray::from(padded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn pads_only_spatial_axes_with_neg_infinity() {
        let x = array![[[1.0f32, 2.0], [3.0, 4.0]]].into_dyn();
        let padded = pad_spatial(x.view(), &[1]).unwrap();
        assert_eq!(padded.shape(), &[1, 2, 4]);
        let cells: Vec<f32> = padded.iter().copied().collect();
        let inf = f32::NEG_INFINITY;
        assert_eq!(cells, vec![inf, 1.0, 2.0, inf, inf, 3.0, 4.0, inf]);
    }

    #[test]
    fn pads_two_axes() {
        let x = ArrayD::<f64>::from_elem(IxDyn(&[1, 1, 2, 3]), 5.0);
        let padded = pad_spatial(x.view(), &[2, 1]).unwrap();
        assert_eq!(padded.shape(), &[1, 1, 6, 5]);
        let finite = padded.iter().filter(|v| v.is_finite()).count();
        assert_eq!(finite, 6);
        assert_eq!(padded[[0, 0, 2, 1]], 5.0);
        assert_eq!(padded[[0, 0, 1, 1]], f64::NEG_INFINITY);
    }

    #[test]
    fn integer_padding_uses_min() {
        let x = array![[[7i32]]].into_dyn();
        let padded = pad_spatial(x.view(), &[1]).unwrap();
        assert_eq!(padded.iter().copied().collect::<Vec<_>>(), vec![i32::MIN, 7, i32::MIN]);
    }

    #[test]
    fn unpadded_standard_input_is_borrowed() {
        let x = ArrayD::<f32>::zeros(IxDyn(&[2, 2, 3]));
        let padded = pad_spatial(x.view(), &[0]).unwrap();
        assert!(padded.is_view());
    }

    #[test]
    fn unpadded_transposed_input_is_copied_to_standard_layout() {
        let x = array![[[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]];
        let transposed = x.view().permuted_axes([2, 1, 0]).into_dyn();
        let padded = pad_spatial(transposed.view(), &[0]).unwrap();
        assert!(padded.is_standard_layout());
        assert_eq!(padded.shape(), &[3, 2, 1]);
        assert_eq!(padded[[2, 1, 0]], 6.0);
    }
}
