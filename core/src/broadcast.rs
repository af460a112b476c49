//! N-way tensor broadcast
use stagediff_data::internal::*;

/// Computes a shape, if any, to which all shapes can be broadcasted.
pub fn multi_broadcast(shapes: &[impl AsRef<[usize]>]) -> DiffResult<TVec<usize>> {
    let Some(len) = shapes.iter().map(|shape| shape.as_ref().len()).max() else {
        return Ok(tvec!());
    };
    let mut shape: TVec<usize> = tvec!();
    for i in 0..len {
        let mut wanted_size = 1;
        for s in shapes {
            let s = s.as_ref();
            let dim = if i < s.len() { s[s.len() - i - 1] } else { 1 };
            wanted_size = match (wanted_size, dim) {
                (a, b) if a == b => a,
                (1, b) => b,
                (a, 1) => a,
                (a, b) => bail!("Can not broadcast {} against {}", a, b),
            };
        }
        shape.push(wanted_size)
    }
    shape.reverse();
    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onnx_1() {
        assert_eq!(multi_broadcast(&tvec![tvec![2, 3, 4, 5], tvec![]]).unwrap(), tvec![2, 3, 4, 5])
    }

    #[test]
    fn onnx_2() {
        assert_eq!(multi_broadcast(&tvec![tvec![2, 3, 4, 5], tvec![5]]).unwrap(), tvec![2, 3, 4, 5])
    }

    #[test]
    fn onnx_4() {
        assert_eq!(
            multi_broadcast(&tvec![tvec![1, 4, 5], tvec![2, 3, 4, 1]]).unwrap(),
            tvec![2, 3, 4, 5]
        )
    }

    #[test]
    fn channel_params() {
        assert_eq!(
            multi_broadcast(&[&[2usize, 3, 5, 5][..], &[1, 3, 1, 1][..]]).unwrap(),
            tvec![2, 3, 5, 5]
        )
    }

    #[test]
    fn incompatible() {
        assert!(multi_broadcast(&tvec![tvec![2, 3], tvec![4]]).is_err())
    }
}
