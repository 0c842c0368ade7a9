use std::num::NonZeroUsize;

use crate::models::Coordinate;

/// Keep every `stride`-th coordinate of a decoded route, starting with the first.
///
/// Bounds the number of nearby searches issued per category.
pub fn sample(path: &[Coordinate], stride: NonZeroUsize) -> Vec<Coordinate> {
    path.iter().step_by(stride.get()).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stride(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn straight_line(len: usize) -> Vec<Coordinate> {
        (0..len)
            .map(|i| Coordinate::new(45.0 + i as f64 * 0.01, 5.0))
            .collect()
    }

    #[test]
    fn empty_path_yields_no_samples() {
        assert!(sample(&[], stride(1)).is_empty());
        assert!(sample(&[], stride(10)).is_empty());
    }

    #[test]
    fn stride_one_keeps_everything() {
        let path = straight_line(4);
        assert_eq!(sample(&path, stride(1)), path);
    }

    #[test]
    fn first_point_always_kept() {
        let path = straight_line(3);
        assert_eq!(sample(&path, stride(10)), vec![path[0]]);
    }

    #[test]
    fn takes_every_nth_point() {
        let path = straight_line(7);
        assert_eq!(sample(&path, stride(3)), vec![path[0], path[3], path[6]]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_sample_length_is_ceiling(len in 1usize..200, s in 1usize..25) {
                let path = straight_line(len);
                let samples = sample(&path, stride(s));
                prop_assert_eq!(samples.len(), len.div_ceil(s));
            }

            #[test]
            fn prop_samples_are_strided_elements(len in 1usize..200, s in 1usize..25) {
                let path = straight_line(len);
                let samples = sample(&path, stride(s));
                for (k, point) in samples.iter().enumerate() {
                    prop_assert_eq!(*point, path[k * s]);
                }
            }
        }
    }
}
