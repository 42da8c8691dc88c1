//! Ragged Array Encoding
//!
//! The solver only accepts fixed-shape arrays, so variable-length per-edge and
//! per-experiment collections (substrates, inhibitors, knockouts, ...) are flattened into
//! one array plus a pair of 1-based, inclusive bounds per group.
//!
//! Group `i` occupies `flat[start - 1 .. end]`. An empty group is encoded as
//! `end == start - 1` and contributes nothing to the flat array. Bounds are contiguous:
//! each group starts right after the previous one ends.

use serde::Serialize;

use crate::error::EncodingError;

/// A list of integer groups encoded as a flat array plus bounds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RaggedArray {
    flat: Vec<usize>,
    bounds: Vec<(usize, usize)>,
}

impl RaggedArray {
    /// Encodes a sequence of groups.
    ///
    /// # Arguments
    ///
    /// * `groups` - The groups in order; each group is a sequence of integers
    ///
    /// # Returns
    ///
    /// The encoded array. Encoding cannot fail.
    pub fn encode<G, I>(groups: G) -> Self
    where
        G: IntoIterator<Item = I>,
        I: IntoIterator<Item = usize>,
    {
        let mut flat = Vec::new();
        let mut bounds = Vec::new();

        for group in groups {
            let start = flat.len() + 1;
            flat.extend(group);
            bounds.push((start, flat.len()));
        }

        Self { flat, bounds }
    }

    /// Rebuilds an encoding from its parts, checking that the bounds are 1-based,
    /// contiguous and cover the flat array exactly.
    pub fn from_parts(flat: Vec<usize>, bounds: Vec<(usize, usize)>) -> Result<Self, EncodingError> {
        let mut expected = 1;
        for (group, &(start, end)) in bounds.iter().enumerate() {
            if start != expected {
                return Err(EncodingError::NonContiguousBounds {
                    group,
                    expected,
                    found: start,
                });
            }
            if end + 1 < start || end > flat.len() {
                return Err(EncodingError::BoundsOutOfRange {
                    group,
                    start,
                    end,
                    len: flat.len(),
                });
            }
            expected = end + 1;
        }

        if expected != flat.len() + 1 {
            return Err(EncodingError::NonContiguousBounds {
                group: bounds.len(),
                expected,
                found: flat.len() + 1,
            });
        }

        Ok(Self { flat, bounds })
    }

    /// Returns group `index` (0-based) as a slice of the flat array.
    pub fn group(&self, index: usize) -> Result<&[usize], EncodingError> {
        let &(start, end) = self.bounds.get(index).ok_or(EncodingError::UnknownCode {
            space: "ragged group".to_string(),
            code: index + 1,
            size: self.bounds.len(),
        })?;

        if end + 1 < start || end > self.flat.len() {
            return Err(EncodingError::BoundsOutOfRange {
                group: index,
                start,
                end,
                len: self.flat.len(),
            });
        }

        Ok(&self.flat[start - 1..end])
    }

    /// Reconstructs the original groups.
    pub fn decode(&self) -> Result<Vec<Vec<usize>>, EncodingError> {
        (0..self.bounds.len())
            .map(|i| self.group(i).map(<[usize]>::to_vec))
            .collect()
    }

    pub fn flat(&self) -> &[usize] {
        &self.flat
    }

    pub fn bounds(&self) -> &[(usize, usize)] {
        &self.bounds
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_groups() {
        let ragged = RaggedArray::encode(vec![vec![3, 1], vec![], vec![2], vec![4, 5, 6]]);

        assert_eq!(ragged.flat(), &[3, 1, 2, 4, 5, 6]);
        assert_eq!(ragged.bounds(), &[(1, 2), (3, 2), (3, 3), (4, 6)]);
        assert_eq!(ragged.len(), 4);
    }

    #[test]
    fn test_decode_reconstructs_groups() {
        let groups = vec![vec![], vec![7], vec![], vec![1, 2, 3], vec![]];
        let ragged = RaggedArray::encode(groups.clone());
        assert_eq!(ragged.decode().unwrap(), groups);
    }

    #[test]
    fn test_only_empty_groups() {
        let ragged = RaggedArray::encode(vec![Vec::<usize>::new(), Vec::new()]);
        assert!(ragged.flat().is_empty());
        assert_eq!(ragged.bounds(), &[(1, 0), (1, 0)]);
        assert_eq!(ragged.decode().unwrap(), vec![Vec::<usize>::new(), Vec::new()]);
    }

    #[test]
    fn test_no_groups() {
        let ragged = RaggedArray::encode(Vec::<Vec<usize>>::new());
        assert!(ragged.is_empty());
        assert!(ragged.decode().unwrap().is_empty());
    }

    #[test]
    fn test_bounds_are_monotone_and_disjoint() {
        let ragged = RaggedArray::encode(vec![vec![1, 2], vec![], vec![3], vec![4, 5]]);
        for window in ragged.bounds().windows(2) {
            let (_, prev_end) = window[0];
            let (next_start, next_end) = window[1];
            assert_eq!(next_start, prev_end + 1);
            assert!(next_end + 1 >= next_start);
        }
    }

    #[test]
    fn test_from_parts_rejects_overflow() {
        let result = RaggedArray::from_parts(vec![1, 2], vec![(1, 1), (2, 3)]);
        assert!(matches!(
            result,
            Err(EncodingError::BoundsOutOfRange { group: 1, .. })
        ));
    }

    #[test]
    fn test_from_parts_rejects_gap() {
        let result = RaggedArray::from_parts(vec![1, 2, 3], vec![(1, 1), (3, 3)]);
        assert!(matches!(
            result,
            Err(EncodingError::NonContiguousBounds {
                group: 1,
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_from_parts_accepts_encoding() {
        let ragged = RaggedArray::encode(vec![vec![9], vec![], vec![8, 7]]);
        let rebuilt =
            RaggedArray::from_parts(ragged.flat().to_vec(), ragged.bounds().to_vec()).unwrap();
        assert_eq!(rebuilt, ragged);
    }
}
