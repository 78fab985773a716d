//! Moving attribute values between domains.
//!
//! A [`DomainMapping`] lists, for every destination element, the source
//! elements whose values are mixed into it. Geometry types build mappings from
//! their topology; applying one is type-generic.

use rayon::prelude::*;

use super::array::dispatch_array;
use super::{AttributeArray, AttributeType};
use crate::util::PARALLEL_GRAIN;

/// Grouped source indices for each destination element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainMapping {
    /// `offsets[i]..offsets[i + 1]` indexes `sources` for destination `i`
    offsets: Vec<u32>,
    sources: Vec<u32>,
}

impl DomainMapping {
    /// Build from `(destination, source)` pairs.
    ///
    /// Pairs may come in any order; sources of one destination keep their
    /// relative order.
    pub fn from_pairs(dst_len: usize, pairs: impl Iterator<Item = (u32, u32)> + Clone) -> Self {
        let mut offsets = vec![0_u32; dst_len + 1];
        for (dst, _) in pairs.clone() {
            offsets[dst as usize + 1] += 1;
        }
        for i in 0..dst_len {
            offsets[i + 1] += offsets[i];
        }
        let mut cursor: Vec<u32> = offsets[..dst_len].to_vec();
        let mut sources = vec![0_u32; offsets[dst_len] as usize];
        for (dst, src) in pairs {
            let slot = &mut cursor[dst as usize];
            sources[*slot as usize] = src;
            *slot += 1;
        }
        Self { offsets, sources }
    }

    /// Build where destination `i` reads exactly source `map[i]`.
    pub fn from_index_map(map: &[u32]) -> Self {
        Self {
            offsets: (0..=map.len() as u32).collect(),
            sources: map.to_vec(),
        }
    }

    /// Number of destination elements.
    #[inline]
    pub fn dst_len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Source indices mixed into destination `i`.
    #[inline]
    pub fn sources(&self, i: usize) -> &[u32] {
        &self.sources[self.offsets[i] as usize..self.offsets[i + 1] as usize]
    }

    /// Produce destination values from `src`. Destinations without sources
    /// get the default value.
    pub fn apply(&self, src: &AttributeArray) -> AttributeArray {
        dispatch_array!(src, data => AttributeArray::from_vec(self.apply_typed(data)))
    }

    fn apply_typed<T: AttributeType>(&self, src: &[T]) -> Vec<T> {
        (0..self.dst_len())
            .into_par_iter()
            .with_min_len(PARALLEL_GRAIN)
            .map(|i| {
                T::mix(
                    self.sources(i)
                        .iter()
                        .filter_map(|&s| src.get(s as usize).copied()),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_groups() {
        let m = DomainMapping::from_pairs(3, [(2, 0), (0, 1), (2, 3), (0, 2)].into_iter());
        assert_eq!(m.dst_len(), 3);
        assert_eq!(m.sources(0), &[1, 2]);
        assert!(m.sources(1).is_empty());
        assert_eq!(m.sources(2), &[0, 3]);
    }

    #[test]
    fn test_apply_mean() {
        let m = DomainMapping::from_pairs(2, [(0, 0), (0, 1), (1, 2)].into_iter());
        let src = AttributeArray::from_vec(vec![1.0_f32, 3.0, 5.0]);
        let dst = m.apply(&src);
        assert_eq!(dst.typed::<f32>(), Some(&[2.0, 5.0][..]));
    }

    #[test]
    fn test_index_map() {
        let m = DomainMapping::from_index_map(&[1, 1, 0]);
        let src = AttributeArray::from_vec(vec![10, 20]);
        assert_eq!(m.apply(&src).typed::<i32>(), Some(&[20, 20, 10][..]));
    }
}
