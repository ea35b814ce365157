use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::r#type::CoordNum;

/// A squared distance usable as an ordered map key.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Dist2<N: CoordNum>(N);

impl<N: CoordNum> Eq for Dist2<N> {}

impl<N: CoordNum> Ord for Dist2<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        // We don't allow NaN. This should only panic on NaN
        self.0.partial_cmp(&other.0).unwrap()
    }
}

impl<N: CoordNum> PartialOrd for Dist2<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded collector for the n-nearest search: a sorted multimap from
/// squared distance to the ids found at that distance, holding on to the
/// `num_requested` closest pairs seen so far. Ids at equal distance keep
/// their insertion order, which is what breaks distance ties by point id.
#[derive(Debug)]
pub(crate) struct SortPoints<N: CoordNum> {
    num_requested: usize,
    num_points: usize,
    largest_dist2: N,
    dist2_to_ids: BTreeMap<Dist2<N>, Vec<u32>>,
}

impl<N: CoordNum> SortPoints<N> {
    pub(crate) fn new(num_requested: usize) -> Self {
        Self {
            num_requested,
            num_points: 0,
            largest_dist2: N::max_value(),
            dist2_to_ids: BTreeMap::new(),
        }
    }

    /// Accept the pair unless the buffer is full and the distance exceeds
    /// everything collected. The largest-distance bucket is evicted only
    /// when doing so still leaves more than `num_requested` pairs, so the
    /// buffer never shrinks below the requested count.
    pub(crate) fn insert(&mut self, dist2: N, point_id: u32) {
        if dist2 > self.largest_dist2 && self.num_points >= self.num_requested {
            return;
        }

        self.num_points += 1;
        self.dist2_to_ids
            .entry(Dist2(dist2))
            .or_default()
            .push(point_id);

        if self.num_points > self.num_requested {
            let (&last_dist2, last_ids) = self.dist2_to_ids.iter().next_back().unwrap();
            let last_count = last_ids.len();
            if self.num_points - last_count > self.num_requested {
                let (&prev_dist2, _) = self.dist2_to_ids.iter().rev().nth(1).unwrap();
                self.num_points -= last_count;
                self.largest_dist2 = prev_dist2.0;
                self.dist2_to_ids.remove(&last_dist2);
            }
        }
    }

    /// The current cut-off: pairs farther than this cannot make the result.
    pub(crate) fn largest_dist2(&self) -> N {
        self.largest_dist2
    }

    /// The collected ids in ascending distance order, truncated to the
    /// requested count.
    pub(crate) fn sorted_ids(&self) -> Vec<u32> {
        let num_ids = self.num_requested.min(self.num_points);
        let mut ids = Vec::with_capacity(num_ids);
        'export: for bucket in self.dist2_to_ids.values() {
            for &id in bucket {
                if ids.len() == num_ids {
                    break 'export;
                }
                ids.push(id);
            }
        }
        ids
    }
}
