//! Channel Neighborhoods

use crate::FeatureError;
use ndarray::{Array2, ArrayView2};

/// Boolean channel x channel neighbor matrix.
///
/// Row `i` marks the channels within the radius of channel `i`. Neighbor
/// lists are derived from the mask in ascending channel order, so any two
/// masks holding the same sets yield the same lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparsityMask {
    mask: Array2<bool>,
    neighbors: Vec<Vec<usize>>,
}

impl SparsityMask {
    /// `mask[i][j] = distance[i][j] <= radius`
    pub fn from_distances(
        distances: ArrayView2<'_, f64>,
        radius: f64,
    ) -> Result<Self, FeatureError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(FeatureError::InvalidRadius(radius));
        }
        Ok(Self::from_mask(distances.mapv(|d| d <= radius)))
    }

    /// Build from explicit neighbor lists, one per channel
    pub fn from_neighbors(num_channels: usize, neighbors: &[Vec<usize>]) -> Self {
        let mut mask = Array2::from_elem((num_channels, num_channels), false);
        for (channel, list) in neighbors.iter().enumerate().take(num_channels) {
            for &neighbor in list.iter().filter(|&&n| n < num_channels) {
                mask[[channel, neighbor]] = true;
            }
        }
        Self::from_mask(mask)
    }

    fn from_mask(mask: Array2<bool>) -> Self {
        let neighbors = mask
            .outer_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, inside)| **inside)
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();
        Self { mask, neighbors }
    }

    pub fn num_channels(&self) -> usize {
        self.mask.nrows()
    }

    pub fn mask(&self) -> ArrayView2<'_, bool> {
        self.mask.view()
    }

    pub fn contains(&self, channel: usize, neighbor: usize) -> bool {
        self.mask.get([channel, neighbor]).copied().unwrap_or(false)
    }

    /// Neighbors of `channel` in ascending order
    pub fn neighbors(&self, channel: usize) -> Option<&[usize]> {
        self.neighbors.get(channel).map(Vec::as_slice)
    }
}
