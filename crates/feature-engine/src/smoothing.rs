//! Window Smoothing Filters
//!
//! Filters applied along the time axis of every extracted peak window before
//! features read it. Edges are handled by repeating the nearest sample.

use crate::FeatureError;
use ndarray::{Array1, Array3, Axis};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Maps a trace to a smoothed trace of the same length
pub trait TraceFilter: Debug + Send + Sync {
    fn filter_trace(&self, trace: &[f32]) -> Vec<f32>;
}

/// Smoothing selection as written in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SmoothingConfig {
    /// Savitzky-Golay polynomial smoothing
    Savgol { window_length: usize, polyorder: usize },
    /// Sliding median
    Median { window_length: usize },
}

impl SmoothingConfig {
    /// Validate parameters and build the filter
    pub fn build(&self) -> Result<Arc<dyn TraceFilter>, FeatureError> {
        match *self {
            SmoothingConfig::Savgol {
                window_length,
                polyorder,
            } => Ok(Arc::new(SavitzkyGolay::new(window_length, polyorder)?)),
            SmoothingConfig::Median { window_length } => {
                Ok(Arc::new(MedianSmoother::new(window_length)?))
            }
        }
    }
}

fn check_odd_window(window_length: usize) -> Result<(), FeatureError> {
    if window_length == 0 || window_length % 2 == 0 {
        return Err(FeatureError::InvalidSmoothing(format!(
            "window length must be odd and > 0, got {}",
            window_length
        )));
    }
    Ok(())
}

/// Sample at `index` with nearest-edge extension
fn nearest(trace: &[f32], index: isize) -> f32 {
    let last = trace.len() as isize - 1;
    trace[index.clamp(0, last) as usize]
}

/// Savitzky-Golay smoothing filter
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    coefficients: Vec<f64>,
}

impl SavitzkyGolay {
    /// Least-squares coefficients for a centered window
    pub fn new(window_length: usize, polyorder: usize) -> Result<Self, FeatureError> {
        check_odd_window(window_length)?;
        if polyorder >= window_length {
            return Err(FeatureError::InvalidSmoothing(format!(
                "polyorder {} must be less than window length {}",
                polyorder, window_length
            )));
        }

        let half = (window_length / 2) as i64;
        let terms = polyorder + 1;
        let offsets: Vec<f64> = (-half..=half).map(|x| x as f64).collect();

        // Normal equations G y = e0, G[a][b] = sum over x of x^(a+b)
        let mut normal = vec![vec![0.0f64; terms + 1]; terms];
        for (a, row) in normal.iter_mut().enumerate() {
            for b in 0..terms {
                row[b] = offsets.iter().map(|x| x.powi((a + b) as i32)).sum();
            }
            row[terms] = if a == 0 { 1.0 } else { 0.0 };
        }
        let solution = solve_augmented(normal).ok_or_else(|| {
            FeatureError::InvalidSmoothing(format!(
                "singular fit for window {} and polyorder {}",
                window_length, polyorder
            ))
        })?;

        let coefficients: Vec<f64> = offsets
            .iter()
            .map(|x| {
                solution
                    .iter()
                    .enumerate()
                    .map(|(k, y)| y * x.powi(k as i32))
                    .sum()
            })
            .collect();

        Ok(Self { coefficients })
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

/// Gauss-Jordan elimination with partial pivoting on an augmented matrix
fn solve_augmented(mut m: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    let n = m.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);

        let scale = m[col][col];
        for value in m[col].iter_mut() {
            *value /= scale;
        }
        for row in 0..n {
            if row != col {
                let factor = m[row][col];
                if factor != 0.0 {
                    for k in col..=n {
                        let delta = factor * m[col][k];
                        m[row][k] -= delta;
                    }
                }
            }
        }
    }
    Some(m.into_iter().map(|row| row[n]).collect())
}

impl TraceFilter for SavitzkyGolay {
    fn filter_trace(&self, trace: &[f32]) -> Vec<f32> {
        if trace.is_empty() {
            return Vec::new();
        }
        let half = (self.coefficients.len() / 2) as isize;
        (0..trace.len() as isize)
            .map(|t| {
                self.coefficients
                    .iter()
                    .enumerate()
                    .map(|(k, c)| c * nearest(trace, t + k as isize - half) as f64)
                    .sum::<f64>() as f32
            })
            .collect()
    }
}

/// Centered sliding median
#[derive(Debug, Clone)]
pub struct MedianSmoother {
    size: usize,
}

impl MedianSmoother {
    /// Create a median smoother; window size must be odd
    pub fn new(size: usize) -> Result<Self, FeatureError> {
        check_odd_window(size)?;
        Ok(Self { size })
    }
}

impl TraceFilter for MedianSmoother {
    fn filter_trace(&self, trace: &[f32]) -> Vec<f32> {
        if trace.is_empty() {
            return Vec::new();
        }
        let half = (self.size / 2) as isize;
        let mut window = vec![0.0f32; self.size];
        (0..trace.len() as isize)
            .map(|t| {
                for (k, slot) in window.iter_mut().enumerate() {
                    *slot = nearest(trace, t + k as isize - half);
                }
                window.sort_by(|a, b| a.total_cmp(b));
                window[self.size / 2]
            })
            .collect()
    }
}

/// Filter every (peak, channel) trace of a peaks x time x channels block
pub fn smooth_windows(filter: &dyn TraceFilter, windows: &mut Array3<f32>) {
    for mut lane in windows.lanes_mut(Axis(1)) {
        let smoothed = filter.filter_trace(&lane.to_vec());
        lane.assign(&Array1::from(smoothed));
    }
}
