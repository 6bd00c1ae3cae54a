//! Class activation maps.

use ndarray::Array2;

/// A 2D class activation map.
///
/// Invariant: values lie in `[0, 1]`, the minimum is 0, and the maximum is
/// either 1 or, for a degenerate (uniformly zero) map, 0.
#[derive(Debug, Clone)]
pub struct Cam {
    values: Array2<f32>,
}

impl Cam {
    /// Builds a CAM from raw spatial importance values, enforcing the
    /// normalization invariant: the minimum is subtracted, then the values
    /// are divided by the maximum if it is nonzero. A raw map with no
    /// spread stays all-zero instead of producing NaN.
    pub fn normalized_from(mut raw: Array2<f32>) -> Self {
        let min = raw.iter().copied().fold(f32::INFINITY, f32::min);
        if min.is_finite() {
            raw.mapv_inplace(|v| v - min);
        }
        let max = raw.iter().copied().fold(0.0f32, f32::max);
        if max > 0.0 {
            raw.mapv_inplace(|v| v / max);
        }
        Self { values: raw }
    }

    /// Map height in cells.
    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    /// Map width in cells.
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    /// The normalized values.
    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }
}
