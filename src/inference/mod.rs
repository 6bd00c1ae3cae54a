//! Classifier inference: probability extraction and top-k selection.

pub mod gradcam;

pub use gradcam::explain;

use crate::core::errors::DermaError;
use crate::models::LesionModel;
use candle_core::Tensor;
use std::cmp::Ordering;

/// A single class prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Class index into the model's output layer.
    pub class_index: usize,
    /// Softmax probability.
    pub probability: f32,
}

/// Runs a forward pass and returns the softmax probability of every class.
///
/// The input is detached first so inference builds no gradient graph.
pub fn class_probabilities(model: &LesionModel, input: &Tensor) -> Result<Vec<f32>, DermaError> {
    let logits = model.forward(&input.detach())?;
    let probabilities = candle_nn::ops::softmax_last_dim(&logits)
        .map_err(|e| DermaError::inference("softmax", e))?;
    probabilities
        .squeeze(0)
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(|e| DermaError::inference("probability extraction", e))
}

/// Selects the `k` most probable classes, ordered by descending probability
/// with ties broken by ascending class index. `k` is clamped to the number
/// of classes.
pub fn top_k(probabilities: &[f32], k: usize) -> Vec<Prediction> {
    let mut indexed: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    indexed.truncate(k.min(probabilities.len()));
    indexed
        .into_iter()
        .map(|(class_index, probability)| Prediction {
            class_index,
            probability,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::Linear;

    #[test]
    fn probabilities_sum_to_one() {
        let device = Device::Cpu;
        let weight = Tensor::zeros((5, 3), DType::F32, &device).unwrap();
        let bias = Tensor::zeros(5, DType::F32, &device).unwrap();
        let model = LesionModel::new(
            "probe",
            vec![
                crate::models::Layer::GlobalAvgPool,
                crate::models::Layer::Linear(Linear::new(weight, Some(bias))),
            ],
            5,
        );
        let input = Tensor::ones((1, 3, 4, 4), DType::F32, &device).unwrap();
        let probabilities = class_probabilities(&model, &input).unwrap();
        assert_eq!(probabilities.len(), 5);
        let total: f32 = probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn top_k_orders_by_probability_then_index() {
        let predictions = top_k(&[0.1, 0.4, 0.1, 0.4], 4);
        let order: Vec<usize> = predictions.iter().map(|p| p.class_index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn top_k_clamps_to_available_classes() {
        let predictions = top_k(&[0.7, 0.3], 10);
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].class_index, 0);
    }
}
