//! Gradient-weighted class activation mapping.
//!
//! The forward pass is split at the model's last convolutional layer. The
//! activation produced there is re-anchored as a gradient variable, the rest
//! of the stack runs from it, and the gradient of the target class score with
//! respect to that variable yields per-channel importance weights. The
//! weighted activation sum, rectified and normalized, is the attention map.
//!
//! Each call builds its own capture state, so a shared model needs no
//! locking and concurrent explanations cannot observe each other.

use crate::core::errors::DermaError;
use crate::domain::Cam;
use crate::models::LesionModel;
use candle_core::{IndexOp, Tensor, Var};
use ndarray::Array2;

/// Computes the class activation map for `target_class`.
///
/// Fails when the model has no convolutional layer or the target class is
/// out of range; callers degrade to a placeholder overlay in that case.
pub fn explain(
    model: &LesionModel,
    input: &Tensor,
    target_class: usize,
) -> Result<Cam, DermaError> {
    let last_conv = model.last_conv_index().ok_or_else(|| {
        DermaError::explainability("model has no convolutional layer to attribute")
    })?;
    if target_class >= model.num_classes() {
        return Err(DermaError::explainability(format!(
            "target class {target_class} out of range for {} classes",
            model.num_classes()
        )));
    }

    let activation = model
        .forward_range(&input.detach(), 0..last_conv + 1)?
        .detach();
    let anchor = Var::from_tensor(&activation)
        .map_err(|e| DermaError::tensor_operation("activation anchoring", e))?;
    let logits = model.forward_range(anchor.as_tensor(), last_conv + 1..model.layers().len())?;

    let score = logits
        .i((0, target_class))
        .map_err(|e| DermaError::tensor_operation("class score selection", e))?;
    let grads = score
        .backward()
        .map_err(|e| DermaError::tensor_operation("score backpropagation", e))?;
    let grad = grads.get(anchor.as_tensor()).ok_or_else(|| {
        DermaError::explainability("no gradient reached the attribution layer")
    })?;

    let (_, channels, height, width) = grad
        .dims4()
        .map_err(|e| DermaError::tensor_operation("gradient rank check", e))?;
    // Spatial mean of the gradient per channel, broadcast back as weights.
    let weights = grad
        .mean(3)
        .and_then(|t| t.mean(2))
        .and_then(|t| t.reshape((1, channels, 1, 1)))
        .map_err(|e| DermaError::tensor_operation("channel weight reduction", e))?;
    let raw = activation
        .broadcast_mul(&weights)
        .and_then(|t| t.sum_keepdim(1))
        .and_then(|t| t.relu())
        .and_then(|t| t.squeeze(0))
        .and_then(|t| t.squeeze(0))
        .and_then(|t| t.to_vec2::<f32>())
        .map_err(|e| DermaError::tensor_operation("activation weighting", e))?;

    let values = Array2::from_shape_fn((height, width), |(y, x)| raw[y][x]);
    Ok(Cam::normalized_from(values))
}
