//! Lesion classifier model structure.
//!
//! A [`LesionModel`] is an explicit ordered stack of layers. Keeping the
//! stack inspectable (rather than a closed `forward` implementation) is what
//! lets the explainability engine scan for the last convolutional layer and
//! split the forward pass around it.

use crate::core::errors::DermaError;
use candle_core::{DType, Device, Module, Tensor};
use std::collections::HashMap;
use std::ops::Range;

/// A single layer in a [`LesionModel`] stack.
#[derive(Debug)]
pub enum Layer {
    /// 2D convolution.
    Conv2d(candle_nn::Conv2d),
    /// Rectified linear activation.
    Relu,
    /// Square max pooling with stride equal to the kernel size.
    MaxPool2d(usize),
    /// Global average pooling over the spatial dimensions; collapses
    /// `(batch, channels, h, w)` to `(batch, channels)`.
    GlobalAvgPool,
    /// Fully connected layer.
    Linear(candle_nn::Linear),
}

impl Layer {
    /// Whether this layer has convolutional capability.
    pub fn is_conv(&self) -> bool {
        matches!(self, Layer::Conv2d(_))
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor, DermaError> {
        match self {
            Layer::Conv2d(conv) => conv
                .forward(x)
                .map_err(|e| DermaError::inference("conv2d forward", e)),
            Layer::Relu => x.relu().map_err(|e| DermaError::inference("relu forward", e)),
            Layer::MaxPool2d(kernel) => x
                .max_pool2d(*kernel)
                .map_err(|e| DermaError::inference("max_pool2d forward", e)),
            Layer::GlobalAvgPool => {
                let (b, c, h, w) = x
                    .dims4()
                    .map_err(|e| DermaError::inference("global average pool input rank", e))?;
                x.reshape((b, c, h * w))
                    .and_then(|t| t.mean(2))
                    .map_err(|e| DermaError::inference("global average pool forward", e))
            }
            Layer::Linear(linear) => linear
                .forward(x)
                .map_err(|e| DermaError::inference("linear forward", e)),
        }
    }
}

/// An inference-ready lesion classifier.
///
/// The model is read-only after construction and safe to share across
/// concurrent requests behind an `Arc`; neither inference nor Grad-CAM
/// attaches any state to it.
#[derive(Debug)]
pub struct LesionModel {
    name: String,
    layers: Vec<Layer>,
    num_classes: usize,
}

impl LesionModel {
    /// Creates a model from an explicit layer stack.
    pub fn new(name: impl Into<String>, layers: Vec<Layer>, num_classes: usize) -> Self {
        Self {
            name: name.into(),
            layers,
            num_classes,
        }
    }

    /// The architecture name this model was reconstructed as.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of output classes.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// The ordered layer stack.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Index of the last layer with convolutional capability, scanning the
    /// stack in traversal order.
    pub fn last_conv_index(&self) -> Option<usize> {
        self.layers.iter().rposition(Layer::is_conv)
    }

    /// Runs the layers in `range` over `input`.
    pub fn forward_range(&self, input: &Tensor, range: Range<usize>) -> Result<Tensor, DermaError> {
        let mut x = input.clone();
        for layer in &self.layers[range] {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    /// Full forward pass producing `(1, num_classes)` logits.
    pub fn forward(&self, input: &Tensor) -> Result<Tensor, DermaError> {
        self.forward_range(input, 0..self.layers.len())
    }
}

/// Resolves named parameters from a loaded tensor archive.
///
/// In strict mode every requested parameter must be present with the exact
/// shape. In tolerant mode missing parameters are zero-initialized and a
/// present parameter with the wrong shape still fails (matching the
/// partial-load semantics of the state-dict reconstruction path).
pub(crate) struct ParamSource<'a> {
    by_name: HashMap<&'a str, &'a Tensor>,
    strict: bool,
    device: &'a Device,
}

impl<'a> ParamSource<'a> {
    pub fn new(entries: &'a [(String, Tensor)], strict: bool, device: &'a Device) -> Self {
        Self {
            by_name: entries
                .iter()
                .map(|(name, tensor)| (name.as_str(), tensor))
                .collect(),
            strict,
            device,
        }
    }

    pub fn get(&self, name: &str, dims: &[usize]) -> Result<Tensor, DermaError> {
        match self.by_name.get(name) {
            Some(tensor) => {
                if tensor.dims() != dims {
                    return Err(DermaError::invalid_input(format!(
                        "parameter {name}: expected shape {:?}, got {:?}",
                        dims,
                        tensor.dims()
                    )));
                }
                tensor
                    .to_dtype(DType::F32)
                    .and_then(|t| t.to_device(self.device))
                    .map_err(|e| DermaError::tensor_operation("parameter conversion", e))
            }
            None if self.strict => Err(DermaError::invalid_input(format!(
                "missing parameter {name}"
            ))),
            None => {
                tracing::debug!(parameter = name, "missing parameter zero-initialized");
                Tensor::zeros(dims, DType::F32, self.device)
                    .map_err(|e| DermaError::tensor_operation("parameter zero-init", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn linear_only_model(device: &Device) -> LesionModel {
        let weight = Tensor::ones((10, 3), DType::F32, device).unwrap();
        let bias = Tensor::zeros(10, DType::F32, device).unwrap();
        LesionModel::new(
            "linear_probe",
            vec![
                Layer::GlobalAvgPool,
                Layer::Linear(candle_nn::Linear::new(weight, Some(bias))),
            ],
            10,
        )
    }

    #[test]
    fn last_conv_index_is_none_without_convs() {
        let device = Device::Cpu;
        let model = linear_only_model(&device);
        assert!(model.last_conv_index().is_none());
    }

    #[test]
    fn forward_produces_logits_row() {
        let device = Device::Cpu;
        let model = linear_only_model(&device);
        let input = Tensor::ones((1, 3, 8, 8), DType::F32, &device).unwrap();
        let logits = model.forward(&input).unwrap();
        assert_eq!(logits.dims(), &[1, 10]);
    }

    #[test]
    fn strict_source_rejects_missing_parameters() {
        let device = Device::Cpu;
        let entries: Vec<(String, Tensor)> = Vec::new();
        let strict = ParamSource::new(&entries, true, &device);
        assert!(strict.get("classifier.weight", &[10, 64]).is_err());

        let tolerant = ParamSource::new(&entries, false, &device);
        let zeros = tolerant.get("classifier.weight", &[10, 64]).unwrap();
        assert_eq!(zeros.dims(), &[10, 64]);
    }

    #[test]
    fn source_rejects_shape_mismatch_even_when_tolerant() {
        let device = Device::Cpu;
        let entries = vec![(
            "classifier.weight".to_string(),
            Tensor::zeros((4, 4), DType::F32, &device).unwrap(),
        )];
        let tolerant = ParamSource::new(&entries, false, &device);
        assert!(tolerant.get("classifier.weight", &[10, 64]).is_err());
    }
}
