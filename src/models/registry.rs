//! Known classifier architecture variants.
//!
//! Checkpoints that arrive without structural metadata (module archives and
//! raw state dictionaries) are reconstructed by trying these variants in
//! order. Each variant describes a small convolutional backbone as a list of
//! stage widths; the parameter manifest it derives is what gets matched
//! against the archived tensor names and shapes.

use crate::core::errors::DermaError;
use crate::models::arch::{Layer, LesionModel, ParamSource};
use candle_core::{Device, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, Linear};

/// Convolution kernel size shared by every variant.
const KERNEL: usize = 3;
/// Max-pool kernel applied after each stage.
const POOL: usize = 2;

/// A reconstructible architecture variant.
#[derive(Debug, Clone, Copy)]
pub struct ArchVariant {
    /// Registry name, also stored as the reconstructed model's name.
    pub name: &'static str,
    /// Output channel width of each convolutional stage.
    pub stages: &'static [usize],
}

/// Variants tried in order when a checkpoint carries no architecture tag.
pub const VARIANTS: &[ArchVariant] = &[
    ArchVariant {
        name: "dermanet_small",
        stages: &[16, 32, 64],
    },
    ArchVariant {
        name: "dermanet_base",
        stages: &[32, 64, 128],
    },
    ArchVariant {
        name: "dermanet_wide",
        stages: &[48, 96, 192],
    },
];

/// Looks up a variant by its registry name.
pub fn find_variant(name: &str) -> Option<&'static ArchVariant> {
    VARIANTS.iter().find(|v| v.name == name)
}

impl ArchVariant {
    /// Width of the final convolutional stage, which is also the classifier
    /// input width after global average pooling.
    pub fn feature_width(&self) -> usize {
        *self.stages.last().unwrap_or(&0)
    }

    /// The complete `(name, shape)` parameter listing for this variant with
    /// `num_classes` output classes.
    ///
    /// Convolutional parameters follow sequential-container naming where
    /// each stage occupies three slots (conv, activation, pool), so the
    /// convolutions sit at `features.0`, `features.3`, `features.6`, ...
    pub fn parameter_manifest(&self, num_classes: usize) -> Vec<(String, Vec<usize>)> {
        let mut manifest = Vec::with_capacity(self.stages.len() * 2 + 2);
        let mut in_channels = 3;
        for (stage, &width) in self.stages.iter().enumerate() {
            let slot = stage * 3;
            manifest.push((
                format!("features.{slot}.weight"),
                vec![width, in_channels, KERNEL, KERNEL],
            ));
            manifest.push((format!("features.{slot}.bias"), vec![width]));
            in_channels = width;
        }
        manifest.push((
            "classifier.weight".to_string(),
            vec![num_classes, self.feature_width()],
        ));
        manifest.push(("classifier.bias".to_string(), vec![num_classes]));
        manifest
    }

    /// Tests whether `entries` is exactly this variant's parameter set, with
    /// no extra and no missing tensors. Returns the class count read from the
    /// classifier weight on success.
    pub fn exact_match(&self, entries: &[(String, Tensor)]) -> Option<usize> {
        let classifier = entries
            .iter()
            .find(|(name, _)| name == "classifier.weight")?;
        let dims = classifier.1.dims();
        if dims.len() != 2 {
            return None;
        }
        let num_classes = dims[0];

        let manifest = self.parameter_manifest(num_classes);
        if entries.len() != manifest.len() {
            return None;
        }
        for (name, shape) in &manifest {
            let present = entries
                .iter()
                .any(|(n, t)| n == name && t.dims() == shape.as_slice());
            if !present {
                return None;
            }
        }
        Some(num_classes)
    }

    /// Tests whether every parameter of `entries` that this variant also
    /// declares has the declared shape. Tensors the variant does not know
    /// about are ignored; absent tensors are acceptable (they are
    /// zero-initialized at build time).
    pub fn compatible_with(&self, entries: &[(String, Tensor)], num_classes: usize) -> bool {
        let manifest = self.parameter_manifest(num_classes);
        manifest.iter().all(|(name, shape)| {
            entries
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, t)| t.dims() == shape.as_slice())
                .unwrap_or(true)
        })
    }

    /// Builds an inference-ready model from `source`.
    pub fn build(
        &self,
        source: &ParamSource<'_>,
        num_classes: usize,
    ) -> Result<LesionModel, DermaError> {
        let mut layers = Vec::with_capacity(self.stages.len() * 3 + 2);
        let mut in_channels = 3;
        for (stage, &width) in self.stages.iter().enumerate() {
            let slot = stage * 3;
            let weight = source.get(
                &format!("features.{slot}.weight"),
                &[width, in_channels, KERNEL, KERNEL],
            )?;
            let bias = source.get(&format!("features.{slot}.bias"), &[width])?;
            let config = Conv2dConfig {
                padding: KERNEL / 2,
                ..Default::default()
            };
            layers.push(Layer::Conv2d(Conv2d::new(weight, Some(bias), config)));
            layers.push(Layer::Relu);
            layers.push(Layer::MaxPool2d(POOL));
            in_channels = width;
        }
        layers.push(Layer::GlobalAvgPool);
        let weight = source.get("classifier.weight", &[num_classes, self.feature_width()])?;
        let bias = source.get("classifier.bias", &[num_classes])?;
        layers.push(Layer::Linear(Linear::new(weight, Some(bias))));

        Ok(LesionModel::new(self.name, layers, num_classes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    fn full_entries(variant: &ArchVariant, num_classes: usize) -> Vec<(String, Tensor)> {
        let device = Device::Cpu;
        variant
            .parameter_manifest(num_classes)
            .into_iter()
            .map(|(name, shape)| {
                let tensor = Tensor::zeros(shape.as_slice(), DType::F32, &device).unwrap();
                (name, tensor)
            })
            .collect()
    }

    #[test]
    fn manifest_uses_sequential_slot_naming() {
        let manifest = VARIANTS[0].parameter_manifest(10);
        let names: Vec<&str> = manifest.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"features.0.weight"));
        assert!(names.contains(&"features.3.weight"));
        assert!(names.contains(&"features.6.weight"));
        assert!(names.contains(&"classifier.bias"));
        assert_eq!(manifest.len(), 8);
    }

    #[test]
    fn exact_match_reads_class_count_from_classifier() {
        let variant = &VARIANTS[0];
        let entries = full_entries(variant, 10);
        assert_eq!(variant.exact_match(&entries), Some(10));

        let mut extra = entries.clone();
        extra.push((
            "aux.weight".to_string(),
            Tensor::zeros(4, DType::F32, &Device::Cpu).unwrap(),
        ));
        assert_eq!(variant.exact_match(&extra), None);
    }

    #[test]
    fn exact_match_rejects_other_variant() {
        let entries = full_entries(&VARIANTS[0], 10);
        assert_eq!(VARIANTS[1].exact_match(&entries), None);
    }

    #[test]
    fn built_model_exposes_last_conv() {
        let device = Device::Cpu;
        let entries: Vec<(String, Tensor)> = Vec::new();
        let source = ParamSource::new(&entries, false, &device);
        let model = VARIANTS[0].build(&source, 10).unwrap();
        // Three stages of (conv, relu, pool); the last conv sits at slot 6.
        assert_eq!(model.last_conv_index(), Some(6));
        assert_eq!(model.num_classes(), 10);
    }

    #[test]
    fn compatible_with_ignores_unknown_tensors() {
        let variant = &VARIANTS[0];
        let device = Device::Cpu;
        let entries = vec![
            (
                "classifier.weight".to_string(),
                Tensor::zeros((10, 64), DType::F32, &device).unwrap(),
            ),
            (
                "running_stats".to_string(),
                Tensor::zeros(4, DType::F32, &device).unwrap(),
            ),
        ];
        assert!(variant.compatible_with(&entries, 10));

        let bad = vec![(
            "classifier.weight".to_string(),
            Tensor::zeros((10, 32), DType::F32, &device).unwrap(),
        )];
        assert!(!variant.compatible_with(&bad, 10));
    }
}
