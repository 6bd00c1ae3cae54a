//! Checkpoint loading.
//!
//! Checkpoints reach us in three shapes, tried in order until one succeeds:
//!
//! 1. **Bundled archive**: a safetensors file whose header metadata names the
//!    architecture and class count. Loaded strictly.
//! 2. **Module archive**: a tensor archive saved together with its training
//!    wrapper. Wrapper prefixes are stripped and the remaining parameter set
//!    must match a registry variant exactly.
//! 3. **Raw state dictionary**: bare parameters with no structural
//!    information. The class count is inferred from the classifier weight and
//!    registry variants are tried in order with a tolerant partial load.

use crate::core::errors::DermaError;
use crate::core::recover::{first_success, Attempt};
use crate::models::arch::{LesionModel, ParamSource};
use crate::models::registry::{find_variant, VARIANTS};
use candle_core::{Device, Tensor};
use once_cell::unsync::OnceCell;
use std::path::Path;

/// Training-wrapper prefixes stripped before matching parameter names.
const WRAPPER_PREFIXES: &[&str] = &["model.", "module."];

/// Class count assumed when no classifier-shaped weight is present.
const DEFAULT_NUM_CLASSES: usize = 1000;

/// Loads a lesion classifier from `path`, trying each checkpoint shape in
/// order. The underlying tensor archive is read at most once across the
/// module-archive and state-dict attempts.
pub fn load_model(path: &Path, device: &Device) -> Result<LesionModel, DermaError> {
    let archive: OnceCell<Vec<(String, Tensor)>> = OnceCell::new();

    let attempts: Vec<(&'static str, Attempt<'_, LesionModel>)> = vec![
        ("bundled", Box::new(|| load_bundled(path, device))),
        (
            "module-archive",
            Box::new(|| {
                let entries = archive.get_or_try_init(|| read_tensor_map(path, device))?;
                load_module_archive(entries, device)
            }),
        ),
        (
            "state-dict",
            Box::new(|| {
                let entries = archive.get_or_try_init(|| read_tensor_map(path, device))?;
                load_state_dict(entries, device)
            }),
        ),
    ];

    let model = first_success("model load", attempts).map_err(|e| {
        DermaError::model_load(path, e.to_string())
    })?;
    tracing::info!(
        path = %path.display(),
        architecture = model.name(),
        num_classes = model.num_classes(),
        "model loaded"
    );
    Ok(model)
}

/// Strategy 1: safetensors archive with `architecture` and `num_classes` in
/// its header metadata.
fn load_bundled(path: &Path, device: &Device) -> Result<LesionModel, DermaError> {
    let bytes = std::fs::read(path)?;
    let (_, metadata) = safetensors::SafeTensors::read_metadata(&bytes)
        .map_err(|e| DermaError::model_load(path, format!("not a safetensors archive: {e}")))?;
    let header = metadata
        .metadata()
        .as_ref()
        .ok_or_else(|| DermaError::model_load(path, "archive carries no header metadata"))?;
    let architecture = header
        .get("architecture")
        .ok_or_else(|| DermaError::model_load(path, "header metadata lacks an architecture tag"))?;
    let num_classes: usize = header
        .get("num_classes")
        .ok_or_else(|| DermaError::model_load(path, "header metadata lacks a class count"))?
        .parse()
        .map_err(|_| DermaError::model_load(path, "header class count is not an integer"))?;
    let variant = find_variant(architecture).ok_or_else(|| {
        DermaError::model_load(path, format!("unknown architecture {architecture}"))
    })?;

    let tensors = candle_core::safetensors::load_buffer(&bytes, device)
        .map_err(|e| DermaError::model_load(path, format!("tensor load failed: {e}")))?;
    let entries = sorted_entries(tensors.into_iter().collect());
    let source = ParamSource::new(&entries, true, device);
    variant.build(&source, num_classes)
}

/// Strategy 2: wrapper-prefixed archive whose parameter set matches a
/// registry variant exactly.
fn load_module_archive(
    entries: &[(String, Tensor)],
    device: &Device,
) -> Result<LesionModel, DermaError> {
    let stripped = strip_wrapper_prefixes(entries);
    for variant in VARIANTS {
        if let Some(num_classes) = variant.exact_match(&stripped) {
            let source = ParamSource::new(&stripped, true, device);
            return variant.build(&source, num_classes);
        }
    }
    Err(DermaError::invalid_input(
        "no registered architecture matches the archived parameter set exactly",
    ))
}

/// Strategy 3: bare state dictionary, tolerant partial load against registry
/// variants in order.
fn load_state_dict(
    entries: &[(String, Tensor)],
    device: &Device,
) -> Result<LesionModel, DermaError> {
    let stripped = strip_wrapper_prefixes(entries);
    let num_classes = infer_num_classes(&stripped);
    for variant in VARIANTS {
        if !variant.compatible_with(&stripped, num_classes) {
            tracing::debug!(
                architecture = variant.name,
                "state-dict shapes incompatible, trying next variant"
            );
            continue;
        }
        let source = ParamSource::new(&stripped, false, device);
        return variant.build(&source, num_classes);
    }
    Err(DermaError::invalid_input(
        "no registered architecture accepts the state-dict parameter shapes",
    ))
}

/// Reads a tensor archive from disk, accepting safetensors and pickle-based
/// formats. Entry order is deterministic: sorted names for safetensors,
/// archive order for pickle.
fn read_tensor_map(path: &Path, device: &Device) -> Result<Vec<(String, Tensor)>, DermaError> {
    if let Ok(tensors) = candle_core::safetensors::load(path, device) {
        return Ok(sorted_entries(tensors.into_iter().collect()));
    }
    candle_core::pickle::read_all(path)
        .map_err(|e| DermaError::model_load(path, format!("unreadable tensor archive: {e}")))
}

fn sorted_entries(mut entries: Vec<(String, Tensor)>) -> Vec<(String, Tensor)> {
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

/// Strips training-wrapper prefixes shared by every parameter name,
/// repeating until no prefix applies (a doubly wrapped `model.module.`
/// archive loses both).
fn strip_wrapper_prefixes(entries: &[(String, Tensor)]) -> Vec<(String, Tensor)> {
    let mut names: Vec<String> = entries.iter().map(|(n, _)| n.clone()).collect();
    loop {
        let Some(prefix) = WRAPPER_PREFIXES
            .iter()
            .find(|p| !names.is_empty() && names.iter().all(|n| n.starts_with(*p)))
        else {
            break;
        };
        for name in &mut names {
            *name = name[prefix.len()..].to_string();
        }
    }
    names
        .into_iter()
        .zip(entries.iter().map(|(_, t)| t.clone()))
        .collect()
}

/// Infers the class count from the first rank-2 weight whose input dimension
/// exceeds one, reading entries in archive order.
fn infer_num_classes(entries: &[(String, Tensor)]) -> usize {
    entries
        .iter()
        .find(|(name, tensor)| {
            name.ends_with(".weight") && tensor.dims().len() == 2 && tensor.dims()[1] > 1
        })
        .map(|(_, tensor)| tensor.dims()[0])
        .unwrap_or(DEFAULT_NUM_CLASSES)
}
