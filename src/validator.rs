use crate::classifier::{ClassMapping, Classifier};
use crate::error::ApiError;
use crate::models::ValidationResponse;
use crate::preprocess;
use anyhow::anyhow;
use tracing::{debug, info};

/// Minimum target-class probability for a positive verdict.
pub const EAR_THRESHOLD: f32 = 0.80;

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins a tie.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, &v)| match best {
            Some((_, top)) if v <= top => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}

pub struct EarValidator {
    classifier: Box<dyn Classifier>,
    classes: ClassMapping,
    target_class: String,
    target_index: usize,
}

impl EarValidator {
    pub fn new(
        classifier: Box<dyn Classifier>,
        classes: ClassMapping,
        target_class: &str,
    ) -> anyhow::Result<Self> {
        let target_index = classes
            .index_of(target_class)
            .ok_or_else(|| anyhow!("target class {target_class:?} is not in the class map"))?;

        Ok(Self {
            classifier,
            classes,
            target_class: target_class.to_string(),
            target_index,
        })
    }

    pub fn validate(&self, image_base64: &str) -> Result<ValidationResponse, ApiError> {
        let input = preprocess::image_to_tensor(image_base64)?;
        let logits = self.classifier.logits(input)?;
        debug!(?logits, "forward pass complete");

        let probs = softmax(&logits);
        let ear_confidence = *probs.get(self.target_index).ok_or_else(|| {
            ApiError::Inference(format!(
                "model returned {} classes, target index is {}",
                probs.len(),
                self.target_index
            ))
        })?;

        let predicted_idx = argmax(&probs)
            .ok_or_else(|| ApiError::Inference("model returned no logits".into()))?;
        let predicted_class = self
            .classes
            .class_at(predicted_idx)
            .ok_or_else(|| {
                ApiError::Inference(format!("predicted index {predicted_idx} has no class name"))
            })?
            .to_string();

        let is_ear = predicted_class == self.target_class && ear_confidence >= EAR_THRESHOLD;
        info!(%predicted_class, ear_confidence, is_ear, "ear validation complete");

        Ok(ValidationResponse {
            predicted_class,
            ear_confidence,
            is_ear,
        })
    }
}
