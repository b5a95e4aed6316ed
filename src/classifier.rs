use crate::error::ApiError;
use crate::preprocess::INPUT_SIZE;
use anyhow::{bail, Context, Result};
use ndarray::Array4;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tract_onnx::prelude::*;

/// Class name to output index, plus the derived inverse.
#[derive(Debug, Clone)]
pub struct ClassMapping {
    class_to_idx: HashMap<String, usize>,
    idx_to_class: HashMap<usize, String>,
}

impl ClassMapping {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open class map {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid class map {}", path.display()))
    }

    /// Reads a JSON object such as `{"ear": 0, "not_ear": 1}`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let class_to_idx: HashMap<String, usize> = serde_json::from_reader(reader)?;
        if class_to_idx.is_empty() {
            bail!("class map is empty");
        }

        let mut idx_to_class = HashMap::with_capacity(class_to_idx.len());
        for (name, &idx) in &class_to_idx {
            if let Some(other) = idx_to_class.insert(idx, name.clone()) {
                bail!("classes {other:?} and {name:?} share index {idx}");
            }
        }

        Ok(Self {
            class_to_idx,
            idx_to_class,
        })
    }

    pub fn index_of(&self, class: &str) -> Option<usize> {
        self.class_to_idx.get(class).copied()
    }

    pub fn class_at(&self, idx: usize) -> Option<&str> {
        self.idx_to_class.get(&idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.class_to_idx.len()
    }
}

/// Anything that maps a `[1, 3, 224, 224]` image tensor to raw class logits.
pub trait Classifier: Send + Sync {
    fn logits(&self, input: Array4<f32>) -> Result<Vec<f32>, ApiError>;
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// The exported network, optimized once and run read-only from every worker.
pub struct OnnxClassifier {
    plan: OnnxPlan,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to load ONNX model {}", path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
                ),
            )?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to make model runnable")?;

        Ok(Self { plan })
    }
}

impl Classifier for OnnxClassifier {
    fn logits(&self, input: Array4<f32>) -> Result<Vec<f32>, ApiError> {
        let shape = input.shape().to_vec();
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_shape(&shape, &data)
            .map_err(|e| ApiError::Inference(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| ApiError::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| ApiError::Inference("model produced no outputs".into()))?;
        let logits = output
            .to_array_view::<f32>()
            .map_err(|e| ApiError::Inference(e.to_string()))?;

        Ok(logits.iter().copied().collect())
    }
}
