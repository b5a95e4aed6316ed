use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ImagePayload {
    pub image_base64: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub predicted_class: String,
    /// Softmax probability of the target class, whatever was predicted.
    pub ear_confidence: f32,
    pub is_ear: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
