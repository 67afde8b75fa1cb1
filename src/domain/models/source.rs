use serde_derive::Deserialize;
use serde_derive::Serialize;

/// A retrieved document chunk the backend used to ground an answer. Every
/// field is optional as the backend does not enforce its shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub source: Option<String>,
    pub chunk_index: Option<i64>,
    pub distance: Option<f64>,
}

impl Source {
    pub fn display(&self) -> String {
        let source = self.source.as_deref().unwrap_or("unknown");
        let chunk = self
            .chunk_index
            .map(|idx| return idx.to_string())
            .unwrap_or_else(|| return "?".to_string());
        let distance = self
            .distance
            .map(|dist| return format!("{dist:.4}"))
            .unwrap_or_else(|| return "?".to_string());

        return format!("{source} (chunk {chunk}) dist: {distance}");
    }
}
