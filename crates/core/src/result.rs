use serde::{Deserialize, Serialize};

/// Output of one extraction run: the recognized text and the canonical,
/// de-duplicated ingredient names in label order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    raw_text: String,
    ingredients: Vec<String>,
}

impl ExtractionResult {
    pub fn new(raw_text: String, ingredients: Vec<String>) -> Self {
        Self { raw_text, ingredients }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn ingredients(&self) -> &[String] {
        &self.ingredients
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    /// Pretty JSON with four-space indentation; `raw_text` is always first.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only emits valid UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
