use regex::Regex;

use ingredex_core::SectionConfig;

/// Finds the ingredient listing inside recognized label text.
///
/// Each configured header becomes `<header>[:\s]*(.*)` matched against the
/// lowercased text with `.` spanning newlines, so everything after the
/// header, to the end of the text, is captured. Headers are tried in
/// priority order and the first one that matches wins.
#[derive(Debug, Clone)]
pub struct SectionLocator {
    patterns: Vec<Regex>,
}

impl SectionLocator {
    pub fn new(config: &SectionConfig) -> Self {
        let patterns = config
            .headers
            .iter()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .map(|h| {
                let pattern = format!(r"(?s){}[:\s]*(.*)", regex::escape(&h));
                Regex::new(&pattern).expect("escaped header is a valid pattern")
            })
            .collect();
        Self { patterns }
    }

    /// The lowercased text following the first matching header, or an empty
    /// string when no header is present.
    pub fn locate(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        for (priority, re) in self.patterns.iter().enumerate() {
            if let Some(block) = re.captures(&lowered).and_then(|c| c.get(1)) {
                tracing::debug!(priority, block_len = block.len(), "Ingredient header found");
                return block.as_str().to_string();
            }
        }
        tracing::debug!("No ingredient header found");
        String::new()
    }
}

impl Default for SectionLocator {
    fn default() -> Self {
        Self::new(&SectionConfig::default())
    }
}
