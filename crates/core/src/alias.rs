use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Alias data compiled into the binary. User tables extend or override it.
const BUILTIN_ALIASES: &str = include_str!("../data/aliases.toml");

#[derive(Debug, Error)]
pub enum AliasError {
    #[error("Failed to read alias table '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse alias table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Alias '{0}' has an empty canonical name")]
    EmptyCanonical(String),
}

/// Maps lowercase ingredient spellings to one canonical display name.
///
/// Keys are case-normalized on insert, so lookups expect an already
/// lowercased key. Canonical names are registered as keys of themselves,
/// which keeps a rendered ingredient list stable when normalized again.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table shipped with the crate (`data/aliases.toml`).
    pub fn builtin() -> Result<Self, AliasError> {
        Self::from_toml(BUILTIN_ALIASES)
    }

    /// Parse a flat TOML table of `"variant" = "Canonical Name"` pairs.
    pub fn from_toml(toml_content: &str) -> Result<Self, AliasError> {
        let raw: HashMap<String, String> = toml::from_str(toml_content)?;
        let mut table = Self::new();
        // Sorted so that overrides between case variants resolve the same way every run.
        let mut pairs: Vec<_> = raw.into_iter().collect();
        pairs.sort();
        for (variant, canonical) in pairs {
            table.insert(&variant, &canonical)?;
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, AliasError> {
        let content = std::fs::read_to_string(path).map_err(|source| AliasError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Add one spelling variant. Later inserts override earlier ones.
    pub fn insert(&mut self, variant: &str, canonical: &str) -> Result<(), AliasError> {
        let canonical = canonical.trim();
        if canonical.is_empty() {
            return Err(AliasError::EmptyCanonical(variant.to_string()));
        }
        if !canonical.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
            tracing::warn!(
                canonical,
                "Canonical name contains characters the normalizer strips; rendered output will not round-trip"
            );
        }

        let key = normalize_key(variant);
        if let Some(previous) = self.entries.get(&key) {
            if previous != canonical {
                tracing::debug!(key = %key, previous = %previous, canonical, "Alias overridden");
            }
        }
        self.entries.insert(key, canonical.to_string());
        self.entries
            .entry(normalize_key(canonical))
            .or_insert_with(|| canonical.to_string());
        Ok(())
    }

    /// Merge `other` into this table; entries from `other` win.
    pub fn extend(&mut self, other: AliasTable) {
        self.entries.extend(other.entries);
    }

    /// Look up an already lowercased spelling.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for AliasTable {
    /// Blank canonical names are skipped.
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (variant, canonical) in iter {
            let _ = table.insert(variant, canonical);
        }
        table
    }
}

fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
