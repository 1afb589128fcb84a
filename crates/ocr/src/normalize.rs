use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use ingredex_core::{AliasTable, NormalizeConfig};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_percentage, r"\d+(?:\.\d+)?\s*%");
re!(re_sentence_end, r"\.(\s|$)");
re!(re_disallowed, r"[^a-zA-Z0-9, ]");
re!(re_spaces, r" {2,}");

/// Turns an ingredient block into canonical, de-duplicated names.
#[derive(Debug, Clone)]
pub struct Normalizer {
    aliases: Arc<AliasTable>,
    min_token_len: usize,
    qualifier_prefixes: Vec<String>,
}

impl Normalizer {
    pub fn new(aliases: Arc<AliasTable>, config: &NormalizeConfig) -> Self {
        let qualifier_prefixes = config
            .qualifier_prefixes
            .iter()
            .map(|p| clean(p).trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            aliases,
            min_token_len: config.min_token_len,
            qualifier_prefixes,
        }
    }

    /// Canonical ingredient names in order of first appearance.
    ///
    /// Never fails: an empty or unreadable block gives an empty list.
    pub fn normalize(&self, block: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let names: Vec<String> = self
            .tokens(block)
            .into_iter()
            .map(|token| self.resolve(&token))
            .filter(|name| seen.insert(name.clone()))
            .collect();
        tracing::debug!(count = names.len(), "Normalized ingredient names");
        names
    }

    /// Cleaned candidate tokens before alias resolution; noise already dropped.
    pub fn tokens(&self, block: &str) -> Vec<String> {
        clean(block)
            .split(',')
            .map(|piece| self.strip_qualifier(piece.trim()))
            .filter(|piece| piece.len() > self.min_token_len)
            .map(str::to_string)
            .collect()
    }

    fn strip_qualifier<'a>(&self, piece: &'a str) -> &'a str {
        // Cleaned text is ASCII, so lowercasing keeps byte offsets.
        let lower = piece.to_ascii_lowercase();
        for prefix in &self.qualifier_prefixes {
            if let Some(rest) = lower.strip_prefix(prefix.as_str()) {
                if rest.is_empty() || rest.starts_with(' ') {
                    return piece[prefix.len()..].trim();
                }
            }
        }
        piece
    }

    fn resolve(&self, token: &str) -> String {
        match self.aliases.get(&token.to_lowercase()) {
            Some(canonical) => canonical.to_string(),
            None => title_case(token),
        }
    }
}

/// Join names the way a label lists them. Normalizing the rendered string
/// gives back the same names.
pub fn render(ingredients: &[String]) -> String {
    ingredients.join(", ")
}

/// Drops concentration annotations, turns sentence-ending periods into
/// delimiters, and keeps only ASCII letters, digits, commas and single spaces.
fn clean(text: &str) -> String {
    let text = re_percentage().replace_all(text, "");
    let text = re_sentence_end().replace_all(&text, ",${1}");
    let text: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let text = re_disallowed().replace_all(&text, "");
    re_spaces().replace_all(&text, " ").into_owned()
}

/// Upper-case every letter that follows a non-letter, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    out
}
