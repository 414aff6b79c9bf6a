//! Domain keyword filter for discovered documents.

use regex::{Regex, RegexBuilder};

/// Commodity names and technical-report vocabulary.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "NI 43-101",
    "S-K 1300",
    "technical report summary",
    "feasibility study",
    "pre-feasibility",
    "preliminary economic assessment",
    "mineral resource",
    "mineral reserve",
    "net present value",
    "lithium",
    "copper",
    "gold",
    "silver",
    "nickel",
    "cobalt",
    "uranium",
    "zinc",
    "graphite",
    "rare earth",
    "potash",
    "vanadium",
    "molybdenum",
    "antimony",
];

/// What [`KeywordFilter::check`] found in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordMatch<'t> {
    /// The first keyword mentioned.
    Found(&'t str),
    /// No keywords configured; every document passes.
    Unfiltered,
    Missing,
}

/// Accepts text that mentions any keyword, case-insensitively and on word
/// boundaries.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    pattern: Option<Regex>,
}

impl KeywordFilter {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let alternation = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(k).replace(r"\ ", " ").replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = if alternation.is_empty() {
            None
        } else {
            RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
                .case_insensitive(true)
                .build()
                .map_err(|e| tracing::warn!("Keyword filter disabled: {}", e))
                .ok()
        };
        Self { pattern }
    }

    pub fn check<'t>(&self, text: &'t str) -> KeywordMatch<'t> {
        match &self.pattern {
            None => KeywordMatch::Unfiltered,
            Some(pattern) => pattern
                .find(text)
                .map_or(KeywordMatch::Missing, |m| KeywordMatch::Found(m.as_str())),
        }
    }

    /// An empty keyword list accepts everything.
    pub fn matches(&self, text: &str) -> bool {
        self.check(text) != KeywordMatch::Missing
    }
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_keyword_accepts() {
        let filter = KeywordFilter::default();
        assert!(filter.matches("This Technical  Report Summary was prepared under S-K 1300"));
        assert!(filter.matches("LITHIUM brine"));
        assert_eq!(
            filter.check("an NI 43-101 report"),
            KeywordMatch::Found("NI 43-101")
        );
        assert!(!filter.matches("Quarterly earnings call transcript for a software company"));
    }

    #[test]
    fn test_word_boundaries() {
        let filter = KeywordFilter::new(&["gold"]);
        assert!(!filter.matches("Goldman Sachs underwriting agreement"));
        assert!(filter.matches("gold equivalent ounces"));
    }

    #[test]
    fn test_empty_list_accepts_all() {
        let filter = KeywordFilter::new::<&str>(&[]);
        assert!(filter.matches("anything"));
        assert_eq!(filter.check("anything"), KeywordMatch::Unfiltered);
        assert_eq!(
            KeywordFilter::new(&["  ", ""]).check("anything"),
            KeywordMatch::Unfiltered
        );
    }

    #[test]
    fn test_missing_keyword() {
        let filter = KeywordFilter::new(&["lithium"]);
        assert_eq!(filter.check("software revenue"), KeywordMatch::Missing);
        assert!(!filter.matches("software revenue"));
    }
}
