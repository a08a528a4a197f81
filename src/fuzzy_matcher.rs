use lazy_static::lazy_static;
use regex::Regex;
use strsim::jaro_winkler;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("static whitespace pattern");
}

/// Fuzzy matcher for field labels with spelling and punctuation variations
/// ("Min Hour Requirement" vs "Min. Hour Requirement").
pub struct FuzzyMatcher {
    /// Similarity threshold (0.0-1.0) for considering two labels as matches
    pub similarity_threshold: f64,
    /// Whether to normalize strings before comparison
    pub normalize: bool,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.92,
            normalize: true,
        }
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            similarity_threshold: threshold,
            normalize: true,
        }
    }

    /// Normalize a label for matching
    /// - Converts to lowercase
    /// - Removes punctuation
    /// - Normalizes whitespace
    pub fn normalize_string(&self, s: &str) -> String {
        if !self.normalize {
            return s.to_lowercase();
        }

        let stripped: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();

        WHITESPACE.replace_all(&stripped, " ").trim().to_string()
    }

    /// Similarity between two labels, 0.0 to 1.0 (higher = more similar)
    pub fn similarity(&self, s1: &str, s2: &str) -> f64 {
        let norm1 = self.normalize_string(s1);
        let norm2 = self.normalize_string(s2);
        jaro_winkler(&norm1, &norm2)
    }

    pub fn is_match(&self, s1: &str, s2: &str) -> bool {
        self.similarity(s1, s2) >= self.similarity_threshold
    }

    /// Best candidate clearing the threshold, earliest on ties.
    /// Returns (index into candidates, similarity score).
    pub fn find_best_match<'a, I>(&self, target: &str, candidates: I) -> Option<(usize, f64)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut best_match: Option<(usize, f64)> = None;

        for (idx, candidate) in candidates.into_iter().enumerate() {
            let score = self.similarity(target, candidate);
            if score < self.similarity_threshold {
                continue;
            }
            match best_match {
                Some((_, best_score)) if score <= best_score => {}
                _ => best_match = Some((idx, score)),
            }
        }

        best_match
    }
}
