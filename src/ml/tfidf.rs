use crate::{
    error::{ApiError, Result},
    ml::sparse::{SparseMatrix, SparseRow},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// Runs of two or more word characters; single letters are never terms.
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

fn default_true() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// A fitted TF-IDF vectorizer. Only `transform` is available at serving time;
/// the vocabulary and idf weights come from the training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_true")]
    lowercase: bool,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default)]
    stop_words: Option<HashSet<String>>,
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default = "default_norm")]
    norm: Option<Norm>,
}

impl TextVectorizer {
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> Result<Self> {
        let vectorizer = Self {
            vocabulary,
            idf,
            lowercase: true,
            ngram_range: default_ngram_range(),
            stop_words: None,
            sublinear_tf: false,
            norm: default_norm(),
        };
        vectorizer.validate()?;
        Ok(vectorizer)
    }

    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        self.ngram_range = (min_n.max(1), max_n.max(min_n.max(1)));
        self
    }

    pub fn with_stop_words(mut self, words: &[&str]) -> Self {
        self.stop_words = Some(words.iter().map(|w| w.to_string()).collect());
        self
    }

    /// Reject artifacts whose vocabulary points outside the idf table.
    pub fn validate(&self) -> Result<()> {
        let width = self.idf.len();
        if let Some((term, &col)) = self.vocabulary.iter().find(|(_, &col)| col >= width) {
            return Err(ApiError::ArtifactLoadFailed(format!(
                "vocabulary term '{}' maps to column {} but idf has {} entries",
                term, col, width
            )));
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err(ApiError::ArtifactLoadFailed(
                "idf weights must be finite".to_string(),
            ));
        }
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ApiError::ArtifactLoadFailed(format!(
                "invalid ngram range ({}, {})",
                min_n, max_n
            )));
        }
        Ok(())
    }

    /// Number of output columns.
    pub fn width(&self) -> usize {
        self.idf.len()
    }

    /// Tokens and n-grams for one document, stop words removed before n-gram assembly.
    pub fn analyze(&self, document: &str) -> Vec<String> {
        let text = if self.lowercase {
            document.to_lowercase()
        } else {
            document.to_string()
        };

        let tokens: Vec<&str> = TOKEN_PATTERN
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|token| {
                self.stop_words
                    .as_ref()
                    .map_or(true, |stop| !stop.contains(*token))
            })
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|gram| gram.join(" ")));
        }
        terms
    }

    pub fn transform_one(&self, document: &str) -> SparseRow {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in self.analyze(document) {
            if let Some(&col) = self.vocabulary.get(&term) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let pairs = counts
            .into_iter()
            .map(|(col, count)| {
                let tf = if self.sublinear_tf {
                    1.0 + count.ln()
                } else {
                    count
                };
                (col, tf * self.idf[col])
            })
            .collect();

        let mut row = SparseRow::from_pairs(pairs);
        match self.norm {
            Some(Norm::L2) => row.normalize(),
            Some(Norm::L1) => {
                let total: f64 = row.entries().iter().map(|(_, v)| v.abs()).sum();
                if total > 0.0 {
                    row = SparseRow::from_pairs(
                        row.entries().iter().map(|&(c, v)| (c, v / total)).collect(),
                    );
                }
            }
            None => {}
        }
        row
    }

    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<SparseMatrix> {
        let rows = documents
            .iter()
            .map(|doc| self.transform_one(doc.as_ref()))
            .collect();
        SparseMatrix::new(rows, self.width())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer() -> TextVectorizer {
        let vocabulary = [
            ("social", 0),
            ("facebook", 1),
            ("lite", 2),
            ("facebook lite", 3),
        ]
        .into_iter()
        .map(|(term, col)| (term.to_string(), col))
        .collect();
        TextVectorizer::new(vocabulary, vec![1.0, 2.0, 1.5, 3.0])
            .unwrap()
            .with_ngram_range(1, 2)
            .with_stop_words(&["the"])
    }

    #[test]
    fn test_analyze_lowercases_and_builds_bigrams() {
        let terms = vectorizer().analyze("SOCIAL Facebook the Lite a");
        assert_eq!(
            terms,
            vec![
                "social",
                "facebook",
                "lite",
                "social facebook",
                "facebook lite"
            ]
        );
    }

    #[test]
    fn test_transform_is_l2_normalized_and_ignores_unknown_terms() {
        let row = vectorizer().transform_one("Facebook Lite zzz");
        assert_eq!(row.nnz(), 3);
        assert!((row.norm() - 1.0).abs() < 1e-12);
        assert_eq!(row.get(0), 0.0);
    }

    #[test]
    fn test_document_without_known_terms_is_empty() {
        let matrix = vectorizer().transform(&["nothing here"]).unwrap();
        assert_eq!(matrix.shape(), (1, 4));
        assert_eq!(matrix.rows()[0].nnz(), 0);
    }

    #[test]
    fn test_validate_rejects_column_outside_idf() {
        let vocabulary = [("social".to_string(), 5)].into_iter().collect();
        assert!(TextVectorizer::new(vocabulary, vec![1.0]).is_err());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let json = r#"{"vocabulary": {"game": 0}, "idf": [1.0]}"#;
        let vectorizer: TextVectorizer = serde_json::from_str(json).unwrap();
        assert_eq!(vectorizer.width(), 1);
        assert_eq!(vectorizer.transform_one("GAME game").entries(), &[(0, 1.0)]);
    }

    #[test]
    fn test_sublinear_tf_with_l1_norm() {
        let json = r#"{
            "vocabulary": {"game": 0, "chess": 1},
            "idf": [1.0, 1.0],
            "sublinear_tf": true,
            "norm": "l1"
        }"#;
        let vectorizer: TextVectorizer = serde_json::from_str(json).unwrap();

        let row = vectorizer.transform_one("game game chess");
        let total: f64 = row.entries().iter().map(|&(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((row.get(0) / row.get(1) - (1.0 + 2f64.ln())).abs() < 1e-12);
    }
}
