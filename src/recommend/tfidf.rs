use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

/// Sparse row: (term index, weight), sorted by term index.
pub type SparseRow = Vec<(usize, f64)>;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Words of two or more characters; single letters and punctuation are dropped.
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

/// Lowercases `text` and splits it into word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// TF-IDF weights of a small document set, one L2-normalized row per document.
///
/// Term frequency is the raw count, idf is smoothed as
/// `ln((1 + n) / (1 + df)) + 1`. Documents without a single token get an
/// all-zero row, and an empty vocabulary is not an error.
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    vocabulary: BTreeMap<String, usize>,
    rows: Vec<SparseRow>,
}

impl TfidfMatrix {
    pub fn fit_transform<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        let terms: BTreeSet<&str> = tokenized.iter().flatten().map(String::as_str).collect();
        let vocabulary: BTreeMap<String, usize> = terms
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect();

        let mut df = vec![0usize; vocabulary.len()];
        let counts: Vec<BTreeMap<usize, usize>> = tokenized
            .iter()
            .map(|tokens| {
                let mut tf = BTreeMap::new();
                for token in tokens {
                    if let Some(&idx) = vocabulary.get(token) {
                        *tf.entry(idx).or_insert(0) += 1;
                    }
                }
                for idx in tf.keys() {
                    df[*idx] += 1;
                }
                tf
            })
            .collect();

        let n = documents.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let rows = counts
            .into_iter()
            .map(|tf| {
                let mut row: SparseRow = tf
                    .into_iter()
                    .map(|(idx, count)| (idx, count as f64 * idf[idx]))
                    .collect();
                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in row.iter_mut() {
                        *w /= norm;
                    }
                }
                row
            })
            .collect();

        Self { vocabulary, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.rows[i]
    }

    /// Cosine similarity of rows `a` and `b`. Zero rows are orthogonal to everything.
    pub fn cosine(&self, a: usize, b: usize) -> f64 {
        dot(&self.rows[a], &self.rows[b])
    }
}

fn dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Children of Dune"), vec!["children", "of", "dune"]);
        assert_eq!(tokenize("A Tale of 2 Cities"), vec!["tale", "of", "cities"]);
        assert_eq!(tokenize("1984"), vec!["1984"]);
        assert_eq!(tokenize("Ève & the Über-Man"), vec!["ève", "the", "über", "man"]);
        assert!(tokenize("I, a !").is_empty());
    }

    #[test]
    fn test_rows_are_unit_length() {
        let m = TfidfMatrix::fit_transform(&["Dune Messiah", "Children of Dune", "Dune"]);
        assert_eq!(m.len(), 3);
        assert_eq!(m.vocabulary_size(), 4);
        for i in 0..m.len() {
            let norm: f64 = m.row(i).iter().map(|(_, w)| w * w).sum();
            assert!(close(norm, 1.0));
        }
    }

    #[test]
    fn test_identical_titles_have_cosine_one() {
        let m = TfidfMatrix::fit_transform(&["The Hobbit", "Dune", "the hobbit"]);
        assert!(close(m.cosine(0, 2), 1.0));
        assert!(close(m.cosine(0, 1), 0.0));
    }

    #[test]
    fn test_smoothed_idf_weights() {
        // "dune" appears in two of three documents, "messiah" in one.
        let m = TfidfMatrix::fit_transform(&["Dune Messiah", "Dune", "Foundation"]);
        let idf_dune = (4.0f64 / 3.0).ln() + 1.0;
        let idf_messiah = (4.0f64 / 2.0).ln() + 1.0;
        let expected = idf_dune / (idf_dune * idf_dune + idf_messiah * idf_messiah).sqrt();
        assert!(close(m.cosine(0, 1), expected));
    }

    #[test]
    fn test_empty_vocabulary_is_all_zero() {
        let m = TfidfMatrix::fit_transform(&["I", "a", "?"]);
        assert_eq!(m.vocabulary_size(), 0);
        assert!(m.row(0).is_empty());
        assert_eq!(m.cosine(0, 1), 0.0);

        let empty: [&str; 0] = [];
        assert!(TfidfMatrix::fit_transform(&empty).is_empty());
    }
}
