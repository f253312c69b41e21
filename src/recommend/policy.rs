use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::{Book, BookId};

/// How the similarity rows of several favorites collapse into one profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Only the most recently added favorite counts.
    #[default]
    Last,
    Mean,
    Max,
}

impl Aggregation {
    /// Collapses `rows` (one per favorite, each `width` wide) into a single row.
    pub fn collapse(self, rows: &[Vec<f64>], width: usize) -> Vec<f64> {
        if rows.is_empty() {
            return vec![0.0; width];
        }

        match self {
            Aggregation::Last => rows[rows.len() - 1].clone(),
            Aggregation::Mean => {
                let mut out = vec![0.0; width];
                for row in rows {
                    for (acc, v) in out.iter_mut().zip(row) {
                        *acc += v;
                    }
                }
                let n = rows.len() as f64;
                out.iter_mut().for_each(|v| *v /= n);
                out
            }
            Aggregation::Max => {
                let mut out = vec![f64::NEG_INFINITY; width];
                for row in rows {
                    for (acc, v) in out.iter_mut().zip(row) {
                        *acc = acc.max(*v);
                    }
                }
                out
            }
        }
    }
}

/// How the picks of a later stage are appended to the earlier ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Append as-is; a book picked by two stages shows up twice.
    Concatenate,
    /// Skip books that are already in the list.
    #[default]
    Distinct,
}

impl MergePolicy {
    pub fn extend(self, combined: &mut Vec<Book>, more: Vec<Book>) {
        match self {
            MergePolicy::Concatenate => combined.extend(more),
            MergePolicy::Distinct => {
                let mut seen: HashSet<BookId> = combined.iter().map(|b| b.id).collect();
                combined.extend(more.into_iter().filter(|b| seen.insert(b.id)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Author;

    fn book(id: BookId) -> Book {
        Book {
            id,
            title: format!("Book {}", id),
            author: Author {
                id: 1,
                name: "Anon".to_string(),
            },
        }
    }

    fn ids(books: &[Book]) -> Vec<BookId> {
        books.iter().map(|b| b.id).collect()
    }

    #[test]
    fn test_collapse() {
        let rows = vec![vec![0.2, 0.8, 0.0], vec![0.6, 0.0, 0.0]];
        assert_eq!(Aggregation::Last.collapse(&rows, 3), vec![0.6, 0.0, 0.0]);
        assert_eq!(Aggregation::Max.collapse(&rows, 3), vec![0.6, 0.8, 0.0]);

        let mean = Aggregation::Mean.collapse(&rows, 3);
        assert!((mean[0] - 0.4).abs() < 1e-12);
        assert!((mean[1] - 0.4).abs() < 1e-12);
        assert_eq!(mean[2], 0.0);

        assert_eq!(Aggregation::Max.collapse(&[], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn test_merge_policies() {
        let mut literal = vec![book(1), book(2)];
        MergePolicy::Concatenate.extend(&mut literal, vec![book(2), book(3)]);
        assert_eq!(ids(&literal), vec![1, 2, 2, 3]);

        let mut distinct = vec![book(1), book(2)];
        MergePolicy::Distinct.extend(&mut distinct, vec![book(2), book(3), book(3)]);
        assert_eq!(ids(&distinct), vec![1, 2, 3]);
    }
}
