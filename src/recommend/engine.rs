use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::policy::{Aggregation, MergePolicy};
use super::sampler::{Sampler, ThreadRngSampler};
use super::tfidf::TfidfMatrix;
use crate::config::RecommendationConfig;
use crate::db::{AuthorId, Book, BookId, Catalog, DbResult, FavoriteRepo};

/// Content-based recommendations from a user's favorites.
///
/// Three stages fill the list in order, each only when the previous one
/// came up short: title similarity, books by the same authors, random picks.
/// Favorited books are never recommended. Nothing is cached between calls.
#[derive(Clone)]
pub struct RecommendationEngine {
    count: usize,
    aggregation: Aggregation,
    merge: MergePolicy,
    sampler: Arc<dyn Sampler>,
}

impl RecommendationEngine {
    pub fn new(config: &RecommendationConfig) -> Self {
        Self {
            count: config.count,
            aggregation: config.aggregation,
            merge: config.merge,
            sampler: Arc::new(ThreadRngSampler),
        }
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub async fn recommend<S>(&self, store: &S, user_id: &str) -> DbResult<Vec<Book>>
    where
        S: Catalog + FavoriteRepo + ?Sized,
    {
        let favorites = store.favorites_for_user(user_id).await?;
        if favorites.is_empty() || self.count == 0 {
            return Ok(Vec::new());
        }

        let favorite_ids: Vec<BookId> = favorites.iter().map(|f| f.book.id).collect();
        let favorite_titles: Vec<&str> = favorites.iter().map(|f| f.book.title.as_str()).collect();
        let mut seen = HashSet::new();
        let favorite_authors: Vec<AuthorId> = favorites
            .iter()
            .map(|f| f.book.author.id)
            .filter(|id| seen.insert(*id))
            .collect();

        let candidates = store.all_books_excluding(&favorite_ids).await?;
        let ranked =
            rank_by_title_similarity(&candidates, &favorite_titles, self.aggregation, self.count);
        let mut recommended: Vec<Book> = ranked.iter().map(|&i| candidates[i].clone()).collect();
        let by_title = recommended.len();

        if recommended.len() >= self.count {
            recommended.truncate(self.count);
            debug!(user = user_id, by_title, "recommendations filled by title similarity");
            return Ok(recommended);
        }

        let by_author = store
            .books_by_authors_excluding(&favorite_authors, &favorite_ids, self.count)
            .await?;
        let by_author_len = by_author.len();
        self.merge.extend(&mut recommended, by_author);

        if recommended.len() >= self.count {
            recommended.truncate(self.count);
            debug!(
                user = user_id,
                by_title,
                by_author = by_author_len,
                "recommendations filled by author"
            );
            return Ok(recommended);
        }

        let remaining = self.count - recommended.len();
        let mut exclude = favorite_ids;
        exclude.extend(recommended.iter().map(|b| b.id));
        let random = store
            .random_books_excluding(&exclude, remaining, self.sampler.as_ref())
            .await?;
        let by_random = random.len();
        recommended.extend(random);
        recommended.truncate(self.count);

        debug!(
            user = user_id,
            by_title,
            by_author = by_author_len,
            by_random,
            "recommendations filled with random picks"
        );

        Ok(recommended)
    }
}

/// Ranks `candidates` by title similarity to `favorite_titles` and returns
/// the indices of the best `limit`, highest score first.
///
/// Candidates sharing no term with the favorites are left out. Equal scores
/// keep candidate order.
pub fn rank_by_title_similarity(
    candidates: &[Book],
    favorite_titles: &[&str],
    aggregation: Aggregation,
    limit: usize,
) -> Vec<usize> {
    if candidates.is_empty() || favorite_titles.is_empty() {
        return Vec::new();
    }

    // Favorites go last: rows [0, n) are candidates, [n, n + f) favorites.
    let n = candidates.len();
    let documents: Vec<&str> = candidates
        .iter()
        .map(|b| b.title.as_str())
        .chain(favorite_titles.iter().copied())
        .collect();
    let matrix = TfidfMatrix::fit_transform(&documents);

    let rows: Vec<Vec<f64>> = (n..matrix.len())
        .map(|fav| (0..n).map(|cand| matrix.cosine(fav, cand)).collect())
        .collect();
    let scores = aggregation.collapse(&rows, n);

    let mut order: Vec<usize> = (0..n).filter(|&i| scores[i] > 0.0).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(limit);
    order
}
