use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::db::Book;

/// Uniform draw of up to `count` books from a pool, without replacement.
pub trait Sampler: Send + Sync {
    fn sample(&self, pool: Vec<Book>, count: usize) -> Vec<Book>;
}

/// Draws from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSampler;

impl Sampler for ThreadRngSampler {
    fn sample(&self, pool: Vec<Book>, count: usize) -> Vec<Book> {
        draw(&mut rand::thread_rng(), pool, count)
    }
}

/// Reproducible sampler, for tests and replaying a run.
pub struct SeededSampler {
    rng: Mutex<StdRng>,
}

impl SeededSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Sampler for SeededSampler {
    fn sample(&self, pool: Vec<Book>, count: usize) -> Vec<Book> {
        // A poisoned lock still holds a usable RNG.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        draw(&mut *rng, pool, count)
    }
}

fn draw<R: Rng + ?Sized>(rng: &mut R, pool: Vec<Book>, count: usize) -> Vec<Book> {
    let amount = count.min(pool.len());
    if amount == 0 {
        return Vec::new();
    }
    let picks = rand::seq::index::sample(rng, pool.len(), amount);
    let mut slots: Vec<Option<Book>> = pool.into_iter().map(Some).collect();
    picks.iter().filter_map(|i| slots[i].take()).collect()
}
