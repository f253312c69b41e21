pub mod engine;
pub mod policy;
pub mod sampler;
pub mod tfidf;

pub use engine::{rank_by_title_similarity, RecommendationEngine};
pub use policy::{Aggregation, MergePolicy};
pub use sampler::{Sampler, SeededSampler, ThreadRngSampler};
pub use tfidf::TfidfMatrix;
