//! External decision providers.

mod ai;

pub use ai::{
    Candidate, NullRecommender, RecommendContext, Recommendation, Recommender, ScoringRecommender,
};
