//! AI recommendation contract.
//!
//! The core pulls recommendations; it never blocks on an AI. A recommender
//! receives a pre-scored snapshot ([`RecommendContext`]) built from previews,
//! so implementations stay free of battle-state borrows and can run behind
//! any transport. Missing or failed recommendations degrade to an empty list.

use async_trait::async_trait;
use battle_core::{ActionKind, ActionTarget, UnitId};
use serde::{Deserialize, Serialize};

/// One suggested action for a unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recommendation {
    pub action_id: String,
    /// 0.0 (wild guess) ..= 1.0 (certain).
    pub confidence: f32,
    pub reasoning: String,
    pub target_hint: Option<ActionTarget>,
}

/// A candidate action with its previewed value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candidate {
    pub action_id: String,
    pub kind: ActionKind,
    pub expected_damage: i32,
    pub expected_healing: i32,
    /// The preview predicted at least one death.
    pub kills: bool,
    pub target: Option<ActionTarget>,
}

/// Snapshot handed to recommenders.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendContext {
    pub unit: UnitId,
    /// Current HP / max HP of the acting unit.
    pub hp_ratio: f32,
    pub candidates: Vec<Candidate>,
}

/// Pull interface for action recommendations.
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend_actions(&self, context: &RecommendContext) -> Vec<Recommendation>;
}

/// Recommends nothing; the degraded-AI fallback.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRecommender;

#[async_trait]
impl Recommender for NullRecommender {
    async fn recommend_actions(&self, _context: &RecommendContext) -> Vec<Recommendation> {
        Vec::new()
    }
}

/// Utility-scoring recommender.
///
/// Kills dominate, then raw damage weighted by aggression, then healing
/// weighted by how wounded the unit is. Scores normalize into confidence.
#[derive(Clone, Copy, Debug)]
pub struct ScoringRecommender {
    /// 0.0 (defensive) ..= 1.0 (reckless). Scales the damage weight.
    pub aggression: f32,
}

impl Default for ScoringRecommender {
    fn default() -> Self {
        Self { aggression: 0.6 }
    }
}

impl ScoringRecommender {
    const KILL_SCORE: f32 = 100.0;

    fn score(&self, candidate: &Candidate, hp_ratio: f32) -> f32 {
        if candidate.kills {
            return Self::KILL_SCORE;
        }
        let damage = candidate.expected_damage as f32 * (1.0 + self.aggression);
        let heal_weight = (1.0 - hp_ratio).clamp(0.0, 1.0) * 3.0;
        let healing = candidate.expected_healing as f32 * heal_weight;
        damage + healing
    }

    fn reasoning(candidate: &Candidate) -> String {
        if candidate.kills {
            format!("{} is expected to kill its target", candidate.action_id)
        } else if candidate.expected_damage > 0 {
            format!(
                "{} deals an expected {} damage",
                candidate.action_id, candidate.expected_damage
            )
        } else if candidate.expected_healing > 0 {
            format!(
                "{} restores an expected {} HP",
                candidate.action_id, candidate.expected_healing
            )
        } else {
            format!("{} keeps options open", candidate.action_id)
        }
    }
}

#[async_trait]
impl Recommender for ScoringRecommender {
    async fn recommend_actions(&self, context: &RecommendContext) -> Vec<Recommendation> {
        let mut scored: Vec<(f32, &Candidate)> = context
            .candidates
            .iter()
            .map(|candidate| (self.score(candidate, context.hp_ratio), candidate))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.action_id.cmp(&b.1.action_id)));

        let best = scored.first().map(|(score, _)| *score).unwrap_or(1.0);
        scored
            .into_iter()
            .map(|(score, candidate)| Recommendation {
                action_id: candidate.action_id.clone(),
                confidence: (score / best.max(1.0)).clamp(0.0, 1.0),
                reasoning: Self::reasoning(candidate),
                target_hint: candidate.target,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, damage: i32, healing: i32, kills: bool) -> Candidate {
        Candidate {
            action_id: id.into(),
            kind: ActionKind::Attack,
            expected_damage: damage,
            expected_healing: healing,
            kills,
            target: None,
        }
    }

    fn context(hp_ratio: f32, candidates: Vec<Candidate>) -> RecommendContext {
        RecommendContext {
            unit: UnitId(1),
            hp_ratio,
            candidates,
        }
    }

    #[tokio::test]
    async fn kills_outrank_damage() {
        let recommender = ScoringRecommender::default();
        let recs = recommender
            .recommend_actions(&context(
                1.0,
                vec![
                    candidate("big_hit", 50, 0, false),
                    candidate("finisher", 5, 0, true),
                ],
            ))
            .await;
        assert_eq!(recs[0].action_id, "finisher");
        assert_eq!(recs[0].confidence, 1.0);
    }

    #[tokio::test]
    async fn wounded_units_value_healing() {
        let recommender = ScoringRecommender::default();
        let healthy = recommender
            .recommend_actions(&context(
                1.0,
                vec![candidate("strike", 10, 0, false), candidate("mend", 0, 12, false)],
            ))
            .await;
        assert_eq!(healthy[0].action_id, "strike");

        let wounded = recommender
            .recommend_actions(&context(
                0.2,
                vec![candidate("strike", 10, 0, false), candidate("mend", 0, 12, false)],
            ))
            .await;
        assert_eq!(wounded[0].action_id, "mend");
    }

    #[tokio::test]
    async fn null_recommender_degrades_to_empty() {
        let recs = NullRecommender
            .recommend_actions(&context(1.0, vec![candidate("strike", 10, 0, false)]))
            .await;
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn confidence_is_bounded() {
        let recommender = ScoringRecommender { aggression: 1.0 };
        let recs = recommender
            .recommend_actions(&context(
                0.5,
                vec![
                    candidate("a", 30, 0, false),
                    candidate("b", 10, 0, false),
                    candidate("c", 0, 8, false),
                ],
            ))
            .await;
        assert!(recs.iter().all(|r| (0.0..=1.0).contains(&r.confidence)));
        // Descending confidence follows descending score.
        assert!(recs.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }
}
