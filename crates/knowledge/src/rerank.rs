//! Linear-combination fusion of lexical and vector hits.

use crate::store::{Candidate, HybridHits};
use ragcheck_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Weight given to the vector modality by default.
pub const DEFAULT_VECTOR_WEIGHT: f32 = 0.7;

/// A fused search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPassage {
    pub id: String,
    pub text: String,
    /// Fused score in `[0, 1]`
    pub score: f32,
    /// Raw lexical score, if the passage was a lexical hit
    pub lexical_score: Option<f32>,
    /// Raw vector score, if the passage was a vector hit
    pub vector_score: Option<f32>,
}

/// Scores each candidate as
/// `weight * norm(vector) + (1 - weight) * norm(lexical)`.
///
/// Each modality is min-max normalized over the candidate set. A modality
/// whose present scores are all equal normalizes to 1.0, and a candidate
/// absent from a modality gets 0 for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearCombinationReranker {
    weight: f32,
}

impl Default for LinearCombinationReranker {
    fn default() -> Self {
        Self {
            weight: DEFAULT_VECTOR_WEIGHT,
        }
    }
}

impl LinearCombinationReranker {
    pub fn new(weight: f32) -> AppResult<Self> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(AppError::InvalidArgument(format!(
                "reranker weight must be within [0, 1], got {}",
                weight
            )));
        }
        Ok(Self { weight })
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Fuse and order all candidates, best first.
    ///
    /// Ties on the fused score fall back to the raw vector score, then to
    /// lexical rank (lexical hits before non-hits), then to candidate order.
    pub fn rerank(&self, hits: &HybridHits) -> Vec<RankedPassage> {
        let candidates = hits.candidates();

        let lexical = Normalizer::new(candidates.iter().filter_map(|c| c.lexical_score));
        let vector = Normalizer::new(candidates.iter().filter_map(|c| c.vector_score));

        let mut scored: Vec<(f32, &Candidate)> = candidates
            .iter()
            .map(|c| {
                let fused = self.weight * vector.apply(c.vector_score)
                    + (1.0 - self.weight) * lexical.apply(c.lexical_score);
                (fused, c)
            })
            .collect();

        scored.sort_by(|(a_score, a), (b_score, b)| {
            b_score
                .total_cmp(a_score)
                .then_with(|| cmp_desc(a.vector_score, b.vector_score))
                .then_with(|| cmp_rank(a.lexical_rank, b.lexical_rank))
        });

        for (score, c) in &scored {
            tracing::debug!(
                id = %c.id,
                fused = score,
                lexical = ?c.lexical_score,
                vector = ?c.vector_score,
                "Fused candidate"
            );
        }

        scored
            .into_iter()
            .map(|(score, c)| RankedPassage {
                id: c.id.clone(),
                text: c.text.clone(),
                score,
                lexical_score: c.lexical_score,
                vector_score: c.vector_score,
            })
            .collect()
    }
}

/// Min-max scaling over one modality's present scores.
struct Normalizer {
    min: f32,
    max: f32,
}

impl Normalizer {
    fn new(scores: impl Iterator<Item = f32>) -> Self {
        let (min, max) = scores.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s), hi.max(s))
        });
        Self { min, max }
    }

    fn apply(&self, score: Option<f32>) -> f32 {
        match score {
            None => 0.0,
            Some(_) if self.max <= self.min => 1.0,
            Some(s) => (s - self.min) / (self.max - self.min),
        }
    }
}

/// Higher present scores first; missing scores last.
fn cmp_desc(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Lower ranks first; non-hits last.
fn cmp_rank(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
