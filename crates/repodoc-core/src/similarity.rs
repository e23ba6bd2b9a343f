//! In-memory similarity scoring over embedding vectors.
//!
//! Both scoring functions compare only the overlapping prefix of the two
//! vectors (`min(|a|, |b|)` dimensions), so a dimension mismatch degrades
//! the score instead of failing. Accumulation is done in `f64`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::EmbeddedChunk;

/// Added to the cosine denominator so all-zero vectors score `0.0`.
pub const COSINE_EPSILON: f64 = 1e-9;

/// Which scoring function ranks candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// `dot(a, b) / (|a|·|b| + ε)`.
    Cosine,
    /// Unnormalized `Σ aᵢ·bᵢ`.
    #[default]
    Dot,
}

impl ScoringMode {
    pub fn score(self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            ScoringMode::Cosine => cosine_similarity(a, b),
            ScoringMode::Dot => dot_product(a, b),
        }
    }
}

/// Unnormalized dot product over the shared prefix.
pub fn dot_product(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum()
}

/// Cosine similarity over the shared prefix.
///
/// Nominally in `[-1.0, 1.0]`; the epsilon term keeps exact boundary values
/// a hair inside the range.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt() + COSINE_EPSILON)
}

/// Anything that carries an embedding vector.
pub trait HasEmbedding {
    fn embedding(&self) -> &[f32];
}

impl HasEmbedding for EmbeddedChunk {
    fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// An item paired with its score against a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<'a, T> {
    pub item: &'a T,
    pub score: f64,
}

/// Score every item against `query_vec` and return all of them, best first.
///
/// The sort is stable: equal scores keep their input order.
pub fn rank<'a, T: HasEmbedding>(
    query_vec: &[f32],
    items: &'a [T],
    mode: ScoringMode,
) -> Vec<Scored<'a, T>> {
    let mut scored: Vec<Scored<'a, T>> = items
        .iter()
        .map(|item| Scored {
            item,
            score: mode.score(query_vec, item.embedding()),
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored
}

/// The `k` best items by cosine similarity.
pub fn top_k<'a, T: HasEmbedding>(query_vec: &[f32], items: &'a [T], k: usize) -> Vec<Scored<'a, T>> {
    let mut ranked = rank(query_vec, items, ScoringMode::Cosine);
    ranked.truncate(k);
    ranked
}
